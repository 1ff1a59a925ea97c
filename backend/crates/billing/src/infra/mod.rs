//! Infrastructure Layer
//!
//! Repository implementations (PostgreSQL, in-memory) and the payment
//! provider adapters.

pub mod memory;
pub mod nowpayments;
pub mod postgres;
pub mod stripe;
