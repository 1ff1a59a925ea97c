//! Infrastructure Layer
//!
//! Repository implementations: PostgreSQL for production, in-memory for tests.

pub mod memory;
pub mod postgres;
