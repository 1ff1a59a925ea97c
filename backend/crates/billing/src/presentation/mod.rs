//! Presentation Layer - HTTP API
//!
//! Axum handlers, provider webhooks, the payment event stream and routes.

pub mod dto;
pub mod handlers;
pub mod router;
pub mod sse;
pub mod webhooks;
