//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations with no business meaning:
//! - Cryptographic utilities (HMAC-SHA256/512, Base64, constant-time compare)
//! - Identity token verification and the `require_identity` middleware
//! - Cookie extraction
//! - Outbound HTTP client construction for payment providers

pub mod cookie;
pub mod crypto;
pub mod identity;
pub mod outbound;
