//! Shared Kernel - Vocabulary shared by every bounded context
//!
//! - Unified error type and result alias (`error`)
//! - Typed entity identifiers (`id`)
//! - Caller roles as asserted by the identity provider (`role`)
//! - Pagination window for list endpoints (`page`)
//!
//! Only things whose meaning is identical in the marketplace and billing
//! contexts belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
pub mod page;
pub mod role;
