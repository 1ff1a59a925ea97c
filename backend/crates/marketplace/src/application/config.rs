//! Application Configuration
//!
//! Configuration for the Marketplace application layer.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    /// Visibility window used when a draft does not specify one
    pub default_visibility_days: i32,
    /// Upper bound accepted for a job's visibility window
    pub max_visibility_days: i32,
    pub title_max_len: usize,
    pub description_max_len: usize,
    pub company_name_max_len: usize,
    pub cover_letter_max_len: usize,
    pub message_max_len: usize,
    /// How often the expiry sweep runs
    pub expiry_sweep_interval: Duration,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            default_visibility_days: 30,
            max_visibility_days: 365,
            title_max_len: 200,
            description_max_len: 20_000,
            company_name_max_len: 120,
            cover_letter_max_len: 10_000,
            message_max_len: 5_000,
            expiry_sweep_interval: Duration::from_secs(15 * 60), // 15 minutes
        }
    }
}

impl MarketplaceConfig {
    /// Create config for development (fast expiry sweep)
    pub fn development() -> Self {
        Self {
            expiry_sweep_interval: Duration::from_secs(60),
            ..Default::default()
        }
    }
}
