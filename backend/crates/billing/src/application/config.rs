//! Application Configuration
//!
//! Configuration for the Billing application layer.

use std::time::Duration;

/// Stripe credentials
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    /// `whsec_...` signing secret of the webhook endpoint
    pub webhook_secret: String,
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

/// NOWPayments credentials and redirect targets
#[derive(Clone)]
pub struct NowPaymentsConfig {
    pub api_key: String,
    pub ipn_secret: String,
    pub api_base: String,
    pub ipn_callback_url: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

impl std::fmt::Debug for NowPaymentsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NowPaymentsConfig")
            .field("api_base", &self.api_base)
            .field("ipn_callback_url", &self.ipn_callback_url)
            .finish_non_exhaustive()
    }
}

pub const STRIPE_API_BASE: &str = "https://api.stripe.com";
pub const NOWPAYMENTS_API_BASE: &str = "https://api.nowpayments.io";

#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// ISO currency every plan is priced in
    pub currency: String,
    /// `None` disables card payments
    pub stripe: Option<StripeConfig>,
    /// `None` disables crypto payments
    pub nowpayments: Option<NowPaymentsConfig>,
    /// Maximum age of a signed Stripe webhook
    pub webhook_tolerance: Duration,
    pub provider_timeout: Duration,
    pub ledger_history_limit: u32,
    /// Buffered events per SSE subscriber before it starts lagging
    pub event_buffer: usize,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            stripe: None,
            nowpayments: None,
            webhook_tolerance: Duration::from_secs(300), // 5 minutes
            provider_timeout: Duration::from_secs(15),
            ledger_history_limit: 50,
            event_buffer: 256,
        }
    }
}

impl BillingConfig {
    /// Create config for development (no providers, larger webhook window)
    pub fn development() -> Self {
        Self {
            webhook_tolerance: Duration::from_secs(3600),
            ..Default::default()
        }
    }
}
