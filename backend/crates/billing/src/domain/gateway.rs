//! Payment provider port

use kernel::id::{JobId, PaymentId, PlanId, UserId};
use marketplace::domain::value_objects::JobTier;

use crate::domain::value_objects::{PaymentProvider, ProviderStatus};
use crate::error::BillingResult;

/// What to charge for
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Our payment id, sent as provider metadata / order id
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub job_id: Option<JobId>,
    pub tier: JobTier,
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
}

/// Provider-side handle for a pending payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub external_id: String,
    /// Stripe client secret for Elements
    pub client_secret: Option<String>,
    /// Hosted page for crypto invoices
    pub redirect_url: Option<String>,
}

#[trait_variant::make(PaymentGateway: Send)]
pub trait LocalPaymentGateway {
    fn provider(&self) -> PaymentProvider;

    async fn create_checkout(&self, request: &CheckoutRequest) -> BillingResult<CheckoutSession>;

    /// Ask the provider where a payment stands
    async fn fetch_status(&self, external_id: &str) -> BillingResult<ProviderStatus>;
}
