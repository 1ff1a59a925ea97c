//! Stripe adapter
//!
//! Card payments go through PaymentIntents. Webhooks carry a
//! `Stripe-Signature: t=<unix>,v1=<hex hmac>` header computed over
//! `"{t}.{raw body}"` with the endpoint secret.

use platform::crypto::{constant_time_eq, hmac_sha256_hex};
use serde::Deserialize;
use std::collections::HashMap;

use crate::application::config::StripeConfig;
use crate::domain::gateway::{CheckoutRequest, CheckoutSession, PaymentGateway};
use crate::domain::value_objects::{PaymentProvider, ProviderStatus};
use crate::error::{BillingError, BillingResult};

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    config: Option<StripeConfig>,
}

impl StripeGateway {
    /// `config: None` leaves card payments disabled
    pub fn new(client: reqwest::Client, config: Option<StripeConfig>) -> Self {
        Self { client, config }
    }

    fn config(&self) -> BillingResult<&StripeConfig> {
        self.config
            .as_ref()
            .ok_or(BillingError::ProviderDisabled(PaymentProvider::Stripe.display_name()))
    }
}

#[derive(Debug, Deserialize)]
struct PaymentIntent {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

async fn read_intent(response: reqwest::Response) -> BillingResult<PaymentIntent> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<PaymentIntent>().await?);
    }

    let message = response
        .json::<StripeErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error.message)
        .unwrap_or_else(|| "no error message".to_string());
    Err(BillingError::Provider(format!("stripe returned {status}: {message}")))
}

/// Map a PaymentIntent status onto the three states we act on
///
/// `requires_payment_method` after a decline stays pending: the buyer may
/// retry with another card on the same intent.
pub fn intent_status(status: &str) -> ProviderStatus {
    match status {
        "succeeded" => ProviderStatus::Succeeded,
        "canceled" => ProviderStatus::Failed,
        _ => ProviderStatus::Pending,
    }
}

impl PaymentGateway for StripeGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Stripe
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> BillingResult<CheckoutSession> {
        let config = self.config()?;

        let mut form: Vec<(&str, String)> = vec![
            ("amount", request.amount_cents.to_string()),
            ("currency", request.currency.clone()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("description", request.description.clone()),
            ("metadata[payment_id]", request.payment_id.to_string()),
            ("metadata[user_id]", request.user_id.to_string()),
            ("metadata[plan_id]", request.plan_id.to_string()),
            ("metadata[tier]", request.tier.code().to_string()),
        ];
        if let Some(job_id) = request.job_id {
            form.push(("metadata[job_id]", job_id.to_string()));
        }

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", config.api_base))
            .bearer_auth(&config.secret_key)
            .header("Idempotency-Key", request.payment_id.to_string())
            .form(&form)
            .send()
            .await?;
        let intent = read_intent(response).await?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| BillingError::Provider("payment intent without client_secret".into()))?;

        Ok(CheckoutSession {
            external_id: intent.id,
            client_secret: Some(client_secret),
            redirect_url: None,
        })
    }

    async fn fetch_status(&self, external_id: &str) -> BillingResult<ProviderStatus> {
        let config = self.config()?;

        let response = self
            .client
            .get(format!("{}/v1/payment_intents/{}", config.api_base, external_id))
            .bearer_auth(&config.secret_key)
            .send()
            .await?;
        let intent = read_intent(response).await?;

        if intent.id != external_id {
            return Err(BillingError::Provider("stripe returned another intent".into()));
        }
        Ok(intent_status(&intent.status))
    }
}

// ============================================================================
// Webhooks
// ============================================================================

/// Check a `Stripe-Signature` header against the raw body
///
/// Any of the `v1` signatures may match (Stripe sends several while a secret
/// is being rolled). The timestamp must be within `tolerance_secs` of `now`.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: i64,
    tolerance_secs: i64,
) -> BillingResult<()> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(BillingError::InvalidSignature)?;
    if signatures.is_empty() || now.abs_diff(timestamp) > tolerance_secs.unsigned_abs() {
        return Err(BillingError::InvalidSignature);
    }

    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(payload);
    let expected = hmac_sha256_hex(secret.as_bytes(), &signed);

    if signatures
        .iter()
        .any(|sig| constant_time_eq(sig.as_bytes(), expected.as_bytes()))
    {
        Ok(())
    } else {
        Err(BillingError::InvalidSignature)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: StripeEventObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventObject {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// What a Stripe event asks us to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripeAction {
    Settle(String),
    Fail(String),
    Ignore,
}

impl StripeEvent {
    pub fn action(&self) -> StripeAction {
        match self.event_type.as_str() {
            "payment_intent.succeeded" => StripeAction::Settle(self.data.object.id.clone()),
            "payment_intent.payment_failed" | "payment_intent.canceled" => {
                StripeAction::Fail(self.data.object.id.clone())
            }
            _ => StripeAction::Ignore,
        }
    }
}
