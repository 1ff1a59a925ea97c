//! Provider webhooks
//!
//! Unauthenticated routes: the provider signature is the only credential.
//! Processing is idempotent, so a redelivered event is settled again as a
//! no-op and only the audit row notices the duplicate.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use kernel::id::PaymentId;
use serde_json::Value;

use crate::domain::entities::WebhookEvent;
use crate::domain::repository::PaymentRepository;
use crate::domain::value_objects::{PaymentProvider, ProviderStatus};
use crate::error::{BillingError, BillingResult};
use crate::infra::nowpayments::{IpnNotification, verify_ipn};
use crate::infra::stripe::{StripeAction, StripeEvent, verify_signature};
use crate::presentation::dto::WebhookAck;
use crate::presentation::handlers::BillingAppState;
use crate::presentation::router::BillingBackend;

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";
pub const NOWPAYMENTS_SIGNATURE_HEADER: &str = "x-nowpayments-sig";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> BillingResult<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(BillingError::InvalidSignature)
}

/// A payment we never created is acknowledged so the provider stops retrying
fn acknowledge_unknown<T>(result: BillingResult<T>, external_id: &str) -> BillingResult<()> {
    match result {
        Ok(_) => Ok(()),
        Err(BillingError::PaymentNotFound) => {
            tracing::warn!(external_id, "Webhook for unknown payment");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn record<B>(
    state: &BillingAppState<B>,
    provider: PaymentProvider,
    event_id: String,
    event_type: String,
    payload: Value,
) -> BillingResult<WebhookAck>
where
    B: BillingBackend,
{
    let event = WebhookEvent {
        provider,
        event_id,
        event_type,
        payload,
        received_at: Utc::now(),
    };
    let fresh = state.repo.record_webhook_event(&event).await?;
    if !fresh {
        tracing::debug!(
            provider = provider.code(),
            event_id = %event.event_id,
            "Duplicate webhook delivery"
        );
    }
    Ok(WebhookAck {
        received: true,
        duplicate: !fresh,
    })
}

/// POST /api/webhooks/stripe
pub async fn stripe_webhook<B>(
    State(state): State<BillingAppState<B>>,
    headers: HeaderMap,
    body: Bytes,
) -> BillingResult<Json<WebhookAck>>
where
    B: BillingBackend,
{
    let config = state
        .config
        .stripe
        .as_ref()
        .ok_or(BillingError::ProviderDisabled(PaymentProvider::Stripe.display_name()))?;

    let tolerance = i64::try_from(state.config.webhook_tolerance.as_secs()).unwrap_or(i64::MAX);
    verify_signature(
        &config.webhook_secret,
        header(&headers, STRIPE_SIGNATURE_HEADER)?,
        &body,
        Utc::now().timestamp(),
        tolerance,
    )?;

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| BillingError::Validation(format!("invalid event body: {e}")))?;
    let event: StripeEvent = serde_json::from_value(payload.clone())
        .map_err(|e| BillingError::Validation(format!("invalid event body: {e}")))?;

    let reconciler = state.reconciler();
    match event.action() {
        StripeAction::Settle(intent_id) => {
            acknowledge_unknown(reconciler.settle(&intent_id).await, &intent_id)?;
        }
        StripeAction::Fail(intent_id) => {
            acknowledge_unknown(reconciler.fail(&intent_id).await, &intent_id)?;
        }
        StripeAction::Ignore => {
            tracing::debug!(event_type = %event.event_type, "Stripe event ignored");
        }
    }

    let ack = record(
        &state,
        PaymentProvider::Stripe,
        event.id,
        event.event_type,
        payload,
    )
    .await?;
    Ok(Json(ack))
}

/// POST /api/webhooks/nowpayments
pub async fn nowpayments_webhook<B>(
    State(state): State<BillingAppState<B>>,
    headers: HeaderMap,
    body: Bytes,
) -> BillingResult<Json<WebhookAck>>
where
    B: BillingBackend,
{
    let config = state
        .config
        .nowpayments
        .as_ref()
        .ok_or(BillingError::ProviderDisabled(PaymentProvider::NowPayments.display_name()))?;

    let payload = verify_ipn(
        &config.ipn_secret,
        header(&headers, NOWPAYMENTS_SIGNATURE_HEADER)?,
        &body,
    )?;
    let ipn = IpnNotification::from_body(&payload)?;

    let payment_id: PaymentId = ipn
        .order_id
        .parse()
        .map_err(|_| BillingError::Validation("order_id is not a payment id".into()))?;

    match state.repo.find_payment(payment_id).await? {
        None => {
            tracing::warn!(order_id = %ipn.order_id, "IPN for unknown payment");
        }
        Some(payment) => {
            if ipn
                .invoice_id
                .as_deref()
                .is_some_and(|invoice| invoice != payment.external_id)
            {
                return Err(BillingError::PaymentMismatch);
            }

            let reconciler = state.reconciler();
            match ipn.status() {
                ProviderStatus::Succeeded => {
                    reconciler.settle(&payment.external_id).await?;
                }
                ProviderStatus::Failed => {
                    reconciler.fail(&payment.external_id).await?;
                }
                ProviderStatus::Pending => {
                    tracing::debug!(
                        payment_id = %payment.id,
                        status = %ipn.payment_status,
                        "Crypto payment in progress"
                    );
                }
            }
        }
    }

    let ack = record(
        &state,
        PaymentProvider::NowPayments,
        ipn.event_id(),
        ipn.payment_status.clone(),
        payload,
    )
    .await?;
    Ok(Json(ack))
}
