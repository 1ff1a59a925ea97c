//! NOWPayments adapter
//!
//! Crypto payments are hosted invoices. The invoice id is our external id and
//! our payment id travels as `order_id`. IPN callbacks are signed with
//! HMAC-SHA512 over the body re-serialized with keys sorted, hex encoded in
//! `x-nowpayments-sig`.

use platform::crypto::{constant_time_eq, hmac_sha512_hex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::config::NowPaymentsConfig;
use crate::domain::gateway::{CheckoutRequest, CheckoutSession, PaymentGateway};
use crate::domain::value_objects::{PaymentProvider, ProviderStatus};
use crate::error::{BillingError, BillingResult};

#[derive(Clone)]
pub struct NowPaymentsGateway {
    client: reqwest::Client,
    config: Option<NowPaymentsConfig>,
}

impl NowPaymentsGateway {
    /// `config: None` leaves crypto payments disabled
    pub fn new(client: reqwest::Client, config: Option<NowPaymentsConfig>) -> Self {
        Self { client, config }
    }

    fn config(&self) -> BillingResult<&NowPaymentsConfig> {
        self.config
            .as_ref()
            .ok_or(BillingError::ProviderDisabled(PaymentProvider::NowPayments.display_name()))
    }
}

#[derive(Debug, Serialize)]
struct InvoiceRequest<'a> {
    price_amount: f64,
    price_currency: &'a str,
    order_id: String,
    order_description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ipn_callback_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    success_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cancel_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct InvoiceResponse {
    id: Value,
    invoice_url: String,
}

/// Ids arrive as JSON numbers or strings depending on the endpoint
pub fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl PaymentGateway for NowPaymentsGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::NowPayments
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> BillingResult<CheckoutSession> {
        let config = self.config()?;

        let body = InvoiceRequest {
            price_amount: request.amount_cents as f64 / 100.0,
            price_currency: &request.currency,
            order_id: request.payment_id.to_string(),
            order_description: &request.description,
            ipn_callback_url: config.ipn_callback_url.as_deref(),
            success_url: config.success_url.as_deref(),
            cancel_url: config.cancel_url.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/v1/invoice", config.api_base))
            .header("x-api-key", &config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BillingError::Provider(format!(
                "nowpayments returned {status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }

        let invoice: InvoiceResponse = response.json().await?;
        let external_id = id_to_string(&invoice.id)
            .ok_or_else(|| BillingError::Provider("invoice without id".into()))?;

        Ok(CheckoutSession {
            external_id,
            client_secret: None,
            redirect_url: Some(invoice.invoice_url),
        })
    }

    /// Invoices confirm through IPN only
    ///
    /// The status endpoint is keyed by the per-attempt payment id, which is
    /// unknown until the first IPN arrives, so a client poll can only learn
    /// what an IPN already settled.
    async fn fetch_status(&self, external_id: &str) -> BillingResult<ProviderStatus> {
        self.config()?;
        tracing::debug!(invoice_id = external_id, "Crypto status comes from IPN");
        Ok(ProviderStatus::Pending)
    }
}

// ============================================================================
// IPN
// ============================================================================

/// Recursively sort object keys
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Check `x-nowpayments-sig` against the body; returns the parsed body
pub fn verify_ipn(secret: &str, signature: &str, payload: &[u8]) -> BillingResult<Value> {
    let body: Value =
        serde_json::from_slice(payload).map_err(|_| BillingError::InvalidSignature)?;
    let canonical = serde_json::to_string(&canonicalize(&body))
        .map_err(|e| BillingError::Internal(e.to_string()))?;

    let expected = hmac_sha512_hex(secret.as_bytes(), canonical.as_bytes());
    let given = signature.trim().to_ascii_lowercase();

    if constant_time_eq(given.as_bytes(), expected.as_bytes()) {
        Ok(body)
    } else {
        Err(BillingError::InvalidSignature)
    }
}

/// The fields of an IPN we act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpnNotification {
    pub order_id: String,
    pub invoice_id: Option<String>,
    pub payment_id: Option<String>,
    pub payment_status: String,
}

impl IpnNotification {
    pub fn from_body(body: &Value) -> BillingResult<Self> {
        let order_id = body
            .get("order_id")
            .and_then(id_to_string)
            .ok_or_else(|| BillingError::Validation("IPN without order_id".into()))?;
        let payment_status = body
            .get("payment_status")
            .and_then(Value::as_str)
            .ok_or_else(|| BillingError::Validation("IPN without payment_status".into()))?
            .to_string();

        Ok(Self {
            order_id,
            invoice_id: body.get("invoice_id").and_then(id_to_string),
            payment_id: body.get("payment_id").and_then(id_to_string),
            payment_status,
        })
    }

    /// Replay key: one event per payment attempt and status
    pub fn event_id(&self) -> String {
        format!(
            "{}:{}",
            self.payment_id.as_deref().unwrap_or(&self.order_id),
            self.payment_status
        )
    }

    pub fn status(&self) -> ProviderStatus {
        match self.payment_status.as_str() {
            "finished" => ProviderStatus::Succeeded,
            "failed" | "expired" | "refunded" => ProviderStatus::Failed,
            _ => ProviderStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "ipn-secret";

    fn sign(body: &str) -> String {
        let value: Value = serde_json::from_str(body).unwrap();
        let canonical = serde_json::to_string(&canonicalize(&value)).unwrap();
        hmac_sha512_hex(SECRET.as_bytes(), canonical.as_bytes())
    }

    #[test]
    fn test_signature_is_key_order_independent() {
        let body = r#"{"payment_status":"finished","order_id":"abc","invoice_id":42}"#;
        let reordered = r#"{"invoice_id":42,"order_id":"abc","payment_status":"finished"}"#;
        let sig = sign(body);
        assert!(verify_ipn(SECRET, &sig, reordered.as_bytes()).is_ok());
        assert!(verify_ipn(SECRET, &sig.to_uppercase(), body.as_bytes()).is_ok());
    }

    #[test]
    fn test_nested_keys_are_sorted() {
        let value: Value = serde_json::from_str(r#"{"b":{"z":1,"a":2},"a":[{"y":1,"x":2}]}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&canonicalize(&value)).unwrap(),
            r#"{"a":[{"x":2,"y":1}],"b":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn test_bad_signature_rejected() {
        let body = r#"{"payment_status":"finished","order_id":"abc"}"#;
        let tampered = r#"{"payment_status":"finished","order_id":"abd"}"#;
        assert!(matches!(
            verify_ipn(SECRET, &sign(body), tampered.as_bytes()),
            Err(BillingError::InvalidSignature)
        ));
        assert!(verify_ipn(SECRET, &sign(body), b"not json").is_err());
    }

    #[test]
    fn test_notification_fields() {
        let body: Value = serde_json::from_str(
            r#"{"payment_id":5077125051,"invoice_id":4522625843,
                "order_id":"ord-1","payment_status":"confirming"}"#,
        )
        .unwrap();
        let ipn = IpnNotification::from_body(&body).unwrap();
        assert_eq!(ipn.invoice_id.as_deref(), Some("4522625843"));
        assert_eq!(ipn.event_id(), "5077125051:confirming");
        assert_eq!(ipn.status(), ProviderStatus::Pending);

        let missing: Value = serde_json::from_str(r#"{"payment_status":"finished"}"#).unwrap();
        assert!(IpnNotification::from_body(&missing).is_err());
    }

    #[test]
    fn test_status_mapping() {
        let mut ipn = IpnNotification {
            order_id: "o".into(),
            invoice_id: None,
            payment_id: None,
            payment_status: "finished".into(),
        };
        assert_eq!(ipn.status(), ProviderStatus::Succeeded);
        ipn.payment_status = "expired".into();
        assert_eq!(ipn.status(), ProviderStatus::Failed);
        ipn.payment_status = "partially_paid".into();
        assert_eq!(ipn.status(), ProviderStatus::Pending);
    }
}
