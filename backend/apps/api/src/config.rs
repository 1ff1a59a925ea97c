//! Server configuration from the environment
//!
//! Everything the binary reads from env vars lives here so it can be
//! tested without touching the process environment.

use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose;
use billing::application::config::{
    BillingConfig, NOWPAYMENTS_API_BASE, NowPaymentsConfig, STRIPE_API_BASE, StripeConfig,
};
use marketplace::MarketplaceConfig;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";
const DEFAULT_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";
/// Only used by debug builds when IDENTITY_SECRET is unset
const DEV_IDENTITY_SECRET: &[u8] = b"development-identity-secret-change-me";

pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
    pub frontend_origins: Vec<String>,
    pub identity_secret: Vec<u8>,
    pub marketplace: MarketplaceConfig,
    pub billing: BillingConfig,
}

impl ApiConfig {
    pub fn from_env(development: bool) -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), development)
    }

    pub fn from_lookup<F>(lookup: F, development: bool) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR is not a socket address")?;

        let max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v.parse().context("DATABASE_MAX_CONNECTIONS is not a number")?,
            None => 5,
        };

        let frontend_origins = var("FRONTEND_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ORIGINS.to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let identity_secret = match var("IDENTITY_SECRET") {
            Some(encoded) => general_purpose::STANDARD
                .decode(encoded.trim())
                .context("IDENTITY_SECRET is not base64")?,
            None if development => DEV_IDENTITY_SECRET.to_vec(),
            None => bail!("IDENTITY_SECRET must be set in production"),
        };
        if identity_secret.len() < 32 && !development {
            bail!("IDENTITY_SECRET must decode to at least 32 bytes");
        }

        let mut marketplace = if development {
            MarketplaceConfig::development()
        } else {
            MarketplaceConfig::default()
        };
        if let Some(secs) = var("EXPIRY_SWEEP_SECS") {
            let secs: u64 = secs.parse().context("EXPIRY_SWEEP_SECS is not a number")?;
            if secs == 0 {
                bail!("EXPIRY_SWEEP_SECS must be positive");
            }
            marketplace.expiry_sweep_interval = Duration::from_secs(secs);
        }

        let mut billing = if development {
            BillingConfig::development()
        } else {
            BillingConfig::default()
        };
        if let Some(currency) = var("BILLING_CURRENCY") {
            billing.currency = currency.to_ascii_lowercase();
        }

        billing.stripe = match (var("STRIPE_SECRET_KEY"), var("STRIPE_WEBHOOK_SECRET")) {
            (Some(secret_key), Some(webhook_secret)) => Some(StripeConfig {
                secret_key,
                webhook_secret,
                api_base: var("STRIPE_API_BASE").unwrap_or_else(|| STRIPE_API_BASE.to_string()),
            }),
            (None, None) => None,
            _ => bail!("STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET must be set together"),
        };

        billing.nowpayments = match (var("NOWPAYMENTS_API_KEY"), var("NOWPAYMENTS_IPN_SECRET")) {
            (Some(api_key), Some(ipn_secret)) => Some(NowPaymentsConfig {
                api_key,
                ipn_secret,
                api_base: var("NOWPAYMENTS_API_BASE")
                    .unwrap_or_else(|| NOWPAYMENTS_API_BASE.to_string()),
                ipn_callback_url: var("NOWPAYMENTS_IPN_CALLBACK_URL"),
                success_url: var("PAYMENT_SUCCESS_URL"),
                cancel_url: var("PAYMENT_CANCEL_URL"),
            }),
            (None, None) => None,
            _ => bail!("NOWPAYMENTS_API_KEY and NOWPAYMENTS_IPN_SECRET must be set together"),
        };

        Ok(Self {
            bind_addr,
            database_url,
            max_connections,
            frontend_origins,
            identity_secret,
            marketplace,
            billing,
        })
    }
}
