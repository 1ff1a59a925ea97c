//! Domain Value Objects

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
}

impl PaymentStatus {
    pub const fn code(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "pending" => Some(PaymentStatus::Pending),
            "succeeded" => Some(PaymentStatus::Succeeded),
            "failed" => Some(PaymentStatus::Failed),
            "canceled" => Some(PaymentStatus::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Stripe,
    NowPayments,
}

impl PaymentProvider {
    pub const fn code(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::NowPayments => "nowpayments",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "stripe" => Some(PaymentProvider::Stripe),
            "nowpayments" => Some(PaymentProvider::NowPayments),
            _ => None,
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "Card",
            PaymentProvider::NowPayments => "Crypto",
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Why a ledger row exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerReason {
    Purchase,
    FeatureUpgrade,
    AdminGrant,
    AdminRevoke,
}

impl LedgerReason {
    pub const fn code(&self) -> &'static str {
        match self {
            LedgerReason::Purchase => "purchase",
            LedgerReason::FeatureUpgrade => "feature_upgrade",
            LedgerReason::AdminGrant => "admin_grant",
            LedgerReason::AdminRevoke => "admin_revoke",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "purchase" => Some(LedgerReason::Purchase),
            "feature_upgrade" => Some(LedgerReason::FeatureUpgrade),
            "admin_grant" => Some(LedgerReason::AdminGrant),
            "admin_revoke" => Some(LedgerReason::AdminRevoke),
            _ => None,
        }
    }
}

/// Payment state as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Pending,
    Succeeded,
    Failed,
}

impl ProviderStatus {
    pub const fn code(&self) -> &'static str {
        match self {
            ProviderStatus::Pending => "pending",
            ProviderStatus::Succeeded => "succeeded",
            ProviderStatus::Failed => "failed",
        }
    }
}
