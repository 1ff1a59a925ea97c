//! Credits Use Case
//!
//! Balance and history for the caller, manual adjustments for admins.

use chrono::Utc;
use kernel::id::UserId;
use marketplace::application::access::ensure_admin;
use platform::identity::Identity;
use std::sync::Arc;

use crate::application::config::BillingConfig;
use crate::domain::entities::LedgerEntry;
use crate::domain::repository::LedgerRepository;
use crate::error::{BillingError, BillingResult};

/// Largest single manual adjustment
const MAX_ADJUSTMENT: i64 = 1_000;

#[derive(Debug, Clone)]
pub struct CreditSummary {
    pub balance: i64,
    pub entries: Vec<LedgerEntry>,
}

pub struct CreditsUseCase<R>
where
    R: LedgerRepository,
{
    repo: Arc<R>,
    config: Arc<BillingConfig>,
}

impl<R> CreditsUseCase<R>
where
    R: LedgerRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<BillingConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn balance(&self, caller: &Identity) -> BillingResult<i64> {
        self.repo.credit_balance(caller.user_id).await
    }

    pub async fn summary(&self, caller: &Identity) -> BillingResult<CreditSummary> {
        let balance = self.repo.credit_balance(caller.user_id).await?;
        let entries = self
            .repo
            .ledger_history(caller.user_id, self.config.ledger_history_limit)
            .await?;
        Ok(CreditSummary { balance, entries })
    }

    /// Grant (positive) or revoke (negative) credits for `user_id`
    pub async fn adjust(
        &self,
        caller: &Identity,
        user_id: UserId,
        amount: i64,
        note: Option<String>,
    ) -> BillingResult<LedgerEntry> {
        ensure_admin(caller)?;

        if amount == 0 || amount.abs() > MAX_ADJUSTMENT {
            return Err(BillingError::Validation(format!(
                "amount must be between -{MAX_ADJUSTMENT} and {MAX_ADJUSTMENT}, and not zero"
            )));
        }
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        let entry = self
            .repo
            .adjust_credits(user_id, amount, note, Utc::now())
            .await?;

        tracing::info!(
            admin_id = %caller.user_id,
            user_id = %user_id,
            amount,
            balance = entry.balance,
            "Credits adjusted"
        );

        Ok(entry)
    }
}
