//! Reconcile Payment Use Case
//!
//! The one path from "provider says paid" to applied effects. Webhooks call
//! [`settle`](ReconcilePaymentUseCase::settle) directly after verifying the
//! signature; client confirmations go through
//! [`confirm`](ReconcilePaymentUseCase::confirm), which asks the provider
//! first. Either way the payment settles at most once.

use chrono::Utc;
use kernel::id::JobId;
use platform::identity::Identity;
use std::sync::Arc;

use crate::application::events::{PaymentEvent, PaymentEvents};
use crate::domain::entities::{Payment, SettleOutcome};
use crate::domain::gateway::PaymentGateway;
use crate::domain::repository::PaymentRepository;
use crate::domain::value_objects::{PaymentProvider, ProviderStatus};
use crate::error::{BillingError, BillingResult};

/// What the client claims it paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentPurpose {
    Job(JobId),
    /// A job that no longer exists; its payment settles as credits
    DeletedJob(JobId),
    Credits,
}

impl PaymentPurpose {
    fn matches(&self, payment: &Payment) -> bool {
        match self {
            PaymentPurpose::Job(job_id) => payment.job_id == Some(*job_id),
            // Deletion may already have cleared the payment's job reference
            PaymentPurpose::DeletedJob(job_id) => payment.job_id.is_none_or(|id| id == *job_id),
            PaymentPurpose::Credits => payment.job_id.is_none(),
        }
    }
}

pub struct ReconcilePaymentUseCase<R, C, K>
where
    R: PaymentRepository,
    C: PaymentGateway,
    K: PaymentGateway,
{
    repo: Arc<R>,
    card: Arc<C>,
    crypto: Arc<K>,
    events: PaymentEvents,
}

impl<R, C, K> ReconcilePaymentUseCase<R, C, K>
where
    R: PaymentRepository,
    C: PaymentGateway,
    K: PaymentGateway,
{
    pub fn new(repo: Arc<R>, card: Arc<C>, crypto: Arc<K>, events: PaymentEvents) -> Self {
        Self {
            repo,
            card,
            crypto,
            events,
        }
    }

    /// Settle a payment the provider has confirmed
    pub async fn settle(&self, external_id: &str) -> BillingResult<SettleOutcome> {
        let now = Utc::now();
        let outcome = self.repo.settle_payment(external_id, now).await?;

        match &outcome {
            SettleOutcome::Settled { payment, effect } => {
                tracing::info!(
                    payment_id = %payment.id,
                    user_id = %payment.user_id,
                    provider = payment.provider.code(),
                    effect = ?effect,
                    "Payment settled"
                );
                self.events.publish(PaymentEvent::settled(payment, effect, now));
            }
            SettleOutcome::AlreadySettled { payment } => {
                tracing::debug!(payment_id = %payment.id, "Payment already settled");
            }
        }

        Ok(outcome)
    }

    /// Record a provider-reported failure
    pub async fn fail(&self, external_id: &str) -> BillingResult<Option<Payment>> {
        let now = Utc::now();
        let failed = self.repo.fail_payment(external_id, now).await?;

        if let Some(payment) = &failed {
            tracing::info!(
                payment_id = %payment.id,
                user_id = %payment.user_id,
                provider = payment.provider.code(),
                "Payment failed"
            );
            self.events.publish(PaymentEvent::failed(payment, now));
        }

        Ok(failed)
    }

    /// Client says it paid; believe the provider, not the client
    pub async fn confirm(
        &self,
        caller: &Identity,
        external_id: &str,
        purpose: PaymentPurpose,
    ) -> BillingResult<SettleOutcome> {
        let payment = self
            .repo
            .find_payment_by_external_id(external_id)
            .await?
            .ok_or(BillingError::PaymentNotFound)?;

        if payment.user_id != caller.user_id || !purpose.matches(&payment) {
            return Err(BillingError::PaymentMismatch);
        }

        if payment.is_settled() {
            return Ok(SettleOutcome::AlreadySettled { payment });
        }

        let status = match payment.provider {
            PaymentProvider::Stripe => self.card.fetch_status(external_id).await?,
            PaymentProvider::NowPayments => self.crypto.fetch_status(external_id).await?,
        };

        match status {
            ProviderStatus::Succeeded => self.settle(external_id).await,
            ProviderStatus::Failed => {
                self.fail(external_id).await?;
                Err(BillingError::PaymentNotSucceeded(status.code()))
            }
            ProviderStatus::Pending => Err(BillingError::PaymentNotSucceeded(status.code())),
        }
    }
}
