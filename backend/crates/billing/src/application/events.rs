//! Payment event fan-out
//!
//! Settlements and failures are broadcast so open dashboards can refresh
//! without polling. Delivery is best effort: no subscriber, no event.

use chrono::{DateTime, Utc};
use kernel::id::{JobId, PaymentId, UserId};
use marketplace::domain::value_objects::JobTier;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::entities::{AppliedEffect, Payment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaymentEventKind {
    #[serde(rename = "payment.settled")]
    Settled,
    #[serde(rename = "payment.failed")]
    Failed,
}

impl PaymentEventKind {
    pub const fn code(&self) -> &'static str {
        match self {
            PaymentEventKind::Settled => "payment.settled",
            PaymentEventKind::Failed => "payment.failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub kind: PaymentEventKind,
    pub user_id: UserId,
    pub payment_id: PaymentId,
    pub external_id: String,
    pub job_id: Option<JobId>,
    pub tier: Option<JobTier>,
    pub credits_balance: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

impl PaymentEvent {
    pub fn settled(payment: &Payment, effect: &AppliedEffect, now: DateTime<Utc>) -> Self {
        let (job_id, tier, credits_balance) = match *effect {
            AppliedEffect::JobUpgraded { job_id, tier, .. } => (Some(job_id), Some(tier), None),
            AppliedEffect::CreditsGranted { balance, .. } => (None, None, Some(balance)),
        };
        Self {
            kind: PaymentEventKind::Settled,
            user_id: payment.user_id,
            payment_id: payment.id,
            external_id: payment.external_id.clone(),
            job_id,
            tier,
            credits_balance,
            occurred_at: now,
        }
    }

    pub fn failed(payment: &Payment, now: DateTime<Utc>) -> Self {
        Self {
            kind: PaymentEventKind::Failed,
            user_id: payment.user_id,
            payment_id: payment.id,
            external_id: payment.external_id.clone(),
            job_id: payment.job_id,
            tier: None,
            credits_balance: None,
            occurred_at: now,
        }
    }
}

#[derive(Clone)]
pub struct PaymentEvents {
    sender: broadcast::Sender<PaymentEvent>,
}

impl PaymentEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PaymentEvent> {
        self.sender.subscribe()
    }

    /// Returns how many subscribers got the event
    pub fn publish(&self, event: PaymentEvent) -> usize {
        let kind = event.kind.code();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!(kind, "No payment event subscribers");
                0
            }
        }
    }
}

impl Default for PaymentEvents {
    fn default() -> Self {
        Self::new(256)
    }
}
