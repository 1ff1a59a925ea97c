//! Use case, ledger and webhook tests for the billing crate
//!
//! Run against the in-memory repositories with a scripted payment gateway.

#[cfg(test)]
mod fixtures {
    use chrono::Utc;
    use kernel::id::{CompanyId, UserId};
    use kernel::role::UserRole;
    use marketplace::application::config::MarketplaceConfig;
    use marketplace::application::{
        CompanyUseCase, CreateCompanyInput, DraftJobInput, ModerateJobUseCase,
        ModerationDecision, PostJobUseCase,
    };
    use marketplace::domain::entities::Job;
    use marketplace::domain::repository::JobRepository;
    use marketplace::domain::value_objects::JobTier;
    use marketplace::MemoryMarketplaceRepository;
    use platform::identity::Identity;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::application::config::BillingConfig;
    use crate::application::events::PaymentEvents;
    use crate::application::{CheckoutInput, CheckoutOutput, CheckoutUseCase, ReconcilePaymentUseCase};
    use crate::domain::gateway::{CheckoutRequest, CheckoutSession, PaymentGateway};
    use crate::domain::repository::LedgerRepository;
    use crate::domain::value_objects::{PaymentProvider, ProviderStatus};
    use crate::error::BillingResult;
    use crate::infra::memory::MemoryBillingRepository;
    use crate::presentation::handlers::BillingAppState;
    use crate::presentation::router::BillingBackend;

    /// Gateway whose provider-side status the test sets by hand
    #[derive(Clone)]
    pub struct StubGateway {
        provider: PaymentProvider,
        prefix: &'static str,
        next: Arc<AtomicU32>,
        statuses: Arc<Mutex<HashMap<String, ProviderStatus>>>,
    }

    impl StubGateway {
        pub fn card() -> Self {
            Self::new(PaymentProvider::Stripe, "pi_test")
        }

        pub fn crypto() -> Self {
            Self::new(PaymentProvider::NowPayments, "inv")
        }

        fn new(provider: PaymentProvider, prefix: &'static str) -> Self {
            Self {
                provider,
                prefix,
                next: Arc::new(AtomicU32::new(1)),
                statuses: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        pub fn set_status(&self, external_id: &str, status: ProviderStatus) {
            self.statuses
                .lock()
                .unwrap()
                .insert(external_id.to_string(), status);
        }
    }

    impl PaymentGateway for StubGateway {
        fn provider(&self) -> PaymentProvider {
            self.provider
        }

        async fn create_checkout(&self, _request: &CheckoutRequest) -> BillingResult<CheckoutSession> {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            let external_id = format!("{}_{n}", self.prefix);
            self.set_status(&external_id, ProviderStatus::Pending);
            Ok(CheckoutSession {
                client_secret: Some(format!("{external_id}_secret")),
                redirect_url: Some(format!("https://pay.example/{external_id}")),
                external_id,
            })
        }

        async fn fetch_status(&self, external_id: &str) -> BillingResult<ProviderStatus> {
            Ok(self
                .statuses
                .lock()
                .unwrap()
                .get(external_id)
                .copied()
                .unwrap_or(ProviderStatus::Pending))
        }
    }

    pub struct MemoryBackend;

    impl BillingBackend for MemoryBackend {
        type Store = MemoryBillingRepository;
        type Market = MemoryMarketplaceRepository;
        type Card = StubGateway;
        type Crypto = StubGateway;
    }

    pub struct Harness {
        pub market: Arc<MemoryMarketplaceRepository>,
        pub market_config: Arc<MarketplaceConfig>,
        pub repo: Arc<MemoryBillingRepository>,
        pub card: Arc<StubGateway>,
        pub crypto: Arc<StubGateway>,
        pub config: Arc<BillingConfig>,
        pub events: PaymentEvents,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_config(BillingConfig::default())
        }

        pub fn with_config(config: BillingConfig) -> Self {
            let market = MemoryMarketplaceRepository::new();
            Self {
                repo: Arc::new(MemoryBillingRepository::new(market.clone())),
                market: Arc::new(market),
                market_config: Arc::new(MarketplaceConfig::default()),
                card: Arc::new(StubGateway::card()),
                crypto: Arc::new(StubGateway::crypto()),
                config: Arc::new(config),
                events: PaymentEvents::new(16),
            }
        }

        pub fn state(&self) -> BillingAppState<MemoryBackend> {
            BillingAppState {
                repo: self.repo.clone(),
                market: self.market.clone(),
                card: self.card.clone(),
                crypto: self.crypto.clone(),
                config: self.config.clone(),
                events: self.events.clone(),
            }
        }

        pub fn reconciler(&self) -> ReconcilePaymentUseCase<MemoryBillingRepository, StubGateway, StubGateway> {
            ReconcilePaymentUseCase::new(
                self.repo.clone(),
                self.card.clone(),
                self.crypto.clone(),
                self.events.clone(),
            )
        }

        pub async fn company(&self, owner: &Identity) -> CompanyId {
            CompanyUseCase::new(self.market.clone(), self.market_config.clone())
                .create(
                    owner,
                    CreateCompanyInput {
                        name: "Chainworks".into(),
                        website: None,
                    },
                )
                .await
                .unwrap()
                .id
        }

        pub async fn draft(&self, owner: &Identity, company_id: CompanyId) -> Job {
            PostJobUseCase::new(self.market.clone(), self.market_config.clone())
                .create_draft(
                    owner,
                    company_id,
                    DraftJobInput {
                        title: "Smart contract engineer".into(),
                        description: "Audit and ship".into(),
                        location: None,
                        visibility_days: Some(30),
                    },
                )
                .await
                .unwrap()
        }

        pub async fn active_job(&self, owner: &Identity, company_id: CompanyId) -> Job {
            let job = self.draft(owner, company_id).await;
            PostJobUseCase::new(self.market.clone(), self.market_config.clone())
                .submit(owner, job.id)
                .await
                .unwrap();
            ModerateJobUseCase::new(self.market.clone())
                .execute_at(&admin(), job.id, ModerationDecision::Approve, Utc::now())
                .await
                .unwrap()
        }

        pub async fn job(&self, job: &Job) -> Job {
            self.market.find_job(job.id).await.unwrap().unwrap()
        }

        pub async fn grant(&self, user: &Identity, amount: i64) {
            self.repo
                .adjust_credits(user.user_id, amount, None, Utc::now())
                .await
                .unwrap();
        }

        pub async fn card_checkout(
            &self,
            caller: &Identity,
            tier: JobTier,
            job: Option<&Job>,
        ) -> BillingResult<CheckoutOutput> {
            CheckoutUseCase::new(
                self.repo.clone(),
                self.market.clone(),
                self.card.clone(),
                self.config.clone(),
            )
            .execute(
                caller,
                CheckoutInput {
                    tier,
                    job_id: job.map(|j| j.id),
                },
            )
            .await
        }

        pub async fn crypto_checkout(&self, caller: &Identity, tier: JobTier) -> CheckoutOutput {
            CheckoutUseCase::new(
                self.repo.clone(),
                self.market.clone(),
                self.crypto.clone(),
                self.config.clone(),
            )
            .execute(caller, CheckoutInput { tier, job_id: None })
            .await
            .unwrap()
        }
    }

    pub fn employer() -> Identity {
        Identity::new(UserId::new(), UserRole::Employer)
    }

    pub fn talent() -> Identity {
        Identity::new(UserId::new(), UserRole::Talent)
    }

    pub fn admin() -> Identity {
        Identity::new(UserId::new(), UserRole::Admin)
    }
}

#[cfg(test)]
mod checkout_tests {
    use axum::http::StatusCode;
    use marketplace::domain::value_objects::JobTier;

    use super::fixtures::*;
    use crate::domain::entities::Plan;
    use crate::domain::repository::{PaymentRepository, PlanRepository};
    use crate::domain::value_objects::{PaymentProvider, PaymentStatus};
    use crate::error::BillingError;
    use crate::infra::memory::MemoryBillingRepository;

    #[tokio::test]
    async fn test_checkout_records_pending_payment() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;

        let out = h
            .card_checkout(&owner, JobTier::Premium, Some(&job))
            .await
            .unwrap();

        assert_eq!(out.payment.status, PaymentStatus::Pending);
        assert_eq!(out.payment.provider, PaymentProvider::Stripe);
        assert_eq!(out.payment.amount_cents, 19_900);
        assert_eq!(out.payment.job_id, Some(job.id));
        assert!(out.session.client_secret.is_some());

        let stored = h
            .repo
            .find_payment_by_external_id(&out.payment.external_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, out.payment);
    }

    #[tokio::test]
    async fn test_checkout_requires_membership() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;

        let err = h
            .card_checkout(&employer(), JobTier::Featured, Some(&job))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_checkout_refuses_tier_already_held() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;
        h.grant(&owner, 1).await;
        crate::application::FeatureUpgradeUseCase::new(h.repo.clone())
            .execute(&owner, job.id)
            .await
            .unwrap();

        let err = h
            .card_checkout(&owner, JobTier::Featured, Some(&job))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::TierNotUpgradable("featured")));

        // Premium is still an upgrade
        assert!(h.card_checkout(&owner, JobTier::Premium, Some(&job)).await.is_ok());
    }

    #[tokio::test]
    async fn test_talent_cannot_buy() {
        let h = Harness::new();
        let err = h
            .card_checkout(&talent(), JobTier::Featured, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_normal_tier_is_not_for_sale() {
        let h = Harness::new();
        let err = h
            .card_checkout(&employer(), JobTier::Normal, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_oldest_active_plan_wins() {
        let mut h = Harness::new();
        let launched = chrono::Utc::now() - chrono::Duration::days(90);
        let original = Plan::new("Featured 30", JobTier::Featured, 30, 9_900, 1, launched);
        let promo = Plan::new("Featured promo", JobTier::Featured, 30, 1_900, 1, chrono::Utc::now());
        h.repo = std::sync::Arc::new(MemoryBillingRepository::with_plans(
            (*h.market).clone(),
            vec![promo, original.clone()],
        ));

        let picked = h
            .repo
            .active_plan_for_tier(JobTier::Featured)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, original.id);

        let out = h
            .card_checkout(&employer(), JobTier::Featured, None)
            .await
            .unwrap();
        assert_eq!(out.plan.id, original.id);
        assert_eq!(out.payment.amount_cents, 9_900);
    }

    #[tokio::test]
    async fn test_inactive_plan_not_found() {
        let mut h = Harness::new();
        let mut plans = Plan::default_catalogue(chrono::Utc::now());
        plans[0].is_active = false;
        h.repo = std::sync::Arc::new(MemoryBillingRepository::with_plans(
            (*h.market).clone(),
            plans,
        ));

        let err = h
            .card_checkout(&employer(), JobTier::Featured, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::PlanNotFound(_)));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}

#[cfg(test)]
mod reconcile_tests {
    use axum::http::StatusCode;
    use chrono::Duration;
    use kernel::id::JobId;
    use marketplace::application::CompanyUseCase;
    use marketplace::domain::value_objects::{JobStatus, JobTier};

    use super::fixtures::*;
    use crate::application::PaymentPurpose;
    use crate::application::events::PaymentEventKind;
    use crate::domain::entities::{AppliedEffect, SettleOutcome};
    use crate::domain::repository::{LedgerRepository, PaymentRepository};
    use crate::domain::value_objects::{LedgerReason, PaymentStatus, ProviderStatus};
    use crate::error::BillingError;

    #[tokio::test]
    async fn test_paid_upgrade_publishes_draft_once() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.draft(&owner, company_id).await;

        let out = h
            .card_checkout(&owner, JobTier::Premium, Some(&job))
            .await
            .unwrap();
        let intent = out.payment.external_id.clone();
        h.card.set_status(&intent, ProviderStatus::Succeeded);

        let first = h
            .reconciler()
            .confirm(&owner, &intent, PaymentPurpose::Job(job.id))
            .await
            .unwrap();
        match first {
            SettleOutcome::Settled {
                ref payment,
                effect:
                    AppliedEffect::JobUpgraded {
                        tier, published, ..
                    },
            } => {
                assert_eq!(payment.status, PaymentStatus::Succeeded);
                assert_eq!(tier, JobTier::Premium);
                assert!(published);
            }
            other => panic!("expected settlement, got {other:?}"),
        }

        let upgraded = h.job(&job).await;
        assert_eq!(upgraded.status, JobStatus::Active);
        assert_eq!(upgraded.tier, JobTier::Premium);
        let published_at = upgraded.published_at.unwrap();
        assert_eq!(upgraded.expires_at, Some(published_at + Duration::days(60)));

        // Client retry and webhook replay are both no-ops
        let again = h
            .reconciler()
            .confirm(&owner, &intent, PaymentPurpose::Job(job.id))
            .await
            .unwrap();
        assert!(again.already_applied());
        assert!(h.reconciler().settle(&intent).await.unwrap().already_applied());
        assert_eq!(h.job(&job).await, upgraded);
    }

    #[tokio::test]
    async fn test_unconfirmed_payment_is_not_settled() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;
        let out = h
            .card_checkout(&owner, JobTier::Featured, Some(&job))
            .await
            .unwrap();

        let err = h
            .reconciler()
            .confirm(&owner, &out.payment.external_id, PaymentPurpose::Job(job.id))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::PaymentNotSucceeded("pending")));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(h.job(&job).await.tier, JobTier::Normal);
    }

    #[tokio::test]
    async fn test_confirm_checks_owner_and_purpose() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;
        let out = h
            .card_checkout(&owner, JobTier::Featured, Some(&job))
            .await
            .unwrap();
        let intent = out.payment.external_id.clone();
        h.card.set_status(&intent, ProviderStatus::Succeeded);

        let stranger = h
            .reconciler()
            .confirm(&employer(), &intent, PaymentPurpose::Job(job.id))
            .await
            .unwrap_err();
        assert!(matches!(stranger, BillingError::PaymentMismatch));

        let other_job = h
            .reconciler()
            .confirm(&owner, &intent, PaymentPurpose::Job(JobId::new()))
            .await
            .unwrap_err();
        assert!(matches!(other_job, BillingError::PaymentMismatch));

        let as_credits = h
            .reconciler()
            .confirm(&owner, &intent, PaymentPurpose::Credits)
            .await
            .unwrap_err();
        assert!(matches!(as_credits, BillingError::PaymentMismatch));

        assert_eq!(h.job(&job).await.tier, JobTier::Normal);
    }

    #[tokio::test]
    async fn test_provider_failure_marks_payment_failed() {
        let h = Harness::new();
        let owner = employer();
        let out = h.card_checkout(&owner, JobTier::Featured, None).await.unwrap();
        let intent = out.payment.external_id.clone();
        h.card.set_status(&intent, ProviderStatus::Failed);

        let err = h
            .reconciler()
            .confirm(&owner, &intent, PaymentPurpose::Credits)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::PaymentNotSucceeded("failed")));

        let stored = h.repo.find_payment_by_external_id(&intent).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Failed);

        // A late success report still settles it
        let outcome = h.reconciler().settle(&intent).await.unwrap();
        assert!(!outcome.already_applied());
        assert_eq!(h.repo.credit_balance(owner.user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failure_after_success_is_ignored() {
        let h = Harness::new();
        let owner = employer();
        let out = h.card_checkout(&owner, JobTier::Featured, None).await.unwrap();
        let intent = out.payment.external_id.clone();

        h.reconciler().settle(&intent).await.unwrap();
        assert!(h.reconciler().fail(&intent).await.unwrap().is_none());

        let stored = h.repo.find_payment_by_external_id(&intent).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_credit_purchase_appends_ledger_row() {
        let h = Harness::new();
        let owner = employer();
        let out = h.card_checkout(&owner, JobTier::Premium, None).await.unwrap();
        let intent = out.payment.external_id.clone();
        h.card.set_status(&intent, ProviderStatus::Succeeded);

        let outcome = h
            .reconciler()
            .confirm(&owner, &intent, PaymentPurpose::Credits)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            SettleOutcome::Settled {
                effect: AppliedEffect::CreditsGranted {
                    amount: 1,
                    balance: 1
                },
                ..
            }
        ));

        let history = h.repo.ledger_history(owner.user_id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason, LedgerReason::Purchase);
        assert_eq!(history[0].payment_id, Some(out.payment.id));
        assert_eq!(history[0].tier, Some(JobTier::Premium));
    }

    #[tokio::test]
    async fn test_deleted_job_payment_grants_credits() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;
        let out = h
            .card_checkout(&owner, JobTier::Featured, Some(&job))
            .await
            .unwrap();

        CompanyUseCase::new(h.market.clone(), h.market_config.clone())
            .delete(&owner, company_id)
            .await
            .unwrap();

        let outcome = h.reconciler().settle(&out.payment.external_id).await.unwrap();
        assert!(matches!(
            outcome,
            SettleOutcome::Settled {
                effect: AppliedEffect::CreditsGranted { amount: 1, .. },
                ..
            }
        ));
        assert_eq!(h.repo.credit_balance(owner.user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_confirm_for_deleted_job_grants_credits() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;
        let out = h
            .card_checkout(&owner, JobTier::Featured, Some(&job))
            .await
            .unwrap();
        let intent = out.payment.external_id.clone();
        h.card.set_status(&intent, ProviderStatus::Succeeded);

        CompanyUseCase::new(h.market.clone(), h.market_config.clone())
            .delete(&owner, company_id)
            .await
            .unwrap();

        let outcome = h
            .reconciler()
            .confirm(&owner, &intent, PaymentPurpose::DeletedJob(job.id))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            SettleOutcome::Settled {
                effect: AppliedEffect::CreditsGranted { amount: 1, balance: 1 },
                ..
            }
        ));

        // Only the job the payment was bought for
        let err = h
            .reconciler()
            .confirm(&owner, &intent, PaymentPurpose::DeletedJob(JobId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::PaymentMismatch));
    }

    #[tokio::test]
    async fn test_unknown_payment_not_found() {
        let h = Harness::new();
        let err = h.reconciler().settle("pi_nobody").await.unwrap_err();
        assert!(matches!(err, BillingError::PaymentNotFound));
    }

    #[tokio::test]
    async fn test_settlement_is_broadcast() {
        let h = Harness::new();
        let owner = employer();
        let mut receiver = h.events.subscribe();

        let out = h.card_checkout(&owner, JobTier::Featured, None).await.unwrap();
        h.reconciler().settle(&out.payment.external_id).await.unwrap();
        // Replays publish nothing
        h.reconciler().settle(&out.payment.external_id).await.unwrap();

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.kind, PaymentEventKind::Settled);
        assert_eq!(event.user_id, owner.user_id);
        assert_eq!(event.credits_balance, Some(1));
        assert!(receiver.try_recv().is_err());
    }
}

#[cfg(test)]
mod ledger_tests {
    use axum::http::StatusCode;
    use marketplace::application::{ModerateJobUseCase, ModerationDecision, PostJobUseCase};
    use marketplace::domain::repository::JobRepository;
    use marketplace::domain::value_objects::{JobStatus, JobTier};

    use super::fixtures::*;
    use crate::application::{CreditsUseCase, FeatureUpgradeUseCase};
    use crate::domain::entities::FeatureOutcome;
    use crate::domain::repository::LedgerRepository;
    use crate::domain::value_objects::LedgerReason;
    use crate::error::BillingError;

    #[tokio::test]
    async fn test_credit_features_job() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;
        h.grant(&owner, 1).await;

        let outcome = FeatureUpgradeUseCase::new(h.repo.clone())
            .execute(&owner, job.id)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FeatureOutcome::Upgraded {
                job_id: job.id,
                balance: 0
            }
        );
        assert_eq!(h.job(&job).await.tier, JobTier::Featured);

        let history = h.repo.ledger_history(owner.user_id, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].amount, -1);
        assert_eq!(history[0].reason, LedgerReason::FeatureUpgrade);
        assert_eq!(history[0].job_id, Some(job.id));
        assert_eq!(history[1].reason, LedgerReason::AdminGrant);
        assert_eq!(
            h.repo.credit_balance(owner.user_id).await.unwrap(),
            history[0].balance
        );
    }

    #[tokio::test]
    async fn test_no_credits_leaves_job_untouched() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;

        let err = FeatureUpgradeUseCase::new(h.repo.clone())
            .execute(&owner, job.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InsufficientCredits));
        assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(h.job(&job).await.tier, JobTier::Normal);
        assert!(h.repo.ledger_history(owner.user_id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_already_featured_costs_nothing() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;
        h.grant(&owner, 2).await;

        let use_case = FeatureUpgradeUseCase::new(h.repo.clone());
        use_case.execute(&owner, job.id).await.unwrap();
        let second = use_case.execute(&owner, job.id).await.unwrap();

        assert!(matches!(second, FeatureOutcome::AlreadyPromoted { balance: 1, .. }));
        assert_eq!(h.repo.credit_balance(owner.user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_spend_of_last_credit() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let first = h.active_job(&owner, company_id).await;
        let second = h.active_job(&owner, company_id).await;
        h.grant(&owner, 1).await;

        let use_case = FeatureUpgradeUseCase::new(h.repo.clone());
        let (a, b) = tokio::join!(
            use_case.execute(&owner, first.id),
            use_case.execute(&owner, second.id)
        );

        let results = [a, b];
        let upgraded = results.iter().filter(|r| r.is_ok()).count();
        let refused = results
            .iter()
            .filter(|r| matches!(r, Err(BillingError::InsufficientCredits)))
            .count();
        assert_eq!((upgraded, refused), (1, 1));

        assert_eq!(h.repo.credit_balance(owner.user_id).await.unwrap(), 0);
        let featured = [h.job(&first).await, h.job(&second).await]
            .iter()
            .filter(|j| j.tier == JobTier::Featured)
            .count();
        assert_eq!(featured, 1);
    }

    #[tokio::test]
    async fn test_concurrent_spend_on_same_job_charges_once() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;
        h.grant(&owner, 5).await;

        let use_case = FeatureUpgradeUseCase::new(h.repo.clone());
        let (a, b) = tokio::join!(use_case.execute(&owner, job.id), use_case.execute(&owner, job.id));

        let outcomes = [a.unwrap(), b.unwrap()];
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, FeatureOutcome::Upgraded { .. }))
                .count(),
            1
        );
        assert_eq!(h.repo.credit_balance(owner.user_id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_non_member_cannot_spend_on_job() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;
        let outsider = employer();
        h.grant(&outsider, 1).await;

        let err = FeatureUpgradeUseCase::new(h.repo.clone())
            .execute(&outsider, job.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::NotCompanyMember));
        assert_eq!(h.repo.credit_balance(outsider.user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_approval_keeps_tier_bought_while_pending() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.draft(&owner, company_id).await;
        PostJobUseCase::new(h.market.clone(), h.market_config.clone())
            .submit(&owner, job.id)
            .await
            .unwrap();
        h.grant(&owner, 1).await;

        // Moderator reads the job before the owner spends a credit on it
        let mut stale = h.job(&job).await;
        FeatureUpgradeUseCase::new(h.repo.clone())
            .execute(&owner, job.id)
            .await
            .unwrap();

        stale.approve(chrono::Utc::now()).unwrap();
        let saved = h
            .market
            .save_job_transition(&stale, JobStatus::Pending)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(saved.status, JobStatus::Active);
        assert_eq!(saved.tier, JobTier::Featured);
        assert_eq!(h.job(&job).await.tier, JobTier::Featured);
        assert_eq!(h.repo.credit_balance(owner.user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_moderation_returns_current_tier() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.draft(&owner, company_id).await;
        PostJobUseCase::new(h.market.clone(), h.market_config.clone())
            .submit(&owner, job.id)
            .await
            .unwrap();
        h.grant(&owner, 1).await;
        FeatureUpgradeUseCase::new(h.repo.clone())
            .execute(&owner, job.id)
            .await
            .unwrap();

        let approved = ModerateJobUseCase::new(h.market.clone())
            .execute(&admin(), job.id, ModerationDecision::Approve)
            .await
            .unwrap();
        assert_eq!(approved.tier, JobTier::Featured);
        assert_eq!(approved.status, JobStatus::Active);
    }

    #[tokio::test]
    async fn test_rejected_job_cannot_be_featured() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.draft(&owner, company_id).await;
        PostJobUseCase::new(h.market.clone(), h.market_config.clone())
            .submit(&owner, job.id)
            .await
            .unwrap();
        ModerateJobUseCase::new(h.market.clone())
            .execute(&admin(), job.id, ModerationDecision::Reject)
            .await
            .unwrap();
        h.grant(&owner, 1).await;

        let err = FeatureUpgradeUseCase::new(h.repo.clone())
            .execute(&owner, job.id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(h.repo.credit_balance(owner.user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_admin_adjustments() {
        let h = Harness::new();
        let credits = CreditsUseCase::new(h.repo.clone(), h.config.clone());
        let root = admin();
        let user = employer();

        let entry = credits
            .adjust(&root, user.user_id, 3, Some("  launch promo ".into()))
            .await
            .unwrap();
        assert_eq!(entry.balance, 3);
        assert_eq!(entry.note.as_deref(), Some("launch promo"));

        let revoke = credits.adjust(&root, user.user_id, -2, None).await.unwrap();
        assert_eq!(revoke.reason, LedgerReason::AdminRevoke);
        assert_eq!(revoke.balance, 1);

        assert!(matches!(
            credits.adjust(&root, user.user_id, -2, None).await,
            Err(BillingError::InsufficientCredits)
        ));
        assert!(matches!(
            credits.adjust(&root, user.user_id, 0, None).await,
            Err(BillingError::Validation(_))
        ));

        let denied = credits.adjust(&user, user.user_id, 5, None).await.unwrap_err();
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);

        let summary = credits.summary(&user).await.unwrap();
        assert_eq!(summary.balance, 1);
        assert_eq!(summary.entries.len(), 2);
        assert_eq!(summary.entries[0].amount, -2);
    }
}

#[cfg(test)]
mod dashboard_tests {
    use marketplace::domain::value_objects::JobStatus;

    use super::fixtures::*;
    use crate::application::{DashboardUseCase, FeatureUpgradeUseCase};

    #[tokio::test]
    async fn test_stats_cover_jobs_and_credits() {
        let h = Harness::new();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;
        h.draft(&owner, company_id).await;
        h.grant(&owner, 2).await;
        FeatureUpgradeUseCase::new(h.repo.clone())
            .execute(&owner, job.id)
            .await
            .unwrap();

        let stats = DashboardUseCase::new(h.repo.clone(), h.market.clone())
            .stats(&owner)
            .await
            .unwrap();

        assert_eq!(stats.credits_balance, 1);
        assert_eq!(stats.jobs.count(JobStatus::Active), 1);
        assert_eq!(stats.jobs.count(JobStatus::Draft), 1);
        assert_eq!(stats.jobs.promoted, 1);
        assert!(stats.applications.iter().all(|(_, n)| *n == 0));
    }
}

#[cfg(test)]
mod router_tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use marketplace::application::CompanyUseCase;
    use marketplace::domain::value_objects::JobTier;
    use platform::crypto::{hmac_sha256_hex, hmac_sha512_hex};
    use platform::identity::{Identity, IdentityConfig, sign_token};
    use std::sync::Arc;
    use tower::ServiceExt;

    use super::fixtures::*;
    use crate::application::config::{BillingConfig, NowPaymentsConfig, StripeConfig};
    use crate::domain::repository::{LedgerRepository, PaymentRepository};
    use crate::domain::value_objects::{PaymentStatus, ProviderStatus};
    use crate::presentation::router::billing_router_generic;

    const SECRET: &[u8] = b"router-test-secret";
    const WEBHOOK_SECRET: &str = "whsec_router";
    const IPN_SECRET: &str = "ipn_router";

    fn identity_config() -> Arc<IdentityConfig> {
        Arc::new(IdentityConfig {
            secret: SECRET.to_vec(),
            ..IdentityConfig::default()
        })
    }

    fn configured() -> Harness {
        Harness::with_config(BillingConfig {
            stripe: Some(StripeConfig {
                secret_key: "sk_test".into(),
                webhook_secret: WEBHOOK_SECRET.into(),
                api_base: "http://stripe.invalid".into(),
            }),
            nowpayments: Some(NowPaymentsConfig {
                api_key: "np_test".into(),
                ipn_secret: IPN_SECRET.into(),
                api_base: "http://nowpayments.invalid".into(),
                ipn_callback_url: None,
                success_url: None,
                cancel_url: None,
            }),
            ..BillingConfig::default()
        })
    }

    fn bearer(identity: &Identity) -> String {
        format!("Bearer {}", sign_token(SECRET, identity))
    }

    fn stripe_event(intent: &str) -> (String, String) {
        let body = format!(
            r#"{{"id":"evt_{intent}","type":"payment_intent.succeeded","data":{{"object":{{"id":"{intent}","status":"succeeded"}}}}}}"#
        );
        let t = Utc::now().timestamp();
        let sig = hmac_sha256_hex(WEBHOOK_SECRET.as_bytes(), format!("{t}.{body}").as_bytes());
        (body, format!("t={t},v1={sig}"))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_plans_are_public() {
        let h = configured();
        let app = billing_router_generic(h.state(), identity_config());

        let response = app
            .oneshot(Request::get("/plans").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["plans"].as_array().unwrap().len(), 2);
        assert_eq!(body["plans"][0]["tier"], "featured");
        assert_eq!(body["providers"][0]["enabled"], true);
    }

    #[tokio::test]
    async fn test_stripe_webhook_settles_once() {
        let h = configured();
        let owner = employer();
        let out = h.card_checkout(&owner, JobTier::Featured, None).await.unwrap();
        let app = billing_router_generic(h.state(), identity_config());
        let (body, signature) = stripe_event(&out.payment.external_id);

        for expect_duplicate in [false, true] {
            let response = app
                .clone()
                .oneshot(
                    Request::post("/webhooks/stripe")
                        .header("stripe-signature", &signature)
                        .body(Body::from(body.clone()))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let ack = json_body(response).await;
            assert_eq!(ack["duplicate"].as_bool().unwrap_or(false), expect_duplicate);
        }

        let payment = h
            .repo
            .find_payment_by_external_id(&out.payment.external_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert_eq!(h.repo.credit_balance(owner.user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stripe_webhook_rejects_bad_signature() {
        let h = configured();
        let owner = employer();
        let out = h.card_checkout(&owner, JobTier::Featured, None).await.unwrap();
        let app = billing_router_generic(h.state(), identity_config());
        let (body, _) = stripe_event(&out.payment.external_id);

        let response = app
            .oneshot(
                Request::post("/webhooks/stripe")
                    .header("stripe-signature", format!("t={},v1=00", Utc::now().timestamp()))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.repo.credit_balance(owner.user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_webhook_without_provider_config_is_unavailable() {
        let h = Harness::new();
        let app = billing_router_generic(h.state(), identity_config());

        let response = app
            .oneshot(
                Request::post("/webhooks/stripe")
                    .header("stripe-signature", "t=0,v1=00")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_nowpayments_ipn_grants_credits() {
        let h = configured();
        let owner = employer();
        let out = h.crypto_checkout(&owner, JobTier::Premium).await;
        let app = billing_router_generic(h.state(), identity_config());

        // Keys already sorted, compact: this is the signed form
        let body = format!(
            r#"{{"invoice_id":"{}","order_id":"{}","payment_id":777,"payment_status":"finished"}}"#,
            out.payment.external_id, out.payment.id
        );
        let signature = hmac_sha512_hex(IPN_SECRET.as_bytes(), body.as_bytes());

        let response = app
            .oneshot(
                Request::post("/webhooks/nowpayments")
                    .header("x-nowpayments-sig", signature)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.repo.credit_balance(owner.user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upgrade_featured_over_http() {
        let h = configured();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;
        let app = billing_router_generic(h.state(), identity_config());
        let uri = format!("/jobs/{}/upgrade-featured", job.id);

        let anonymous = app
            .clone()
            .oneshot(Request::post(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let broke = app
            .clone()
            .oneshot(
                Request::post(&uri)
                    .header(header::AUTHORIZATION, bearer(&owner))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(broke.status(), StatusCode::PAYMENT_REQUIRED);

        h.grant(&owner, 1).await;
        let response = app
            .oneshot(
                Request::post(&uri)
                    .header(header::AUTHORIZATION, bearer(&owner))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["tier"], "featured");
        assert_eq!(body["creditsBalance"], 0);
        assert_eq!(body["alreadyApplied"], false);
    }

    #[tokio::test]
    async fn test_upgrade_confirm_after_job_deleted_over_http() {
        let h = configured();
        let owner = employer();
        let company_id = h.company(&owner).await;
        let job = h.active_job(&owner, company_id).await;
        let out = h
            .card_checkout(&owner, JobTier::Featured, Some(&job))
            .await
            .unwrap();
        let intent = out.payment.external_id.clone();
        h.card.set_status(&intent, ProviderStatus::Succeeded);
        CompanyUseCase::new(h.market.clone(), h.market_config.clone())
            .delete(&owner, company_id)
            .await
            .unwrap();

        let app = billing_router_generic(h.state(), identity_config());
        let response = app
            .oneshot(
                Request::post(format!("/jobs/{}/upgrade-featured", job.id))
                    .header(header::AUTHORIZATION, bearer(&owner))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!(r#"{{"paymentIntentId":"{intent}"}}"#)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["paymentStatus"], "succeeded");
        assert_eq!(body["creditsGranted"], 1);
        assert_eq!(body["creditsBalance"], 1);
        assert_eq!(h.repo.credit_balance(owner.user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_payment_events_stream_only_callers_payments() {
        let h = configured();
        let owner = employer();
        let stranger = employer();
        let app = billing_router_generic(h.state(), identity_config());

        let response = app
            .oneshot(
                Request::get("/payments/events")
                    .header(header::AUTHORIZATION, bearer(&owner))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let theirs = h
            .card_checkout(&stranger, JobTier::Featured, None)
            .await
            .unwrap();
        let mine = h
            .card_checkout(&owner, JobTier::Premium, None)
            .await
            .unwrap();
        h.reconciler().settle(&theirs.payment.external_id).await.unwrap();
        h.reconciler().settle(&mine.payment.external_id).await.unwrap();

        let mut body = response.into_body();
        let mut text = String::new();
        while !text.contains("\n\n") {
            let frame = tokio::time::timeout(std::time::Duration::from_secs(5), body.frame())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let Ok(data) = frame.into_data() {
                text.push_str(std::str::from_utf8(&data).unwrap());
            }
        }

        assert!(text.contains("event: payment.settled"));
        assert!(text.contains(&mine.payment.external_id));
        assert!(!text.contains(&theirs.payment.external_id));
    }

    #[tokio::test]
    async fn test_credits_endpoint_shows_ledger() {
        let h = configured();
        let owner = employer();
        h.grant(&owner, 2).await;
        let app = billing_router_generic(h.state(), identity_config());

        let response = app
            .oneshot(
                Request::get("/credits")
                    .header(header::AUTHORIZATION, bearer(&owner))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["balance"], 2);
        assert_eq!(body["entries"][0]["reason"], "admin_grant");
    }
}
