//! Webhook dispatcher: route inbound events to sync jobs.

use tracing::{debug, info};

use marketsync_core::Entity;
use marketsync_orders::AccountStore;

use crate::event::{WebhookEvent, WebhookTopic};
use crate::job::{Job, JobId, JobKind};
use crate::store::{JobStore, JobStoreError};

/// What happened to a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A sync job was queued; processing happens asynchronously.
    Enqueued { job_id: JobId, kind: JobKind },
    /// The delivery was discarded on purpose.
    Dropped(DropReason),
}

/// Why a delivery was discarded. Both cases are expected operational noise,
/// acknowledged to the sender so it does not redeliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No connected account matches the sender domain.
    UnknownAccount,
    /// The topic is not one this system consumes.
    UnknownTopic,
}

/// Dispatch failed; the sender should redeliver.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to enqueue sync job: {0}")]
    Enqueue(#[from] JobStoreError),
}

/// Turns webhooks into queued jobs.
///
/// Never blocks on handler work: the only side effect of a dispatch is one
/// enqueued job (or a deliberate drop).
#[derive(Debug, Clone)]
pub struct Dispatcher<A, S> {
    accounts: A,
    jobs: S,
}

impl<A, S> Dispatcher<A, S>
where
    A: AccountStore,
    S: JobStore,
{
    pub fn new(accounts: A, jobs: S) -> Self {
        Self { accounts, jobs }
    }

    pub fn dispatch(&self, event: &WebhookEvent) -> Result<DispatchOutcome, DispatchError> {
        let Some(account) = self.accounts.find_by_domain(&event.domain) else {
            debug!(domain = event.domain, topic = event.topic, "webhook from unknown account, dropping");
            return Ok(DispatchOutcome::Dropped(DropReason::UnknownAccount));
        };

        let Some(topic) = WebhookTopic::parse(&event.topic) else {
            debug!(domain = event.domain, topic = event.topic, "unhandled webhook topic, dropping");
            return Ok(DispatchOutcome::Dropped(DropReason::UnknownTopic));
        };

        let kind = topic.job_kind();
        let job = Job::new(
            account.tenant_id(),
            *account.id(),
            kind,
            event.payload.clone(),
        );
        let job_id = self.jobs.enqueue(job)?;

        info!(
            tenant_id = %account.tenant_id(),
            domain = event.domain,
            topic = event.topic,
            job_id = %job_id,
            "webhook accepted"
        );
        Ok(DispatchOutcome::Enqueued { job_id, kind })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use marketsync_core::{EntityId, TenantId};
    use marketsync_orders::{
        Credentials, ExternalAccount, ExternalAccountId, InMemoryAccountStore, MarketplaceKind,
    };

    use super::*;
    use crate::store::InMemoryJobStore;

    fn setup() -> (
        Dispatcher<Arc<InMemoryAccountStore>, Arc<InMemoryJobStore>>,
        Arc<InMemoryJobStore>,
        TenantId,
    ) {
        let accounts = InMemoryAccountStore::arc();
        let jobs = InMemoryJobStore::arc();
        let tenant = TenantId::new();

        accounts
            .insert(ExternalAccount::new(
                ExternalAccountId::new(EntityId::new()),
                tenant,
                MarketplaceKind::Storefront,
                "shop-1",
                Credentials::new("tok"),
            ))
            .unwrap();

        (Dispatcher::new(accounts, jobs.clone()), jobs, tenant)
    }

    #[test]
    fn order_webhook_enqueues_order_sync_job() {
        let (dispatcher, jobs, tenant) = setup();

        let event = WebhookEvent::new("orders/create", "shop-1", json!({"id": 1001}));
        let outcome = dispatcher.dispatch(&event).unwrap();

        let DispatchOutcome::Enqueued { job_id, kind } = outcome else {
            panic!("expected enqueue, got {outcome:?}");
        };
        assert_eq!(kind, JobKind::OrderSync);

        let job = jobs.get(tenant, job_id).unwrap().unwrap();
        assert_eq!(job.tenant_id, tenant);
        assert_eq!(job.payload, json!({"id": 1001}));
    }

    #[test]
    fn update_webhook_takes_the_same_path() {
        let (dispatcher, _jobs, _tenant) = setup();
        let event = WebhookEvent::new("orders/updated", "shop-1", json!({"id": 1001}));
        assert!(matches!(
            dispatcher.dispatch(&event).unwrap(),
            DispatchOutcome::Enqueued {
                kind: JobKind::OrderSync,
                ..
            }
        ));
    }

    #[test]
    fn inventory_webhook_routes_to_inventory_sync() {
        let (dispatcher, _jobs, _tenant) = setup();
        let event = WebhookEvent::new("inventory_levels/update", "shop-1", json!({}));
        assert!(matches!(
            dispatcher.dispatch(&event).unwrap(),
            DispatchOutcome::Enqueued {
                kind: JobKind::InventorySync,
                ..
            }
        ));
    }

    #[test]
    fn unknown_domain_is_dropped_not_errored() {
        let (dispatcher, jobs, _tenant) = setup();
        let event = WebhookEvent::new("orders/create", "shop-9", json!({"id": 1}));

        assert_eq!(
            dispatcher.dispatch(&event).unwrap(),
            DispatchOutcome::Dropped(DropReason::UnknownAccount)
        );
        assert_eq!(jobs.pending_count(), 0);
    }

    #[test]
    fn unknown_topic_is_dropped_not_errored() {
        let (dispatcher, jobs, _tenant) = setup();
        let event = WebhookEvent::new("customers/create", "shop-1", json!({}));

        assert_eq!(
            dispatcher.dispatch(&event).unwrap(),
            DispatchOutcome::Dropped(DropReason::UnknownTopic)
        );
        assert_eq!(jobs.pending_count(), 0);
    }
}
