//! Service wiring: stores, the sync pipeline, and job handlers.

use std::sync::Arc;

use tracing::debug;

use marketsync_core::OpContext;
use marketsync_ingest::{
    Dispatcher, InMemoryJobStore, JobKind, JobResult, JobRunner,
};
use marketsync_ledger::{Allocator, InMemoryUnitStore, InMemoryVariantStore};
use marketsync_listings::{InMemoryListingStore, InMemoryMarketplaceApi, Synchronizer};
use marketsync_orders::{AccountStore, InMemoryAccountStore, InMemoryOrderStore, Materializer};

pub type AppMaterializer =
    Materializer<Arc<InMemoryOrderStore>, Arc<InMemoryVariantStore>, Arc<InMemoryUnitStore>>;

pub type AppSynchronizer = Synchronizer<
    Arc<InMemoryAccountStore>,
    Arc<InMemoryVariantStore>,
    Arc<InMemoryUnitStore>,
    Arc<InMemoryListingStore>,
    Arc<InMemoryMarketplaceApi>,
>;

pub type AppDispatcher = Dispatcher<Arc<InMemoryAccountStore>, Arc<InMemoryJobStore>>;

pub type AppRunner = JobRunner<Arc<InMemoryJobStore>>;

/// Everything the HTTP layer needs, shared via `Extension<Arc<AppServices>>`.
pub struct AppServices {
    pub accounts: Arc<InMemoryAccountStore>,
    pub variants: Arc<InMemoryVariantStore>,
    pub units: Arc<InMemoryUnitStore>,
    pub orders: Arc<InMemoryOrderStore>,
    pub listings: Arc<InMemoryListingStore>,
    pub jobs: Arc<InMemoryJobStore>,
    pub dispatcher: AppDispatcher,
    pub materializer: Arc<AppMaterializer>,
    pub synchronizer: AppSynchronizer,
    pub runner: Arc<AppRunner>,
}

/// Wire the in-memory stack and register the sync job handlers.
pub fn build_services() -> AppServices {
    let accounts = InMemoryAccountStore::arc();
    let variants = InMemoryVariantStore::arc();
    let units = InMemoryUnitStore::arc();
    let orders = InMemoryOrderStore::arc();
    let listings = InMemoryListingStore::arc();
    let jobs = InMemoryJobStore::arc();

    let allocator = Allocator::new(variants.clone(), units.clone());
    let materializer = Arc::new(Materializer::new(orders.clone(), allocator));
    let synchronizer = Synchronizer::new(
        accounts.clone(),
        variants.clone(),
        units.clone(),
        listings.clone(),
        InMemoryMarketplaceApi::arc(),
    );
    let dispatcher = Dispatcher::new(accounts.clone(), jobs.clone());

    let mut runner = JobRunner::new(jobs.clone());

    let order_accounts = accounts.clone();
    let order_materializer = materializer.clone();
    runner.register(JobKind::OrderSync, move |job| {
        // The account may have been disconnected between enqueue and claim;
        // that cannot be fixed by retrying.
        let Some(account) = order_accounts.get(&job.account_id) else {
            return JobResult::Fatal(format!("account {} is not connected", job.account_id));
        };

        let ctx = OpContext::system(job.tenant_id);
        match order_materializer.materialize(&ctx, &account, &job.payload) {
            Ok(_) => JobResult::Completed,
            Err(e) if e.is_fatal() => JobResult::Fatal(e.to_string()),
            Err(e) => JobResult::Retry(e.to_string()),
        }
    });

    runner.register(JobKind::InventorySync, |job| {
        // Serialized stock is derived from unit status, so marketplace level
        // webhooks carry nothing to apply yet. Acknowledge and move on.
        debug!(job_id = %job.id, "inventory level update acknowledged");
        JobResult::Completed
    });

    AppServices {
        accounts,
        variants,
        units,
        orders,
        listings,
        jobs,
        dispatcher,
        materializer,
        synchronizer,
        runner: Arc::new(runner),
    }
}
