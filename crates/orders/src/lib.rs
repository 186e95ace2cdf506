//! `marketsync-orders` — marketplace accounts and the order materializer.
//!
//! Orders arrive as loosely-structured webhook payloads and are upserted
//! idempotently, keyed by (external account, external order id). Line items
//! are rebuilt wholesale on every re-ingestion; allocation runs through the
//! ledger crate.

pub mod account;
pub mod materializer;
pub mod order;
pub mod payload;
pub mod store;

pub use account::{
    AccountStore, AccountStoreError, Credentials, ExternalAccount, ExternalAccountId,
    InMemoryAccountStore, MarketplaceKind,
};
pub use materializer::{MaterializeError, MaterializeOutcome, Materializer};
pub use order::{LineItemId, Order, OrderId, OrderLineItem};
pub use payload::{LinePayload, OrderPayload};
pub use store::{InMemoryOrderStore, OrderKey, OrderStore, OrderStoreError};
