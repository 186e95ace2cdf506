//! `marketsync-listings` — pushing inventory units to an external marketplace.
//!
//! The synchronizer builds a draft listing from ledger data, calls the
//! marketplace API through the [`MarketplaceApi`] seam, and mirrors the remote
//! listing locally as a [`ListingRecord`]. Remote failures are absorbed into
//! [`SyncError`]; they never escape as transport faults.

pub mod api;
pub mod record;
pub mod synchronizer;

pub use api::{ApiResponse, ApiTransportError, InMemoryMarketplaceApi, ListingDraft, MarketplaceApi};
pub use record::{
    InMemoryListingStore, ListingRecord, ListingRecordId, ListingStatus, ListingStore,
};
pub use synchronizer::{SyncError, Synchronizer};
