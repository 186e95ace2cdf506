//! `marketsync-ledger` — physical inventory and its reservation lifecycle.
//!
//! The ledger is the data authority for inventory units. Orders reference
//! units through line items but never own them; listings record a unit's
//! presence on a marketplace but read status from here.

pub mod allocator;
pub mod store;
pub mod unit;
pub mod variant;

pub use allocator::Allocator;
pub use store::{
    InMemoryUnitStore, InMemoryVariantStore, LedgerError, UnitStore, VariantStore,
};
pub use unit::{InventoryUnit, InventoryUnitId, UnitStatus};
pub use variant::{Variant, VariantId};
