//! `marketsync-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod context;
pub mod entity;
pub mod error;
pub mod id;

pub use context::OpContext;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ActorId, EntityId, TenantId};
