//! Explicit per-operation context.
//!
//! Every domain operation receives the tenant and actor it runs on behalf of.
//! There is no ambient "current account" lookup anywhere in the codebase.

use serde::{Deserialize, Serialize};

use crate::id::{ActorId, TenantId};

/// Context for a single domain operation.
///
/// Immutable; construct a fresh one per unit of work.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpContext {
    tenant_id: TenantId,
    actor_id: ActorId,
}

impl OpContext {
    pub fn new(tenant_id: TenantId, actor_id: ActorId) -> Self {
        Self {
            tenant_id,
            actor_id,
        }
    }

    /// Context for background workers acting on behalf of a tenant.
    ///
    /// The actor is the nil id, which audit consumers treat as "system".
    pub fn system(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            actor_id: ActorId::from_uuid(uuid::Uuid::nil()),
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }
}
