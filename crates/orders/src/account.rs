//! Marketplace connections.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketsync_core::{Entity, EntityId, TenantId};

/// External account identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalAccountId(pub EntityId);

impl ExternalAccountId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ExternalAccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Which marketplace a connection points at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketplaceKind {
    Storefront,
    AuctionMarketplace,
}

/// Rotatable API credentials for a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

/// One marketplace credential/connection per (tenant, marketplace kind).
///
/// The `domain` is the marketplace-assigned identifier inbound webhooks carry
/// (e.g. a shop domain) and is how events are routed back to a tenant.
/// Identity fields are immutable after creation; only credentials rotate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalAccount {
    id: ExternalAccountId,
    tenant_id: TenantId,
    kind: MarketplaceKind,
    domain: String,
    credentials: Credentials,
    created_at: DateTime<Utc>,
}

impl ExternalAccount {
    pub fn new(
        id: ExternalAccountId,
        tenant_id: TenantId,
        kind: MarketplaceKind,
        domain: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            id,
            tenant_id,
            kind,
            domain: domain.into(),
            credentials,
            created_at: Utc::now(),
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn kind(&self) -> MarketplaceKind {
        self.kind
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = credentials;
    }
}

impl Entity for ExternalAccount {
    type Id = ExternalAccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Account lookups.
///
/// `find_by_domain` is deliberately not tenant-scoped: webhook routing has to
/// resolve the tenant *from* the domain.
pub trait AccountStore: Send + Sync {
    /// Register a connection.
    ///
    /// Rejects a second connection for the same (tenant, marketplace) pair
    /// and a domain already held by any account: the domain is the only
    /// webhook routing key, so it must be unique across tenants.
    fn insert(&self, account: ExternalAccount) -> Result<(), AccountStoreError>;

    fn get(&self, id: &ExternalAccountId) -> Option<ExternalAccount>;

    fn find_by_domain(&self, domain: &str) -> Option<ExternalAccount>;

    /// Tenant's connection to a given marketplace, if any.
    fn find_for_tenant(&self, tenant_id: TenantId, kind: MarketplaceKind)
    -> Option<ExternalAccount>;

    /// Swap credentials in place; identity fields stay untouched.
    fn rotate_credentials(
        &self,
        id: &ExternalAccountId,
        credentials: Credentials,
    ) -> Result<(), AccountStoreError>;
}

/// Account store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountStoreError {
    #[error("account not found: {0}")]
    NotFound(ExternalAccountId),
    #[error("account already exists for this (tenant, marketplace) pair")]
    AlreadyConnected,
    #[error("domain {0} is already connected to another account")]
    DomainTaken(String),
}

impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    fn insert(&self, account: ExternalAccount) -> Result<(), AccountStoreError> {
        (**self).insert(account)
    }

    fn get(&self, id: &ExternalAccountId) -> Option<ExternalAccount> {
        (**self).get(id)
    }

    fn find_by_domain(&self, domain: &str) -> Option<ExternalAccount> {
        (**self).find_by_domain(domain)
    }

    fn find_for_tenant(
        &self,
        tenant_id: TenantId,
        kind: MarketplaceKind,
    ) -> Option<ExternalAccount> {
        (**self).find_for_tenant(tenant_id, kind)
    }

    fn rotate_credentials(
        &self,
        id: &ExternalAccountId,
        credentials: Credentials,
    ) -> Result<(), AccountStoreError> {
        (**self).rotate_credentials(id, credentials)
    }
}

/// In-memory account store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<ExternalAccountId, ExternalAccount>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl AccountStore for InMemoryAccountStore {
    fn insert(&self, account: ExternalAccount) -> Result<(), AccountStoreError> {
        let mut map = self.accounts.write().unwrap();
        let duplicate = map
            .values()
            .any(|a| a.tenant_id() == account.tenant_id() && a.kind() == account.kind());
        if duplicate {
            return Err(AccountStoreError::AlreadyConnected);
        }
        if map.values().any(|a| a.domain() == account.domain()) {
            return Err(AccountStoreError::DomainTaken(account.domain().to_string()));
        }
        map.insert(*account.id(), account);
        Ok(())
    }

    fn get(&self, id: &ExternalAccountId) -> Option<ExternalAccount> {
        self.accounts.read().unwrap().get(id).cloned()
    }

    fn find_by_domain(&self, domain: &str) -> Option<ExternalAccount> {
        let map = self.accounts.read().unwrap();
        map.values().find(|a| a.domain() == domain).cloned()
    }

    fn find_for_tenant(
        &self,
        tenant_id: TenantId,
        kind: MarketplaceKind,
    ) -> Option<ExternalAccount> {
        let map = self.accounts.read().unwrap();
        map.values()
            .find(|a| a.tenant_id() == tenant_id && a.kind() == kind)
            .cloned()
    }

    fn rotate_credentials(
        &self,
        id: &ExternalAccountId,
        credentials: Credentials,
    ) -> Result<(), AccountStoreError> {
        let mut map = self.accounts.write().unwrap();
        let account = map.get_mut(id).ok_or(AccountStoreError::NotFound(*id))?;
        account.set_credentials(credentials);
        Ok(())
    }
}
