//! Tenant administration
//!
//! Tenants partition everything else in the store; these operations are the
//! only ones that run unscoped.

use crate::traits::ReconciliationStorage;
use crate::types::{ReconcileError, ReconcileResult, Tenant};

/// Creates and looks up tenants
pub struct TenantManager<S: ReconciliationStorage> {
    storage: S,
}

impl<S: ReconciliationStorage> TenantManager<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Create a tenant; fails with `Conflict` if the name is already taken
    pub async fn create(&mut self, name: &str) -> ReconcileResult<Tenant> {
        let mut session = self.storage.begin().await?;
        match session.insert_tenant(name).await {
            Ok(tenant) => {
                session.commit().await?;
                Ok(tenant)
            }
            Err(e) => {
                session.rollback().await?;
                Err(e)
            }
        }
    }

    /// Fetch a tenant, failing with `TenantNotFound` if it does not exist
    pub async fn get(&self, tenant_id: i64) -> ReconcileResult<Tenant> {
        let mut session = self.storage.begin().await?;
        let found = session.get_tenant(tenant_id).await;
        session.rollback().await?;
        found?.ok_or(ReconcileError::TenantNotFound(tenant_id))
    }

    /// List every tenant in ascending id order
    pub async fn list(&self) -> ReconcileResult<Vec<Tenant>> {
        let mut session = self.storage.begin().await?;
        let tenants = session.list_tenants().await;
        session.rollback().await?;
        tenants
    }
}
