//! Local client adapter implementing the SDK API trait.
//!
//! Bridges the domain services to [`GateAccessClient`] so in-process callers
//! go through the same validation and cache invalidation as REST callers.

use std::sync::Arc;

use async_trait::async_trait;
use gate_access_sdk::{
    AccessAuditRecord, AccessCheckRequest, AccessDecision, AuditFilter, CallContext, Entitlement,
    GateAccessClient, GateAccessError, ListEntry, ListKind, ListParams, NewEntitlement,
    NewListEntry,
};
use uuid::Uuid;

use crate::domain::service::Service;

pub struct GateAccessLocalClient {
    service: Arc<Service>,
}

impl GateAccessLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl GateAccessClient for GateAccessLocalClient {
    async fn check_access(
        &self,
        ctx: &CallContext,
        request: AccessCheckRequest,
    ) -> Result<AccessDecision, GateAccessError> {
        self.service
            .engine
            .check_access(ctx, request)
            .await
            .map_err(Into::into)
    }

    async fn create_list_entry(
        &self,
        ctx: &CallContext,
        kind: ListKind,
        entry: NewListEntry,
    ) -> Result<ListEntry, GateAccessError> {
        self.service
            .lists
            .create(ctx, kind, entry)
            .await
            .map_err(Into::into)
    }

    async fn delete_list_entry(
        &self,
        ctx: &CallContext,
        kind: ListKind,
        id: Uuid,
    ) -> Result<(), GateAccessError> {
        self.service.lists.delete(ctx, kind, id).await?;
        Ok(())
    }

    async fn create_entitlement(
        &self,
        ctx: &CallContext,
        entitlement: NewEntitlement,
    ) -> Result<Entitlement, GateAccessError> {
        self.service
            .entitlements
            .create(ctx, entitlement)
            .await
            .map_err(Into::into)
    }

    async fn revoke_entitlement(
        &self,
        ctx: &CallContext,
        id: Uuid,
        revoked_by: Uuid,
        reason: String,
    ) -> Result<Entitlement, GateAccessError> {
        self.service
            .entitlements
            .revoke(ctx, id, revoked_by, &reason)
            .await
            .map_err(Into::into)
    }

    async fn list_audit(
        &self,
        ctx: &CallContext,
        filter: AuditFilter,
        params: ListParams,
    ) -> Result<Vec<AccessAuditRecord>, GateAccessError> {
        self.service
            .engine
            .list_audit(ctx, filter, params)
            .await
            .map_err(Into::into)
    }
}
