//! Public API trait for gate access.
//!
//! Other modules (camera ingest, operator consoles) call the engine and the
//! administrative operations through this trait so that every priority-list
//! write goes through cache invalidation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::GateAccessError;
use crate::models::{
    AccessAuditRecord, AccessCheckRequest, AccessDecision, AuditFilter, CallContext, Entitlement,
    ListEntry, ListKind, ListParams, NewEntitlement, NewListEntry,
};

#[async_trait]
pub trait GateAccessClient: Send + Sync {
    /// Decide whether a vehicle may pass a gate.
    ///
    /// A denial is a successful call returning a denied decision.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the request is malformed (bad gate id, confidence outside `0.0..=1.0`)
    /// - the store is unreachable while resolving vehicle, identity or entitlements
    async fn check_access(
        &self,
        ctx: &CallContext,
        request: AccessCheckRequest,
    ) -> Result<AccessDecision, GateAccessError>;

    /// Add an allow-list or deny-list entry.
    ///
    /// # Errors
    ///
    /// Returns error on invalid identifier, empty reason or store failure.
    async fn create_list_entry(
        &self,
        ctx: &CallContext,
        kind: ListKind,
        entry: NewListEntry,
    ) -> Result<ListEntry, GateAccessError>;

    /// Remove a list entry by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the entry does not exist.
    async fn delete_list_entry(
        &self,
        ctx: &CallContext,
        kind: ListKind,
        id: Uuid,
    ) -> Result<(), GateAccessError>;

    /// Issue an entitlement covering one or more vehicles.
    ///
    /// # Errors
    ///
    /// Returns error on inconsistent validity bounds, inactive identity or
    /// vehicles not owned by the identity.
    async fn create_entitlement(
        &self,
        ctx: &CallContext,
        entitlement: NewEntitlement,
    ) -> Result<Entitlement, GateAccessError>;

    /// Revoke an entitlement. One-way.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the entitlement is already revoked.
    async fn revoke_entitlement(
        &self,
        ctx: &CallContext,
        id: Uuid,
        revoked_by: Uuid,
        reason: String,
    ) -> Result<Entitlement, GateAccessError>;

    /// Audit records, newest first.
    ///
    /// # Errors
    ///
    /// Returns error on store failure.
    async fn list_audit(
        &self,
        ctx: &CallContext,
        filter: AuditFilter,
        params: ListParams,
    ) -> Result<Vec<AccessAuditRecord>, GateAccessError>;
}
