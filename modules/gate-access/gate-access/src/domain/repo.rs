//! Repository traits for the gate access domain.
//!
//! Lookups by identifier always take a normalized [`VehicleIdentifier`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gate_access_sdk::{
    AccessAuditRecord, AuditFilter, Entitlement, Identity, ListEntry, ListKind, ListParams,
    Revocation, Vehicle, VehicleIdentifier,
};
use uuid::Uuid;

#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn insert(&self, identity: Identity) -> anyhow::Result<Identity>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Identity>>;

    /// Returns the updated identity, `None` if it does not exist.
    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<Option<Identity>>;
}

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn insert(&self, vehicle: Vehicle) -> anyhow::Result<Vehicle>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Vehicle>>;

    async fn find_by_identifier(
        &self,
        identifier: &VehicleIdentifier,
    ) -> anyhow::Result<Option<Vehicle>>;

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Vehicle>>;

    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<Option<Vehicle>>;
}

/// Outcome of an atomic revoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked(Entitlement),
    AlreadyRevoked,
    NotFound,
}

#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// Inserts the entitlement together with its vehicle links.
    async fn insert(
        &self,
        entitlement: Entitlement,
        vehicle_ids: &[Uuid],
    ) -> anyhow::Result<Entitlement>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Entitlement>>;

    /// All entitlements of an identity, newest first.
    async fn list_by_identity(&self, identity_id: Uuid) -> anyhow::Result<Vec<Entitlement>>;

    /// Entitlements of `identity_id` linked to `vehicle_id`, newest first.
    /// Includes inactive and expired ones.
    async fn list_for_identity_and_vehicle(
        &self,
        identity_id: Uuid,
        vehicle_id: Uuid,
    ) -> anyhow::Result<Vec<Entitlement>>;

    /// Sets the inactive flag and the revocation record in one step.
    async fn revoke(&self, id: Uuid, revocation: Revocation) -> anyhow::Result<RevokeOutcome>;

    /// Returns `false` if the link already existed.
    async fn add_vehicle(&self, entitlement_id: Uuid, vehicle_id: Uuid) -> anyhow::Result<bool>;

    /// Returns `false` if there was no such link.
    async fn remove_vehicle(&self, entitlement_id: Uuid, vehicle_id: Uuid)
    -> anyhow::Result<bool>;

    async fn list_vehicle_ids(&self, entitlement_id: Uuid) -> anyhow::Result<Vec<Uuid>>;

    /// Active temporary entitlements whose `valid_until` is at or before `now`.
    async fn list_expired_temporary(&self, now: DateTime<Utc>)
    -> anyhow::Result<Vec<Entitlement>>;
}

/// Storage for allow-list and deny-list entries.
#[async_trait]
pub trait PriorityListRepository: Send + Sync {
    async fn insert(&self, entry: ListEntry) -> anyhow::Result<ListEntry>;

    /// Replaces the stored entry with the same id. `None` if it does not exist.
    async fn update(&self, entry: ListEntry) -> anyhow::Result<Option<ListEntry>>;

    async fn find_by_id(&self, kind: ListKind, id: Uuid) -> anyhow::Result<Option<ListEntry>>;

    /// First active, unexpired entry for the identifier, in insertion order.
    async fn find_effective(
        &self,
        kind: ListKind,
        identifier: &VehicleIdentifier,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<ListEntry>>;

    async fn list(&self, kind: ListKind, params: ListParams) -> anyhow::Result<Vec<ListEntry>>;

    /// Returns the deleted entry, `None` if it did not exist.
    async fn delete(&self, kind: ListKind, id: Uuid) -> anyhow::Result<Option<ListEntry>>;

    /// Deletes entries whose expiry is at or before `now`; returns how many.
    async fn delete_expired(&self, kind: ListKind, now: DateTime<Utc>) -> anyhow::Result<u64>;
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, record: AccessAuditRecord) -> anyhow::Result<()>;

    /// Newest first.
    async fn list(
        &self,
        filter: &AuditFilter,
        params: ListParams,
    ) -> anyhow::Result<Vec<AccessAuditRecord>>;
}
