//! In-memory relational store.
//!
//! One lock guards all tables so multi-row writes (entitlement plus links,
//! revocation) are atomic with respect to readers.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gate_access_sdk::{
    AccessAuditRecord, AuditFilter, Entitlement, EntitlementKind, EntitlementVehicleLink,
    Identity, ListEntry, ListKind, ListParams, Revocation, Vehicle, VehicleIdentifier,
};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::entitlement::{apply_revocation, is_expired_temporary};
use crate::domain::repo::{
    AuditRepository, EntitlementRepository, IdentityRepository, PriorityListRepository,
    RevokeOutcome, VehicleRepository,
};

#[derive(Default)]
struct Tables {
    identities: HashMap<Uuid, Identity>,
    vehicles: HashMap<Uuid, Vehicle>,
    vehicle_by_identifier: HashMap<VehicleIdentifier, Uuid>,
    /// Insertion order.
    entitlements: Vec<Entitlement>,
    links: HashSet<EntitlementVehicleLink>,
    allow_list: Vec<ListEntry>,
    deny_list: Vec<ListEntry>,
    audit: Vec<AccessAuditRecord>,
}

impl Tables {
    fn list(&self, kind: ListKind) -> &Vec<ListEntry> {
        match kind {
            ListKind::Allow => &self.allow_list,
            ListKind::Deny => &self.deny_list,
        }
    }

    fn list_mut(&mut self, kind: ListKind) -> &mut Vec<ListEntry> {
        match kind {
            ListKind::Allow => &mut self.allow_list,
            ListKind::Deny => &mut self.deny_list,
        }
    }

    fn entitlement_mut(&mut self, id: Uuid) -> Option<&mut Entitlement> {
        self.entitlements.iter_mut().find(|e| e.id == id)
    }

    /// Newest first; later insertion wins ties on `created_at`.
    fn newest_first(&self, mut keep: impl FnMut(&Entitlement) -> bool) -> Vec<Entitlement> {
        let mut out: Vec<Entitlement> = self
            .entitlements
            .iter()
            .rev()
            .filter(|e| keep(e))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }
}

fn page<T>(items: impl Iterator<Item = T>, params: ListParams) -> Vec<T> {
    items.skip(params.offset).take(params.limit).collect()
}

/// In-memory implementation of every gate access repository.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityRepository for InMemoryStore {
    async fn insert(&self, identity: Identity) -> anyhow::Result<Identity> {
        let mut tables = self.tables.write();
        if tables.identities.contains_key(&identity.id) {
            anyhow::bail!("identity {} already exists", identity.id);
        }
        tables.identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Identity>> {
        Ok(self.tables.read().identities.get(&id).cloned())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<Option<Identity>> {
        let mut tables = self.tables.write();
        Ok(tables.identities.get_mut(&id).map(|identity| {
            identity.active = active;
            identity.clone()
        }))
    }
}

#[async_trait]
impl VehicleRepository for InMemoryStore {
    async fn insert(&self, vehicle: Vehicle) -> anyhow::Result<Vehicle> {
        let mut tables = self.tables.write();
        if !tables.identities.contains_key(&vehicle.owner_id) {
            anyhow::bail!("owner {} does not exist", vehicle.owner_id);
        }
        if tables.vehicle_by_identifier.contains_key(&vehicle.identifier) {
            anyhow::bail!("identifier {} already registered", vehicle.identifier);
        }
        tables
            .vehicle_by_identifier
            .insert(vehicle.identifier.clone(), vehicle.id);
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Vehicle>> {
        Ok(self.tables.read().vehicles.get(&id).cloned())
    }

    async fn find_by_identifier(
        &self,
        identifier: &VehicleIdentifier,
    ) -> anyhow::Result<Option<Vehicle>> {
        let tables = self.tables.read();
        Ok(tables
            .vehicle_by_identifier
            .get(identifier)
            .and_then(|id| tables.vehicles.get(id))
            .cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Vehicle>> {
        let tables = self.tables.read();
        let mut vehicles: Vec<Vehicle> = tables
            .vehicles
            .values()
            .filter(|v| v.owner_id == owner_id)
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(vehicles)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<Option<Vehicle>> {
        let mut tables = self.tables.write();
        Ok(tables.vehicles.get_mut(&id).map(|vehicle| {
            vehicle.active = active;
            vehicle.clone()
        }))
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryStore {
    async fn insert(
        &self,
        entitlement: Entitlement,
        vehicle_ids: &[Uuid],
    ) -> anyhow::Result<Entitlement> {
        let mut tables = self.tables.write();
        if let Some(missing) = vehicle_ids
            .iter()
            .find(|id| !tables.vehicles.contains_key(id))
        {
            anyhow::bail!("vehicle {missing} does not exist");
        }
        for vehicle_id in vehicle_ids {
            tables.links.insert(EntitlementVehicleLink {
                entitlement_id: entitlement.id,
                vehicle_id: *vehicle_id,
            });
        }
        tables.entitlements.push(entitlement.clone());
        Ok(entitlement)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Entitlement>> {
        Ok(self
            .tables
            .read()
            .entitlements
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn list_by_identity(&self, identity_id: Uuid) -> anyhow::Result<Vec<Entitlement>> {
        Ok(self
            .tables
            .read()
            .newest_first(|e| e.identity_id == identity_id))
    }

    async fn list_for_identity_and_vehicle(
        &self,
        identity_id: Uuid,
        vehicle_id: Uuid,
    ) -> anyhow::Result<Vec<Entitlement>> {
        let tables = self.tables.read();
        Ok(tables.newest_first(|e| {
            e.identity_id == identity_id
                && tables.links.contains(&EntitlementVehicleLink {
                    entitlement_id: e.id,
                    vehicle_id,
                })
        }))
    }

    async fn revoke(&self, id: Uuid, revocation: Revocation) -> anyhow::Result<RevokeOutcome> {
        let mut tables = self.tables.write();
        let Some(entitlement) = tables.entitlement_mut(id) else {
            return Ok(RevokeOutcome::NotFound);
        };
        if !entitlement.active {
            return Ok(RevokeOutcome::AlreadyRevoked);
        }
        apply_revocation(entitlement, revocation);
        Ok(RevokeOutcome::Revoked(entitlement.clone()))
    }

    async fn add_vehicle(&self, entitlement_id: Uuid, vehicle_id: Uuid) -> anyhow::Result<bool> {
        let mut tables = self.tables.write();
        if tables.entitlement_mut(entitlement_id).is_none() {
            anyhow::bail!("entitlement {entitlement_id} does not exist");
        }
        if !tables.vehicles.contains_key(&vehicle_id) {
            anyhow::bail!("vehicle {vehicle_id} does not exist");
        }
        Ok(tables.links.insert(EntitlementVehicleLink {
            entitlement_id,
            vehicle_id,
        }))
    }

    async fn remove_vehicle(
        &self,
        entitlement_id: Uuid,
        vehicle_id: Uuid,
    ) -> anyhow::Result<bool> {
        Ok(self.tables.write().links.remove(&EntitlementVehicleLink {
            entitlement_id,
            vehicle_id,
        }))
    }

    async fn list_vehicle_ids(&self, entitlement_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .tables
            .read()
            .links
            .iter()
            .filter(|l| l.entitlement_id == entitlement_id)
            .map(|l| l.vehicle_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn list_expired_temporary(
        &self,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Entitlement>> {
        Ok(self.tables.read().newest_first(|e| {
            e.active && e.kind == EntitlementKind::Temporary && is_expired_temporary(e, now)
        }))
    }
}

#[async_trait]
impl PriorityListRepository for InMemoryStore {
    async fn insert(&self, entry: ListEntry) -> anyhow::Result<ListEntry> {
        self.tables.write().list_mut(entry.kind).push(entry.clone());
        Ok(entry)
    }

    async fn update(&self, entry: ListEntry) -> anyhow::Result<Option<ListEntry>> {
        let mut tables = self.tables.write();
        Ok(tables
            .list_mut(entry.kind)
            .iter_mut()
            .find(|e| e.id == entry.id)
            .map(|slot| {
                *slot = entry.clone();
                entry
            }))
    }

    async fn find_by_id(&self, kind: ListKind, id: Uuid) -> anyhow::Result<Option<ListEntry>> {
        Ok(self
            .tables
            .read()
            .list(kind)
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn find_effective(
        &self,
        kind: ListKind,
        identifier: &VehicleIdentifier,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<ListEntry>> {
        Ok(self
            .tables
            .read()
            .list(kind)
            .iter()
            .find(|e| &e.identifier == identifier && e.is_effective(now))
            .cloned())
    }

    async fn list(&self, kind: ListKind, params: ListParams) -> anyhow::Result<Vec<ListEntry>> {
        Ok(page(self.tables.read().list(kind).iter().cloned(), params))
    }

    async fn delete(&self, kind: ListKind, id: Uuid) -> anyhow::Result<Option<ListEntry>> {
        let mut tables = self.tables.write();
        let list = tables.list_mut(kind);
        Ok(list
            .iter()
            .position(|e| e.id == id)
            .map(|idx| list.remove(idx)))
    }

    async fn delete_expired(&self, kind: ListKind, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut tables = self.tables.write();
        let list = tables.list_mut(kind);
        let before = list.len();
        list.retain(|e| e.expires_at.is_none_or(|expires_at| expires_at > now));
        Ok(u64::try_from(before - list.len())?)
    }
}

#[async_trait]
impl AuditRepository for InMemoryStore {
    async fn append(&self, record: AccessAuditRecord) -> anyhow::Result<()> {
        self.tables.write().audit.push(record);
        Ok(())
    }

    async fn list(
        &self,
        filter: &AuditFilter,
        params: ListParams,
    ) -> anyhow::Result<Vec<AccessAuditRecord>> {
        Ok(page(
            self.tables
                .read()
                .audit
                .iter()
                .rev()
                .filter(|r| filter.matches(r))
                .cloned(),
            params,
        ))
    }
}
