//! Fakes and a wired harness for domain unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use gate_access_sdk::{
    AccessAuditRecord, AccessCheckRequest, AuditFilter, CallContext, Direction, Entitlement,
    EntitlementKind, Identity, ListEntry, ListKind, ListParams, NewEntitlement, NewIdentity,
    NewListEntry, NewVehicle, PlateSource, Revocation, Vehicle, VehicleIdentifier,
};
use parking_lot::Mutex;
use uuid::Uuid;

use super::admin::{EntitlementService, RegistryService};
use super::deadline::Deadlines;
use super::engine::{AccessEngine, EngineSettings};
use super::ports::{CacheError, Clock, KeyValueCache, RecognitionResult, Recognizer, RecognizerError};
use super::priority_list::PriorityListService;
use super::repo::{
    AuditRepository, EntitlementRepository, IdentityRepository, PriorityListRepository,
    RevokeOutcome, VehicleRepository,
};
use super::tiers::TierPipeline;
use crate::infra::storage::InMemoryStore;

pub const LIST_TTL: Duration = Duration::from_secs(3600);

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// In-memory cache that can be told to fail each operation.
#[derive(Default)]
pub struct FaultyCache {
    entries: Mutex<HashMap<String, (String, Duration)>>,
    pub fail_get: AtomicBool,
    pub fail_set: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_scan: AtomicBool,
    pub gets: AtomicUsize,
}

impl FaultyCache {
    pub fn fail_all(&self, fail: bool) {
        for flag in [&self.fail_get, &self.fail_set, &self.fail_delete, &self.fail_scan] {
            flag.store(fail, Ordering::SeqCst);
        }
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).map(|(v, _)| v.clone())
    }

    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.entries.lock().get(key).map(|(_, ttl)| *ttl)
    }

    pub fn put_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .insert(key.to_owned(), (value.to_owned(), LIST_TTL));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[async_trait]
impl KeyValueCache for FaultyCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(CacheError::new("get", "connection refused"));
        }
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(CacheError::new("set", "connection refused"));
        }
        self.entries.lock().insert(key.to_owned(), (value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(CacheError::new("delete", "connection refused"));
        }
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(CacheError::new("scan", "connection refused"));
        }
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Store wrapper with per-table outage switches.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryStore,
    pub fail_lists: AtomicBool,
    pub fail_vehicles: AtomicBool,
    pub fail_identities: AtomicBool,
    pub fail_entitlements: AtomicBool,
    pub fail_audit: AtomicBool,
    pub list_lookups: AtomicUsize,
    pub vehicle_lookups: AtomicUsize,
}

fn check(flag: &AtomicBool, what: &str) -> anyhow::Result<()> {
    if flag.load(Ordering::SeqCst) {
        anyhow::bail!("{what} table unreachable");
    }
    Ok(())
}

#[async_trait]
impl IdentityRepository for FlakyStore {
    async fn insert(&self, identity: Identity) -> anyhow::Result<Identity> {
        check(&self.fail_identities, "identity")?;
        IdentityRepository::insert(&self.inner, identity).await
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Identity>> {
        check(&self.fail_identities, "identity")?;
        IdentityRepository::find_by_id(&self.inner, id).await
    }

    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<Option<Identity>> {
        check(&self.fail_identities, "identity")?;
        IdentityRepository::set_active(&self.inner, id, active).await
    }
}

#[async_trait]
impl VehicleRepository for FlakyStore {
    async fn insert(&self, vehicle: Vehicle) -> anyhow::Result<Vehicle> {
        check(&self.fail_vehicles, "vehicle")?;
        VehicleRepository::insert(&self.inner, vehicle).await
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Vehicle>> {
        check(&self.fail_vehicles, "vehicle")?;
        VehicleRepository::find_by_id(&self.inner, id).await
    }

    async fn find_by_identifier(
        &self,
        identifier: &VehicleIdentifier,
    ) -> anyhow::Result<Option<Vehicle>> {
        self.vehicle_lookups.fetch_add(1, Ordering::SeqCst);
        check(&self.fail_vehicles, "vehicle")?;
        self.inner.find_by_identifier(identifier).await
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Vehicle>> {
        check(&self.fail_vehicles, "vehicle")?;
        self.inner.list_by_owner(owner_id).await
    }

    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<Option<Vehicle>> {
        check(&self.fail_vehicles, "vehicle")?;
        VehicleRepository::set_active(&self.inner, id, active).await
    }
}

#[async_trait]
impl EntitlementRepository for FlakyStore {
    async fn insert(
        &self,
        entitlement: Entitlement,
        vehicle_ids: &[Uuid],
    ) -> anyhow::Result<Entitlement> {
        check(&self.fail_entitlements, "entitlement")?;
        EntitlementRepository::insert(&self.inner, entitlement, vehicle_ids).await
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Entitlement>> {
        check(&self.fail_entitlements, "entitlement")?;
        EntitlementRepository::find_by_id(&self.inner, id).await
    }

    async fn list_by_identity(&self, identity_id: Uuid) -> anyhow::Result<Vec<Entitlement>> {
        check(&self.fail_entitlements, "entitlement")?;
        self.inner.list_by_identity(identity_id).await
    }

    async fn list_for_identity_and_vehicle(
        &self,
        identity_id: Uuid,
        vehicle_id: Uuid,
    ) -> anyhow::Result<Vec<Entitlement>> {
        check(&self.fail_entitlements, "entitlement")?;
        self.inner
            .list_for_identity_and_vehicle(identity_id, vehicle_id)
            .await
    }

    async fn revoke(&self, id: Uuid, revocation: Revocation) -> anyhow::Result<RevokeOutcome> {
        check(&self.fail_entitlements, "entitlement")?;
        self.inner.revoke(id, revocation).await
    }

    async fn add_vehicle(&self, entitlement_id: Uuid, vehicle_id: Uuid) -> anyhow::Result<bool> {
        check(&self.fail_entitlements, "entitlement")?;
        self.inner.add_vehicle(entitlement_id, vehicle_id).await
    }

    async fn remove_vehicle(
        &self,
        entitlement_id: Uuid,
        vehicle_id: Uuid,
    ) -> anyhow::Result<bool> {
        check(&self.fail_entitlements, "entitlement")?;
        self.inner.remove_vehicle(entitlement_id, vehicle_id).await
    }

    async fn list_vehicle_ids(&self, entitlement_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        check(&self.fail_entitlements, "entitlement")?;
        self.inner.list_vehicle_ids(entitlement_id).await
    }

    async fn list_expired_temporary(
        &self,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Entitlement>> {
        check(&self.fail_entitlements, "entitlement")?;
        self.inner.list_expired_temporary(now).await
    }
}

#[async_trait]
impl PriorityListRepository for FlakyStore {
    async fn insert(&self, entry: ListEntry) -> anyhow::Result<ListEntry> {
        check(&self.fail_lists, "list")?;
        PriorityListRepository::insert(&self.inner, entry).await
    }

    async fn update(&self, entry: ListEntry) -> anyhow::Result<Option<ListEntry>> {
        check(&self.fail_lists, "list")?;
        self.inner.update(entry).await
    }

    async fn find_by_id(&self, kind: ListKind, id: Uuid) -> anyhow::Result<Option<ListEntry>> {
        check(&self.fail_lists, "list")?;
        PriorityListRepository::find_by_id(&self.inner, kind, id).await
    }

    async fn find_effective(
        &self,
        kind: ListKind,
        identifier: &VehicleIdentifier,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<ListEntry>> {
        self.list_lookups.fetch_add(1, Ordering::SeqCst);
        check(&self.fail_lists, "list")?;
        self.inner.find_effective(kind, identifier, now).await
    }

    async fn list(&self, kind: ListKind, params: ListParams) -> anyhow::Result<Vec<ListEntry>> {
        check(&self.fail_lists, "list")?;
        PriorityListRepository::list(&self.inner, kind, params).await
    }

    async fn delete(&self, kind: ListKind, id: Uuid) -> anyhow::Result<Option<ListEntry>> {
        check(&self.fail_lists, "list")?;
        self.inner.delete(kind, id).await
    }

    async fn delete_expired(&self, kind: ListKind, now: DateTime<Utc>) -> anyhow::Result<u64> {
        check(&self.fail_lists, "list")?;
        self.inner.delete_expired(kind, now).await
    }
}

#[async_trait]
impl AuditRepository for FlakyStore {
    async fn append(&self, record: AccessAuditRecord) -> anyhow::Result<()> {
        check(&self.fail_audit, "audit")?;
        self.inner.append(record).await
    }

    async fn list(
        &self,
        filter: &AuditFilter,
        params: ListParams,
    ) -> anyhow::Result<Vec<AccessAuditRecord>> {
        check(&self.fail_audit, "audit")?;
        AuditRepository::list(&self.inner, filter, params).await
    }
}

/// Recognizer returning queued answers; transport error once the queue is empty.
#[derive(Default)]
pub struct ScriptedRecognizer {
    answers: Mutex<VecDeque<Result<RecognitionResult, RecognizerError>>>,
    pub calls: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn push(&self, answer: Result<RecognitionResult, RecognizerError>) {
        self.answers.lock().push_back(answer);
    }

    pub fn push_plate(&self, plate: &str, confidence: f64) {
        self.push(Ok(RecognitionResult {
            success: true,
            identifier: plate.to_owned(),
            confidence,
            error: None,
        }));
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn recognize(
        &self,
        _image_base64: &str,
        _min_confidence: f64,
    ) -> Result<RecognitionResult, RecognizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(RecognizerError::Transport("connection refused".to_owned())))
    }

    async fn health(&self) -> Result<(), RecognizerError> {
        Ok(())
    }
}

/// Every domain service wired over the same fakes.
pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub cache: Arc<FaultyCache>,
    pub clock: Arc<FixedClock>,
    pub recognizer: Arc<ScriptedRecognizer>,
    pub lists: Arc<PriorityListService>,
    pub registry: RegistryService,
    pub entitlements: EntitlementService,
    pub engine: AccessEngine,
    pub ctx: CallContext,
    pub admin_id: Uuid,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(FlakyStore::default());
        let cache = Arc::new(FaultyCache::default());
        let clock = Arc::new(FixedClock::new(
            DateTime::from_timestamp(1_750_000_000, 0).unwrap(),
        ));
        let recognizer = Arc::new(ScriptedRecognizer::default());
        let deadlines = Deadlines::default();

        let lists = Arc::new(PriorityListService::new(
            store.clone(),
            cache.clone(),
            clock.clone(),
            LIST_TTL,
            deadlines,
        ));
        let registry = RegistryService::new(store.clone(), store.clone(), clock.clone(), deadlines);
        let entitlements = EntitlementService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            clock.clone(),
            deadlines,
        );
        let pipeline = TierPipeline::standard(
            lists.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            deadlines,
        );
        let engine = AccessEngine::new(
            pipeline,
            recognizer.clone(),
            store.clone(),
            clock.clone(),
            EngineSettings {
                deadlines,
                ..EngineSettings::default()
            },
        );

        Self {
            store,
            cache,
            clock,
            recognizer,
            lists,
            registry,
            entitlements,
            engine,
            ctx: CallContext::new(),
            admin_id: Uuid::new_v4(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn plate(raw: &str) -> VehicleIdentifier {
        VehicleIdentifier::parse(raw).unwrap()
    }

    pub async fn identity(&self, active: bool) -> Identity {
        let identity = self
            .registry
            .register_identity(
                &self.ctx,
                NewIdentity {
                    name: "Ivan Petrov".to_owned(),
                },
            )
            .await
            .unwrap();
        if active {
            identity
        } else {
            self.registry
                .set_identity_active(&self.ctx, identity.id, false)
                .await
                .unwrap()
        }
    }

    pub async fn vehicle(&self, owner: &Identity, plate: &str) -> Vehicle {
        self.registry
            .register_vehicle(
                &self.ctx,
                NewVehicle {
                    owner_id: owner.id,
                    identifier: plate.to_owned(),
                },
            )
            .await
            .unwrap()
    }

    pub async fn permanent(&self, owner: &Identity, vehicle: &Vehicle) -> Entitlement {
        self.entitlements
            .create(
                &self.ctx,
                NewEntitlement {
                    identity_id: owner.id,
                    kind: EntitlementKind::Permanent,
                    valid_from: self.now() - TimeDelta::days(1),
                    valid_until: None,
                    vehicle_ids: vec![vehicle.id],
                },
            )
            .await
            .unwrap()
    }

    pub async fn temporary(
        &self,
        owner: &Identity,
        vehicle: &Vehicle,
        valid_for: TimeDelta,
    ) -> Entitlement {
        let now = self.now();
        self.entitlements
            .create(
                &self.ctx,
                NewEntitlement {
                    identity_id: owner.id,
                    kind: EntitlementKind::Temporary,
                    valid_from: now - TimeDelta::hours(1),
                    valid_until: Some(now + valid_for),
                    vehicle_ids: vec![vehicle.id],
                },
            )
            .await
            .unwrap()
    }

    pub async fn list_entry(&self, kind: ListKind, plate: &str, reason: &str) -> ListEntry {
        self.lists
            .create(
                &self.ctx,
                kind,
                NewListEntry {
                    identifier: plate.to_owned(),
                    reason: reason.to_owned(),
                    created_by: self.admin_id,
                    expires_at: None,
                },
            )
            .await
            .unwrap()
    }

    pub fn recognized(plate: &str) -> AccessCheckRequest {
        AccessCheckRequest {
            source: PlateSource::Recognized {
                identifier: plate.to_owned(),
                confidence: 0.95,
            },
            gate_id: "north-1".to_owned(),
            direction: Direction::In,
        }
    }

    pub fn image() -> AccessCheckRequest {
        AccessCheckRequest {
            source: PlateSource::Image {
                image_base64: "aW1hZ2U=".to_owned(),
            },
            gate_id: "north-1".to_owned(),
            direction: Direction::In,
        }
    }

    pub async fn audit(&self) -> Vec<AccessAuditRecord> {
        AuditRepository::list(&self.store.inner, &AuditFilter::All, ListParams::default())
            .await
            .unwrap()
    }
}
