//! Wiring of the domain services over their ports.

use std::sync::Arc;
use std::time::Duration;

use super::admin::{EntitlementService, RegistryService};
use super::deadline::Deadlines;
use super::engine::{AccessEngine, EngineSettings};
use super::ports::{Clock, KeyValueCache, Recognizer};
use super::priority_list::PriorityListService;
use super::repo::{
    AuditRepository, EntitlementRepository, IdentityRepository, PriorityListRepository,
    VehicleRepository,
};
use super::tiers::TierPipeline;

/// Capabilities the domain depends on.
#[derive(Clone)]
pub struct Ports {
    pub identities: Arc<dyn IdentityRepository>,
    pub vehicles: Arc<dyn VehicleRepository>,
    pub entitlements: Arc<dyn EntitlementRepository>,
    pub lists: Arc<dyn PriorityListRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub cache: Arc<dyn KeyValueCache>,
    pub recognizer: Arc<dyn Recognizer>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub list_cache_ttl: Duration,
    pub engine: EngineSettings,
}

/// Every domain service of the module, sharing one set of ports.
pub struct Service {
    pub engine: AccessEngine,
    pub lists: Arc<PriorityListService>,
    pub registry: RegistryService,
    pub entitlements: EntitlementService,
}

impl Service {
    #[must_use]
    pub fn new(ports: Ports, settings: ServiceSettings) -> Self {
        let deadlines: Deadlines = settings.engine.deadlines;

        let lists = Arc::new(PriorityListService::new(
            ports.lists,
            ports.cache,
            ports.clock.clone(),
            settings.list_cache_ttl,
            deadlines,
        ));
        let pipeline = TierPipeline::standard(
            lists.clone(),
            ports.vehicles.clone(),
            ports.identities.clone(),
            ports.entitlements.clone(),
            deadlines,
        );
        let engine = AccessEngine::new(
            pipeline,
            ports.recognizer,
            ports.audit,
            ports.clock.clone(),
            settings.engine,
        );
        let registry = RegistryService::new(
            ports.identities.clone(),
            ports.vehicles.clone(),
            ports.clock.clone(),
            deadlines,
        );
        let entitlements = EntitlementService::new(
            ports.entitlements,
            ports.identities,
            ports.vehicles,
            ports.clock,
            deadlines,
        );

        Self {
            engine,
            lists,
            registry,
            entitlements,
        }
    }
}
