#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

//! Shared fixtures for gate access integration tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use gate_access::GateAccessModule;
use gate_access::config::{GateAccessConfig, RecognizerConfig};
use gate_access::domain::service::Service;
use gate_access_sdk::{
    AccessCheckRequest, CallContext, Direction, Entitlement, EntitlementKind, GateAccessClient,
    Identity, NewEntitlement, NewIdentity, NewVehicle, PlateSource, Vehicle,
};

/// Address nothing listens on; recognizer calls fail fast.
pub const UNREACHABLE_RECOGNIZER: &str = "http://127.0.0.1:9";

pub fn config(recognizer_url: &str) -> GateAccessConfig {
    GateAccessConfig {
        sweep_interval: Duration::ZERO,
        recognizer: RecognizerConfig {
            base_url: recognizer_url.to_owned(),
            request_timeout: Duration::from_secs(2),
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        },
        ..GateAccessConfig::default()
    }
}

/// Module wired with its production adapters.
pub struct TestGate {
    pub module: GateAccessModule,
    pub service: Arc<Service>,
    pub client: Arc<dyn GateAccessClient>,
    pub ctx: CallContext,
}

impl TestGate {
    pub fn new(recognizer_url: &str) -> Self {
        let module = GateAccessModule::new(&config(recognizer_url)).expect("module builds");
        Self {
            service: module.service(),
            client: module.client(),
            module,
            ctx: CallContext::new(),
        }
    }

    pub fn offline() -> Self {
        Self::new(UNREACHABLE_RECOGNIZER)
    }

    pub async fn identity(&self, name: &str) -> Identity {
        self.service
            .registry
            .register_identity(
                &self.ctx,
                NewIdentity {
                    name: name.to_owned(),
                },
            )
            .await
            .unwrap()
    }

    pub async fn vehicle(&self, owner: &Identity, plate: &str) -> Vehicle {
        self.service
            .registry
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

    /// Identity, vehicle and a permanent entitlement covering it.
    pub async fn resident(&self, plate: &str) -> (Identity, Vehicle, Entitlement) {
        let identity = self.identity("Resident").await;
        let vehicle = self.vehicle(&identity, plate).await;
        let entitlement = self
            .client
            .create_entitlement(
                &self.ctx,
                NewEntitlement {
                    identity_id: identity.id,
                    kind: EntitlementKind::Permanent,
                    valid_from: Utc::now() - TimeDelta::minutes(1),
                    valid_until: None,
                    vehicle_ids: vec![vehicle.id],
                },
            )
            .await
            .unwrap();
        (identity, vehicle, entitlement)
    }
}

pub fn recognized(plate: &str) -> AccessCheckRequest {
    AccessCheckRequest {
        source: PlateSource::Recognized {
            identifier: plate.to_owned(),
            confidence: 0.98,
        },
        gate_id: "main-gate".to_owned(),
        direction: Direction::In,
    }
}

pub fn image() -> AccessCheckRequest {
    AccessCheckRequest {
        source: PlateSource::Image {
            image_base64: "ZmFrZS1mcmFtZQ==".to_owned(),
        },
        gate_id: "main-gate".to_owned(),
        direction: Direction::In,
    }
}
