//! Gate access module definition.

use std::sync::Arc;
use std::time::Duration;

use gate_access_sdk::{CallContext, GateAccessClient, ListKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api::rest::routes;
use crate::config::GateAccessConfig;
use crate::domain::deadline::Deadlines;
use crate::domain::engine::EngineSettings;
use crate::domain::ports::SystemClock;
use crate::domain::service::{Ports, Service, ServiceSettings};
use crate::infra::recognizer::RetryPolicy;
use crate::infra::{HttpRecognizer, InMemoryStore, MokaKeyValueCache};
use crate::local_client::GateAccessLocalClient;

impl From<&GateAccessConfig> for ServiceSettings {
    fn from(cfg: &GateAccessConfig) -> Self {
        Self {
            list_cache_ttl: cfg.list_cache_ttl,
            engine: EngineSettings {
                min_confidence: cfg.min_confidence,
                recognition_timeout: recognition_budget(cfg),
                deadlines: Deadlines {
                    cache: cfg.cache_timeout,
                    store: cfg.store_timeout,
                },
            },
        }
    }
}

/// Worst case for one recognizer call: every attempt times out, plus backoffs.
fn recognition_budget(cfg: &GateAccessConfig) -> Duration {
    let policy = RetryPolicy::from(&cfg.recognizer);
    let backoffs = (0..policy.max_attempts.saturating_sub(1))
        .map(|retry| policy.backoff_for(retry))
        .fold(Duration::ZERO, Duration::saturating_add);
    cfg.recognizer
        .request_timeout
        .saturating_mul(policy.max_attempts)
        .saturating_add(backoffs)
}

/// Gate access module.
///
/// Owns the domain services and exposes them as a REST router and as a
/// [`GateAccessClient`] for in-process callers.
pub struct GateAccessModule {
    service: Arc<Service>,
    sweep_interval: Duration,
}

impl GateAccessModule {
    /// Wires the default adapters: in-memory store, moka cache, HTTP recognizer.
    ///
    /// # Errors
    ///
    /// Invalid configuration or a recognizer client that cannot be built.
    pub fn new(cfg: &GateAccessConfig) -> anyhow::Result<Self> {
        cfg.validate().map_err(anyhow::Error::msg)?;
        info!("Initializing gate access module");

        let store = Arc::new(InMemoryStore::new());
        let ports = Ports {
            identities: store.clone(),
            vehicles: store.clone(),
            entitlements: store.clone(),
            lists: store.clone(),
            audit: store,
            cache: Arc::new(MokaKeyValueCache::new(cfg.list_cache_max_entries)),
            recognizer: Arc::new(HttpRecognizer::new(&cfg.recognizer)?),
            clock: Arc::new(SystemClock),
        };
        info!(
            recognizer = %cfg.recognizer.base_url,
            min_confidence = cfg.min_confidence,
            "Gate access adapters wired"
        );
        Ok(Self::with_ports(cfg, ports))
    }

    /// Wires the module over caller-supplied adapters.
    pub fn with_ports(cfg: &GateAccessConfig, ports: Ports) -> Self {
        Self {
            service: Arc::new(Service::new(ports, ServiceSettings::from(cfg))),
            sweep_interval: cfg.sweep_interval,
        }
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    /// REST routes under `/gate/v1`.
    pub fn router(&self) -> axum::Router {
        info!("Registering gate access REST routes");
        routes::router(self.service.clone())
    }

    pub fn client(&self) -> Arc<dyn GateAccessClient> {
        Arc::new(GateAccessLocalClient::new(self.service.clone()))
    }

    /// Periodically removes expired list entries until `cancel` fires.
    ///
    /// Returns `None` when sweeping is disabled (`sweep_interval: 0s`).
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        if self.sweep_interval.is_zero() {
            info!("Expired entry sweeper disabled");
            return None;
        }
        let service = self.service.clone();
        let period = self.sweep_interval;

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("Expired entry sweeper stopped");
                        return;
                    }
                    _ = ticker.tick() => sweep_once(&service, &cancel).await,
                }
            }
        }))
    }
}

async fn sweep_once(service: &Service, cancel: &CancellationToken) {
    let ctx = CallContext::new().with_cancellation(cancel.clone());
    for kind in [ListKind::Allow, ListKind::Deny] {
        if let Err(e) = service.lists.sweep_expired(&ctx, kind).await {
            error!(list = %kind, error = %e, "Expired entry sweep failed");
        }
    }
    match service.entitlements.list_expired_temporary(&ctx).await {
        Ok(expired) if !expired.is_empty() => {
            info!(count = expired.len(), "Temporary entitlements past validity");
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "Failed to list expired entitlements"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognition_budget_covers_retries() {
        let cfg = GateAccessConfig::default();
        // 3 x 30s attempts + 200ms + 400ms backoff
        assert_eq!(
            recognition_budget(&cfg),
            Duration::from_secs(90) + Duration::from_millis(600)
        );
    }

    #[test]
    fn test_settings_from_config() {
        let cfg = GateAccessConfig {
            min_confidence: 0.85,
            store_timeout: Duration::from_millis(750),
            ..GateAccessConfig::default()
        };
        let settings = ServiceSettings::from(&cfg);
        assert!((settings.engine.min_confidence - 0.85).abs() < f64::EPSILON);
        assert_eq!(settings.engine.deadlines.store, Duration::from_millis(750));
        assert_eq!(settings.list_cache_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = GateAccessConfig {
            min_confidence: 1.5,
            ..GateAccessConfig::default()
        };
        assert!(GateAccessModule::new(&cfg).is_err());
    }
}
