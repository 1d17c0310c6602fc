//! Access decision engine.
//!
//! `check_access` walks: recognition gate, then the tier pipeline. Every
//! decision, grant or deny, is audited exactly once before it is returned.
//! Operational failures in identity or entitlement tiers are returned as
//! errors and produce no decision.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gate_access_sdk::{
    AccessAuditRecord, AccessCheckRequest, AccessDecision, AuditFilter, CallContext, Decision,
    Direction, Entitlement, Identity, ListParams, PlateSource, Vehicle, VehicleIdentifier,
    normalize_identifier,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::deadline::{Deadlines, bounded};
use super::error::DomainError;
use super::ports::{Clock, Recognizer, RecognizerError};
use super::repo::AuditRepository;
use super::tiers::{Evaluation, TierPipeline, Verdict};

pub const REASON_RECOGNIZER_UNAVAILABLE: &str = "recognition service unavailable";

const MAX_GATE_ID_LEN: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Minimum confidence, applied regardless of the recognizer's own threshold.
    pub min_confidence: f64,
    /// Upper bound for one recognizer call, retries included.
    pub recognition_timeout: Duration,
    pub deadlines: Deadlines,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            recognition_timeout: Duration::from_secs(30),
            deadlines: Deadlines::default(),
        }
    }
}

/// Terminal state before it is audited.
struct Outcome {
    decision: Decision,
    identifier: String,
    confidence: f64,
    reason: String,
    identity: Option<Identity>,
    vehicle: Option<Vehicle>,
    entitlement: Option<Entitlement>,
}

impl Outcome {
    fn denied(identifier: impl Into<String>, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Denied,
            identifier: identifier.into(),
            confidence,
            reason: reason.into(),
            identity: None,
            vehicle: None,
            entitlement: None,
        }
    }
}

/// Either a recognized identifier or an early deny.
enum Recognition {
    Plate {
        identifier: VehicleIdentifier,
        confidence: f64,
    },
    Rejected(Outcome),
}

pub struct AccessEngine {
    pipeline: TierPipeline,
    recognizer: Arc<dyn Recognizer>,
    audit: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl AccessEngine {
    #[must_use]
    pub fn new(
        pipeline: TierPipeline,
        recognizer: Arc<dyn Recognizer>,
        audit: Arc<dyn AuditRepository>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            pipeline,
            recognizer,
            audit,
            clock,
            settings,
        }
    }

    /// Decide access for one gate event.
    ///
    /// # Errors
    ///
    /// `Validation` for malformed requests; `StoreUnavailable`, `Timeout` or
    /// `Cancelled` when vehicle, identity or entitlement lookups fail.
    #[tracing::instrument(skip_all, fields(gate_id = %request.gate_id, direction = %request.direction))]
    pub async fn check_access(
        &self,
        ctx: &CallContext,
        request: AccessCheckRequest,
    ) -> Result<AccessDecision, DomainError> {
        let gate_id = validate_gate_id(&request.gate_id)?;
        let direction = request.direction;

        let (identifier, confidence) = match self.recognize(ctx, request.source).await? {
            Recognition::Plate {
                identifier,
                confidence,
            } => (identifier, confidence),
            Recognition::Rejected(outcome) => {
                return Ok(self.finalize(outcome, &gate_id, direction).await);
            }
        };

        let mut eval = Evaluation::new(identifier, self.clock.now());
        let verdict = match self.pipeline.run(ctx, &mut eval).await {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(identifier = %eval.identifier, error = %e, "Access check failed");
                return Err(e);
            }
        };

        let outcome = match verdict {
            Verdict::Granted(grant) => Outcome {
                decision: Decision::Granted,
                identifier: eval.identifier.into_inner(),
                confidence,
                reason: grant.reason,
                identity: eval.identity,
                vehicle: eval.vehicle,
                entitlement: grant.entitlement,
            },
            Verdict::Denied(reason) => Outcome {
                identity: eval.identity,
                vehicle: eval.vehicle,
                ..Outcome::denied(eval.identifier.into_inner(), confidence, reason)
            },
        };
        Ok(self.finalize(outcome, &gate_id, direction).await)
    }

    /// Recognition gate: recognizer call, failure, confidence and identifier checks.
    async fn recognize(
        &self,
        ctx: &CallContext,
        source: PlateSource,
    ) -> Result<Recognition, DomainError> {
        let min_confidence = self.settings.min_confidence;

        let (raw, confidence) = match source {
            PlateSource::Recognized {
                identifier,
                confidence,
            } => {
                validate_confidence(confidence)?;
                (identifier, confidence)
            }
            PlateSource::Image { image_base64 } => {
                if image_base64.trim().is_empty() {
                    return Err(DomainError::validation("image_base64", "must not be empty"));
                }
                let call = bounded(
                    ctx,
                    self.settings.recognition_timeout,
                    "recognize",
                    self.recognizer.recognize(&image_base64, min_confidence),
                )
                .await;
                let result = match call {
                    Ok(Ok(result)) => result,
                    Err(e @ DomainError::Cancelled { .. }) => return Err(e),
                    Err(e) => {
                        warn!(error = %e, "Recognizer did not answer in time");
                        return Ok(Recognition::Rejected(Outcome::denied(
                            "",
                            0.0,
                            REASON_RECOGNIZER_UNAVAILABLE,
                        )));
                    }
                    Ok(Err(e)) => {
                        log_recognizer_error(&e);
                        return Ok(Recognition::Rejected(Outcome::denied(
                            "",
                            0.0,
                            REASON_RECOGNIZER_UNAVAILABLE,
                        )));
                    }
                };
                if !result.success {
                    let detail = result.error.as_deref().unwrap_or("no plate detected");
                    return Ok(Recognition::Rejected(Outcome::denied(
                        normalize_identifier(&result.identifier),
                        result.confidence,
                        format!("recognition failed: {detail}"),
                    )));
                }
                (result.identifier, result.confidence)
            }
        };

        if confidence < min_confidence {
            return Ok(Recognition::Rejected(Outcome::denied(
                normalize_identifier(&raw),
                confidence,
                format!("low confidence: {confidence:.2} below {min_confidence:.2}"),
            )));
        }

        match VehicleIdentifier::parse(&raw) {
            Ok(identifier) => Ok(Recognition::Plate {
                identifier,
                confidence,
            }),
            Err(e) => Ok(Recognition::Rejected(Outcome::denied(
                normalize_identifier(&raw),
                confidence,
                format!("recognition failed: {e}"),
            ))),
        }
    }

    /// Writes the audit record and builds the decision. Audit failures are
    /// logged and do not change the decision.
    async fn finalize(&self, outcome: Outcome, gate_id: &str, direction: Direction) -> AccessDecision {
        let decided_at = self.clock.now();
        let record = audit_record(&outcome, gate_id, direction, decided_at);

        // The caller may already be gone; the record is written regardless.
        let audit_ctx = CallContext::new();
        if let Err(e) = self
            .settings
            .deadlines
            .store(&audit_ctx, "append audit record", self.audit.append(record))
            .await
        {
            error!(
                identifier = %outcome.identifier,
                gate_id = %gate_id,
                decision = %outcome.decision,
                error = %e,
                "Failed to write access audit record"
            );
        }

        info!(
            identifier = %outcome.identifier,
            gate_id = %gate_id,
            decision = %outcome.decision,
            reason = %outcome.reason,
            "Access decision"
        );

        AccessDecision {
            decision: outcome.decision,
            identifier: outcome.identifier,
            confidence: outcome.confidence,
            reason: outcome.reason,
            identity: outcome.identity,
            vehicle: outcome.vehicle,
            entitlement: outcome.entitlement,
            decided_at,
        }
    }

    /// Audit records, newest first.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub async fn list_audit(
        &self,
        ctx: &CallContext,
        filter: AuditFilter,
        params: ListParams,
    ) -> Result<Vec<AccessAuditRecord>, DomainError> {
        self.settings
            .deadlines
            .store(ctx, "list audit records", self.audit.list(&filter, params))
            .await
    }

    /// Whether the recognizer answers its health probe.
    pub async fn recognizer_healthy(&self, ctx: &CallContext) -> bool {
        matches!(
            bounded(
                ctx,
                self.settings.recognition_timeout,
                "recognizer health",
                self.recognizer.health()
            )
            .await,
            Ok(Ok(()))
        )
    }

    #[must_use]
    pub fn tier_names(&self) -> Vec<&'static str> {
        self.pipeline.tier_names()
    }
}

fn log_recognizer_error(e: &RecognizerError) {
    if e.is_retryable() {
        warn!(error = %e, "Recognizer unreachable");
    } else {
        error!(error = %e, "Recognizer call failed");
    }
}

fn audit_record(
    outcome: &Outcome,
    gate_id: &str,
    direction: Direction,
    created_at: DateTime<Utc>,
) -> AccessAuditRecord {
    AccessAuditRecord {
        id: Uuid::new_v4(),
        identifier: outcome.identifier.clone(),
        confidence: outcome.confidence,
        decision: outcome.decision,
        reason: outcome.reason.clone(),
        identity_id: outcome.identity.as_ref().map(|i| i.id),
        vehicle_id: outcome.vehicle.as_ref().map(|v| v.id),
        gate_id: gate_id.to_owned(),
        direction,
        created_at,
    }
}

fn validate_gate_id(gate_id: &str) -> Result<String, DomainError> {
    let gate_id = gate_id.trim();
    if gate_id.is_empty() {
        return Err(DomainError::validation("gate_id", "must not be empty"));
    }
    if gate_id.chars().count() > MAX_GATE_ID_LEN {
        return Err(DomainError::validation(
            "gate_id",
            format!("must be at most {MAX_GATE_ID_LEN} characters"),
        ));
    }
    Ok(gate_id.to_owned())
}

fn validate_confidence(confidence: f64) -> Result<(), DomainError> {
    if confidence.is_finite() && (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(DomainError::validation(
            "confidence",
            "must be within 0.0..=1.0",
        ))
    }
}
