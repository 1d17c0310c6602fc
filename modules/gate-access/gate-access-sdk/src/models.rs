//! Domain models for gate access.
//!
//! These models are transport-agnostic (no serde); the REST layer owns its
//! own DTOs.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::identifier::VehicleIdentifier;

/// Owner of vehicles and holder of entitlements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub name: String,
}

/// A registered vehicle. The owner is mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vehicle {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub identifier: VehicleIdentifier,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVehicle {
    pub owner_id: Uuid,
    /// Raw plate text; normalized and validated on registration.
    pub identifier: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntitlementKind {
    Permanent,
    Temporary,
}

impl EntitlementKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Temporary => "temporary",
        }
    }
}

impl fmt::Display for EntitlementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntitlementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "permanent" => Ok(Self::Permanent),
            "temporary" => Ok(Self::Temporary),
            other => Err(format!("unknown entitlement kind '{other}'")),
        }
    }
}

/// Who revoked an entitlement, when and why. Present only on inactive entitlements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revocation {
    pub revoked_at: DateTime<Utc>,
    pub revoked_by: Uuid,
    pub reason: String,
}

/// A time-scoped permit ("pass") held by an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entitlement {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub kind: EntitlementKind,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub active: bool,
    pub revocation: Option<Revocation>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntitlement {
    pub identity_id: Uuid,
    pub kind: EntitlementKind,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub vehicle_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntitlementVehicleLink {
    pub entitlement_id: Uuid,
    pub vehicle_id: Uuid,
}

/// Which priority list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Allow,
    Deny,
}

impl ListKind {
    /// Cache namespace for this list.
    #[must_use]
    pub fn namespace(self) -> &'static str {
        match self {
            Self::Allow => "allowlist",
            Self::Deny => "denylist",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allow-list or deny-list record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub id: Uuid,
    pub kind: ListKind,
    pub identifier: VehicleIdentifier,
    pub reason: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl ListEntry {
    /// Active and not yet expired at `now`.
    #[must_use]
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewListEntry {
    pub identifier: String,
    pub reason: String,
    pub created_by: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Partial update of a list entry. `expires_at: Some(None)` clears the expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEntryPatch {
    pub identifier: Option<String>,
    pub reason: Option<String>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            other => Err(format!("unknown direction '{other}', expected IN or OUT")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Granted,
    Denied,
}

impl Decision {
    #[must_use]
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the plate for a check comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum PlateSource {
    /// Camera frame, sent to the recognizer.
    Image { image_base64: String },
    /// Plate already recognized upstream.
    Recognized { identifier: String, confidence: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessCheckRequest {
    pub source: PlateSource,
    pub gate_id: String,
    pub direction: Direction,
}

/// Result of one access check. Every decision carries a reason.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessDecision {
    pub decision: Decision,
    /// Normalized identifier when recognition produced one, raw text otherwise.
    pub identifier: String,
    pub confidence: f64,
    pub reason: String,
    pub identity: Option<Identity>,
    pub vehicle: Option<Vehicle>,
    pub entitlement: Option<Entitlement>,
    pub decided_at: DateTime<Utc>,
}

impl AccessDecision {
    #[must_use]
    pub fn granted(&self) -> bool {
        self.decision.is_granted()
    }
}

/// Immutable, append-only record of one decision.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessAuditRecord {
    pub id: Uuid,
    pub identifier: String,
    pub confidence: f64,
    pub decision: Decision,
    pub reason: String,
    pub identity_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub gate_id: String,
    pub direction: Direction,
    pub created_at: DateTime<Utc>,
}

/// Selects which audit records to return.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuditFilter {
    #[default]
    All,
    Identity(Uuid),
    Vehicle(Uuid),
    Identifier(VehicleIdentifier),
}

impl AuditFilter {
    #[must_use]
    pub fn matches(&self, record: &AccessAuditRecord) -> bool {
        match self {
            Self::All => true,
            Self::Identity(id) => record.identity_id == Some(*id),
            Self::Vehicle(id) => record.vehicle_id == Some(*id),
            Self::Identifier(identifier) => record.identifier == identifier.as_str(),
        }
    }
}

/// Offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    pub limit: usize,
    pub offset: usize,
}

impl ListParams {
    pub const DEFAULT_LIMIT: usize = 50;
    pub const MAX_LIMIT: usize = 500;

    /// Builds params, clamping `limit` into `1..=MAX_LIMIT`.
    #[must_use]
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Per-call cancellation and deadline carried into every cache and store call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancellation: CancellationToken,
    timeout: Option<Duration>,
}

impl CallContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
