//! REST DTOs for gate access.
//!
//! SDK models stay transport-agnostic; these carry the serde shape of the API.

use chrono::{DateTime, Utc};
use gate_access_sdk::{
    AccessAuditRecord, AccessCheckRequest, AccessDecision, AuditFilter, Direction, Entitlement,
    EntitlementKind, Identity, ListEntry, ListEntryPatch, ListParams, NewEntitlement, NewIdentity,
    NewListEntry, NewVehicle, PlateSource, Revocation, Vehicle, VehicleIdentifier,
};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// === Access ===

/// Exactly one of `imageBase64` or `identifier` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckAccessRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Confidence of an upstream recognition; 1.0 when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub gate_id: String,
    pub direction: String,
}

impl CheckAccessRequest {
    /// # Errors
    ///
    /// `Validation` when the plate source is ambiguous or the direction unknown.
    pub fn into_request(self) -> Result<AccessCheckRequest, DomainError> {
        let direction: Direction = self
            .direction
            .parse()
            .map_err(|e: String| DomainError::validation("direction", e))?;

        let source = match (self.image_base64, self.identifier) {
            (Some(image_base64), None) => {
                if self.confidence.is_some() {
                    return Err(DomainError::validation(
                        "confidence",
                        "only allowed together with identifier",
                    ));
                }
                PlateSource::Image { image_base64 }
            }
            (None, Some(identifier)) => PlateSource::Recognized {
                identifier,
                confidence: self.confidence.unwrap_or(1.0),
            },
            _ => {
                return Err(DomainError::validation(
                    "imageBase64",
                    "exactly one of imageBase64 or identifier is required",
                ));
            }
        };

        Ok(AccessCheckRequest {
            source,
            gate_id: self.gate_id,
            direction,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecisionDto {
    pub granted: bool,
    pub decision: String,
    pub identifier: String,
    pub confidence: f64,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<VehicleDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entitlement: Option<EntitlementDto>,
    pub decided_at: DateTime<Utc>,
}

impl From<AccessDecision> for AccessDecisionDto {
    fn from(d: AccessDecision) -> Self {
        Self {
            granted: d.granted(),
            decision: d.decision.as_str().to_owned(),
            identifier: d.identifier,
            confidence: d.confidence,
            reason: d.reason,
            identity: d.identity.map(IdentityDto::from),
            vehicle: d.vehicle.map(VehicleDto::from),
            entitlement: d.entitlement.map(EntitlementDto::from),
            decided_at: d.decided_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuditQuery {
    pub identity_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub identifier: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AuditQuery {
    /// # Errors
    ///
    /// `Validation` when more than one filter is given or the identifier is malformed.
    pub fn into_filter(self) -> Result<(AuditFilter, ListParams), DomainError> {
        let params = ListParams::new(self.limit, self.offset);
        let filter = match (self.identity_id, self.vehicle_id, self.identifier) {
            (None, None, None) => AuditFilter::All,
            (Some(id), None, None) => AuditFilter::Identity(id),
            (None, Some(id), None) => AuditFilter::Vehicle(id),
            (None, None, Some(raw)) => AuditFilter::Identifier(VehicleIdentifier::parse(&raw)?),
            _ => {
                return Err(DomainError::validation(
                    "filter",
                    "use at most one of identityId, vehicleId, identifier",
                ));
            }
        };
        Ok((filter, params))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecordDto {
    pub id: Uuid,
    pub identifier: String,
    pub confidence: f64,
    pub decision: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<Uuid>,
    pub gate_id: String,
    pub direction: String,
    pub created_at: DateTime<Utc>,
}

impl From<AccessAuditRecord> for AuditRecordDto {
    fn from(r: AccessAuditRecord) -> Self {
        Self {
            id: r.id,
            identifier: r.identifier,
            confidence: r.confidence,
            decision: r.decision.as_str().to_owned(),
            reason: r.reason,
            identity_id: r.identity_id,
            vehicle_id: r.vehicle_id,
            gate_id: r.gate_id,
            direction: r.direction.as_str().to_owned(),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl From<PageQuery> for ListParams {
    fn from(q: PageQuery) -> Self {
        ListParams::new(q.limit, q.offset)
    }
}

// === Priority lists ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntryDto {
    pub id: Uuid,
    pub list: String,
    pub identifier: String,
    pub reason: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl From<ListEntry> for ListEntryDto {
    fn from(e: ListEntry) -> Self {
        Self {
            id: e.id,
            list: e.kind.as_str().to_owned(),
            identifier: e.identifier.into_inner(),
            reason: e.reason,
            created_by: e.created_by,
            created_at: e.created_at,
            expires_at: e.expires_at,
            active: e.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateListEntryRequest {
    pub identifier: String,
    pub reason: String,
    pub created_by: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<CreateListEntryRequest> for NewListEntry {
    fn from(req: CreateListEntryRequest) -> Self {
        Self {
            identifier: req.identifier,
            reason: req.reason,
            created_by: req.created_by,
            expires_at: req.expires_at,
        }
    }
}

/// Partial update. `expiresAt: null` clears the expiry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateListEntryRequest {
    pub identifier: Option<String>,
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub active: Option<bool>,
}

impl From<UpdateListEntryRequest> for ListEntryPatch {
    fn from(req: UpdateListEntryRequest) -> Self {
        Self {
            identifier: req.identifier,
            reason: req.reason,
            expires_at: req.expires_at,
            active: req.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResponse {
    pub removed: u64,
}

// === Entitlements ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationDto {
    pub revoked_at: DateTime<Utc>,
    pub revoked_by: Uuid,
    pub reason: String,
}

impl From<Revocation> for RevocationDto {
    fn from(r: Revocation) -> Self {
        Self {
            revoked_at: r.revoked_at,
            revoked_by: r.revoked_by,
            reason: r.reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementDto {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub kind: String,
    pub valid_from: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation: Option<RevocationDto>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_ids: Option<Vec<Uuid>>,
}

impl From<Entitlement> for EntitlementDto {
    fn from(e: Entitlement) -> Self {
        Self {
            id: e.id,
            identity_id: e.identity_id,
            kind: e.kind.as_str().to_owned(),
            valid_from: e.valid_from,
            valid_until: e.valid_until,
            active: e.active,
            revocation: e.revocation.map(RevocationDto::from),
            created_at: e.created_at,
            vehicle_ids: None,
        }
    }
}

impl EntitlementDto {
    #[must_use]
    pub fn with_vehicles(mut self, vehicle_ids: Vec<Uuid>) -> Self {
        self.vehicle_ids = Some(vehicle_ids);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateEntitlementRequest {
    pub identity_id: Uuid,
    pub kind: String,
    pub valid_from: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    pub vehicle_ids: Vec<Uuid>,
}

impl CreateEntitlementRequest {
    /// # Errors
    ///
    /// `Validation` for an unknown kind.
    pub fn into_new(self) -> Result<NewEntitlement, DomainError> {
        let kind: EntitlementKind = self
            .kind
            .parse()
            .map_err(|e: String| DomainError::validation("kind", e))?;
        Ok(NewEntitlement {
            identity_id: self.identity_id,
            kind,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            vehicle_ids: self.vehicle_ids,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RevokeEntitlementRequest {
    pub revoked_by: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LinkVehicleRequest {
    pub vehicle_id: Uuid,
}

// === Registry ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDto {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Identity> for IdentityDto {
    fn from(i: Identity) -> Self {
        Self {
            id: i.id,
            name: i.name,
            active: i.active,
            created_at: i.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateIdentityRequest {
    pub name: String,
}

impl From<CreateIdentityRequest> for NewIdentity {
    fn from(req: CreateIdentityRequest) -> Self {
        Self { name: req.name }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDto {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub identifier: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Vehicle> for VehicleDto {
    fn from(v: Vehicle) -> Self {
        Self {
            id: v.id,
            owner_id: v.owner_id,
            identifier: v.identifier.into_inner(),
            active: v.active,
            created_at: v.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateVehicleRequest {
    pub owner_id: Uuid,
    pub identifier: String,
}

impl From<CreateVehicleRequest> for NewVehicle {
    fn from(req: CreateVehicleRequest) -> Self {
        Self {
            owner_id: req.owner_id,
            identifier: req.identifier,
        }
    }
}

// === Health ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub recognizer: String,
}
