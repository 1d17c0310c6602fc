//! Gate Access SDK
//!
//! Public contract of the gate access module:
//! - [`GateAccessClient`]: async API other modules call
//! - [`models`]: transport-agnostic domain models
//! - [`GateAccessError`]: errors crossing the module boundary
//! - [`identifier`]: vehicle identifier normalization and validation

pub mod api;
pub mod error;
pub mod identifier;
pub mod models;

pub use api::GateAccessClient;
pub use error::GateAccessError;
pub use identifier::{IdentifierError, VehicleIdentifier, normalize_identifier};
pub use models::{
    AccessAuditRecord, AccessCheckRequest, AccessDecision, AuditFilter, CallContext, Decision,
    Direction, Entitlement, EntitlementKind, EntitlementVehicleLink, Identity, ListEntry,
    ListEntryPatch, ListKind, ListParams, NewEntitlement, NewIdentity, NewListEntry, NewVehicle,
    PlateSource, Revocation, Vehicle,
};
