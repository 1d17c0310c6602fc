#![allow(clippy::must_use_candidate)]

//! Gate Access Module Implementation
//!
//! Decides whether a vehicle may pass a gate, based on the plate recognized
//! from a camera frame. It provides:
//!
//! - Ordered decision tiers: recognition, allow-list, deny-list, identity
//!   resolution, entitlements
//! - A read-through, write-invalidate cache in front of the priority lists
//! - Entitlement validity rules and administration
//! - An append-only audit trail of every decision
//!
//! ## Architecture
//!
//! ```text
//!      camera / operator console
//!                 │
//!                 ▼ REST (/gate/v1/...) or dyn GateAccessClient
//! ┌────────────────────────────────────┐
//! │         AccessEngine               │
//! │  recognition → allow → deny →      │
//! │  identity → entitlement → audit    │
//! └────────────────────────────────────┘
//!        │               │
//!        ▼               ▼
//!  PriorityListCache   repositories
//!   (KeyValueCache)    (identity, vehicle, entitlement, audit)
//! ```

// === PUBLIC API (from SDK) ===
pub use gate_access_sdk::{
    AccessAuditRecord, AccessCheckRequest, AccessDecision, AuditFilter, CallContext, Decision,
    Direction, Entitlement, EntitlementKind, GateAccessClient, GateAccessError, Identity,
    ListEntry, ListKind, ListParams, NewEntitlement, NewIdentity, NewListEntry, NewVehicle,
    PlateSource, Vehicle, VehicleIdentifier,
};

// === MODULE DEFINITION ===
pub mod module;
pub use module::GateAccessModule;

// === LOCAL CLIENT ===
pub mod local_client;

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod api;
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
