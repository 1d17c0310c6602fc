//! Ordered decision tiers.
//!
//! Each tier inspects the evaluation state and returns a [`TierOutcome`]. The
//! pipeline runs tiers in order and stops at the first `Grant` or `Deny`.
//! Order, highest priority first: allow-list, deny-list, identity
//! resolution, entitlement.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gate_access_sdk::{CallContext, Entitlement, Identity, ListKind, Vehicle, VehicleIdentifier};
use tracing::{debug, warn};

use super::deadline::Deadlines;
use super::entitlement::first_honorable;
use super::error::DomainError;
use super::priority_list::{Membership, PriorityListService};
use super::repo::{EntitlementRepository, IdentityRepository, VehicleRepository};

pub const REASON_VEHICLE_NOT_REGISTERED: &str = "vehicle not registered";
pub const REASON_VEHICLE_INACTIVE: &str = "vehicle inactive";
pub const REASON_OWNER_NOT_FOUND: &str = "vehicle owner not found";
pub const REASON_USER_INACTIVE: &str = "user account is inactive";
pub const REASON_NO_ENTITLEMENT: &str = "no entitlement for this vehicle";
pub const REASON_ENTITLEMENTS_EXPIRED: &str = "all entitlements expired/inactive";
pub const REASON_VALID_ENTITLEMENT: &str = "valid entitlement";
pub const REASON_NO_TIER_DECIDED: &str = "no access rule matched";

/// State shared by the tiers of one evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub identifier: VehicleIdentifier,
    pub now: DateTime<Utc>,
    pub vehicle: Option<Vehicle>,
    pub identity: Option<Identity>,
}

impl Evaluation {
    #[must_use]
    pub fn new(identifier: VehicleIdentifier, now: DateTime<Utc>) -> Self {
        Self {
            identifier,
            now,
            vehicle: None,
            identity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    pub reason: String,
    pub entitlement: Option<Entitlement>,
}

/// Tagged result of one tier.
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome {
    Grant(Grant),
    Deny(String),
    Continue,
}

impl TierOutcome {
    fn grant(reason: impl Into<String>) -> Self {
        Self::Grant(Grant {
            reason: reason.into(),
            entitlement: None,
        })
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self::Deny(reason.into())
    }
}

#[async_trait]
pub trait Tier: Send + Sync {
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// Operational failures the tier does not absorb.
    async fn evaluate(
        &self,
        ctx: &CallContext,
        eval: &mut Evaluation,
    ) -> Result<TierOutcome, DomainError>;
}

/// Final outcome of the pipeline: a grant or a deny, never `Continue`.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Granted(Grant),
    Denied(String),
}

/// Tiers in priority order.
pub struct TierPipeline {
    tiers: Vec<Arc<dyn Tier>>,
}

impl TierPipeline {
    #[must_use]
    pub fn new(tiers: Vec<Arc<dyn Tier>>) -> Self {
        Self { tiers }
    }

    /// The standard order: allow, deny, identity resolution, entitlement.
    #[must_use]
    pub fn standard(
        lists: Arc<PriorityListService>,
        vehicles: Arc<dyn VehicleRepository>,
        identities: Arc<dyn IdentityRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
        deadlines: Deadlines,
    ) -> Self {
        Self::new(vec![
            Arc::new(AllowListTier::new(lists.clone())),
            Arc::new(DenyListTier::new(lists)),
            Arc::new(IdentityResolutionTier::new(vehicles, identities, deadlines)),
            Arc::new(EntitlementTier::new(entitlements, deadlines)),
        ])
    }

    #[must_use]
    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Runs tiers until one decides.
    ///
    /// # Errors
    ///
    /// The first error a tier returns.
    pub async fn run(
        &self,
        ctx: &CallContext,
        eval: &mut Evaluation,
    ) -> Result<Verdict, DomainError> {
        for tier in &self.tiers {
            match tier.evaluate(ctx, eval).await? {
                TierOutcome::Grant(grant) => {
                    debug!(tier = tier.name(), "Tier granted");
                    return Ok(Verdict::Granted(grant));
                }
                TierOutcome::Deny(reason) => {
                    debug!(tier = tier.name(), reason = %reason, "Tier denied");
                    return Ok(Verdict::Denied(reason));
                }
                TierOutcome::Continue => {}
            }
        }
        Ok(Verdict::Denied(REASON_NO_TIER_DECIDED.to_owned()))
    }
}

/// Priority-list lookup where an outage means "keep evaluating".
async fn list_membership(
    lists: &PriorityListService,
    ctx: &CallContext,
    kind: ListKind,
    tier: &'static str,
    identifier: &VehicleIdentifier,
) -> Result<Membership, DomainError> {
    match lists.check(ctx, kind, identifier).await {
        Ok(membership) => Ok(membership),
        Err(e @ DomainError::Cancelled { .. }) => Err(e),
        Err(e) => {
            warn!(tier, identifier = %identifier, error = %e, "Priority list unavailable, continuing");
            Ok(Membership::Absent)
        }
    }
}

/// Highest priority. Membership grants unconditionally.
pub struct AllowListTier {
    lists: Arc<PriorityListService>,
}

impl AllowListTier {
    #[must_use]
    pub fn new(lists: Arc<PriorityListService>) -> Self {
        Self { lists }
    }
}

#[async_trait]
impl Tier for AllowListTier {
    fn name(&self) -> &'static str {
        "allow_list"
    }

    async fn evaluate(
        &self,
        ctx: &CallContext,
        eval: &mut Evaluation,
    ) -> Result<TierOutcome, DomainError> {
        let membership =
            list_membership(&self.lists, ctx, ListKind::Allow, self.name(), &eval.identifier)
                .await?;
        Ok(match membership.reason() {
            Some(reason) => TierOutcome::grant(format!("allow-listed: {reason}")),
            None => TierOutcome::Continue,
        })
    }
}

/// Second priority. Membership denies unconditionally.
pub struct DenyListTier {
    lists: Arc<PriorityListService>,
}

impl DenyListTier {
    #[must_use]
    pub fn new(lists: Arc<PriorityListService>) -> Self {
        Self { lists }
    }
}

#[async_trait]
impl Tier for DenyListTier {
    fn name(&self) -> &'static str {
        "deny_list"
    }

    async fn evaluate(
        &self,
        ctx: &CallContext,
        eval: &mut Evaluation,
    ) -> Result<TierOutcome, DomainError> {
        let membership =
            list_membership(&self.lists, ctx, ListKind::Deny, self.name(), &eval.identifier)
                .await?;
        Ok(match membership.reason() {
            Some(reason) => TierOutcome::deny(format!("deny-listed: {reason}")),
            None => TierOutcome::Continue,
        })
    }
}

/// Resolves vehicle and owner. Never grants.
pub struct IdentityResolutionTier {
    vehicles: Arc<dyn VehicleRepository>,
    identities: Arc<dyn IdentityRepository>,
    deadlines: Deadlines,
}

impl IdentityResolutionTier {
    #[must_use]
    pub fn new(
        vehicles: Arc<dyn VehicleRepository>,
        identities: Arc<dyn IdentityRepository>,
        deadlines: Deadlines,
    ) -> Self {
        Self {
            vehicles,
            identities,
            deadlines,
        }
    }
}

#[async_trait]
impl Tier for IdentityResolutionTier {
    fn name(&self) -> &'static str {
        "identity_resolution"
    }

    async fn evaluate(
        &self,
        ctx: &CallContext,
        eval: &mut Evaluation,
    ) -> Result<TierOutcome, DomainError> {
        let Some(vehicle) = self
            .deadlines
            .store(
                ctx,
                "find vehicle",
                self.vehicles.find_by_identifier(&eval.identifier),
            )
            .await?
        else {
            return Ok(TierOutcome::deny(REASON_VEHICLE_NOT_REGISTERED));
        };
        let vehicle_active = vehicle.active;
        let owner_id = vehicle.owner_id;
        eval.vehicle = Some(vehicle);
        if !vehicle_active {
            return Ok(TierOutcome::deny(REASON_VEHICLE_INACTIVE));
        }

        let Some(identity) = self
            .deadlines
            .store(ctx, "find identity", self.identities.find_by_id(owner_id))
            .await?
        else {
            return Ok(TierOutcome::deny(REASON_OWNER_NOT_FOUND));
        };
        let identity_active = identity.active;
        eval.identity = Some(identity);
        if !identity_active {
            return Ok(TierOutcome::deny(REASON_USER_INACTIVE));
        }

        Ok(TierOutcome::Continue)
    }
}

/// Lowest priority. Grants when any linked entitlement is honorable.
pub struct EntitlementTier {
    entitlements: Arc<dyn EntitlementRepository>,
    deadlines: Deadlines,
}

impl EntitlementTier {
    #[must_use]
    pub fn new(entitlements: Arc<dyn EntitlementRepository>, deadlines: Deadlines) -> Self {
        Self {
            entitlements,
            deadlines,
        }
    }
}

#[async_trait]
impl Tier for EntitlementTier {
    fn name(&self) -> &'static str {
        "entitlement"
    }

    async fn evaluate(
        &self,
        ctx: &CallContext,
        eval: &mut Evaluation,
    ) -> Result<TierOutcome, DomainError> {
        let (Some(identity), Some(vehicle)) = (&eval.identity, &eval.vehicle) else {
            // Only reachable when the pipeline is assembled without identity resolution.
            return Ok(TierOutcome::deny(REASON_VEHICLE_NOT_REGISTERED));
        };

        let candidates = self
            .deadlines
            .store(
                ctx,
                "list entitlements",
                self.entitlements
                    .list_for_identity_and_vehicle(identity.id, vehicle.id),
            )
            .await?;

        if candidates.is_empty() {
            return Ok(TierOutcome::deny(REASON_NO_ENTITLEMENT));
        }
        Ok(match first_honorable(&candidates, eval.now) {
            Some(entitlement) => TierOutcome::Grant(Grant {
                reason: REASON_VALID_ENTITLEMENT.to_owned(),
                entitlement: Some(entitlement.clone()),
            }),
            None => TierOutcome::deny(REASON_ENTITLEMENTS_EXPIRED),
        })
    }
}
