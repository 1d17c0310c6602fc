//! Administrative services: identity/vehicle registry and entitlements.

use std::sync::Arc;

use gate_access_sdk::{
    CallContext, Entitlement, Identity, NewEntitlement, NewIdentity, NewVehicle, Vehicle,
    VehicleIdentifier,
};
use tracing::info;
use uuid::Uuid;

use super::deadline::Deadlines;
use super::entitlement;
use super::error::DomainError;
use super::ports::Clock;
use super::repo::{EntitlementRepository, IdentityRepository, RevokeOutcome, VehicleRepository};

const MAX_NAME_LEN: usize = 200;

/// Identity and vehicle registration.
pub struct RegistryService {
    identities: Arc<dyn IdentityRepository>,
    vehicles: Arc<dyn VehicleRepository>,
    clock: Arc<dyn Clock>,
    deadlines: Deadlines,
}

impl RegistryService {
    #[must_use]
    pub fn new(
        identities: Arc<dyn IdentityRepository>,
        vehicles: Arc<dyn VehicleRepository>,
        clock: Arc<dyn Clock>,
        deadlines: Deadlines,
    ) -> Self {
        Self {
            identities,
            vehicles,
            clock,
            deadlines,
        }
    }

    /// # Errors
    ///
    /// `Validation` for a blank or overlong name; store errors.
    pub async fn register_identity(
        &self,
        ctx: &CallContext,
        new: NewIdentity,
    ) -> Result<Identity, DomainError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name", "must not be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation(
                "name",
                format!("must be at most {MAX_NAME_LEN} characters"),
            ));
        }

        let identity = Identity {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            active: true,
            created_at: self.clock.now(),
        };
        let identity = self
            .deadlines
            .store(ctx, "insert identity", self.identities.insert(identity))
            .await?;
        info!(identity_id = %identity.id, "Identity registered");
        Ok(identity)
    }

    /// # Errors
    ///
    /// `NotFound` if the identity does not exist.
    pub async fn get_identity(&self, ctx: &CallContext, id: Uuid) -> Result<Identity, DomainError> {
        self.deadlines
            .store(ctx, "find identity", self.identities.find_by_id(id))
            .await?
            .ok_or_else(|| DomainError::not_found("identity", id))
    }

    /// # Errors
    ///
    /// `NotFound` if the identity does not exist.
    pub async fn set_identity_active(
        &self,
        ctx: &CallContext,
        id: Uuid,
        active: bool,
    ) -> Result<Identity, DomainError> {
        let identity = self
            .deadlines
            .store(ctx, "update identity", self.identities.set_active(id, active))
            .await?
            .ok_or_else(|| DomainError::not_found("identity", id))?;
        info!(identity_id = %id, active, "Identity active flag changed");
        Ok(identity)
    }

    /// Registers a vehicle under an existing owner.
    ///
    /// # Errors
    ///
    /// `Validation` for a nil owner, `InvalidIdentifier`, `NotFound` for an
    /// unknown owner, `Conflict` when the identifier is already registered.
    #[tracing::instrument(skip_all, fields(owner_id = %new.owner_id))]
    pub async fn register_vehicle(
        &self,
        ctx: &CallContext,
        new: NewVehicle,
    ) -> Result<Vehicle, DomainError> {
        if new.owner_id.is_nil() {
            return Err(DomainError::validation("owner_id", "must be set"));
        }
        let identifier = VehicleIdentifier::parse(&new.identifier)?;
        self.get_identity(ctx, new.owner_id).await?;

        if self
            .deadlines
            .store(ctx, "find vehicle", self.vehicles.find_by_identifier(&identifier))
            .await?
            .is_some()
        {
            return Err(DomainError::conflict(format!(
                "vehicle {identifier} is already registered"
            )));
        }

        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            identifier,
            active: true,
            created_at: self.clock.now(),
        };
        let vehicle = self
            .deadlines
            .store(ctx, "insert vehicle", self.vehicles.insert(vehicle))
            .await?;
        info!(vehicle_id = %vehicle.id, identifier = %vehicle.identifier, "Vehicle registered");
        Ok(vehicle)
    }

    /// # Errors
    ///
    /// `NotFound` if the vehicle does not exist.
    pub async fn get_vehicle(&self, ctx: &CallContext, id: Uuid) -> Result<Vehicle, DomainError> {
        self.deadlines
            .store(ctx, "find vehicle", self.vehicles.find_by_id(id))
            .await?
            .ok_or_else(|| DomainError::not_found("vehicle", id))
    }

    /// # Errors
    ///
    /// `NotFound` if the owner does not exist.
    pub async fn list_vehicles(
        &self,
        ctx: &CallContext,
        owner_id: Uuid,
    ) -> Result<Vec<Vehicle>, DomainError> {
        self.get_identity(ctx, owner_id).await?;
        self.deadlines
            .store(ctx, "list vehicles", self.vehicles.list_by_owner(owner_id))
            .await
    }

    /// # Errors
    ///
    /// `NotFound` if the vehicle does not exist.
    pub async fn set_vehicle_active(
        &self,
        ctx: &CallContext,
        id: Uuid,
        active: bool,
    ) -> Result<Vehicle, DomainError> {
        let vehicle = self
            .deadlines
            .store(ctx, "update vehicle", self.vehicles.set_active(id, active))
            .await?
            .ok_or_else(|| DomainError::not_found("vehicle", id))?;
        info!(vehicle_id = %id, active, "Vehicle active flag changed");
        Ok(vehicle)
    }
}

/// Entitlement issuance, revocation and vehicle coverage.
pub struct EntitlementService {
    entitlements: Arc<dyn EntitlementRepository>,
    identities: Arc<dyn IdentityRepository>,
    vehicles: Arc<dyn VehicleRepository>,
    clock: Arc<dyn Clock>,
    deadlines: Deadlines,
}

impl EntitlementService {
    #[must_use]
    pub fn new(
        entitlements: Arc<dyn EntitlementRepository>,
        identities: Arc<dyn IdentityRepository>,
        vehicles: Arc<dyn VehicleRepository>,
        clock: Arc<dyn Clock>,
        deadlines: Deadlines,
    ) -> Self {
        Self {
            entitlements,
            identities,
            vehicles,
            clock,
            deadlines,
        }
    }

    /// Issues an entitlement for an active identity over vehicles it owns.
    ///
    /// # Errors
    ///
    /// `InvalidEntitlement` for inconsistent bounds, `NotFound` for unknown
    /// identity or vehicles, `Validation` for inactive or foreign vehicles.
    #[tracing::instrument(skip_all, fields(identity_id = %new.identity_id, kind = %new.kind))]
    pub async fn create(
        &self,
        ctx: &CallContext,
        new: NewEntitlement,
    ) -> Result<Entitlement, DomainError> {
        entitlement::validate_new(&new)?;

        let identity = self
            .deadlines
            .store(ctx, "find identity", self.identities.find_by_id(new.identity_id))
            .await?
            .ok_or_else(|| DomainError::not_found("identity", new.identity_id))?;
        if !identity.active {
            return Err(DomainError::validation("identity_id", "identity is inactive"));
        }

        for vehicle_id in &new.vehicle_ids {
            let vehicle = self.find_vehicle(ctx, *vehicle_id).await?;
            ensure_covers(&vehicle, identity.id)?;
        }

        let issued = entitlement::issue(&new, self.clock.now());
        let issued = self
            .deadlines
            .store(
                ctx,
                "insert entitlement",
                self.entitlements.insert(issued, &new.vehicle_ids),
            )
            .await?;
        info!(entitlement_id = %issued.id, vehicles = new.vehicle_ids.len(), "Entitlement issued");
        Ok(issued)
    }

    /// # Errors
    ///
    /// `NotFound` if the entitlement does not exist.
    pub async fn get(&self, ctx: &CallContext, id: Uuid) -> Result<Entitlement, DomainError> {
        self.deadlines
            .store(ctx, "find entitlement", self.entitlements.find_by_id(id))
            .await?
            .ok_or_else(|| DomainError::not_found("entitlement", id))
    }

    /// Vehicles covered by an entitlement.
    ///
    /// # Errors
    ///
    /// `NotFound` if the entitlement does not exist.
    pub async fn vehicle_ids(&self, ctx: &CallContext, id: Uuid) -> Result<Vec<Uuid>, DomainError> {
        self.get(ctx, id).await?;
        self.deadlines
            .store(ctx, "list entitlement vehicles", self.entitlements.list_vehicle_ids(id))
            .await
    }

    /// Entitlements of an identity, newest first.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub async fn list_by_identity(
        &self,
        ctx: &CallContext,
        identity_id: Uuid,
    ) -> Result<Vec<Entitlement>, DomainError> {
        self.deadlines
            .store(
                ctx,
                "list entitlements",
                self.entitlements.list_by_identity(identity_id),
            )
            .await
    }

    /// One-way revocation.
    ///
    /// # Errors
    ///
    /// `AlreadyRevoked` when the entitlement is already inactive, `NotFound`
    /// when it does not exist.
    #[tracing::instrument(skip_all, fields(entitlement_id = %id))]
    pub async fn revoke(
        &self,
        ctx: &CallContext,
        id: Uuid,
        revoked_by: Uuid,
        reason: &str,
    ) -> Result<Entitlement, DomainError> {
        let revocation = entitlement::revocation(revoked_by, reason, self.clock.now())?;
        match self
            .deadlines
            .store(ctx, "revoke entitlement", self.entitlements.revoke(id, revocation))
            .await?
        {
            RevokeOutcome::Revoked(revoked) => {
                info!(revoked_by = %revoked_by, "Entitlement revoked");
                Ok(revoked)
            }
            RevokeOutcome::AlreadyRevoked => Err(DomainError::AlreadyRevoked { id }),
            RevokeOutcome::NotFound => Err(DomainError::not_found("entitlement", id)),
        }
    }

    /// Extends an entitlement to another vehicle of the same owner.
    ///
    /// # Errors
    ///
    /// `Conflict` if the entitlement is revoked or the link exists;
    /// `NotFound`/`Validation` for the vehicle.
    pub async fn add_vehicle(
        &self,
        ctx: &CallContext,
        id: Uuid,
        vehicle_id: Uuid,
    ) -> Result<(), DomainError> {
        let current = self.get(ctx, id).await?;
        if current.revocation.is_some() {
            return Err(DomainError::conflict(format!(
                "entitlement {id} is revoked"
            )));
        }
        let vehicle = self.find_vehicle(ctx, vehicle_id).await?;
        ensure_covers(&vehicle, current.identity_id)?;

        let added = self
            .deadlines
            .store(
                ctx,
                "link entitlement vehicle",
                self.entitlements.add_vehicle(id, vehicle_id),
            )
            .await?;
        if !added {
            return Err(DomainError::conflict(format!(
                "vehicle {vehicle_id} is already covered by entitlement {id}"
            )));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `NotFound` if the link does not exist.
    pub async fn remove_vehicle(
        &self,
        ctx: &CallContext,
        id: Uuid,
        vehicle_id: Uuid,
    ) -> Result<(), DomainError> {
        let removed = self
            .deadlines
            .store(
                ctx,
                "unlink entitlement vehicle",
                self.entitlements.remove_vehicle(id, vehicle_id),
            )
            .await?;
        if removed {
            Ok(())
        } else {
            Err(DomainError::not_found(
                "entitlement vehicle link",
                format!("{id}/{vehicle_id}"),
            ))
        }
    }

    /// Active temporary entitlements past their `valid_until`.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub async fn list_expired_temporary(
        &self,
        ctx: &CallContext,
    ) -> Result<Vec<Entitlement>, DomainError> {
        let now = self.clock.now();
        self.deadlines
            .store(
                ctx,
                "list expired entitlements",
                self.entitlements.list_expired_temporary(now),
            )
            .await
    }

    async fn find_vehicle(&self, ctx: &CallContext, id: Uuid) -> Result<Vehicle, DomainError> {
        self.deadlines
            .store(ctx, "find vehicle", self.vehicles.find_by_id(id))
            .await?
            .ok_or_else(|| DomainError::not_found("vehicle", id))
    }
}

fn ensure_covers(vehicle: &Vehicle, identity_id: Uuid) -> Result<(), DomainError> {
    if vehicle.owner_id != identity_id {
        return Err(DomainError::validation(
            "vehicle_ids",
            format!("vehicle {} is not owned by identity {identity_id}", vehicle.id),
        ));
    }
    if !vehicle.active {
        return Err(DomainError::validation(
            "vehicle_ids",
            format!("vehicle {} is inactive", vehicle.id),
        ));
    }
    Ok(())
}
