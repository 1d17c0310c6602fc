//! Entitlement validity rules.
//!
//! Pure functions: no I/O, "now" is always passed in.

use chrono::{DateTime, Utc};
use gate_access_sdk::{Entitlement, EntitlementKind, NewEntitlement, Revocation};
use uuid::Uuid;

use super::error::DomainError;

/// Whether `entitlement` permits access at `now`.
///
/// The window is `[valid_from, valid_until)`: a temporary entitlement whose
/// `valid_until` equals `now` is already expired. Permanent entitlements
/// ignore `valid_until`.
#[must_use]
pub fn is_honorable(entitlement: &Entitlement, now: DateTime<Utc>) -> bool {
    if !entitlement.active || now < entitlement.valid_from {
        return false;
    }
    match (entitlement.kind, entitlement.valid_until) {
        (EntitlementKind::Temporary, Some(valid_until)) => now < valid_until,
        _ => true,
    }
}

/// First honorable entitlement in input order.
///
/// Callers pass entitlements newest first, so the most recently issued one
/// wins when several are honorable.
#[must_use]
pub fn first_honorable(entitlements: &[Entitlement], now: DateTime<Utc>) -> Option<&Entitlement> {
    entitlements.iter().find(|e| is_honorable(e, now))
}

/// Temporary past its window at `now`.
#[must_use]
pub fn is_expired_temporary(entitlement: &Entitlement, now: DateTime<Utc>) -> bool {
    entitlement.kind == EntitlementKind::Temporary
        && entitlement
            .valid_until
            .is_some_and(|valid_until| valid_until <= now)
}

/// Checks temporal bounds and vehicle coverage of a new entitlement.
///
/// # Errors
///
/// `InvalidEntitlement` when a temporary entitlement lacks a `valid_until`
/// strictly after `valid_from`, a permanent one carries a `valid_until`, or
/// the vehicle list is empty or has duplicates.
pub fn validate_new(new: &NewEntitlement) -> Result<(), DomainError> {
    match (new.kind, new.valid_until) {
        (EntitlementKind::Temporary, None) => {
            return Err(DomainError::invalid_entitlement(
                "temporary entitlement requires valid_until",
            ));
        }
        (EntitlementKind::Temporary, Some(valid_until)) if valid_until <= new.valid_from => {
            return Err(DomainError::invalid_entitlement(
                "valid_until must be after valid_from",
            ));
        }
        (EntitlementKind::Permanent, Some(_)) => {
            return Err(DomainError::invalid_entitlement(
                "permanent entitlement must not have valid_until",
            ));
        }
        _ => {}
    }

    if new.vehicle_ids.is_empty() {
        return Err(DomainError::invalid_entitlement(
            "at least one vehicle is required",
        ));
    }
    let mut seen = std::collections::HashSet::with_capacity(new.vehicle_ids.len());
    if let Some(dup) = new.vehicle_ids.iter().find(|id| !seen.insert(**id)) {
        return Err(DomainError::invalid_entitlement(format!(
            "vehicle {dup} listed more than once"
        )));
    }
    Ok(())
}

/// Materializes a validated [`NewEntitlement`]. Links are stored separately.
#[must_use]
pub fn issue(new: &NewEntitlement, now: DateTime<Utc>) -> Entitlement {
    Entitlement {
        id: Uuid::new_v4(),
        identity_id: new.identity_id,
        kind: new.kind,
        valid_from: new.valid_from,
        valid_until: new.valid_until,
        active: true,
        revocation: None,
        created_at: now,
    }
}

/// Builds the revocation record.
///
/// # Errors
///
/// `Validation` when the reason is blank or the revoker is nil.
pub fn revocation(
    revoked_by: Uuid,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Revocation, DomainError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(DomainError::validation("reason", "must not be empty"));
    }
    if revoked_by.is_nil() {
        return Err(DomainError::validation("revoked_by", "must be set"));
    }
    Ok(Revocation {
        revoked_at: now,
        revoked_by,
        reason: reason.to_owned(),
    })
}

/// Applies a revocation: inactive and revocation record set together.
pub fn apply_revocation(entitlement: &mut Entitlement, revocation: Revocation) {
    entitlement.active = false;
    entitlement.revocation = Some(revocation);
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn temporary(from: i64, until: i64) -> Entitlement {
        Entitlement {
            id: Uuid::new_v4(),
            identity_id: Uuid::new_v4(),
            kind: EntitlementKind::Temporary,
            valid_from: at(from),
            valid_until: Some(at(until)),
            active: true,
            revocation: None,
            created_at: at(from),
        }
    }

    fn permanent(from: i64) -> Entitlement {
        Entitlement {
            kind: EntitlementKind::Permanent,
            valid_until: None,
            ..temporary(from, from + 1)
        }
    }

    #[test]
    fn temporary_window_is_half_open() {
        let e = temporary(0, 100);
        assert!(!is_honorable(&e, at(-1)));
        assert!(is_honorable(&e, at(0)));
        assert!(is_honorable(&e, at(99)));
        assert!(!is_honorable(&e, at(100)), "valid_until == now is expired");
        assert!(!is_honorable(&e, at(101)));
    }

    #[test]
    fn permanent_is_honorable_indefinitely_once_started() {
        let e = permanent(0);
        assert!(!is_honorable(&e, at(-1)));
        assert!(is_honorable(&e, at(0)));
        assert!(is_honorable(&e, at(0) + TimeDelta::days(365 * 50)));
    }

    #[test]
    fn inactive_is_never_honorable() {
        let mut e = permanent(0);
        apply_revocation(
            &mut e,
            revocation(Uuid::new_v4(), "lost card", at(1)).unwrap(),
        );
        assert!(!e.active);
        assert!(e.revocation.is_some());
        assert!(!is_honorable(&e, at(5)));
    }

    #[test]
    fn first_honorable_prefers_input_order() {
        let expired = temporary(0, 10);
        let newer = permanent(5);
        let older = permanent(1);
        let list = vec![expired, newer.clone(), older];
        assert_eq!(first_honorable(&list, at(20)).map(|e| e.id), Some(newer.id));
    }

    #[test]
    fn first_honorable_none_when_all_expired() {
        let list = vec![temporary(0, 10), temporary(0, 20)];
        assert!(first_honorable(&list, at(20)).is_none());
        assert!(first_honorable(&[], at(20)).is_none());
    }

    fn new_entitlement(kind: EntitlementKind, until: Option<i64>) -> NewEntitlement {
        NewEntitlement {
            identity_id: Uuid::new_v4(),
            kind,
            valid_from: at(0),
            valid_until: until.map(at),
            vehicle_ids: vec![Uuid::new_v4()],
        }
    }

    #[test]
    fn validate_temporal_bounds() {
        assert!(validate_new(&new_entitlement(EntitlementKind::Temporary, Some(1))).is_ok());
        assert!(validate_new(&new_entitlement(EntitlementKind::Temporary, Some(0))).is_err());
        assert!(validate_new(&new_entitlement(EntitlementKind::Temporary, None)).is_err());
        assert!(validate_new(&new_entitlement(EntitlementKind::Permanent, None)).is_ok());
        assert!(validate_new(&new_entitlement(EntitlementKind::Permanent, Some(10))).is_err());
    }

    #[test]
    fn validate_vehicle_list() {
        let mut new = new_entitlement(EntitlementKind::Permanent, None);
        new.vehicle_ids.clear();
        assert!(validate_new(&new).is_err());

        let id = Uuid::new_v4();
        new.vehicle_ids = vec![id, id];
        assert!(validate_new(&new).is_err());
    }

    #[test]
    fn expired_temporary_detection() {
        assert!(is_expired_temporary(&temporary(0, 10), at(10)));
        assert!(!is_expired_temporary(&temporary(0, 10), at(9)));
        assert!(!is_expired_temporary(&permanent(0), at(1_000_000)));
    }

    #[test]
    fn revocation_requires_reason() {
        assert!(revocation(Uuid::new_v4(), "  ", at(0)).is_err());
        assert!(revocation(Uuid::nil(), "stolen", at(0)).is_err());
    }
}
