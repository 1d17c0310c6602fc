//! Allow-list and deny-list service with a read-through, write-invalidate cache.
//!
//! Cache values carry membership and reason in a single string so one read
//! yields both: `"0:"` is a confirmed absence, `"1:<reason>"` a confirmed
//! presence. Keys are `{namespace}:{identifier}`.
//!
//! Cache failures never change an answer, they only cost a store round trip.
//! Store failures on a miss are returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gate_access_sdk::{
    CallContext, ListEntry, ListEntryPatch, ListKind, ListParams, NewListEntry, VehicleIdentifier,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::deadline::Deadlines;
use super::error::DomainError;
use super::ports::{Clock, KeyValueCache};
use super::repo::PriorityListRepository;

const MAX_REASON_LEN: usize = 500;

/// Cached answer for one identifier on one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    Absent,
    Present { reason: String },
}

impl Membership {
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Absent => "0:".to_owned(),
            Self::Present { reason } => format!("1:{reason}"),
        }
    }

    /// `None` for values this service did not write.
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        if let Some(reason) = raw.strip_prefix("1:") {
            Some(Self::Present {
                reason: reason.to_owned(),
            })
        } else if raw == "0:" {
            Some(Self::Absent)
        } else {
            None
        }
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Absent => None,
            Self::Present { reason } => Some(reason),
        }
    }
}

#[must_use]
pub fn cache_key(kind: ListKind, identifier: &VehicleIdentifier) -> String {
    format!("{}:{identifier}", kind.namespace())
}

fn namespace_prefix(kind: ListKind) -> String {
    format!("{}:", kind.namespace())
}

/// Allow-list / deny-list lookups and administration.
///
/// All writes to list entries go through here so the matching cache key is
/// always invalidated.
pub struct PriorityListService {
    repo: Arc<dyn PriorityListRepository>,
    cache: Arc<dyn KeyValueCache>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    deadlines: Deadlines,
}

impl PriorityListService {
    #[must_use]
    pub fn new(
        repo: Arc<dyn PriorityListRepository>,
        cache: Arc<dyn KeyValueCache>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        deadlines: Deadlines,
    ) -> Self {
        Self {
            repo,
            cache,
            clock,
            ttl,
            deadlines,
        }
    }

    /// Membership of `identifier` in the `kind` list.
    ///
    /// # Errors
    ///
    /// Store failure, timeout or cancellation on a cache miss. Cache failures
    /// are logged and fall through to the store.
    #[tracing::instrument(skip_all, fields(list = %kind, identifier = %identifier))]
    pub async fn check(
        &self,
        ctx: &CallContext,
        kind: ListKind,
        identifier: &VehicleIdentifier,
    ) -> Result<Membership, DomainError> {
        let key = cache_key(kind, identifier);

        match self
            .deadlines
            .cache(ctx, "cache get", self.cache.get(&key))
            .await?
        {
            Ok(Some(raw)) => {
                if let Some(membership) = Membership::decode(&raw) {
                    debug!(key = %key, "Priority list cache hit");
                    return Ok(membership);
                }
                warn!(key = %key, "Discarding undecodable priority list cache value");
            }
            Ok(None) => debug!(key = %key, "Priority list cache miss"),
            Err(e) => warn!(key = %key, error = %e, "Priority list cache unavailable, reading store"),
        }

        let now = self.clock.now();
        let entry = self
            .deadlines
            .store(
                ctx,
                "find list entry",
                self.repo.find_effective(kind, identifier, now),
            )
            .await?;

        let (membership, ttl) = match entry {
            Some(entry) => {
                let ttl = self.ttl_until(entry.expires_at, now);
                (
                    Membership::Present {
                        reason: entry.reason,
                    },
                    ttl,
                )
            }
            None => (Membership::Absent, Some(self.ttl)),
        };

        if let Some(ttl) = ttl {
            self.populate(ctx, &key, &membership, ttl).await;
        }
        Ok(membership)
    }

    /// Cache lifetime for an answer backed by an entry expiring at `expires_at`.
    fn ttl_until(&self, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Duration> {
        match expires_at {
            None => Some(self.ttl),
            Some(expires_at) => (expires_at - now)
                .to_std()
                .ok()
                .filter(|left| !left.is_zero())
                .map(|left| left.min(self.ttl)),
        }
    }

    async fn populate(&self, ctx: &CallContext, key: &str, membership: &Membership, ttl: Duration) {
        match self
            .deadlines
            .cache(ctx, "cache set", self.cache.set(key, membership.encode(), ttl))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(key = %key, error = %e, "Failed to populate priority list cache"),
            Err(e) => debug!(key = %key, error = %e, "Priority list cache populate abandoned"),
        }
    }

    async fn invalidate(&self, ctx: &CallContext, kind: ListKind, identifier: &VehicleIdentifier) {
        let key = cache_key(kind, identifier);
        match self
            .deadlines
            .cache(ctx, "cache delete", self.cache.delete(&key))
            .await
        {
            Ok(Ok(())) => debug!(key = %key, "Invalidated priority list cache key"),
            Ok(Err(e)) => warn!(
                key = %key,
                error = %e,
                "Failed to invalidate priority list cache key, stale until TTL"
            ),
            Err(e) => warn!(key = %key, error = %e, "Priority list cache invalidation abandoned"),
        }
    }

    /// Drops every cached answer for `kind`, including identifiers never written here.
    async fn invalidate_namespace(&self, ctx: &CallContext, kind: ListKind) {
        let prefix = namespace_prefix(kind);
        let keys = match self
            .deadlines
            .cache(ctx, "cache scan", self.cache.scan_prefix(&prefix))
            .await
        {
            Ok(Ok(keys)) => keys,
            Ok(Err(e)) => {
                error!(prefix = %prefix, error = %e, "Failed to scan priority list cache namespace");
                return;
            }
            Err(e) => {
                error!(prefix = %prefix, error = %e, "Priority list namespace invalidation abandoned");
                return;
            }
        };

        let mut failed = 0usize;
        for key in &keys {
            if !matches!(
                self.deadlines
                    .cache(ctx, "cache delete", self.cache.delete(key))
                    .await,
                Ok(Ok(()))
            ) {
                failed += 1;
            }
        }
        if failed > 0 {
            error!(
                prefix = %prefix,
                failed,
                total = keys.len(),
                "Some priority list cache keys could not be invalidated"
            );
        } else {
            debug!(prefix = %prefix, total = keys.len(), "Invalidated priority list namespace");
        }
    }

    /// # Errors
    ///
    /// Validation errors for malformed input, store errors otherwise.
    #[tracing::instrument(skip_all, fields(list = %kind))]
    pub async fn create(
        &self,
        ctx: &CallContext,
        kind: ListKind,
        new: NewListEntry,
    ) -> Result<ListEntry, DomainError> {
        let now = self.clock.now();
        let identifier = VehicleIdentifier::parse(&new.identifier)?;
        let reason = validate_reason(&new.reason)?;
        if new.created_by.is_nil() {
            return Err(DomainError::validation("created_by", "must be set"));
        }
        validate_expiry(new.expires_at, now)?;

        let entry = ListEntry {
            id: Uuid::new_v4(),
            kind,
            identifier,
            reason,
            created_by: new.created_by,
            created_at: now,
            expires_at: new.expires_at,
            active: true,
        };
        let entry = self
            .deadlines
            .store(ctx, "insert list entry", self.repo.insert(entry))
            .await?;
        self.invalidate(ctx, kind, &entry.identifier).await;

        info!(id = %entry.id, identifier = %entry.identifier, "List entry created");
        Ok(entry)
    }

    /// # Errors
    ///
    /// `NotFound` if the entry does not exist; validation and store errors.
    #[tracing::instrument(skip_all, fields(list = %kind, id = %id))]
    pub async fn update(
        &self,
        ctx: &CallContext,
        kind: ListKind,
        id: Uuid,
        patch: ListEntryPatch,
    ) -> Result<ListEntry, DomainError> {
        let now = self.clock.now();
        let current = self.get(ctx, kind, id).await?;

        let mut updated = current.clone();
        if let Some(raw) = patch.identifier.as_deref() {
            updated.identifier = VehicleIdentifier::parse(raw)?;
        }
        if let Some(reason) = patch.reason.as_deref() {
            updated.reason = validate_reason(reason)?;
        }
        if let Some(expires_at) = patch.expires_at {
            validate_expiry(expires_at, now)?;
            updated.expires_at = expires_at;
        }
        if let Some(active) = patch.active {
            updated.active = active;
        }

        let updated = self
            .deadlines
            .store(ctx, "update list entry", self.repo.update(updated))
            .await?
            .ok_or_else(|| DomainError::not_found(entity_name(kind), id))?;

        self.invalidate(ctx, kind, &current.identifier).await;
        if updated.identifier != current.identifier {
            self.invalidate(ctx, kind, &updated.identifier).await;
        }

        info!(identifier = %updated.identifier, "List entry updated");
        Ok(updated)
    }

    /// # Errors
    ///
    /// `NotFound` if the entry does not exist.
    pub async fn get(
        &self,
        ctx: &CallContext,
        kind: ListKind,
        id: Uuid,
    ) -> Result<ListEntry, DomainError> {
        self.deadlines
            .store(ctx, "find list entry", self.repo.find_by_id(kind, id))
            .await?
            .ok_or_else(|| DomainError::not_found(entity_name(kind), id))
    }

    /// # Errors
    ///
    /// Store errors.
    pub async fn list(
        &self,
        ctx: &CallContext,
        kind: ListKind,
        params: ListParams,
    ) -> Result<Vec<ListEntry>, DomainError> {
        self.deadlines
            .store(ctx, "list entries", self.repo.list(kind, params))
            .await
    }

    /// Deletes by id. The store returns the removed row, so the exact cache
    /// key is invalidated with no staleness window.
    ///
    /// # Errors
    ///
    /// `NotFound` if the entry does not exist.
    #[tracing::instrument(skip_all, fields(list = %kind, id = %id))]
    pub async fn delete(
        &self,
        ctx: &CallContext,
        kind: ListKind,
        id: Uuid,
    ) -> Result<ListEntry, DomainError> {
        let removed = self
            .deadlines
            .store(ctx, "delete list entry", self.repo.delete(kind, id))
            .await?
            .ok_or_else(|| DomainError::not_found(entity_name(kind), id))?;
        self.invalidate(ctx, kind, &removed.identifier).await;

        info!(identifier = %removed.identifier, "List entry deleted");
        Ok(removed)
    }

    /// Removes expired entries and drops the whole cache namespace.
    ///
    /// # Errors
    ///
    /// Store errors. Cache failures are logged; the count is still returned.
    #[tracing::instrument(skip_all, fields(list = %kind))]
    pub async fn sweep_expired(&self, ctx: &CallContext, kind: ListKind) -> Result<u64, DomainError> {
        let now = self.clock.now();
        let removed = self
            .deadlines
            .store(ctx, "delete expired entries", self.repo.delete_expired(kind, now))
            .await?;
        self.invalidate_namespace(ctx, kind).await;

        info!(removed, "Swept expired list entries");
        Ok(removed)
    }
}

fn entity_name(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Allow => "allow-list entry",
        ListKind::Deny => "deny-list entry",
    }
}

fn validate_reason(reason: &str) -> Result<String, DomainError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(DomainError::validation("reason", "must not be empty"));
    }
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(DomainError::validation(
            "reason",
            format!("must be at most {MAX_REASON_LEN} characters"),
        ));
    }
    Ok(reason.to_owned())
}

fn validate_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<(), DomainError> {
    match expires_at {
        Some(expires_at) if expires_at <= now => Err(DomainError::validation(
            "expires_at",
            "must be in the future",
        )),
        _ => Ok(()),
    }
}
