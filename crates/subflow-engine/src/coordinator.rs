//! # Lifecycle Coordinator
//!
//! Runs one logical subscription update end to end:
//!
//! ```text
//! attribute check ─▶ diff ─▶ field authorizer ─▶ transition authorizer ─▶ commit ─▶ event ─▶ notifier
//!                                                 (only if state changed)
//! ```
//!
//! Authorization is evaluated against the `old` snapshot's state and the
//! commit is conditional on `old.version`, so a decision is never applied
//! to a record that moved underneath it. Nothing is written until both
//! authorizers pass, and the notifier only sees events for acknowledged
//! commits.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use subflow_core::{ActorId, Role, SubscriptionId, Timestamp};
use subflow_state::{
    attribute_changes, authorize_attributes, authorize_fields, authorize_transition, changes, diff,
    ChangeSet, PolicyError, StateChange, StateName, StateRegistry, Subscription,
};
use tracing::Instrument;

use crate::config::EngineConfig;
use crate::error::ApplyError;
use crate::event::ChangeEvent;
use crate::links::LinkBuilder;
use crate::notifier::Notifier;
use crate::store::SubscriptionStore;

/// The authenticated actor performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: ActorId, role: Role) -> Self {
        Self { id, role }
    }
}

/// Result of evaluating an update without committing it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedUpdate {
    /// Snapshot to commit: governed fields and state from the proposal,
    /// identity and stamps owned by the coordinator.
    pub next: Subscription,
    /// What the update changes.
    pub changes: ChangeSet,
    /// Version of the snapshot the decision was made against.
    pub expected_version: u64,
}

impl PreparedUpdate {
    /// Whether committing would change nothing.
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// What happened to the change event after a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Delivered,
    /// Notifications are switched off in configuration.
    Disabled,
    /// The notifier failed. The commit stands.
    Failed { reason: String },
}

/// A committed update.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedUpdate {
    /// The stored snapshot, with its new version.
    pub subscription: Subscription,
    pub event: ChangeEvent,
    pub notification: NotificationOutcome,
}

/// Outcome of [`LifecycleCoordinator::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The proposal equals the current snapshot; nothing was written.
    Unchanged(Subscription),
    Committed(Box<AppliedUpdate>),
}

impl ApplyOutcome {
    /// The subscription as it stands after the operation.
    pub fn subscription(&self) -> &Subscription {
        match self {
            Self::Unchanged(sub) => sub,
            Self::Committed(applied) => &applied.subscription,
        }
    }

    pub fn event(&self) -> Option<&ChangeEvent> {
        match self {
            Self::Unchanged(_) => None,
            Self::Committed(applied) => Some(&applied.event),
        }
    }

    pub fn committed(self) -> Option<AppliedUpdate> {
        match self {
            Self::Unchanged(_) => None,
            Self::Committed(applied) => Some(*applied),
        }
    }
}

/// Orchestrates authorization, commit, and notification of subscription
/// updates.
#[derive(Debug)]
pub struct LifecycleCoordinator<S, N> {
    registry: Arc<StateRegistry>,
    store: S,
    notifier: N,
    links: LinkBuilder,
    config: EngineConfig,
}

impl<S: SubscriptionStore, N: Notifier> LifecycleCoordinator<S, N> {
    /// Create a coordinator over the process-wide standard registry.
    pub fn new(store: S, notifier: N, config: EngineConfig) -> Self {
        Self {
            registry: StateRegistry::shared(),
            store,
            notifier,
            links: LinkBuilder::new(config.portal_url.clone()),
            config,
        }
    }

    /// Replace the policy registry.
    pub fn with_registry(mut self, registry: Arc<StateRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Authorize the update from `old` to `new` and compute the snapshot
    /// that would be committed. Pure; touches neither store nor notifier.
    pub fn evaluate(
        &self,
        actor: &Actor,
        old: &Subscription,
        new: &Subscription,
    ) -> Result<PreparedUpdate, PolicyError> {
        let role = actor.role;

        let attributes = attribute_changes(old, new);
        authorize_attributes(role, &attributes)?;

        let changed = diff(old, new);
        authorize_fields(&self.registry, role, old.state, &changed)?;

        let state = if old.state != new.state {
            authorize_transition(&self.registry, role, old.state, new.state)?;
            Some(StateChange {
                from: old.state,
                to: new.state,
            })
        } else {
            None
        };

        let changes = ChangeSet {
            fields: changes(old, new),
            state,
            attributes: attributes.into_iter().collect(),
        };

        let mut next = old.clone();
        for field in &changed {
            next.copy_field_from(new, *field);
        }
        next.state = new.state;
        // Differences here were either rejected above or are admin-writable.
        next.distributor.clone_from(&new.distributor);
        next.extra.clone_from(&new.extra);

        if !changes.is_empty() {
            let now = Timestamp::now();
            next.editor = Some(actor.id.clone());
            next.edited_at = Some(now);
            if state.is_some() {
                next.mover = Some(actor.id.clone());
                next.moved_at = Some(now);
            }
        }

        Ok(PreparedUpdate {
            next,
            changes,
            expected_version: old.version,
        })
    }

    /// Authorize and commit the update from `old` to `new`, then hand the
    /// change event to the notifier.
    ///
    /// `old` must be the snapshot the caller read from the store; the commit
    /// fails with [`ApplyError::ConcurrentModification`] if the stored
    /// version has moved since.
    pub async fn apply(
        &self,
        actor: &Actor,
        old: &Subscription,
        new: &Subscription,
    ) -> Result<ApplyOutcome, ApplyError> {
        let span = tracing::info_span!(
            "apply",
            subscription = %old.id,
            actor = %actor.id,
            role = %actor.role,
            state = %old.state,
        );
        self.apply_inner(actor, old, new).instrument(span).await
    }

    async fn apply_inner(
        &self,
        actor: &Actor,
        old: &Subscription,
        new: &Subscription,
    ) -> Result<ApplyOutcome, ApplyError> {
        let prepared = match self.evaluate(actor, old, new) {
            Ok(prepared) => prepared,
            Err(err) => {
                if err.is_defect() {
                    tracing::error!(error = %err, "lifecycle registry is inconsistent");
                } else {
                    tracing::warn!(error = %err, "subscription update rejected");
                }
                metrics::counter!("subflow_apply_total", "outcome" => "rejected").increment(1);
                return Err(err.into());
            }
        };

        if prepared.is_noop() {
            tracing::debug!("subscription update changes nothing");
            metrics::counter!("subflow_apply_total", "outcome" => "unchanged").increment(1);
            return Ok(ApplyOutcome::Unchanged(old.clone()));
        }

        let stored = match self
            .store
            .commit(prepared.expected_version, prepared.next)
            .await
        {
            Ok(stored) => stored,
            Err(err) => {
                let err = ApplyError::from(err);
                if err.is_retryable() {
                    tracing::warn!(error = %err, "subscription changed since it was read");
                    metrics::counter!("subflow_apply_total", "outcome" => "conflict").increment(1);
                } else {
                    tracing::error!(error = %err, "subscription commit failed");
                    metrics::counter!("subflow_apply_total", "outcome" => "store_error")
                        .increment(1);
                }
                return Err(err);
            }
        };

        metrics::counter!("subflow_apply_total", "outcome" => "committed").increment(1);
        if let Some(StateChange { from, to }) = prepared.changes.state {
            tracing::info!(%from, %to, version = stored.version, "subscription moved");
            metrics::counter!(
                "subflow_transition_total",
                "from" => from.as_str(),
                "to" => to.as_str()
            )
            .increment(1);
        } else {
            tracing::info!(version = stored.version, "subscription updated");
        }

        let event = ChangeEvent::build(&self.links, old, &stored, prepared.changes);
        let notification = self.dispatch(&event).await;

        Ok(ApplyOutcome::Committed(Box::new(AppliedUpdate {
            subscription: stored,
            event,
            notification,
        })))
    }

    /// Load `id`, apply `edit` to the fresh snapshot, and commit, retrying
    /// from a fresh read when another writer got there first.
    ///
    /// Each attempt re-runs the whole authorization against the state it
    /// read; no decision from a lost attempt is reused.
    pub async fn update<F>(
        &self,
        actor: &Actor,
        id: SubscriptionId,
        mut edit: F,
    ) -> Result<ApplyOutcome, ApplyError>
    where
        F: FnMut(&Subscription) -> Subscription + Send,
    {
        let attempts = self.config.max_commit_attempts.max(1);
        for attempt in 1..=attempts {
            let current = self.store.load(id).await?;
            let proposed = edit(&current);
            match self.apply(actor, &current, &proposed).await {
                Err(err) if err.is_retryable() => {
                    tracing::debug!(attempt, attempts, subscription = %id, "retrying after concurrent modification");
                }
                other => return other,
            }
        }
        Err(ApplyError::RetriesExhausted { id, attempts })
    }

    /// Store a new subscription drafted by `actor`.
    ///
    /// Only partners and admins create subscriptions, and only in `New`.
    /// Governed fields filled in on the draft must be writable by the
    /// creator in `New`; a distributor or `extra` attributes may only be set
    /// by an admin.
    pub async fn create(
        &self,
        actor: &Actor,
        draft: Subscription,
    ) -> Result<Subscription, ApplyError> {
        if !matches!(actor.role, Role::Partner | Role::Admin) {
            tracing::warn!(actor = %actor.id, role = %actor.role, "subscription creation rejected");
            return Err(ApplyError::CreationForbidden { role: actor.role });
        }
        if draft.state != StateName::New {
            return Err(ApplyError::InvalidInitialState { state: draft.state });
        }

        // Everything on the draft beyond an empty record is a write by the creator.
        let mut blank = Subscription::draft(draft.partner.clone(), "");
        blank.id = draft.id;
        blank.creator = draft.creator.clone();
        blank.created_at = draft.created_at;
        authorize_attributes(actor.role, &attribute_changes(&blank, &draft))?;
        authorize_fields(
            &self.registry,
            actor.role,
            StateName::New,
            &diff(&blank, &draft),
        )?;

        let mut record = draft;
        record.normalize();
        record.creator = actor.id.clone();
        record.created_at = Timestamp::now();
        record.mover = None;
        record.moved_at = None;
        record.editor = None;
        record.edited_at = None;

        let stored = self.store.insert(record).await?;
        tracing::info!(subscription = %stored.id, partner = %stored.partner, "subscription created");
        metrics::counter!("subflow_create_total").increment(1);
        Ok(stored)
    }

    async fn dispatch(&self, event: &ChangeEvent) -> NotificationOutcome {
        if !self.config.notifications_enabled {
            return NotificationOutcome::Disabled;
        }
        match self.notifier.notify(event).await {
            Ok(()) => NotificationOutcome::Delivered,
            Err(err) => {
                tracing::warn!(event_id = %event.event_id, error = %err, "change notification failed");
                metrics::counter!("subflow_notification_failures_total").increment(1);
                NotificationOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
