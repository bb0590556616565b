//! # subflow-engine: Subscription Lifecycle Coordinator
//!
//! Turns the pure policy decisions of `subflow-state` into committed
//! updates.
//!
//! ## Flow
//!
//! A caller reads a subscription from a [`SubscriptionStore`], edits a copy,
//! and hands both snapshots to [`LifecycleCoordinator::apply`]. The
//! coordinator authorizes attributes, fields, and the state change against
//! the snapshot it was given, commits conditionally on that snapshot's
//! version, and passes a [`ChangeEvent`] to the [`Notifier`].
//!
//! [`LifecycleCoordinator::update`] wraps the read/edit/apply loop and
//! retries on concurrent modification.
//!
//! ## Crate Policy
//!
//! - Storage and notification are traits so deployments can plug in a
//!   database and a mailer; [`InMemoryStore`] and [`LogNotifier`] cover
//!   tests and local runs.
//! - A notifier failure never rolls back a commit.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod links;
pub mod notifier;
pub mod store;

pub use config::{ConfigError, EngineConfig};
pub use coordinator::{
    Actor, AppliedUpdate, ApplyOutcome, LifecycleCoordinator, NotificationOutcome, PreparedUpdate,
};
pub use error::ApplyError;
pub use event::{ChangeEvent, Delta, Link};
pub use links::LinkBuilder;
pub use notifier::{ChannelNotifier, LogNotifier, NotifyError, Notifier};
pub use store::{InMemoryStore, StoreError, SubscriptionStore};
