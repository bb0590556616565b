//! # Subscription Store
//!
//! Persistence boundary of the engine. The store owns the optimistic
//! concurrency stamp: `commit` succeeds only when the stored version still
//! equals the version the caller read, and bumps it on success.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use subflow_core::SubscriptionId;
use subflow_state::Subscription;
use thiserror::Error;

/// Errors returned by a [`SubscriptionStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("subscription {id} not found")]
    NotFound { id: SubscriptionId },

    #[error("subscription {id} already exists")]
    AlreadyExists { id: SubscriptionId },

    /// The stored version moved since the snapshot was read.
    #[error("subscription {id} version conflict: expected {expected}, found {actual}")]
    VersionConflict {
        id: SubscriptionId,
        expected: u64,
        actual: u64,
    },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Transactional storage for subscriptions.
///
/// Implementations must be `Send + Sync` so a coordinator can be shared
/// across tasks behind an `Arc`.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Read the current snapshot.
    async fn load(&self, id: SubscriptionId) -> Result<Subscription, StoreError>;

    /// Store a new subscription. The stored record starts at version 1.
    async fn insert(&self, subscription: Subscription) -> Result<Subscription, StoreError>;

    /// Replace the stored snapshot if its version equals `expected_version`.
    ///
    /// Returns the stored record with its new version.
    async fn commit(
        &self,
        expected_version: u64,
        subscription: Subscription,
    ) -> Result<Subscription, StoreError>;
}

#[async_trait]
impl<T: SubscriptionStore + ?Sized> SubscriptionStore for Arc<T> {
    async fn load(&self, id: SubscriptionId) -> Result<Subscription, StoreError> {
        (**self).load(id).await
    }

    async fn insert(&self, subscription: Subscription) -> Result<Subscription, StoreError> {
        (**self).insert(subscription).await
    }

    async fn commit(
        &self,
        expected_version: u64,
        subscription: Subscription,
    ) -> Result<Subscription, StoreError> {
        (**self).commit(expected_version, subscription).await
    }
}

/// In-process store backed by a concurrent map.
///
/// The version check and the write happen under the same shard lock, so
/// two commits against the same version cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: DashMap<SubscriptionId, Subscription>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored subscriptions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    async fn load(&self, id: SubscriptionId) -> Result<Subscription, StoreError> {
        self.records
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound { id })
    }

    async fn insert(&self, mut subscription: Subscription) -> Result<Subscription, StoreError> {
        match self.records.entry(subscription.id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                id: subscription.id,
            }),
            Entry::Vacant(slot) => {
                subscription.version = 1;
                slot.insert(subscription.clone());
                Ok(subscription)
            }
        }
    }

    async fn commit(
        &self,
        expected_version: u64,
        mut subscription: Subscription,
    ) -> Result<Subscription, StoreError> {
        let id = subscription.id;
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or(StoreError::NotFound { id })?;
        let actual = entry.version;
        if actual != expected_version {
            return Err(StoreError::VersionConflict {
                id,
                expected: expected_version,
                actual,
            });
        }
        subscription.version = actual + 1;
        *entry = subscription.clone();
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subflow_core::ActorId;

    fn draft() -> Subscription {
        Subscription::draft(ActorId::new("acme").unwrap(), "acme-waf")
    }

    #[tokio::test]
    async fn insert_starts_at_version_one() {
        let store = InMemoryStore::new();
        let stored = store.insert(draft()).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(store.load(stored.id).await.unwrap(), stored);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = InMemoryStore::new();
        let stored = store.insert(draft()).await.unwrap();
        let err = store.insert(stored.clone()).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists { id: stored.id });
    }

    #[tokio::test]
    async fn commit_bumps_version() {
        let store = InMemoryStore::new();
        let stored = store.insert(draft()).await.unwrap();
        let mut next = stored.clone();
        next.description = "edited".to_string();
        let committed = store.commit(stored.version, next).await.unwrap();
        assert_eq!(committed.version, 2);
        assert_eq!(store.load(stored.id).await.unwrap().description, "edited");
    }

    #[tokio::test]
    async fn stale_commit_is_rejected() {
        let store = InMemoryStore::new();
        let stored = store.insert(draft()).await.unwrap();
        store.commit(stored.version, stored.clone()).await.unwrap();

        let err = store.commit(stored.version, stored.clone()).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionConflict {
                id: stored.id,
                expected: 1,
                actual: 2,
            }
        );
    }

    #[tokio::test]
    async fn missing_subscription_is_not_found() {
        let store = InMemoryStore::new();
        let sub = draft();
        assert_eq!(
            store.load(sub.id).await.unwrap_err(),
            StoreError::NotFound { id: sub.id }
        );
        assert!(store.commit(0, sub).await.is_err());
    }
}
