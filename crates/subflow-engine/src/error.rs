//! # Engine Errors
//!
//! Everything `apply`, `update`, and `create` can return. Policy rejections
//! pass through untouched so callers can render role- and state-specific
//! messages; store failures are translated into lifecycle terms.

use subflow_core::{Role, SubscriptionId};
use subflow_state::{PolicyError, StateName};
use thiserror::Error;

use crate::store::StoreError;

/// Failure of a lifecycle operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// The update was rejected by the lifecycle policy.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The stored version moved between read and commit. Re-read and
    /// re-apply; authorization must be recomputed against the fresh state.
    #[error("subscription {id} was modified concurrently (read version {expected}, stored version {actual})")]
    ConcurrentModification {
        id: SubscriptionId,
        expected: u64,
        actual: u64,
    },

    #[error("subscription {id} not found")]
    NotFound { id: SubscriptionId },

    #[error("subscription {id} already exists")]
    AlreadyExists { id: SubscriptionId },

    /// Only partners (and admins) create subscriptions.
    #[error("role {role} is not allowed to create subscriptions")]
    CreationForbidden { role: Role },

    #[error("new subscriptions must start in New, not {state}")]
    InvalidInitialState { state: StateName },

    /// `update` lost every race it entered.
    #[error("subscription {id} is still changing after {attempts} attempts")]
    RetriesExhausted { id: SubscriptionId, attempts: u32 },

    #[error("store error: {0}")]
    Store(String),
}

impl ApplyError {
    /// Whether re-reading and re-applying may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }

    /// Whether this error indicates a defect rather than a rejected request.
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::Policy(e) if e.is_defect())
    }
}

impl From<StoreError> for ApplyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => Self::NotFound { id },
            StoreError::AlreadyExists { id } => Self::AlreadyExists { id },
            StoreError::VersionConflict {
                id,
                expected,
                actual,
            } => Self::ConcurrentModification {
                id,
                expected,
                actual,
            },
            StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}
