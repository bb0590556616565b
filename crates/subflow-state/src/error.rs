//! # Lifecycle Policy Errors
//!
//! Structured rejections returned by the authorizers. Every variant carries
//! the state and role it was evaluated against so the caller can render a
//! precise message without re-deriving context.

use subflow_core::Role;
use thiserror::Error;

use crate::policy::{FieldSet, StateName};

/// Rejection of a proposed subscription update.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The subscription is in a state the registry has no entry for.
    ///
    /// Internal-consistency fault, never expected user input.
    #[error("subscription state {state} is missing from the lifecycle registry")]
    UnknownState {
        /// The state that was looked up.
        state: StateName,
    },

    /// The role may not move the subscription between these states.
    #[error("role {role} is not allowed to change the state from {from} to {to}")]
    StateChangeForbidden {
        /// Current state.
        from: StateName,
        /// Requested state.
        to: StateName,
        /// Acting role.
        role: Role,
    },

    /// The role tried to change fields it may not write in this state.
    #[error("role {role} is not allowed to change {} while the subscription is {state}", join_fields(.fields))]
    FieldPermissionDenied {
        /// State the subscription is in.
        state: StateName,
        /// Acting role.
        role: Role,
        /// Every offending field.
        fields: FieldSet,
    },

    /// The update touches attributes outside the governed field set.
    #[error("role {role} is not allowed to change {}", .attributes.join(", "))]
    UngovernedAttributeChanged {
        /// Acting role.
        role: Role,
        /// Names of the offending attributes.
        attributes: Vec<String>,
    },
}

impl PolicyError {
    /// Whether this error indicates a defect rather than a rejected request.
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::UnknownState { .. })
    }
}

fn join_fields(fields: &FieldSet) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Structural fault in a policy table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A required state has no entry.
    #[error("lifecycle registry has no entry for {state}")]
    MissingState { state: StateName },

    /// A transition points at a state with no entry.
    #[error("transition {from} -> {to} for role {role} targets a state missing from the registry")]
    DanglingTransition {
        from: StateName,
        role: Role,
        to: StateName,
    },

    /// A terminal state declares outgoing transitions.
    #[error("terminal state {state} declares transitions for role {role}")]
    TerminalHasTransitions { state: StateName, role: Role },

    /// `admin` appears as a key; it bypasses the table and must not.
    #[error("state {state} declares permissions for admin")]
    AdminEntry { state: StateName },
}
