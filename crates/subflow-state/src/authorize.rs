//! # Authorizers
//!
//! Decide whether an actor may make a given change. All three checks are
//! pure lookups over the registry. `admin` is handled by an explicit guard
//! at the top of each check, before the table is consulted.

use std::collections::BTreeSet;

use subflow_core::Role;

use crate::diff::{ATTR_CREATED_AT, ATTR_CREATOR, ATTR_ID, ATTR_PARTNER};
use crate::error::PolicyError;
use crate::policy::{FieldSet, StateName, StateRegistry};

/// Attributes nobody may change, `admin` included.
const IMMUTABLE_ATTRIBUTES: [&str; 4] = [ATTR_ID, ATTR_PARTNER, ATTR_CREATOR, ATTR_CREATED_AT];

/// Check that `role` may move a subscription from `from` to `to`.
///
/// Staying in the same state always succeeds. `admin` may move anywhere.
pub fn authorize_transition(
    registry: &StateRegistry,
    role: Role,
    from: StateName,
    to: StateName,
) -> Result<(), PolicyError> {
    if from == to || role.is_admin() {
        return Ok(());
    }
    if registry.lookup(from)?.may_move_to(role, to) {
        Ok(())
    } else {
        Err(PolicyError::StateChangeForbidden { from, to, role })
    }
}

/// Check that every field in `changed` is writable by `role` in `state`.
///
/// On rejection the error lists all offending fields, not only the first.
pub fn authorize_fields(
    registry: &StateRegistry,
    role: Role,
    state: StateName,
    changed: &FieldSet,
) -> Result<(), PolicyError> {
    if role.is_admin() {
        return Ok(());
    }
    let policy = registry.lookup(state)?;
    let denied: FieldSet = changed
        .iter()
        .copied()
        .filter(|field| !policy.may_write(role, *field))
        .collect();
    if denied.is_empty() {
        Ok(())
    } else {
        Err(PolicyError::FieldPermissionDenied {
            state,
            role,
            fields: denied,
        })
    }
}

/// Check changes to attributes outside the governed field set.
///
/// Governed roles may change none of them. `admin` may change the
/// distributor assignment and free-form attributes but never the identity
/// of the subscription or its owner.
pub fn authorize_attributes(role: Role, changed: &BTreeSet<String>) -> Result<(), PolicyError> {
    let denied: Vec<String> = changed
        .iter()
        .filter(|attr| !role.is_admin() || IMMUTABLE_ATTRIBUTES.contains(&attr.as_str()))
        .cloned()
        .collect();
    if denied.is_empty() {
        Ok(())
    } else {
        Err(PolicyError::UngovernedAttributeChanged {
            role,
            attributes: denied,
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
