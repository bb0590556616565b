//! # Field Diff Evaluator
//!
//! Compares two subscription snapshots. Only the governed fields take part
//! in [`diff`]; values are compared through [`FieldValue`], so a write that
//! leaves the value unchanged is not a change.

use std::collections::BTreeSet;

use crate::changes::FieldChange;
use crate::policy::{FieldName, FieldSet};
use crate::subscription::Subscription;

/// Attribute names reported by [`attribute_changes`] for identity fields.
pub const ATTR_ID: &str = "id";
pub const ATTR_PARTNER: &str = "partner";
pub const ATTR_DISTRIBUTOR: &str = "distributor";
pub const ATTR_CREATOR: &str = "creator";
pub const ATTR_CREATED_AT: &str = "created_at";
/// Prefix for free-form attributes, e.g. `extra.region`.
pub const ATTR_EXTRA_PREFIX: &str = "extra.";

/// Governed fields whose value differs between `old` and `new`.
pub fn diff(old: &Subscription, new: &Subscription) -> FieldSet {
    FieldName::ALL
        .into_iter()
        .filter(|field| old.field_value(*field) != new.field_value(*field))
        .collect()
}

/// Old/new values of every changed governed field, in `FieldName` order.
pub fn changes(old: &Subscription, new: &Subscription) -> Vec<FieldChange> {
    FieldName::ALL
        .into_iter()
        .filter_map(|field| {
            let before = old.field_value(field);
            let after = new.field_value(field);
            (before != after).then_some(FieldChange {
                field,
                old: before,
                new: after,
            })
        })
        .collect()
}

/// Changed attributes that the policy table does not govern.
///
/// Covers the identity attributes and every key of `extra` that was added,
/// removed, or changed. Bookkeeping stamps (mover, editor, version) are not
/// reported; the coordinator always overwrites them.
pub fn attribute_changes(old: &Subscription, new: &Subscription) -> BTreeSet<String> {
    let mut changed = BTreeSet::new();
    if old.id != new.id {
        changed.insert(ATTR_ID.to_string());
    }
    if old.partner != new.partner {
        changed.insert(ATTR_PARTNER.to_string());
    }
    if old.distributor != new.distributor {
        changed.insert(ATTR_DISTRIBUTOR.to_string());
    }
    if old.creator != new.creator {
        changed.insert(ATTR_CREATOR.to_string());
    }
    if old.created_at != new.created_at {
        changed.insert(ATTR_CREATED_AT.to_string());
    }
    let keys: BTreeSet<&String> = old.extra.keys().chain(new.extra.keys()).collect();
    for key in keys {
        if old.extra.get(key) != new.extra.get(key) {
            changed.insert(format!("{ATTR_EXTRA_PREFIX}{key}"));
        }
    }
    changed
}
