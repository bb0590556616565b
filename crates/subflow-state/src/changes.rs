//! # Change Sets
//!
//! The structured record of what an accepted update changed. The engine
//! wraps it into the notification event; it is also what `subflow check`
//! prints.

use serde::{Deserialize, Serialize};

use crate::policy::{FieldName, FieldSet, StateName};
use crate::subscription::FieldValue;

/// Old and new value of one governed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: FieldName,
    pub old: FieldValue,
    pub new: FieldValue,
}

/// A lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub from: StateName,
    pub to: StateName,
}

/// Everything an update changes: governed fields and, optionally, state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Changed governed fields, in `FieldName` order.
    pub fields: Vec<FieldChange>,
    /// Present when the update moves the subscription.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateChange>,
    /// Names of changed attributes outside the governed field set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
}

impl ChangeSet {
    /// Whether the update changes nothing at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.state.is_none() && self.attributes.is_empty()
    }

    /// The changed governed fields.
    pub fn changed_fields(&self) -> FieldSet {
        self.fields.iter().map(|c| c.field).collect()
    }

    /// The change recorded for `field`, if any.
    pub fn field(&self, field: FieldName) -> Option<&FieldChange> {
        self.fields.iter().find(|c| c.field == field)
    }
}
