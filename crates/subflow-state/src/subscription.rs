//! # Subscription Snapshot
//!
//! The subscription as seen by the lifecycle: a plain value. The policy
//! code compares an "old" snapshot with a proposed "new" one and never
//! mutates either in place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use subflow_core::{ActorId, SubscriptionId, Timestamp};

use crate::policy::{FieldName, StateName};

/// A subscription record.
///
/// The nine governed attributes map one-to-one onto [`FieldName`]. The
/// identity and bookkeeping attributes (`id`, `partner`, `creator`, the
/// mover/editor stamps, `version`) are owned by the lifecycle coordinator.
/// `extra` holds free-form attributes the policy table does not govern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier.
    pub id: SubscriptionId,
    /// Owning partner organization.
    pub partner: ActorId,
    /// Distributor responsible for provisioning, once assigned.
    #[serde(default)]
    pub distributor: Option<ActorId>,

    /// Short machine name.
    pub name: String,
    /// Name shown in listings and notifications.
    #[serde(default)]
    pub display_name: String,
    /// Service start.
    #[serde(default)]
    pub start_date: Option<Timestamp>,
    /// Service end.
    #[serde(default)]
    pub end_date: Option<Timestamp>,
    /// Client account the subscription is for.
    #[serde(default)]
    pub sub_user: Option<ActorId>,
    /// Tariff plan name.
    #[serde(default)]
    pub sub_plan: Option<String>,
    /// Discount in percent.
    #[serde(default)]
    pub discount: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comment: String,

    /// Current lifecycle state.
    pub state: StateName,

    pub creator: ActorId,
    pub created_at: Timestamp,
    /// Last actor to change the state, and when.
    #[serde(default)]
    pub mover: Option<ActorId>,
    #[serde(default)]
    pub moved_at: Option<Timestamp>,
    /// Last actor to commit any change, and when.
    #[serde(default)]
    pub editor: Option<ActorId>,
    #[serde(default)]
    pub edited_at: Option<Timestamp>,

    /// Optimistic-concurrency stamp. Incremented by the store on every commit.
    #[serde(default)]
    pub version: u64,

    /// Attributes outside the governed field set.
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Subscription {
    /// A fresh draft in `New`, created by its own partner.
    pub fn draft(partner: ActorId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: SubscriptionId::new(),
            creator: partner.clone(),
            partner,
            distributor: None,
            display_name: name.clone(),
            name,
            start_date: None,
            end_date: None,
            sub_user: None,
            sub_plan: None,
            discount: 0,
            description: String::new(),
            comment: String::new(),
            state: StateName::New,
            created_at: Timestamp::now(),
            mover: None,
            moved_at: None,
            editor: None,
            edited_at: None,
            version: 0,
            extra: BTreeMap::new(),
        }
    }

    /// The semantic value of a governed field.
    pub fn field_value(&self, field: FieldName) -> FieldValue {
        match field {
            FieldName::Name => FieldValue::text(&self.name),
            FieldName::DisplayName => FieldValue::text(&self.display_name),
            FieldName::StartDate => FieldValue::date(self.start_date),
            FieldName::EndDate => FieldValue::date(self.end_date),
            FieldName::SubUser => FieldValue::text(self.sub_user.as_ref().map_or("", ActorId::as_str)),
            FieldName::SubPlan => FieldValue::text(self.sub_plan.as_deref().unwrap_or_default()),
            FieldName::Discount => FieldValue::Percent(self.discount),
            FieldName::Description => FieldValue::text(&self.description),
            FieldName::Comment => FieldValue::text(&self.comment),
        }
    }

    /// Copy the value of a governed field from `source` into `self`.
    ///
    /// Text is stored the way [`FieldValue`] compares it: trimmed, with a
    /// blank plan stored as absent.
    pub fn copy_field_from(&mut self, source: &Subscription, field: FieldName) {
        match field {
            FieldName::Name => self.name = normalized(&source.name),
            FieldName::DisplayName => self.display_name = normalized(&source.display_name),
            FieldName::StartDate => self.start_date = source.start_date,
            FieldName::EndDate => self.end_date = source.end_date,
            FieldName::SubUser => self.sub_user.clone_from(&source.sub_user),
            FieldName::SubPlan => {
                self.sub_plan = source
                    .sub_plan
                    .as_deref()
                    .map(normalized)
                    .filter(|plan| !plan.is_empty());
            }
            FieldName::Discount => self.discount = source.discount,
            FieldName::Description => self.description = normalized(&source.description),
            FieldName::Comment => self.comment = normalized(&source.comment),
        }
    }

    /// Normalize every governed text field in place.
    pub fn normalize(&mut self) {
        let source = self.clone();
        for field in FieldName::ALL {
            self.copy_field_from(&source, field);
        }
    }

    /// Whether the subscription is closed.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

fn normalized(s: &str) -> String {
    s.trim().to_string()
}

/// Normalized value of a governed field, used for comparison and reporting.
///
/// Blank text and an absent optional value are the same value: clearing a
/// plan that was never set is not an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Empty,
    Text(String),
    Date(Timestamp),
    Percent(i32),
}

impl FieldValue {
    /// Text value; blank strings normalize to `Empty`.
    pub fn text(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    /// Optional date value.
    pub fn date(ts: Option<Timestamp>) -> Self {
        ts.map_or(Self::Empty, Self::Date)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Date(ts) => write!(f, "{ts}"),
            Self::Percent(p) => write!(f, "{p}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partner() -> ActorId {
        ActorId::new("acme").unwrap()
    }

    #[test]
    fn draft_starts_in_new() {
        let sub = Subscription::draft(partner(), "acme-waf");
        assert_eq!(sub.state, StateName::New);
        assert_eq!(sub.creator, sub.partner);
        assert_eq!(sub.display_name, "acme-waf");
        assert_eq!(sub.version, 0);
    }

    #[test]
    fn blank_and_absent_text_are_equal() {
        let mut a = Subscription::draft(partner(), "s");
        let mut b = a.clone();
        a.sub_plan = None;
        b.sub_plan = Some("   ".to_string());
        assert_eq!(a.field_value(FieldName::SubPlan), b.field_value(FieldName::SubPlan));
    }

    #[test]
    fn discount_zero_is_a_value() {
        let sub = Subscription::draft(partner(), "s");
        assert_eq!(sub.field_value(FieldName::Discount), FieldValue::Percent(0));
    }

    #[test]
    fn copy_field_moves_only_that_field() {
        let base = Subscription::draft(partner(), "s");
        let mut edited = base.clone();
        edited.description = "changed".to_string();
        edited.comment = "also changed".to_string();

        let mut target = base.clone();
        target.copy_field_from(&edited, FieldName::Description);
        assert_eq!(target.description, "changed");
        assert_eq!(target.comment, base.comment);
    }

    #[test]
    fn copied_text_is_stored_normalized() {
        let base = Subscription::draft(partner(), "s");
        let mut edited = base.clone();
        edited.description = "  y ".to_string();
        edited.sub_plan = Some("   ".to_string());

        let mut target = base.clone();
        target.sub_plan = Some("basic".to_string());
        target.copy_field_from(&edited, FieldName::Description);
        target.copy_field_from(&edited, FieldName::SubPlan);
        assert_eq!(target.description, "y");
        assert_eq!(target.sub_plan, None);
        assert_eq!(
            target.field_value(FieldName::Description),
            edited.field_value(FieldName::Description)
        );
    }

    #[test]
    fn normalize_trims_every_text_field() {
        let mut sub = Subscription::draft(partner(), " acme-waf ");
        sub.comment = "note\n".to_string();
        sub.sub_plan = Some(" pro ".to_string());
        sub.normalize();
        assert_eq!(sub.name, "acme-waf");
        assert_eq!(sub.display_name, "acme-waf");
        assert_eq!(sub.comment, "note");
        assert_eq!(sub.sub_plan.as_deref(), Some("pro"));
    }

    #[test]
    fn field_value_display() {
        assert_eq!(FieldValue::Percent(15).to_string(), "15");
        assert_eq!(FieldValue::Empty.to_string(), "");
        assert_eq!(FieldValue::text(" pro ").to_string(), "pro");
    }

    #[test]
    fn subscription_deserializes_with_defaults() {
        let json = serde_json::json!({
            "id": "5f1b8c5e-3c1a-4d6b-9a70-2f5d7c0e8a11",
            "partner": "acme",
            "name": "acme-waf",
            "state": "Pending",
            "creator": "acme",
            "created_at": "2026-01-15T12:00:00Z"
        });
        let sub: Subscription = serde_json::from_value(json).unwrap();
        assert_eq!(sub.state, StateName::Pending);
        assert_eq!(sub.discount, 0);
        assert!(sub.extra.is_empty());
    }
}
