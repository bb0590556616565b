//! # Change Events
//!
//! The structured record handed to the notifier after a commit. It carries
//! both sides of every attribute a notification may show, so the renderer
//! can print "old -> new" lines only where [`Delta::is_changed`] holds,
//! without going back to the store.

use serde::{Deserialize, Serialize};
use subflow_core::{ActorId, SubscriptionId, Timestamp};
use subflow_state::{ChangeSet, StateChange, StateName, Subscription};
use url::Url;
use uuid::Uuid;

use crate::links::LinkBuilder;

/// A named party or resource with its portal link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub url: Url,
}

/// Old and new value of one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta<T> {
    pub old: T,
    pub new: T,
}

impl<T: PartialEq> Delta<T> {
    pub fn new(old: T, new: T) -> Self {
        Self { old, new }
    }

    /// Whether the value differs.
    pub fn is_changed(&self) -> bool {
        self.old != self.new
    }
}

/// Notification input emitted once per committed update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_id: Uuid,
    pub occurred_at: Timestamp,

    pub subscription_id: SubscriptionId,
    pub subscription_name: String,
    pub subscription_url: Url,
    pub display_name: Delta<String>,

    pub partner: Link,
    pub distributor: Delta<Option<Link>>,
    pub client: Delta<Option<Link>>,
    pub plan: Delta<Option<Link>>,
    pub discount: Delta<i32>,
    pub start_date: Delta<Option<Timestamp>>,
    pub end_date: Delta<Option<Timestamp>>,
    pub status: Delta<StateName>,
    pub description: Delta<String>,
    pub comment: Delta<String>,

    pub creator: Link,
    pub mover: Option<Link>,
    pub moved_at: Option<Timestamp>,
    pub editor: Option<Link>,
    pub edited_at: Option<Timestamp>,

    /// The governed fields and transition the update was authorized for.
    pub changes: ChangeSet,
}

impl ChangeEvent {
    /// Describe the update from `old` to the committed snapshot.
    pub fn build(
        links: &LinkBuilder,
        old: &Subscription,
        committed: &Subscription,
        changes: ChangeSet,
    ) -> Self {
        let org = |id: &ActorId| Link {
            name: id.to_string(),
            url: links.organization(id),
        };
        let user = |id: &ActorId| Link {
            name: id.to_string(),
            url: links.user(id),
        };
        let plan = |name: &Option<String>| {
            name.as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|n| Link {
                    name: n.to_string(),
                    url: links.plan(n),
                })
        };

        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Timestamp::now(),
            subscription_id: committed.id,
            subscription_name: committed.name.clone(),
            subscription_url: links.subscription(&committed.id),
            display_name: Delta::new(old.display_name.clone(), committed.display_name.clone()),
            partner: org(&committed.partner),
            distributor: Delta::new(
                old.distributor.as_ref().map(org),
                committed.distributor.as_ref().map(org),
            ),
            client: Delta::new(old.sub_user.as_ref().map(user), committed.sub_user.as_ref().map(user)),
            plan: Delta::new(plan(&old.sub_plan), plan(&committed.sub_plan)),
            discount: Delta::new(old.discount, committed.discount),
            start_date: Delta::new(old.start_date, committed.start_date),
            end_date: Delta::new(old.end_date, committed.end_date),
            status: Delta::new(old.state, committed.state),
            description: Delta::new(old.description.clone(), committed.description.clone()),
            comment: Delta::new(old.comment.clone(), committed.comment.clone()),
            creator: user(&committed.creator),
            mover: committed.mover.as_ref().map(user),
            moved_at: committed.moved_at,
            editor: committed.editor.as_ref().map(user),
            edited_at: committed.edited_at,
            changes,
        }
    }

    /// The transition this update performed, if any.
    pub fn transition(&self) -> Option<StateChange> {
        self.changes.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subflow_state::{FieldChange, FieldName, FieldValue};

    fn links() -> LinkBuilder {
        LinkBuilder::new(Url::parse("https://portal.example.com").unwrap())
    }

    #[test]
    fn build_pairs_old_and_committed_values() {
        let old = Subscription::draft(ActorId::new("acme").unwrap(), "acme-waf");
        let mut committed = old.clone();
        committed.sub_plan = Some("pro".to_string());
        committed.state = StateName::Pending;

        let changes = ChangeSet {
            fields: vec![FieldChange {
                field: FieldName::SubPlan,
                old: FieldValue::Empty,
                new: FieldValue::Text("pro".to_string()),
            }],
            state: Some(StateChange {
                from: StateName::New,
                to: StateName::Pending,
            }),
            attributes: Vec::new(),
        };
        let event = ChangeEvent::build(&links(), &old, &committed, changes);

        assert!(event.plan.is_changed());
        assert_eq!(event.plan.old, None);
        assert_eq!(
            event.plan.new.as_ref().map(|p| p.url.as_str()),
            Some("https://portal.example.com/plans/pro")
        );
        assert!(event.status.is_changed());
        assert!(!event.discount.is_changed());
        assert_eq!(event.partner.url.as_str(), "https://portal.example.com/organizations/acme");
        assert_eq!(
            event.transition(),
            Some(StateChange {
                from: StateName::New,
                to: StateName::Pending
            })
        );
    }

    #[test]
    fn reassigned_distributor_keeps_the_previous_one() {
        let mut old = Subscription::draft(ActorId::new("acme").unwrap(), "acme-waf");
        old.distributor = Some(ActorId::new("northwind").unwrap());
        let mut committed = old.clone();
        committed.distributor = Some(ActorId::new("southwind").unwrap());

        let changes = ChangeSet {
            attributes: vec!["distributor".to_string()],
            ..ChangeSet::default()
        };
        let event = ChangeEvent::build(&links(), &old, &committed, changes);

        assert!(event.distributor.is_changed());
        assert_eq!(event.distributor.old.as_ref().unwrap().name, "northwind");
        assert_eq!(
            event.distributor.new.as_ref().unwrap().url.as_str(),
            "https://portal.example.com/organizations/southwind"
        );
    }

    #[test]
    fn event_serializes_to_json() {
        let old = Subscription::draft(ActorId::new("acme").unwrap(), "acme-waf");
        let event = ChangeEvent::build(&links(), &old, &old, ChangeSet::default());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"]["old"], "New");
        assert_eq!(json["subscription_name"], "acme-waf");
    }
}
