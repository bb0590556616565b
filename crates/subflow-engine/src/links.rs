//! Portal links embedded in change events.

use subflow_core::{ActorId, SubscriptionId};
use url::Url;

/// Builds absolute portal URLs for subscriptions and the parties around them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    base: Url,
}

impl LinkBuilder {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// `/subscriptions/{id}`
    pub fn subscription(&self, id: &SubscriptionId) -> Url {
        self.link(&["subscriptions", &id.as_uuid().to_string()])
    }

    /// `/organizations/{name}` for partners and distributors.
    pub fn organization(&self, org: &ActorId) -> Url {
        self.link(&["organizations", org.as_str()])
    }

    /// `/users/{name}` for creators, movers, editors, and client accounts.
    pub fn user(&self, user: &ActorId) -> Url {
        self.link(&["users", user.as_str()])
    }

    /// `/plans/{name}`
    pub fn plan(&self, plan: &str) -> Url {
        self.link(&["plans", plan])
    }

    fn link(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
