//! # State Registry
//!
//! The lifecycle policy table: for each [`StateName`], which fields each
//! governed role may write while the subscription sits there, and which
//! states that role may move it to.
//!
//! The table is data, not code paths. It is built once per process
//! ([`StateRegistry::shared()`]) and never mutated afterwards; changing the
//! policy is a code change.
//!
//! ## Table
//!
//! | State         | Role        | Writable fields                                        | Moves to               |
//! |---------------|-------------|--------------------------------------------------------|------------------------|
//! | New           | partner     | Name, DisplayName, SubUser, SubPlan, Discount, Description | Pending            |
//! | Pending       | partner     | DisplayName, SubPlan, Discount, Description, Comment   |:                      |
//! | PreAuthorized | partner     | DisplayName, Description                               | Authorized, Cancelled  |
//! | Unauthorized  | partner     | DisplayName, SubPlan, Discount, Description            | Pending, Cancelled     |
//! | Authorized    | distributor | DisplayName, StartDate, Description                    | Started, Cancelled     |
//! | Started       | partner     | DisplayName, Description                               | PreFinished            |
//! | PreFinished   | distributor | DisplayName, EndDate, Description                      | Finished               |
//! | Finished      | partner     | DisplayName, Description                               |:                      |
//! | Cancelled     | partner     | DisplayName, Description                               |:                      |

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use subflow_core::Role;

use crate::error::{PolicyError, RegistryError};

// ─── State Names ─────────────────────────────────────────────────────

/// Lifecycle stage of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StateName {
    /// Draft created by a partner. The unique initial state.
    New,
    /// Submitted by the partner, awaiting an administrator decision.
    Pending,
    /// Approved by an administrator, awaiting partner confirmation.
    PreAuthorized,
    /// Declined by an administrator; the partner may revise and resubmit.
    Unauthorized,
    /// Confirmed and handed to the distributor.
    Authorized,
    /// Provisioned and running.
    Started,
    /// Partner requested wind-down.
    PreFinished,
    /// Closed after a normal run (terminal).
    Finished,
    /// Closed without running to completion (terminal).
    Cancelled,
}

impl StateName {
    /// All states, in lifecycle order.
    pub const ALL: [StateName; 9] = [
        StateName::New,
        StateName::Pending,
        StateName::PreAuthorized,
        StateName::Unauthorized,
        StateName::Authorized,
        StateName::Started,
        StateName::PreFinished,
        StateName::Finished,
        StateName::Cancelled,
    ];

    /// Canonical state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Pending => "Pending",
            Self::PreAuthorized => "PreAuthorized",
            Self::Unauthorized => "Unauthorized",
            Self::Authorized => "Authorized",
            Self::Started => "Started",
            Self::PreFinished => "PreFinished",
            Self::Finished => "Finished",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    /// Parse a canonical state name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for StateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Field Names ─────────────────────────────────────────────────────

/// A policy-controlled attribute of a subscription.
///
/// This is the closed mutation surface the lifecycle governs. The status
/// itself is not a `FieldName`; it is covered by the transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldName {
    Name,
    DisplayName,
    StartDate,
    EndDate,
    SubUser,
    SubPlan,
    Discount,
    Description,
    Comment,
}

impl FieldName {
    /// All governed fields.
    pub const ALL: [FieldName; 9] = [
        FieldName::Name,
        FieldName::DisplayName,
        FieldName::StartDate,
        FieldName::EndDate,
        FieldName::SubUser,
        FieldName::SubPlan,
        FieldName::Discount,
        FieldName::Description,
        FieldName::Comment,
    ];

    /// Human-readable label used in messages shown to partners and staff.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::DisplayName => "Display Name",
            Self::StartDate => "Start Date",
            Self::EndDate => "End Date",
            Self::SubUser => "Sub user",
            Self::SubPlan => "Sub plan",
            Self::Discount => "Discount",
            Self::Description => "Description",
            Self::Comment => "Comment",
        }
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An ordered set of governed fields.
pub type FieldSet = BTreeSet<FieldName>;

// ─── State Policy ────────────────────────────────────────────────────

/// Permissions attached to a single lifecycle state.
///
/// A role missing from `field_permissions` may write nothing in this state;
/// a role missing from `transitions` may move the subscription nowhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePolicy {
    /// Fields each role may write while the subscription is in this state.
    #[serde(default)]
    pub field_permissions: BTreeMap<Role, FieldSet>,
    /// Destination states each role may move the subscription to.
    #[serde(default)]
    pub transitions: BTreeMap<Role, BTreeSet<StateName>>,
}

impl StatePolicy {
    /// An empty policy: nobody may write or move anything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `role` write access to `fields`.
    pub fn allow_fields(mut self, role: Role, fields: impl IntoIterator<Item = FieldName>) -> Self {
        self.field_permissions.entry(role).or_default().extend(fields);
        self
    }

    /// Allow `role` to move the subscription to each of `targets`.
    pub fn allow_transitions(
        mut self,
        role: Role,
        targets: impl IntoIterator<Item = StateName>,
    ) -> Self {
        self.transitions.entry(role).or_default().extend(targets);
        self
    }

    /// Fields `role` may write; empty when the role has no entry.
    pub fn fields_for(&self, role: Role) -> FieldSet {
        self.field_permissions.get(&role).cloned().unwrap_or_default()
    }

    /// Whether `role` may write `field`.
    pub fn may_write(&self, role: Role, field: FieldName) -> bool {
        self.field_permissions
            .get(&role)
            .is_some_and(|fields| fields.contains(&field))
    }

    /// States `role` may move to; empty when the role has no entry.
    pub fn transitions_for(&self, role: Role) -> BTreeSet<StateName> {
        self.transitions.get(&role).cloned().unwrap_or_default()
    }

    /// Whether `role` may move to `to`.
    pub fn may_move_to(&self, role: Role, to: StateName) -> bool {
        self.transitions
            .get(&role)
            .is_some_and(|targets| targets.contains(&to))
    }

    /// Whether no role has any outgoing transition.
    pub fn is_absorbing(&self) -> bool {
        self.transitions.values().all(BTreeSet::is_empty)
    }
}

// ─── Registry ────────────────────────────────────────────────────────

/// Read-only mapping from lifecycle state to its [`StatePolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StateRegistry {
    policies: BTreeMap<StateName, StatePolicy>,
}

static SHARED: OnceLock<Arc<StateRegistry>> = OnceLock::new();

impl StateRegistry {
    /// The process-wide standard registry, built on first use.
    pub fn shared() -> Arc<StateRegistry> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::standard())))
    }

    /// Build the standard subscription lifecycle table.
    pub fn standard() -> Self {
        use FieldName::*;
        use StateName::*;

        let table = [
            (
                New,
                StatePolicy::new()
                    .allow_fields(
                        Role::Partner,
                        [Name, DisplayName, SubUser, SubPlan, Discount, Description],
                    )
                    .allow_transitions(Role::Partner, [Pending]),
            ),
            (
                Pending,
                StatePolicy::new().allow_fields(
                    Role::Partner,
                    [DisplayName, SubPlan, Discount, Description, Comment],
                ),
            ),
            (
                PreAuthorized,
                StatePolicy::new()
                    .allow_fields(Role::Partner, [DisplayName, Description])
                    .allow_transitions(Role::Partner, [Authorized, Cancelled]),
            ),
            (
                Unauthorized,
                StatePolicy::new()
                    .allow_fields(Role::Partner, [DisplayName, SubPlan, Discount, Description])
                    .allow_transitions(Role::Partner, [Pending, Cancelled]),
            ),
            (
                Authorized,
                StatePolicy::new()
                    .allow_fields(Role::Distributor, [DisplayName, StartDate, Description])
                    .allow_transitions(Role::Distributor, [Started, Cancelled]),
            ),
            (
                Started,
                StatePolicy::new()
                    .allow_fields(Role::Partner, [DisplayName, Description])
                    .allow_transitions(Role::Partner, [PreFinished]),
            ),
            (
                PreFinished,
                StatePolicy::new()
                    .allow_fields(Role::Distributor, [DisplayName, EndDate, Description])
                    .allow_transitions(Role::Distributor, [Finished]),
            ),
            (
                Finished,
                StatePolicy::new().allow_fields(Role::Partner, [DisplayName, Description]),
            ),
            (
                Cancelled,
                StatePolicy::new().allow_fields(Role::Partner, [DisplayName, Description]),
            ),
        ];

        Self {
            policies: table.into_iter().collect(),
        }
    }

    /// Build a registry from explicit policies, validating its structure.
    pub fn from_policies(
        policies: impl IntoIterator<Item = (StateName, StatePolicy)>,
    ) -> Result<Self, RegistryError> {
        let registry = Self {
            policies: policies.into_iter().collect(),
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Check the structural invariants of the table:
    ///
    /// - the initial state `New` is present;
    /// - every transition target is itself a key of the table;
    /// - terminal states have no outgoing transitions for any role;
    /// - `admin` never appears as a key (it bypasses the table).
    pub fn validate(&self) -> Result<(), RegistryError> {
        if !self.policies.contains_key(&StateName::New) {
            return Err(RegistryError::MissingState {
                state: StateName::New,
            });
        }
        for (state, policy) in &self.policies {
            if policy.field_permissions.contains_key(&Role::Admin)
                || policy.transitions.contains_key(&Role::Admin)
            {
                return Err(RegistryError::AdminEntry { state: *state });
            }
            for (role, targets) in &policy.transitions {
                if state.is_terminal() && !targets.is_empty() {
                    return Err(RegistryError::TerminalHasTransitions {
                        state: *state,
                        role: *role,
                    });
                }
                if let Some(to) = targets.iter().find(|t| !self.policies.contains_key(t)) {
                    return Err(RegistryError::DanglingTransition {
                        from: *state,
                        role: *role,
                        to: *to,
                    });
                }
            }
        }
        Ok(())
    }

    /// The policy for `state`.
    ///
    /// A miss means a subscription carries a state the table does not know
    /// about. That is a defect in the table or the data, not a user error.
    pub fn lookup(&self, state: StateName) -> Result<&StatePolicy, PolicyError> {
        self.policies.get(&state).ok_or_else(|| {
            tracing::error!(%state, "subscription state missing from lifecycle registry");
            PolicyError::UnknownState { state }
        })
    }

    /// Fields `role` may write in `state`.
    pub fn allowed_fields(&self, state: StateName, role: Role) -> Result<FieldSet, PolicyError> {
        Ok(self.lookup(state)?.fields_for(role))
    }

    /// States `role` may move to from `state` via the table.
    ///
    /// `admin` is not in the table and gets an empty set here even though
    /// the transition authorizer lets it move anywhere.
    pub fn allowed_transitions(
        &self,
        state: StateName,
        role: Role,
    ) -> Result<BTreeSet<StateName>, PolicyError> {
        Ok(self.lookup(state)?.transitions_for(role))
    }

    /// States present in the table.
    pub fn states(&self) -> impl Iterator<Item = StateName> + '_ {
        self.policies.keys().copied()
    }

    /// Iterate over `(state, policy)` pairs in lifecycle order.
    pub fn iter(&self) -> impl Iterator<Item = (StateName, &StatePolicy)> + '_ {
        self.policies.iter().map(|(state, policy)| (*state, policy))
    }
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_is_valid() {
        StateRegistry::standard().validate().unwrap();
    }

    #[test]
    fn standard_registry_covers_every_state() {
        let registry = StateRegistry::standard();
        let states: Vec<_> = registry.states().collect();
        assert_eq!(states, StateName::ALL.to_vec());
    }

    #[test]
    fn shared_registry_is_built_once() {
        let a = StateRegistry::shared();
        let b = StateRegistry::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn terminal_states_are_absorbing() {
        let registry = StateRegistry::standard();
        for state in StateName::ALL.iter().filter(|s| s.is_terminal()) {
            assert!(registry.lookup(*state).unwrap().is_absorbing(), "{state}");
        }
    }

    #[test]
    fn pending_has_no_governed_transitions() {
        let registry = StateRegistry::standard();
        for role in Role::ALL {
            assert!(registry
                .allowed_transitions(StateName::Pending, role)
                .unwrap()
                .is_empty());
        }
    }

    #[test]
    fn new_allows_partner_to_submit_only() {
        let registry = StateRegistry::standard();
        let targets = registry
            .allowed_transitions(StateName::New, Role::Partner)
            .unwrap();
        assert_eq!(targets, BTreeSet::from([StateName::Pending]));
    }

    #[test]
    fn authorized_belongs_to_distributor() {
        let registry = StateRegistry::standard();
        let fields = registry
            .allowed_fields(StateName::Authorized, Role::Distributor)
            .unwrap();
        assert!(fields.contains(&FieldName::StartDate));
        assert!(registry
            .allowed_fields(StateName::Authorized, Role::Partner)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn admin_is_not_a_table_key() {
        let registry = StateRegistry::standard();
        for (_, policy) in registry.iter() {
            assert!(!policy.field_permissions.contains_key(&Role::Admin));
            assert!(!policy.transitions.contains_key(&Role::Admin));
        }
    }

    #[test]
    fn from_policies_rejects_dangling_transition() {
        let result = StateRegistry::from_policies([(
            StateName::New,
            StatePolicy::new().allow_transitions(Role::Partner, [StateName::Pending]),
        )]);
        assert_eq!(
            result.unwrap_err(),
            RegistryError::DanglingTransition {
                from: StateName::New,
                role: Role::Partner,
                to: StateName::Pending,
            }
        );
    }

    #[test]
    fn from_policies_rejects_terminal_transitions() {
        let result = StateRegistry::from_policies([
            (StateName::New, StatePolicy::new()),
            (
                StateName::Finished,
                StatePolicy::new().allow_transitions(Role::Partner, [StateName::New]),
            ),
        ]);
        assert!(matches!(
            result,
            Err(RegistryError::TerminalHasTransitions {
                state: StateName::Finished,
                ..
            })
        ));
    }

    #[test]
    fn from_policies_requires_initial_state() {
        let result = StateRegistry::from_policies([(StateName::Pending, StatePolicy::new())]);
        assert_eq!(
            result.unwrap_err(),
            RegistryError::MissingState {
                state: StateName::New
            }
        );
    }

    #[test]
    fn from_policies_rejects_admin_entries() {
        let result = StateRegistry::from_policies([(
            StateName::New,
            StatePolicy::new().allow_fields(Role::Admin, [FieldName::Name]),
        )]);
        assert!(matches!(result, Err(RegistryError::AdminEntry { .. })));
    }

    #[test]
    fn lookup_of_absent_state_is_unknown_state() {
        let registry = StateRegistry::from_policies([(StateName::New, StatePolicy::new())]).unwrap();
        assert_eq!(
            registry.lookup(StateName::Started).unwrap_err(),
            PolicyError::UnknownState {
                state: StateName::Started
            }
        );
    }

    #[test]
    fn state_name_parse_is_case_insensitive() {
        assert_eq!(StateName::parse("preauthorized"), Some(StateName::PreAuthorized));
        assert_eq!(StateName::parse("Finished"), Some(StateName::Finished));
        assert_eq!(StateName::parse("Archived"), None);
    }

    #[test]
    fn field_labels_use_product_wording() {
        assert_eq!(FieldName::DisplayName.to_string(), "Display Name");
        assert_eq!(FieldName::SubPlan.to_string(), "Sub plan");
    }
}
