//! # Check Subcommand
//!
//! Dry-runs an update: reads an old and a new subscription snapshot (JSON,
//! or YAML by `.yaml`/`.yml` extension), evaluates the update for an actor
//! against the standard lifecycle table, and prints the resulting change set
//! or the structured rejection. Nothing is stored and nobody is notified.
//!
//! Exit codes: `0` accepted or unchanged, `2` rejected.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use subflow_core::{ActorId, Role};
use subflow_engine::{Actor, EngineConfig, InMemoryStore, LifecycleCoordinator, LogNotifier};
use subflow_state::{ChangeSet, FieldName, PolicyError, StateName, Subscription};

/// Arguments for `subflow check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Acting role: partner, distributor, admin, or unknown.
    #[arg(long)]
    pub role: Role,

    /// Acting user name, recorded as editor/mover.
    #[arg(long, value_parser = parse_actor)]
    pub actor: ActorId,

    /// Snapshot as currently stored.
    #[arg(long)]
    pub old: PathBuf,

    /// Proposed snapshot.
    #[arg(long)]
    pub new: PathBuf,
}

fn parse_actor(raw: &str) -> Result<ActorId, String> {
    ActorId::new(raw).map_err(|e| e.to_string())
}

/// Outcome of a dry run, as printed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum CheckReport {
    Accepted { changes: ChangeSet },
    Unchanged,
    Rejected { rejection: Rejection },
}

impl CheckReport {
    /// Process exit code for this report.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Accepted { .. } | Self::Unchanged => 0,
            Self::Rejected { .. } => 2,
        }
    }
}

/// A policy rejection flattened for output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<StateName>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldName>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
}

impl From<&PolicyError> for Rejection {
    fn from(err: &PolicyError) -> Self {
        let mut rejection = Rejection {
            kind: "",
            message: err.to_string(),
            role: None,
            state: None,
            target: None,
            fields: Vec::new(),
            attributes: Vec::new(),
        };
        match err {
            PolicyError::UnknownState { state } => {
                rejection.kind = "unknown_state";
                rejection.state = Some(*state);
            }
            PolicyError::StateChangeForbidden { from, to, role } => {
                rejection.kind = "state_change_forbidden";
                rejection.role = Some(*role);
                rejection.state = Some(*from);
                rejection.target = Some(*to);
            }
            PolicyError::FieldPermissionDenied {
                state,
                role,
                fields,
            } => {
                rejection.kind = "field_permission_denied";
                rejection.role = Some(*role);
                rejection.state = Some(*state);
                rejection.fields = fields.iter().copied().collect();
            }
            PolicyError::UngovernedAttributeChanged { role, attributes } => {
                rejection.kind = "ungoverned_attribute_changed";
                rejection.role = Some(*role);
                rejection.attributes.clone_from(attributes);
            }
        }
        rejection
    }
}

/// Run `subflow check`.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let old = load_snapshot(&args.old)?;
    let new = load_snapshot(&args.new)?;
    let actor = Actor::new(args.actor.clone(), args.role);

    let report = evaluate(&actor, &old, &new)?;
    if let CheckReport::Rejected { rejection } = &report {
        tracing::warn!(kind = rejection.kind, "{}", rejection.message);
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to serialize report")?
    );
    Ok(report.exit_code())
}

/// Evaluate `old -> new` for `actor` against the standard table.
pub fn evaluate(actor: &Actor, old: &Subscription, new: &Subscription) -> Result<CheckReport> {
    let coordinator =
        LifecycleCoordinator::new(InMemoryStore::new(), LogNotifier, EngineConfig::local()?);
    let report = match coordinator.evaluate(actor, old, new) {
        Ok(prepared) if prepared.is_noop() => CheckReport::Unchanged,
        Ok(prepared) => CheckReport::Accepted {
            changes: prepared.changes,
        },
        Err(err) => CheckReport::Rejected {
            rejection: Rejection::from(&err),
        },
    };
    Ok(report)
}

/// Read a subscription snapshot from disk.
pub fn load_snapshot(path: &Path) -> Result<Subscription> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML snapshot {}", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON snapshot {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subflow_state::FieldSet;

    fn snapshot(state: StateName) -> Subscription {
        let mut sub = Subscription::draft(ActorId::new("acme").unwrap(), "acme-waf");
        sub.state = state;
        sub.version = 1;
        sub
    }

    fn actor(role: Role) -> Actor {
        Actor::new(ActorId::new("alice").unwrap(), role)
    }

    #[test]
    fn accepted_update_reports_changes() {
        let old = snapshot(StateName::New);
        let mut new = old.clone();
        new.discount = 20;
        new.state = StateName::Pending;

        let report = evaluate(&actor(Role::Partner), &old, &new).unwrap();
        let CheckReport::Accepted { changes } = &report else {
            panic!("expected acceptance, got {report:?}");
        };
        assert_eq!(changes.changed_fields(), FieldSet::from([FieldName::Discount]));
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn unchanged_update() {
        let old = snapshot(StateName::Finished);
        let report = evaluate(&actor(Role::Partner), &old, &old.clone()).unwrap();
        assert_eq!(report, CheckReport::Unchanged);
    }

    #[test]
    fn rejection_is_structured() {
        let old = snapshot(StateName::New);
        let mut new = old.clone();
        new.start_date = Some(subflow_core::Timestamp::now());

        let report = evaluate(&actor(Role::Partner), &old, &new).unwrap();
        assert_eq!(report.exit_code(), 2);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["decision"], "rejected");
        assert_eq!(value["rejection"]["kind"], "field_permission_denied");
        assert_eq!(value["rejection"]["role"], "partner");
        assert_eq!(value["rejection"]["state"], "New");
        assert_eq!(value["rejection"]["fields"], serde_json::json!(["StartDate"]));
        assert!(value["rejection"].get("target").is_none());
    }

    #[test]
    fn forbidden_transition_names_target() {
        let old = snapshot(StateName::Authorized);
        let mut new = old.clone();
        new.state = StateName::Started;

        let report = evaluate(&actor(Role::Partner), &old, &new).unwrap();
        let CheckReport::Rejected { rejection } = report else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.kind, "state_change_forbidden");
        assert_eq!(rejection.state, Some(StateName::Authorized));
        assert_eq!(rejection.target, Some(StateName::Started));
    }

    #[test]
    fn snapshots_load_from_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let sub = snapshot(StateName::Pending);

        let json_path = dir.path().join("old.json");
        std::fs::write(&json_path, serde_json::to_string(&sub).unwrap()).unwrap();
        assert_eq!(load_snapshot(&json_path).unwrap(), sub);

        let yaml_path = dir.path().join("old.yaml");
        std::fs::write(&yaml_path, serde_yaml::to_string(&sub).unwrap()).unwrap();
        assert_eq!(load_snapshot(&yaml_path).unwrap(), sub);
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let err = load_snapshot(Path::new("/nonexistent/old.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
