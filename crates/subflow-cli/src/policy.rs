//! # Policy Subcommands
//!
//! Read-only views of the lifecycle table.
//!
//! - `policy`: dump the whole table as JSON or YAML.
//! - `transitions`: list the fields a role may write and the states it may
//!   move to from one state.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use subflow_core::Role;
use subflow_state::{StateName, StateRegistry};

/// Serialization format for table dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// Arguments for `subflow policy`.
#[derive(Args, Debug)]
pub struct PolicyArgs {
    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

/// Arguments for `subflow transitions`.
#[derive(Args, Debug)]
pub struct TransitionsArgs {
    /// State the subscription is in (e.g. "Authorized").
    #[arg(long, value_parser = parse_state)]
    pub state: StateName,

    /// Acting role: partner, distributor, admin, or unknown.
    #[arg(long)]
    pub role: Role,
}

/// Parse a state name as accepted on the command line.
pub fn parse_state(raw: &str) -> Result<StateName, String> {
    StateName::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = StateName::ALL.iter().map(StateName::as_str).collect();
        format!("unknown state '{raw}' (expected one of: {})", known.join(", "))
    })
}

/// Run `subflow policy`.
pub fn run_policy(args: &PolicyArgs) -> Result<u8> {
    let registry = StateRegistry::shared();
    println!("{}", render_policy(&registry, args.format)?);
    Ok(0)
}

/// Serialize the table.
pub fn render_policy(registry: &StateRegistry, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(registry).context("failed to serialize policy as JSON")
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(registry).context("failed to serialize policy as YAML")
        }
    }
}

/// Run `subflow transitions`.
pub fn run_transitions(args: &TransitionsArgs) -> Result<u8> {
    let registry = StateRegistry::shared();
    print!("{}", render_transitions(&registry, args.state, args.role)?);
    Ok(0)
}

/// Describe what `role` may do while a subscription is in `state`.
pub fn render_transitions(registry: &StateRegistry, state: StateName, role: Role) -> Result<String> {
    if role.is_admin() {
        let targets: Vec<&str> = StateName::ALL
            .iter()
            .filter(|s| **s != state)
            .map(StateName::as_str)
            .collect();
        return Ok(format!(
            "fields: (all)\ntransitions: {}\n",
            targets.join(", ")
        ));
    }

    let fields = registry.allowed_fields(state, role)?;
    let targets = registry.allowed_transitions(state, role)?;

    let fields = if fields.is_empty() {
        "(none)".to_string()
    } else {
        fields.iter().map(|f| f.label()).collect::<Vec<_>>().join(", ")
    };
    let targets = if targets.is_empty() {
        "(none)".to_string()
    } else {
        targets
            .iter()
            .map(StateName::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    Ok(format!("fields: {fields}\ntransitions: {targets}\n"))
}
