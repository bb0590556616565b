//! # subflow-cli: Lifecycle Policy Tooling
//!
//! Command-line access to the subscription lifecycle table for operators
//! and support staff.
//!
//! ## Subcommands
//!
//! - `policy`: Dump the lifecycle table as JSON or YAML
//! - `transitions`: What a role may write and where it may move from a state
//! - `check`: Dry-run an update between two snapshot files
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; decisions are made by `subflow-state` and
//!   `subflow-engine`.
//! - Handlers return a process exit code and print to stdout.

pub mod check;
pub mod policy;
