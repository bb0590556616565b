//! # subflow-state: Subscription Lifecycle Policy
//!
//! Pure, synchronous decision logic for the subscription lifecycle. Nothing
//! in this crate blocks, allocates shared state, or performs I/O.
//!
//! ## Components
//!
//! - **State registry** (`policy.rs`): frozen table mapping each
//!   [`StateName`] to the fields each role may write there and the states
//!   each role may move to.
//!
//! - **Field diff** (`diff.rs`): the set of governed fields whose value
//!   differs between two snapshots, plus changes to attributes the table
//!   does not govern.
//!
//! - **Authorizers** (`authorize.rs`): transition, field, and attribute
//!   checks. `admin` is an explicit short-circuit in each of them and never
//!   appears as a key in the table.
//!
//! ## Lifecycle
//!
//! ```text
//! New ─▶ Pending ─▶ PreAuthorized ─▶ Authorized ─▶ Started ─▶ PreFinished ─▶ Finished
//!          ▲  │           │               │
//!          │  ▼           ▼               ▼
//!          └ Unauthorized ─────────▶ Cancelled
//! ```
//!
//! `Pending → PreAuthorized | Unauthorized` is only reachable by `admin`.
//! `Finished` and `Cancelled` are absorbing.

pub mod authorize;
pub mod changes;
pub mod diff;
pub mod error;
pub mod policy;
pub mod subscription;

pub use authorize::{authorize_attributes, authorize_fields, authorize_transition};
pub use changes::{ChangeSet, FieldChange, StateChange};
pub use diff::{attribute_changes, changes, diff};
pub use error::{PolicyError, RegistryError};
pub use policy::{FieldName, FieldSet, StateName, StatePolicy, StateRegistry};
pub use subscription::{FieldValue, Subscription};
