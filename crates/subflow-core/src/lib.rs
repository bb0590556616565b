//! # subflow-core: Foundational Types for subflow
//!
//! Leaf crate of the workspace. Defines the primitives every other crate
//! shares when talking about subscriptions and the people acting on them.
//!
//! ## Key Design Principles
//!
//! 1. **Closed role enumeration.** [`Role`] is a tagged enum, not a string.
//!    Permission data elsewhere is keyed by it, so adding a role forces every
//!    `match` to handle it.
//!
//! 2. **Newtype identifiers.** `SubscriptionId` and `ActorId` cannot be
//!    swapped for one another or for a bare `String`.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is truncated to seconds so that
//!    two snapshots of the same instant always compare equal.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `subflow-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod role;
pub mod temporal;

pub use error::SubflowError;
pub use identity::{ActorId, SubscriptionId};
pub use role::Role;
pub use temporal::Timestamp;
