//! # Plandiff Engine
//!
//! Structural diff and pending-value backfill for declarative resource plans.
//!
//! A plan is a freshly computed snapshot of a resource's configuration tree
//! in which some values are still pending. This crate compares the plan with
//! the last known state, decides which pending values are safe to copy over
//! from state, and copies them.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of files, network, or platform
//! - **Deterministic**: Same inputs always produce same outputs
//! - **Testable**: Pure logic over in-memory trees
//!
//! ## Core Concepts
//!
//! ### Tree Model
//!
//! A snapshot is a [`Record`] of named fields holding [`Value`]s: scalar
//! leaves, nested records, and ordered lists. Each value is [`Knowable`]:
//! known, pending, or null.
//!
//! ### Diff
//!
//! [`diff`] produces [`AttributeChanges`], an ordered list of change paths
//! such as `replication_specs[0].zone_name` or `region_configs[+1]`.
//!
//! ### Dependencies
//!
//! A [`DependencyMap`] says which attributes a trigger attribute invalidates.
//! [`AttributeChanges::keep_pending`] turns it into a [`RetainSet`].
//!
//! ### Merge
//!
//! [`copy_pending`] fills pending values from state, never replacing known
//! values and leaving retained names pending at every depth.
//!
//! ### Reconciliation
//!
//! The [`Reconciler`] runs the whole flow with per-element rules for lists
//! of records, controlled by a [`MinimizeLevel`]:
//! - [`MinimizeLevel::Never`] - Root merge only
//! - [`MinimizeLevel::Default`] - Also backfill unchanged list elements
//! - [`MinimizeLevel::Always`] - Also backfill changed list elements (default)
//!
//! ## Quick Start
//!
//! ```rust
//! use plandiff_engine::{copy_pending, dependency_map, diff, Record, Value};
//!
//! let state = Record::new()
//!     .with("zone_name", Value::string("zone1"))
//!     .with("zone_id", Value::string("z-1"))
//!     .with("state_name", Value::string("IDLE"));
//! let mut plan = Record::new()
//!     .with("zone_name", Value::string("zone2"))
//!     .with("zone_id", Value::pending_leaf())
//!     .with("state_name", Value::pending_leaf());
//!
//! // 1. What changed?
//! let changes = diff(&state, &plan)?;
//! assert!(changes.attribute_changed("zone_name"));
//!
//! // 2. zone_id follows zone_name, so it must be recomputed
//! let retain = changes.keep_pending(&dependency_map([("zone_name", &["zone_id"][..])]));
//!
//! // 3. Everything else comes from state
//! copy_pending(&state, &mut plan, &retain)?;
//! assert_eq!(plan.get("zone_id"), Some(&Value::pending_leaf()));
//! assert_eq!(plan.get("state_name"), Some(&Value::string("IDLE")));
//! # Ok::<(), plandiff_engine::Error>(())
//! ```
//!
//! ## Logging
//!
//! The engine emits [`tracing`] events and installs no subscriber.

pub mod changes;
pub mod config;
pub mod diff;
pub mod error;
pub mod merge;
pub mod path;
pub mod reconcile;
pub mod schema;
pub mod value;

#[cfg(test)]
mod fixtures;

// Re-export main types at crate root
pub use changes::{dependency_map, AttributeChanges, DependencyMap, RetainSet};
pub use config::{ConfigError, MinimizeLevel, ReconcileConfig, MINIMIZE_ENV_VAR};
pub use diff::diff;
pub use error::Error;
pub use merge::{
    copy_pending, copy_pending_with, has_pending, keep_any, KeepPending, KeepPendingFn,
    MergeReport,
};
pub use reconcile::{ListPolicy, ReconcileResult, Reconciler};
pub use schema::{FieldDef, FieldType, RecordSchema};
pub use value::{Field, Knowable, List, Record, Scalar, Value, ValueKind};
