//! Reconciliation of a freshly computed plan against prior state.
//!
//! A plan is a snapshot where some values are still pending. Most of them
//! will end up equal to what the prior state already holds, so they are
//! backfilled from state unless a change makes that unsafe.
//!
//! # Algorithm
//!
//! 1. Return early if the plan holds no pending value at its root
//! 2. Diff state against plan
//! 3. Retain the always-pending names plus the dependents of changed triggers
//! 4. Merge state into plan at the root, leaving retained names pending
//! 5. For every [`ListPolicy`] whose list was retained, merge each list
//!    element separately with an element-specific retain set
//!
//! Step 5 depends on the [`MinimizeLevel`]: `Never` skips it, `Default`
//! merges unchanged elements only, `Always` also merges changed elements
//! while retaining the dependents of what changed in them.

use crate::{
    changes::{AttributeChanges, DependencyMap, RetainSet},
    config::{MinimizeLevel, ReconcileConfig},
    diff::diff,
    error::Result,
    merge::{copy_pending, copy_pending_with, has_pending, KeepPending, MergeReport},
    path, Error, Knowable, Record, Value,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Element-level retain rules for a top-level list of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPolicy {
    /// Top-level field holding the list
    pub list: String,
    /// Names kept pending in every element
    pub always_pending: Vec<String>,
    /// Names kept pending in every element when the list grew or shrank
    pub on_len_change: Vec<String>,
    /// Nested list name -> names kept pending in a changed element whose
    /// nested list grew or shrank
    pub on_nested_len_change: BTreeMap<String, Vec<String>>,
    /// Dependencies applied to changed elements
    pub dependencies: DependencyMap,
}

impl ListPolicy {
    pub fn new(list: impl Into<String>) -> Self {
        Self {
            list: list.into(),
            ..Self::default()
        }
    }

    pub fn with_always_pending<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.always_pending.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_on_len_change<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on_len_change.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_on_nested_len_change<I, S>(mut self, nested: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on_nested_len_change
            .entry(nested.into())
            .or_default()
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_dependencies(mut self, dependencies: DependencyMap) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    fn unchanged_retain(&self, changes: &AttributeChanges) -> RetainSet {
        let mut retain: RetainSet = self.always_pending.iter().cloned().collect();
        // An insertion in the middle shifts every later element.
        if changes.list_len_changes(&self.list) {
            retain.extend(self.on_len_change.iter().cloned());
        }
        retain
    }

    fn changed_retain(
        &self,
        unchanged: &RetainSet,
        changes: &AttributeChanges,
        element: &str,
    ) -> RetainSet {
        let mut retain = unchanged.clone();
        for (nested, names) in &self.on_nested_len_change {
            if changes.nested_list_len_changes(&path::join(element, nested)) {
                retain.extend(names.iter().cloned());
            }
        }
        retain.extend(changes.keep_pending(&self.dependencies));
        retain
    }
}

/// Result of reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    /// Changes between state and plan
    pub changes: AttributeChanges,
    /// Names retained at the root merge
    pub retained: RetainSet,
    /// Paths backfilled from state
    pub filled: Vec<String>,
    /// True when the plan had nothing pending and was left untouched
    pub skipped: bool,
}

impl ReconcileResult {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// The reconciler backfills pending plan values from prior state.
pub struct Reconciler {
    config: ReconcileConfig,
    always_pending: RetainSet,
    dependencies: DependencyMap,
    list_policies: Vec<ListPolicy>,
    keep: Option<KeepPending>,
}

impl Reconciler {
    /// Create a reconciler that retains nothing by default.
    pub fn new(config: ReconcileConfig) -> Self {
        Self {
            config,
            always_pending: RetainSet::new(),
            dependencies: DependencyMap::new(),
            list_policies: Vec::new(),
            keep: None,
        }
    }

    /// Names never backfilled at the root, such as volatile status fields.
    pub fn with_always_pending<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.always_pending.extend(names.into_iter().map(Into::into));
        self
    }

    /// Root-level trigger -> dependents mapping.
    pub fn with_dependencies(mut self, dependencies: DependencyMap) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    pub fn with_list_policy(mut self, policy: ListPolicy) -> Self {
        self.list_policies.push(policy);
        self
    }

    /// Predicate consulted before every fill, at the root and in list elements.
    pub fn with_keep(mut self, keep: KeepPending) -> Self {
        self.keep = Some(keep);
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Backfill pending values of `plan` from `state`.
    pub fn reconcile(&self, state: &Record, plan: &mut Record) -> Result<ReconcileResult> {
        if !has_pending(plan) {
            debug!("plan has no pending values, skipping reconcile");
            return Ok(ReconcileResult::skipped());
        }

        let changes = diff(state, plan)?;
        let mut retained = self.always_pending.clone();
        retained.extend(changes.keep_pending(&self.dependencies));
        info!(
            changes = changes.len(),
            retained = ?retained,
            minimize = %self.config.minimize,
            "reconciling plan against state"
        );

        let mut filled = self.copy(state, plan, &retained)?.filled;

        if self.config.minimize != MinimizeLevel::Never {
            for policy in &self.list_policies {
                if retained.contains(&policy.list) {
                    filled.extend(self.reconcile_list(policy, state, plan, &changes)?);
                }
            }
        }

        Ok(ReconcileResult {
            changes,
            retained,
            filled,
            skipped: false,
        })
    }

    fn reconcile_list(
        &self,
        policy: &ListPolicy,
        state: &Record,
        plan: &mut Record,
        changes: &AttributeChanges,
    ) -> Result<Vec<String>> {
        let Some(state_list) = state.get(&policy.list).and_then(Value::as_list) else {
            return Ok(Vec::new());
        };
        let Some(Value::List(Knowable::Known(plan_list))) = plan.get_mut(&policy.list) else {
            return Ok(Vec::new());
        };

        let unchanged = policy.unchanged_retain(changes);
        let mut filled = Vec::new();
        // Elements only in the plan have no state to copy from.
        for (i, (src, dest)) in state_list.iter().zip(plan_list.iter_mut()).enumerate() {
            let element = path::index(&policy.list, i);
            let retain = if changes.list_index_changed(&policy.list, i) {
                if self.config.minimize != MinimizeLevel::Always {
                    debug!(path = %element, "changed list element left pending");
                    continue;
                }
                policy.changed_retain(&unchanged, changes, &element)
            } else {
                unchanged.clone()
            };

            let src = element_record(src, &element)?;
            let dest = element_record_mut(dest, &element)?;
            let (Some(src), Some(dest)) = (src, dest) else {
                continue;
            };
            let report = self.copy(src, dest, &retain)?;
            filled.extend(report.filled.iter().map(|p| path::join(&element, p)));
        }
        Ok(filled)
    }

    fn copy(&self, src: &Record, dest: &mut Record, retain: &RetainSet) -> Result<MergeReport> {
        match &self.keep {
            Some(keep) => copy_pending_with(src, dest, retain, keep.as_ref()),
            None => copy_pending(src, dest, retain),
        }
    }
}

fn element_record<'v>(value: &'v Value, path: &str) -> Result<Option<&'v Record>> {
    match value {
        Value::Record(record) => Ok(record.as_known()),
        other => Err(not_a_record(other, path)),
    }
}

fn element_record_mut<'v>(value: &'v mut Value, path: &str) -> Result<Option<&'v mut Record>> {
    match value {
        Value::Record(record) => Ok(record.as_known_mut()),
        other => Err(not_a_record(other, path)),
    }
}

fn not_a_record(value: &Value, path: &str) -> Error {
    Error::ShapeMismatch {
        path: path.to_string(),
        expected: "record".to_string(),
        got: value.kind().to_string(),
    }
}
