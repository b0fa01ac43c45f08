//! Backfill pending values in a new snapshot from a prior snapshot.
//!
//! The merge walks `dest` recursively. A pending field is replaced with the
//! source field of the same name; known records and lists are descended into
//! so pending values nested inside them are filled too. Known values are
//! never replaced.
//!
//! A pending record or list is rebuilt from the source's shape, including
//! each field's `mutable` flag, with every slot pending, and then merged. Its
//! own path is reported as filled ahead of the paths filled inside it.
//!
//! Two mechanisms keep a field pending even though the source has a value:
//! - a [`RetainSet`] of field names, matched at every depth
//! - an optional [`KeepPendingFn`] predicate over the field name and the
//!   source value
//!
//! Field names are matched by declared name only. Retain names use the same
//! lowercase naming domain and are validated up front.

use crate::{
    changes::RetainSet, error::Result, path, Error, Knowable, List, Record, Value, ValueKind,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Predicate deciding whether a pending field stays pending, given its name
/// and the source value that would otherwise be copied.
pub type KeepPendingFn = dyn Fn(&str, &Value) -> bool + Send + Sync;

/// Boxed [`KeepPendingFn`], for storing and combining predicates.
pub type KeepPending = Box<KeepPendingFn>;

/// Combine predicates: keep pending if any of them says so.
pub fn keep_any(predicates: Vec<KeepPending>) -> KeepPending {
    Box::new(move |name, value| predicates.iter().any(|p| p(name, value)))
}

/// Paths touched by a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Pending values replaced from the source
    pub filled: Vec<String>,
    /// Pending values deliberately left pending
    pub kept: Vec<String>,
}

/// True if any direct field of `record` is pending.
pub fn has_pending(record: &Record) -> bool {
    record.has_pending()
}

/// Fill pending fields of `dest` from `src`, leaving retained names pending.
pub fn copy_pending(src: &Record, dest: &mut Record, retain: &RetainSet) -> Result<MergeReport> {
    merge(src, dest, retain, None)
}

/// Like [`copy_pending`], additionally consulting `keep` before each fill.
pub fn copy_pending_with(
    src: &Record,
    dest: &mut Record,
    retain: &RetainSet,
    keep: &KeepPendingFn,
) -> Result<MergeReport> {
    merge(src, dest, retain, Some(keep))
}

fn merge(
    src: &Record,
    dest: &mut Record,
    retain: &RetainSet,
    keep: Option<&KeepPendingFn>,
) -> Result<MergeReport> {
    validate_retain(retain)?;
    let mut merger = Merger {
        retain,
        keep,
        report: MergeReport::default(),
    };
    merger.merge_record(src, dest, "")?;
    Ok(merger.report)
}

fn validate_retain(retain: &RetainSet) -> Result<()> {
    let invalid: Vec<String> = retain
        .iter()
        .filter(|name| name.to_lowercase() != **name)
        .cloned()
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidRetainName(invalid))
    }
}

struct Merger<'a> {
    retain: &'a RetainSet,
    keep: Option<&'a KeepPendingFn>,
    report: MergeReport,
}

impl Merger<'_> {
    fn merge_record(&mut self, src: &Record, dest: &mut Record, prefix: &str) -> Result<()> {
        for field in dest.iter_mut() {
            let path = path::join(prefix, &field.name);
            if self.retain.contains(&field.name) {
                if field.value.is_pending() {
                    self.kept(path);
                }
                continue;
            }
            let Some(src_value) = src.get(&field.name) else {
                continue;
            };
            if !field.mutable {
                continue;
            }
            self.merge_value(&field.name, src_value, &mut field.value, &path)?;
        }
        Ok(())
    }

    fn merge_value(&mut self, name: &str, src: &Value, dest: &mut Value, path: &str) -> Result<()> {
        if dest.is_pending() {
            if src.is_pending() {
                return Ok(());
            }
            if self.keep.is_some_and(|keep| keep(name, src)) {
                self.kept(path.to_string());
                return Ok(());
            }
        }
        match (src, dest) {
            (Value::Leaf(s), Value::Leaf(d)) => {
                if d.is_pending() {
                    *d = s.clone();
                    self.filled(path);
                }
                Ok(())
            }
            (Value::Record(s), Value::Record(d)) => self.merge_record_value(s, d, path),
            (Value::List(s), Value::List(d)) => self.merge_list_value(name, s, d, path),
            (s, d) => Err(shape_mismatch(path, d.kind(), s.kind())),
        }
    }

    fn merge_record_value(
        &mut self,
        src: &Knowable<Record>,
        dest: &mut Knowable<Record>,
        path: &str,
    ) -> Result<()> {
        match (src, &mut *dest) {
            // Null in the prior snapshot stays null.
            (Knowable::Null, Knowable::Pending) => {
                *dest = Knowable::Null;
                self.filled(path);
            }
            (Knowable::Known(s), Knowable::Pending) => {
                self.filled(path);
                let mut record = s.as_pending();
                self.merge_record(s, &mut record, path)?;
                *dest = Knowable::Known(record);
            }
            (Knowable::Known(s), Knowable::Known(d)) => self.merge_record(s, d, path)?,
            _ => {}
        }
        Ok(())
    }

    fn merge_list_value(
        &mut self,
        name: &str,
        src: &Knowable<List>,
        dest: &mut Knowable<List>,
        path: &str,
    ) -> Result<()> {
        match (src, &mut *dest) {
            (Knowable::Null, Knowable::Pending) => {
                *dest = Knowable::Null;
                self.filled(path);
            }
            (Knowable::Known(s), Knowable::Pending) => {
                self.filled(path);
                let mut list = s.as_pending();
                self.merge_elements(name, s, &mut list, path)?;
                *dest = Knowable::Known(list);
            }
            // Slots only line up when neither side gained or lost elements.
            (Knowable::Known(s), Knowable::Known(d)) if s.len() == d.len() => {
                self.merge_elements(name, s, d, path)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn merge_elements(&mut self, name: &str, src: &List, dest: &mut List, path: &str) -> Result<()> {
        for (i, (s, d)) in src.iter().zip(dest.iter_mut()).enumerate() {
            self.merge_value(name, s, d, &path::index(path, i))?;
        }
        Ok(())
    }

    fn filled(&mut self, path: &str) {
        info!(path, "copying pending value from prior state");
        self.report.filled.push(path.to_string());
    }

    fn kept(&mut self, path: String) {
        info!(path = %path, "keeping value pending");
        self.report.kept.push(path);
    }
}

fn shape_mismatch(path: &str, expected: ValueKind, got: ValueKind) -> Error {
    Error::ShapeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        got: got.to_string(),
    }
}
