//! Structural diff between two snapshots of a record tree.
//!
//! # Algorithm
//!
//! 1. Walk `dest` fields in declared order
//! 2. Skip fields that are pending or null in `dest`, or equal to `src`
//! 3. Emit the field path, then recurse into records and lists
//! 4. Retract the field path again if the recursion found nothing finer
//!
//! Lists are compared slot by slot: a slot present in both snapshots is
//! diffed recursively and reported as `name[i]`, a slot only in `src` as
//! `name[-i]` and a slot only in `dest` as `name[+i]`.
//!
//! Pending or null values in `dest` never count as changes: absence of
//! information is not evidence of change.

use crate::{
    changes::AttributeChanges, error::Result, path, Error, Knowable, List, Record, Value,
};
use tracing::debug;

/// Compute the change paths between two snapshots of the same record shape.
///
/// Returns an empty set (never `None`) when nothing changed. Fails with
/// [`Error::ShapeMismatch`] when a field has a different kind in each snapshot.
pub fn diff(src: &Record, dest: &Record) -> Result<AttributeChanges> {
    let mut changes = Vec::new();
    diff_records(Some(src), dest, "", &mut changes)?;
    debug!(count = changes.len(), "computed attribute changes");
    Ok(AttributeChanges::new(changes))
}

/// `src == None` means the whole source record is absent (null or pending),
/// so every field compares against null.
fn diff_records(
    src: Option<&Record>,
    dest: &Record,
    prefix: &str,
    out: &mut Vec<String>,
) -> Result<()> {
    for field in dest.iter() {
        let path = path::join(prefix, &field.name);
        let src_value = src.and_then(|s| s.get(&field.name));
        diff_value(src_value, &field.value, &path, out)?;
    }
    Ok(())
}

fn diff_value(src: Option<&Value>, dest: &Value, path: &str, out: &mut Vec<String>) -> Result<()> {
    if !dest.is_known() {
        return Ok(());
    }
    if let Some(src) = src {
        check_kind(src, dest, path)?;
        if src == dest {
            return Ok(());
        }
    }

    let mark = out.len();
    out.push(path.to_string());
    match dest {
        Value::Record(Knowable::Known(record)) => {
            diff_records(src.and_then(Value::as_record), record, path, out)?;
            retract_unrefined(out, mark);
        }
        Value::List(Knowable::Known(list)) => {
            diff_lists(src.and_then(Value::as_list), list, path, out)?;
            retract_unrefined(out, mark);
        }
        _ => {}
    }
    Ok(())
}

fn diff_lists(src: Option<&List>, dest: &List, path: &str, out: &mut Vec<String>) -> Result<()> {
    check_uniform(dest, path)?;
    let src_len = src.map_or(0, List::len);
    for i in 0..src_len.max(dest.len()) {
        match (src.and_then(|s| s.get(i)), dest.get(i)) {
            (Some(s), Some(d)) => diff_value(Some(s), d, &path::index(path, i), out)?,
            (Some(_), None) => out.push(path::removed(path, i)),
            (None, Some(_)) => out.push(path::added(path, i)),
            (None, None) => {}
        }
    }
    Ok(())
}

// Drop the path pushed at `mark` when nothing was appended after it.
fn retract_unrefined(out: &mut Vec<String>, mark: usize) {
    if out.len() == mark + 1 {
        out.truncate(mark);
    }
}

fn check_kind(src: &Value, dest: &Value, path: &str) -> Result<()> {
    if src.kind() == dest.kind() {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            path: path.to_string(),
            expected: dest.kind().to_string(),
            got: src.kind().to_string(),
        })
    }
}

fn check_uniform(list: &List, path: &str) -> Result<()> {
    let mut kinds = list.iter().map(Value::kind);
    if let Some(first) = kinds.next() {
        if let Some(other) = kinds.find(|k| *k != first) {
            return Err(Error::ShapeMismatch {
                path: path.to_string(),
                expected: first.to_string(),
                got: other.to_string(),
            });
        }
    }
    Ok(())
}
