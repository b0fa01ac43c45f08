//! Shared test trees: a cluster-like resource with nested records and lists.

use crate::{Knowable, Record, Scalar, Value};
use proptest::prelude::*;

/// Root record with every field null.
pub fn simple_model() -> Record {
    Record::new()
        .with("replication_specs", Value::null_list())
        .with("project_id", Value::null_leaf())
        .with("name", Value::null_leaf())
        .with("advanced_config", Value::null_record())
        .with("backup_enabled", Value::null_leaf())
}

pub fn advanced_config(javascript_enabled: bool) -> Value {
    Value::record(Record::new().with("javascript_enabled", Value::bool(javascript_enabled)))
}

pub fn auto_scaling_false_and_null() -> Value {
    Value::record(
        Record::new()
            .with("compute_min_instance_size", Value::null_leaf())
            .with("compute_max_instance_size", Value::null_leaf())
            .with("compute_enabled", Value::bool(false))
            .with("disk_gb_enabled", Value::bool(false)),
    )
}

pub fn spec(instance_size: &str, node_count: Value) -> Value {
    Value::record(
        Record::new()
            .with("instance_size", Value::string(instance_size))
            .with("node_count", node_count),
    )
}

pub fn region_config(provider_name: Value, spec: Value) -> Record {
    Record::new()
        .with("auto_scaling", auto_scaling_false_and_null())
        .with("provider_name", provider_name)
        .with("region_name", Value::string("US_EAST_1"))
        .with("spec", spec)
}

pub fn region_config_src() -> Record {
    region_config(Value::string("aws"), spec("M10", Value::int(3)))
}

/// Provider name and spec still to be computed.
pub fn region_config_dest() -> Record {
    region_config(Value::pending_leaf(), Value::pending_record())
}

pub fn region_config_node_count_pending() -> Record {
    region_config(Value::string("aws"), spec("M10", Value::pending_leaf()))
}

pub fn region_config_spec_pending() -> Record {
    region_config(Value::string("aws"), Value::pending_record())
}

/// A list holding a single replication spec.
pub fn replication_specs(zone_name: Value, region_configs: Vec<Record>) -> Value {
    Value::list(vec![Value::record(replication_spec(zone_name, region_configs))])
}

pub fn replication_spec(zone_name: Value, region_configs: Vec<Record>) -> Record {
    Record::new()
        .with(
            "region_configs",
            Value::list(region_configs.into_iter().map(Value::record).collect()),
        )
        .with("zone_name", zone_name)
}

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::bool),
        (-5i64..5).prop_map(Value::int),
        prop::num::f64::ANY.prop_map(Value::float),
        "[a-c]{0,2}".prop_map(|s| Value::string(s)),
    ]
}

fn record_from(values: Vec<Value>) -> Record {
    values
        .into_iter()
        .enumerate()
        .fold(Record::new(), |rec, (i, v)| rec.with(format!("f{}", i), v))
}

/// Fully known records with nested records and uniform lists.
pub fn arb_known_record() -> impl Strategy<Value = Record> {
    let value = arb_leaf().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4)
                .prop_map(|vals| Value::record(record_from(vals))),
            prop::collection::vec(arb_leaf(), 0..3).prop_map(Value::list),
            prop::collection::vec(prop::collection::vec(inner, 0..3), 0..3).prop_map(|recs| {
                Value::list(
                    recs.into_iter()
                        .map(|vals| Value::record(record_from(vals)))
                        .collect(),
                )
            }),
        ]
    });
    prop::collection::vec(value, 1..5).prop_map(record_from)
}

/// Same shape as `record`, every known leaf replaced by a different value.
pub fn shift_leaves(record: &Record) -> Record {
    record
        .iter()
        .fold(Record::new(), |rec, f| rec.with(f.name.clone(), shift_value(&f.value)))
}

fn shift_value(value: &Value) -> Value {
    match value {
        Value::Leaf(Knowable::Known(scalar)) => match scalar {
            Scalar::Bool(b) => Value::bool(!b),
            Scalar::Int(i) => Value::int(i + 100),
            Scalar::Float(x) => Value::float(x + 1.0),
            Scalar::String(s) => Value::string(format!("{}~", s)),
        },
        Value::Record(Knowable::Known(record)) => Value::record(shift_leaves(record)),
        Value::List(Knowable::Known(list)) => Value::list(list.iter().map(shift_value).collect()),
        other => other.clone(),
    }
}

/// Turn values pending at any depth, one mask bit per visited value.
///
/// A set bit makes the value pending; a clear bit keeps it and descends into
/// known records and lists. Bits are reused cyclically.
pub fn punch_pending(record: &Record, mask: &[bool]) -> Record {
    let mut bits = mask.iter().copied().cycle();
    punch_record(record, &mut bits)
}

fn punch_record(record: &Record, bits: &mut impl Iterator<Item = bool>) -> Record {
    record.iter().fold(Record::new(), |rec, f| {
        let value = punch_value(&f.value, bits);
        rec.with(f.name.clone(), value)
    })
}

fn punch_value(value: &Value, bits: &mut impl Iterator<Item = bool>) -> Value {
    if bits.next().unwrap_or(false) {
        return value.as_pending();
    }
    match value {
        Value::Record(Knowable::Known(record)) => Value::record(punch_record(record, bits)),
        Value::List(Knowable::Known(list)) => {
            Value::list(list.iter().map(|v| punch_value(v, bits)).collect())
        }
        other => other.clone(),
    }
}

/// Every known leaf of `record` with its dotted path.
pub fn known_leaves(record: &Record) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    collect_record(record, "", &mut out);
    out
}

fn collect_record(record: &Record, prefix: &str, out: &mut Vec<(String, Value)>) {
    for field in record.iter() {
        collect_value(&field.value, &crate::path::join(prefix, &field.name), out);
    }
}

fn collect_value(value: &Value, path: &str, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Leaf(Knowable::Known(_)) => out.push((path.to_string(), value.clone())),
        Value::Record(Knowable::Known(record)) => collect_record(record, path, out),
        Value::List(Knowable::Known(list)) => {
            for (i, element) in list.iter().enumerate() {
                collect_value(element, &crate::path::index(path, i), out);
            }
        }
        _ => {}
    }
}
