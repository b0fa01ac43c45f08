//! Tree model shared by the diff and merge engines.
//!
//! A configuration snapshot is a [`Record`] of named fields. Every field holds
//! a [`Value`]: a scalar leaf, a nested record, or an ordered list. Each value
//! carries its knownness explicitly through [`Knowable`], so "not computed
//! yet" ([`Knowable::Pending`]) and "explicitly unset" ([`Knowable::Null`])
//! are distinct from a concrete value and keep the kind of the slot they
//! occupy.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete scalar carried by a leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

// Floats compare by bit pattern so every scalar equals itself, NaN included.
impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a.to_bits() == b.to_bits(),
            (Scalar::String(a), Scalar::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Scalar {
    /// Name of the scalar type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "Bool",
            Scalar::Int(_) => "Int",
            Scalar::Float(_) => "Float",
            Scalar::String(_) => "String",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// Knownness of a slot in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "value")]
pub enum Knowable<T> {
    /// The concrete value is determined.
    Known(T),
    /// The value will be computed later.
    Pending,
    /// The value is explicitly absent.
    Null,
}

impl<T> Knowable<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Knowable::Known(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Knowable::Pending)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Knowable::Null)
    }

    /// Borrow the concrete value, if known.
    pub fn as_known(&self) -> Option<&T> {
        match self {
            Knowable::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Mutably borrow the concrete value, if known.
    pub fn as_known_mut(&mut self) -> Option<&mut T> {
        match self {
            Knowable::Known(v) => Some(v),
            _ => None,
        }
    }
}

/// The structural kind of a value, independent of its knownness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Leaf,
    Record,
    List,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Leaf => write!(f, "leaf"),
            ValueKind::Record => write!(f, "record"),
            ValueKind::List => write!(f, "list"),
        }
    }
}

/// A node in the configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum Value {
    Leaf(Knowable<Scalar>),
    Record(Knowable<Record>),
    List(Knowable<List>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::Leaf(Knowable::Known(Scalar::String(s.into())))
    }

    pub fn int(i: i64) -> Self {
        Value::Leaf(Knowable::Known(Scalar::Int(i)))
    }

    pub fn float(x: f64) -> Self {
        Value::Leaf(Knowable::Known(Scalar::Float(x)))
    }

    pub fn bool(b: bool) -> Self {
        Value::Leaf(Knowable::Known(Scalar::Bool(b)))
    }

    pub fn record(record: Record) -> Self {
        Value::Record(Knowable::Known(record))
    }

    pub fn list(elements: Vec<Value>) -> Self {
        Value::List(Knowable::Known(List::new(elements)))
    }

    pub fn pending_leaf() -> Self {
        Value::Leaf(Knowable::Pending)
    }

    pub fn pending_record() -> Self {
        Value::Record(Knowable::Pending)
    }

    pub fn pending_list() -> Self {
        Value::List(Knowable::Pending)
    }

    pub fn null_leaf() -> Self {
        Value::Leaf(Knowable::Null)
    }

    pub fn null_record() -> Self {
        Value::Record(Knowable::Null)
    }

    pub fn null_list() -> Self {
        Value::List(Knowable::Null)
    }

    /// Null value of the given kind.
    pub fn null_of(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Leaf => Value::null_leaf(),
            ValueKind::Record => Value::null_record(),
            ValueKind::List => Value::null_list(),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Leaf(_) => ValueKind::Leaf,
            Value::Record(_) => ValueKind::Record,
            Value::List(_) => ValueKind::List,
        }
    }

    pub fn is_pending(&self) -> bool {
        match self {
            Value::Leaf(v) => v.is_pending(),
            Value::Record(v) => v.is_pending(),
            Value::List(v) => v.is_pending(),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Leaf(v) => v.is_null(),
            Value::Record(v) => v.is_null(),
            Value::List(v) => v.is_null(),
        }
    }

    pub fn is_known(&self) -> bool {
        !self.is_pending() && !self.is_null()
    }

    /// A pending value of the same kind.
    pub fn as_pending(&self) -> Value {
        match self {
            Value::Leaf(_) => Value::pending_leaf(),
            Value::Record(_) => Value::pending_record(),
            Value::List(_) => Value::pending_list(),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Leaf(v) => v.as_known(),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(v) => v.as_known(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(v) => v.as_known(),
            _ => None,
        }
    }

    /// Build a fully known tree from plain JSON.
    ///
    /// Objects become records with fields sorted alphabetically by key, since
    /// `serde_json::Map` does not keep insertion order. Arrays become lists and
    /// `null` becomes a null leaf.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::null_leaf(),
            serde_json::Value::Bool(b) => Value::bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::int(i),
                None => Value::float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::string(s.clone()),
            serde_json::Value::Array(items) => {
                Value::list(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::record(
                map.iter()
                    .fold(Record::new(), |rec, (k, v)| rec.with(k, Value::from_json(v))),
            ),
        }
    }

    /// Render a tree as plain JSON. Null values of any kind become `null`.
    ///
    /// Fails on pending values, which have no JSON representation.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        match self {
            Value::Leaf(Knowable::Known(s)) => Ok(match s {
                Scalar::Bool(b) => serde_json::Value::Bool(*b),
                Scalar::Int(i) => serde_json::Value::from(*i),
                Scalar::Float(x) => serde_json::Number::from_f64(*x)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| Error::InvalidJson(format!("non-finite float {}", x)))?,
                Scalar::String(s) => serde_json::Value::String(s.clone()),
            }),
            Value::Record(Knowable::Known(rec)) => rec.to_json(),
            Value::List(Knowable::Known(list)) => Ok(serde_json::Value::Array(
                list.iter().map(Value::to_json).collect::<Result<_>>()?,
            )),
            v if v.is_null() => Ok(serde_json::Value::Null),
            _ => Err(Error::InvalidJson("pending value".into())),
        }
    }
}

fn default_mutable() -> bool {
    true
}

/// A named field of a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Declared field name
    pub name: String,
    /// Field value
    pub value: Value,
    /// Whether the merge engine may replace this field
    #[serde(default = "default_mutable")]
    pub mutable: bool,
}

// Mutability is a merge permission, not part of the field's content.
impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

/// An ordered collection of named fields.
///
/// Field order is the declared order and drives traversal order in the diff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Builder-style method to set a field.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder-style method to set a field the merge engine must not replace.
    pub fn with_immutable(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        self.insert(name.clone(), value);
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.mutable = false;
        }
        self
    }

    /// Set a field, replacing an existing one of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(Field {
                name,
                value,
                mutable: true,
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.field(name).map(|f| &f.value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|f| f.name == name)
            .map(|f| &mut f.value)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Fields in declared order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Field> {
        self.fields.iter_mut()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True if any direct field is pending. Nested fields are not inspected.
    pub fn has_pending(&self) -> bool {
        self.fields.iter().any(|f| f.value.is_pending())
    }

    /// Same fields, every value replaced by a pending value of its kind.
    pub fn as_pending(&self) -> Record {
        Record {
            fields: self
                .fields
                .iter()
                .map(|f| Field {
                    name: f.name.clone(),
                    value: f.value.as_pending(),
                    mutable: f.mutable,
                })
                .collect(),
        }
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        let mut map = serde_json::Map::new();
        for field in &self.fields {
            map.insert(field.name.clone(), field.value.to_json()?);
        }
        Ok(serde_json::Value::Object(map))
    }
}

/// An ordered sequence of values of uniform shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct List {
    elements: Vec<Value>,
}

impl List {
    pub fn new(elements: Vec<Value>) -> Self {
        Self { elements }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.elements.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.elements.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Same length, every element replaced by a pending value of its kind.
    pub fn as_pending(&self) -> List {
        List {
            elements: self.elements.iter().map(Value::as_pending).collect(),
        }
    }
}
