//! Schema definition and validation.
//!
//! Schemas declare the shape of a record tree: which fields exist, their
//! types, and which of them are computed rather than configured. Snapshots
//! can be validated before they are diffed or merged.

use crate::{error::Result, path, Error, Knowable, Record, Scalar, Value};
use serde::{Deserialize, Serialize};

/// Field types supported in schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "of")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Record(RecordSchema),
    /// Homogeneous list of the inner type
    List(Box<FieldType>),
}

impl FieldType {
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    fn pending(&self) -> Value {
        match self {
            FieldType::Record(_) => Value::pending_record(),
            FieldType::List(_) => Value::pending_list(),
            _ => Value::pending_leaf(),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "String"),
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Bool => write!(f, "Bool"),
            FieldType::Record(_) => write!(f, "Record"),
            FieldType::List(inner) => write!(f, "List<{}>", inner),
        }
    }
}

/// Definition of a field in a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Field type
    pub field_type: FieldType,
    /// Whether the value is computed by the system rather than configured
    pub computed: bool,
}

impl FieldDef {
    /// Create a configured field definition.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            computed: false,
        }
    }

    /// Create a computed field definition.
    pub fn computed(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            computed: true,
        }
    }
}

/// Schema for a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSchema {
    /// Field definitions in declared order
    pub fields: Vec<FieldDef>,
}

impl RecordSchema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a record against this schema.
    ///
    /// Every field present must be declared and match its declared type.
    /// Pending and null values are accepted for any type. Declared fields may
    /// be absent.
    pub fn validate(&self, record: &Record) -> Result<()> {
        self.validate_at(record, "")
    }

    fn validate_at(&self, record: &Record, prefix: &str) -> Result<()> {
        for field in record.iter() {
            let path = path::join(prefix, &field.name);
            let def = self
                .field(&field.name)
                .ok_or_else(|| Error::UnknownField(path.clone()))?;
            validate_value(&def.field_type, &field.value, &path)?;
        }
        Ok(())
    }

    /// A record of the declared shape with every field pending.
    pub fn pending_record(&self) -> Record {
        self.fields.iter().fold(Record::new(), |rec, def| {
            rec.with(def.name.clone(), def.field_type.pending())
        })
    }

    /// Replace null computed fields with pending ones, descending into known
    /// nested records and record lists.
    ///
    /// This is how a plan is derived from configuration: computed values not
    /// set explicitly are not known until applied.
    pub fn mark_computed_pending(&self, record: &mut Record) {
        for def in &self.fields {
            let Some(value) = record.get_mut(&def.name) else {
                continue;
            };
            if def.computed && value.is_null() {
                *value = def.field_type.pending();
                continue;
            }
            mark_nested(&def.field_type, value);
        }
    }
}

fn mark_nested(field_type: &FieldType, value: &mut Value) {
    match (field_type, value) {
        (FieldType::Record(schema), Value::Record(Knowable::Known(record))) => {
            schema.mark_computed_pending(record);
        }
        (FieldType::List(inner), Value::List(Knowable::Known(list))) => {
            for element in list.iter_mut() {
                mark_nested(inner, element);
            }
        }
        _ => {}
    }
}

fn validate_value(field_type: &FieldType, value: &Value, path: &str) -> Result<()> {
    let valid = match (field_type, value) {
        (_, v) if !v.is_known() => kind_matches(field_type, v),
        (FieldType::Record(schema), Value::Record(Knowable::Known(record))) => {
            return schema.validate_at(record, path);
        }
        (FieldType::List(inner), Value::List(Knowable::Known(list))) => {
            for (i, element) in list.iter().enumerate() {
                validate_value(inner, element, &path::index(path, i))?;
            }
            return Ok(());
        }
        (scalar_type, Value::Leaf(Knowable::Known(scalar))) => matches!(
            (scalar_type, scalar),
            (FieldType::String, Scalar::String(_))
                | (FieldType::Int, Scalar::Int(_))
                | (FieldType::Float, Scalar::Float(_) | Scalar::Int(_))
                | (FieldType::Bool, Scalar::Bool(_))
        ),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            field: path.to_string(),
            expected: field_type.to_string(),
            got: value_type_name(value),
        })
    }
}

fn kind_matches(field_type: &FieldType, value: &Value) -> bool {
    matches!(
        (field_type, value),
        (FieldType::Record(_), Value::Record(_))
            | (FieldType::List(_), Value::List(_))
            | (
                FieldType::String | FieldType::Int | FieldType::Float | FieldType::Bool,
                Value::Leaf(_)
            )
    )
}

fn value_type_name(value: &Value) -> String {
    match value {
        Value::Leaf(Knowable::Known(scalar)) => scalar.type_name().to_string(),
        Value::Leaf(_) => "Leaf".to_string(),
        Value::Record(_) => "Record".to_string(),
        Value::List(_) => "List".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_config_schema() -> RecordSchema {
        RecordSchema::new(vec![
            FieldDef::new("region_name", FieldType::String),
            FieldDef::new("priority", FieldType::Int),
            FieldDef::computed("container_id", FieldType::String),
        ])
    }

    fn cluster_schema() -> RecordSchema {
        RecordSchema::new(vec![
            FieldDef::new("name", FieldType::String),
            FieldDef::new("backup_enabled", FieldType::Bool),
            FieldDef::computed("state_name", FieldType::String),
            FieldDef::new(
                "region_configs",
                FieldType::list(FieldType::Record(region_config_schema())),
            ),
            FieldDef::new("tags", FieldType::list(FieldType::String)),
            FieldDef::new("disk_size_gb", FieldType::Float),
        ])
    }

    fn region(name: &str, container_id: Value) -> Value {
        Value::record(
            Record::new()
                .with("region_name", Value::string(name))
                .with("priority", Value::int(7))
                .with("container_id", container_id),
        )
    }

    #[test]
    fn validate_valid_record() {
        let record = Record::new()
            .with("name", Value::string("cluster0"))
            .with("backup_enabled", Value::bool(true))
            .with("state_name", Value::pending_leaf())
            .with(
                "region_configs",
                Value::list(vec![region("US_EAST_1", Value::null_leaf())]),
            )
            .with("tags", Value::list(vec![Value::string("prod")]))
            .with("disk_size_gb", Value::int(10));
        assert!(cluster_schema().validate(&record).is_ok());
    }

    #[test]
    fn validate_absent_and_pending_fields() {
        let record = Record::new()
            .with("name", Value::null_leaf())
            .with("region_configs", Value::pending_list());
        assert!(cluster_schema().validate(&record).is_ok());
    }

    #[test]
    fn validate_unknown_field() {
        let record = Record::new().with(
            "region_configs",
            Value::list(vec![Value::record(
                Record::new().with("zone_id", Value::string("z")),
            )]),
        );
        let result = cluster_schema().validate(&record);
        assert!(matches!(result, Err(Error::UnknownField(f)) if f == "region_configs[0].zone_id"));
    }

    #[test]
    fn validate_wrong_type() {
        let record = Record::new().with("backup_enabled", Value::string("yes"));
        let result = cluster_schema().validate(&record);
        assert_eq!(
            result,
            Err(Error::TypeMismatch {
                field: "backup_enabled".into(),
                expected: "Bool".into(),
                got: "String".into(),
            })
        );
    }

    #[test]
    fn validate_wrong_kind() {
        let record = Record::new().with("tags", Value::pending_record());
        let result = cluster_schema().validate(&record);
        assert!(matches!(result, Err(Error::TypeMismatch { field, got, .. }) if field == "tags" && got == "Record"));

        let record = Record::new().with("tags", Value::list(vec![Value::int(1)]));
        let result = cluster_schema().validate(&record);
        assert!(matches!(result, Err(Error::TypeMismatch { field, .. }) if field == "tags[0]"));
    }

    #[test]
    fn pending_record_has_declared_shape() {
        let record = cluster_schema().pending_record();
        assert_eq!(
            record.field_names().collect::<Vec<_>>(),
            ["name", "backup_enabled", "state_name", "region_configs", "tags", "disk_size_gb"]
        );
        assert_eq!(record.get("region_configs"), Some(&Value::pending_list()));
        assert_eq!(record.get("name"), Some(&Value::pending_leaf()));
        assert!(cluster_schema().validate(&record).is_ok());
    }

    #[test]
    fn mark_computed_pending_descends_into_lists() {
        let mut record = Record::new()
            .with("name", Value::null_leaf())
            .with("state_name", Value::null_leaf())
            .with(
                "region_configs",
                Value::list(vec![
                    region("US_EAST_1", Value::null_leaf()),
                    region("EU_WEST_1", Value::string("c1")),
                ]),
            );
        cluster_schema().mark_computed_pending(&mut record);

        assert_eq!(record.get("name"), Some(&Value::null_leaf()));
        assert_eq!(record.get("state_name"), Some(&Value::pending_leaf()));
        assert_eq!(
            record.get("region_configs"),
            Some(&Value::list(vec![
                region("US_EAST_1", Value::pending_leaf()),
                region("EU_WEST_1", Value::string("c1")),
            ]))
        );
    }

    #[test]
    fn field_type_display() {
        assert_eq!(FieldType::String.to_string(), "String");
        assert_eq!(FieldType::list(FieldType::Int).to_string(), "List<Int>");
        assert_eq!(
            FieldType::Record(RecordSchema::default()).to_string(),
            "Record"
        );
    }

    #[test]
    fn schema_serialization() {
        let schema = cluster_schema();
        let json = serde_json::to_string(&schema).unwrap();
        let parsed: RecordSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, parsed);
    }
}
