//! Model contracts shared by all repositories.
//!
//! # Responsibility
//! - Describe persisted entities (table, key, columns, fillable set).
//! - Define the row-parsing and relation-loading seam repositories call into.
//! - Convert between SQL values, JSON values, and erased records.
//!
//! # Invariants
//! - A descriptor is validated before any repository is built on it.
//! - The fillable set is always a subset of the declared columns.

use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, Row};
use serde::Serialize;
use serde_json::{Number, Value as JsonValue};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use crate::repo::crud::{RepoError, RepoResult};

/// Erased row representation keyed by column name.
pub type Record = BTreeMap<String, JsonValue>;

/// Static description of a persisted entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Canonical entity name in studly case, e.g. `Ticket`.
    pub entity: &'static str,
    /// Backing table name.
    pub table: &'static str,
    /// Primary key column.
    pub primary_key: &'static str,
    /// All persisted columns, in select order.
    pub columns: &'static [&'static str],
    /// Columns writable through create/update and usable in filters.
    pub fillable: &'static [&'static str],
}

impl ModelDescriptor {
    /// Returns true when `column` is declared on this entity.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|candidate| *candidate == column)
    }

    /// Returns true when `field` may be written or filtered on.
    pub fn is_fillable(&self, field: &str) -> bool {
        self.fillable.iter().any(|candidate| *candidate == field)
    }

    /// Checks internal consistency of the descriptor.
    ///
    /// # Errors
    /// - Empty entity or table name.
    /// - Empty column list.
    /// - Primary key or fillable field not present in `columns`.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.entity.trim().is_empty() {
            return Err(DescriptorError::EmptyEntity);
        }
        if self.table.trim().is_empty() {
            return Err(DescriptorError::EmptyTable {
                entity: self.entity,
            });
        }
        if self.columns.is_empty() {
            return Err(DescriptorError::NoColumns {
                entity: self.entity,
            });
        }
        if !self.has_column(self.primary_key) {
            return Err(DescriptorError::PrimaryKeyNotDeclared {
                entity: self.entity,
                primary_key: self.primary_key,
            });
        }
        for field in self.fillable {
            if !self.has_column(field) {
                return Err(DescriptorError::FillableNotDeclared {
                    entity: self.entity,
                    field,
                });
            }
        }
        Ok(())
    }
}

/// Structural problems in a [`ModelDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    EmptyEntity,
    EmptyTable {
        entity: &'static str,
    },
    NoColumns {
        entity: &'static str,
    },
    PrimaryKeyNotDeclared {
        entity: &'static str,
        primary_key: &'static str,
    },
    FillableNotDeclared {
        entity: &'static str,
        field: &'static str,
    },
}

impl Display for DescriptorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEntity => write!(f, "descriptor entity name is empty"),
            Self::EmptyTable { entity } => {
                write!(f, "descriptor for `{entity}` has an empty table name")
            }
            Self::NoColumns { entity } => {
                write!(f, "descriptor for `{entity}` declares no columns")
            }
            Self::PrimaryKeyNotDeclared {
                entity,
                primary_key,
            } => write!(
                f,
                "descriptor for `{entity}` names primary key `{primary_key}` outside its columns"
            ),
            Self::FillableNotDeclared { entity, field } => write!(
                f,
                "descriptor for `{entity}` marks `{field}` fillable but does not declare it"
            ),
        }
    }
}

impl Error for DescriptorError {}

/// Primary key value of a persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Returns the id as a SQL bind value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(value) => Value::Integer(*value),
            Self::Text(value) => Value::Text(value.clone()),
        }
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Uuid> for RecordId {
    fn from(value: Uuid) -> Self {
        Self::Text(value.to_string())
    }
}

/// Typed persisted entity.
///
/// Implementations pair a Rust struct with its [`ModelDescriptor`] and own
/// row parsing. `load_relations` is a hook for eager loading; the default
/// implementation ignores every relation name.
pub trait Model: Sized + Serialize {
    /// Returns the static descriptor for this entity.
    fn descriptor() -> &'static ModelDescriptor;

    /// Parses one row selected with the descriptor's column order.
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;

    /// Loads named relations onto a parsed model.
    ///
    /// Unknown relation names are ignored, mirroring the silent-skip policy
    /// for filter and sort fields.
    fn load_relations(&mut self, _conn: &Connection, _relations: &[&str]) -> RepoResult<()> {
        Ok(())
    }
}

/// Serializes a model into an erased [`Record`].
pub fn record_from_model<M: Model>(model: &M) -> RepoResult<Record> {
    let value = serde_json::to_value(model).map_err(|err| {
        RepoError::InvalidData(format!(
            "failed to serialize `{}` model: {err}",
            M::descriptor().entity
        ))
    })?;
    match value {
        JsonValue::Object(map) => Ok(map.into_iter().collect()),
        other => Err(RepoError::InvalidData(format!(
            "`{}` model serialized to non-object JSON: {other}",
            M::descriptor().entity
        ))),
    }
}

/// Converts one SQL value reference into JSON.
pub fn sql_value_to_json(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(value) => JsonValue::Number(Number::from(value)),
        ValueRef::Real(value) => Number::from_f64(value)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => JsonValue::Array(
            bytes
                .iter()
                .map(|byte| JsonValue::Number(Number::from(*byte)))
                .collect(),
        ),
    }
}

/// Converts one JSON value into a SQL bind value.
///
/// # Errors
/// - Arrays and objects have no scalar SQL representation.
pub fn json_value_to_sql(value: &JsonValue) -> RepoResult<Value> {
    match value {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(value) => Ok(Value::Integer(i64::from(*value))),
        JsonValue::Number(number) => {
            if let Some(value) = number.as_i64() {
                Ok(Value::Integer(value))
            } else if let Some(value) = number.as_f64() {
                Ok(Value::Real(value))
            } else {
                Err(RepoError::InvalidData(format!(
                    "numeric value `{number}` has no SQL representation"
                )))
            }
        }
        JsonValue::String(value) => Ok(Value::Text(value.clone())),
        JsonValue::Array(_) | JsonValue::Object(_) => Err(RepoError::InvalidData(
            "composite JSON values cannot be bound as SQL scalars".to_string(),
        )),
    }
}
