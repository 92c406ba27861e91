//! Generic CRUD repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over any table described by a `ModelDescriptor`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Construction validates the descriptor and the backing schema; a built
//!   repository never discovers a missing table or column at query time.
//! - Field names reach SQL only after passing descriptor validation.
//! - Write paths touch fillable columns only.

use crate::config::RepoConfig;
use crate::db::DbError;
use crate::model::{
    sql_value_to_json, DescriptorError, Model, ModelDescriptor, Record, RecordId,
};
use crate::query::{
    apply_order_by, apply_where, Listing, Page, QueryParams, DEFAULT_PAGE_SIZE,
};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound {
        entity: &'static str,
        id: RecordId,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidDescriptor(DescriptorError),
    UnknownColumn {
        entity: &'static str,
        column: String,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table is missing: {table}")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column is missing: {table}.{column}")
            }
            Self::InvalidDescriptor(err) => write!(f, "{err}"),
            Self::UnknownColumn { entity, column } => {
                write!(f, "unknown column `{column}` on {entity}")
            }
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidDescriptor(err) => Some(err),
            Self::NotFound { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. }
            | Self::UnknownColumn { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<DescriptorError> for RepoError {
    fn from(value: DescriptorError) -> Self {
        Self::InvalidDescriptor(value)
    }
}

/// Repository interface for typed CRUD operations.
pub trait CrudRepository {
    type Model: Model;

    /// Lists one page, eagerly loading `with` relations onto each row.
    fn all(&self, with: &[&str], params: &QueryParams) -> RepoResult<Page<Self::Model>>;
    /// Counts all rows of the entity.
    fn count(&self) -> RepoResult<u64>;
    /// Gets one row by primary key.
    fn find(&self, id: &RecordId) -> RepoResult<Option<Self::Model>>;
    /// Gets one row by primary key or fails with `NotFound`.
    fn find_or_fail(&self, id: &RecordId) -> RepoResult<Self::Model>;
    /// Lists one page of rows where `field` equals `value`.
    fn find_equals(
        &self,
        field: &str,
        value: Value,
        params: &QueryParams,
    ) -> RepoResult<Page<Self::Model>>;
    /// Lists rows where `field` contains `value` as a substring.
    ///
    /// A `None` page size returns the complete result set. A `Some` page
    /// size opts into paged output; the page itself uses
    /// [`DEFAULT_PAGE_SIZE`], not the supplied value.
    fn find_by(
        &self,
        field: &str,
        value: &str,
        per_page: Option<u32>,
    ) -> RepoResult<Listing<Self::Model>>;
    /// Inserts one row from fillable fields and returns the stored model.
    ///
    /// Non-fillable fields are dropped without error. Under uuid key
    /// generation the primary key is always generated here; a caller-supplied
    /// key value is replaced.
    fn create(&self, fields: &[(&str, Value)]) -> RepoResult<Self::Model>;
    /// Inserts many rows in one statement and returns the inserted count.
    ///
    /// Rows are written exactly as given: no fillable filtering and no key
    /// generation. Every row must carry the columns named by the first row.
    fn insert(&self, rows: &[Vec<(&str, Value)>]) -> RepoResult<usize>;
    /// Updates fillable fields of one row and returns the stored model.
    fn update(&self, id: &RecordId, fields: &[(&str, Value)]) -> RepoResult<Self::Model>;
    /// Deletes one row by primary key.
    fn delete(&self, id: &RecordId) -> RepoResult<()>;
    /// Projects the named columns of every row into erased records.
    fn get_fields(&self, fields: &[&str]) -> RepoResult<Vec<Record>>;
    /// Returns distinct display values of one column, keyed by themselves.
    ///
    /// Null values are skipped.
    fn get_selectable_field(&self, field: &str) -> RepoResult<BTreeMap<String, String>>;
}

/// SQLite-backed repository for one model type.
#[derive(Debug)]
pub struct SqliteCrudRepository<'conn, M: Model> {
    conn: &'conn Connection,
    use_uuid: bool,
    select_sql: String,
    _model: PhantomData<fn() -> M>,
}

impl<'conn, M: Model> SqliteCrudRepository<'conn, M> {
    /// Constructs a repository after validating descriptor and schema.
    ///
    /// # Errors
    /// - `InvalidDescriptor` when the model descriptor is inconsistent.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the connected
    ///   database does not carry the declared storage.
    pub fn try_new(conn: &'conn Connection, config: &RepoConfig) -> RepoResult<Self> {
        let descriptor = M::descriptor();
        descriptor.validate()?;
        ensure_storage_ready(conn, descriptor)?;

        let select_sql = format!(
            "SELECT {} FROM {}",
            descriptor.columns.join(", "),
            descriptor.table
        );

        Ok(Self {
            conn,
            use_uuid: config.use_uuid,
            select_sql,
            _model: PhantomData,
        })
    }

    fn descriptor(&self) -> &'static ModelDescriptor {
        M::descriptor()
    }

    fn require_column(&self, column: &str) -> RepoResult<()> {
        if self.descriptor().has_column(column) {
            return Ok(());
        }
        Err(RepoError::UnknownColumn {
            entity: self.descriptor().entity,
            column: column.to_string(),
        })
    }

    /// Runs one paged query. `tail` must start with ` WHERE 1 = 1`.
    fn paged_query(
        &self,
        mut tail: String,
        mut bind_values: Vec<Value>,
        params: &QueryParams,
    ) -> RepoResult<Page<M>> {
        let descriptor = self.descriptor();
        apply_where(&mut tail, &mut bind_values, &params.filter, descriptor);

        let count_sql = format!("SELECT COUNT(*) FROM {}{tail}", descriptor.table);
        let total: i64 = self.conn.query_row(
            &count_sql,
            params_from_iter(bind_values.clone()),
            |row| row.get(0),
        )?;
        let total = u64::try_from(total).unwrap_or_default();

        apply_order_by(&mut tail, params.sort.as_ref(), descriptor);

        let per_page = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        tail.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(per_page)));
        if params.offset > 0 {
            tail.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(params.offset)));
        }

        let sql = format!("{}{tail}", self.select_sql);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(M::from_row(row)?);
        }

        Ok(Page {
            items,
            total,
            per_page,
            offset: params.offset,
        })
    }
}

impl<M: Model> CrudRepository for SqliteCrudRepository<'_, M> {
    type Model = M;

    fn all(&self, with: &[&str], params: &QueryParams) -> RepoResult<Page<M>> {
        let mut page = self.paged_query(String::from(" WHERE 1 = 1"), Vec::new(), params)?;
        if !with.is_empty() {
            for item in &mut page.items {
                item.load_relations(self.conn, with)?;
            }
        }
        Ok(page)
    }

    fn count(&self) -> RepoResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {};", self.descriptor().table);
        let total: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    fn find(&self, id: &RecordId) -> RepoResult<Option<M>> {
        let sql = format!(
            "{} WHERE {} = ? LIMIT 1;",
            self.select_sql,
            self.descriptor().primary_key
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_value()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(M::from_row(row)?));
        }
        Ok(None)
    }

    fn find_or_fail(&self, id: &RecordId) -> RepoResult<M> {
        self.find(id)?.ok_or_else(|| RepoError::NotFound {
            entity: self.descriptor().entity,
            id: id.clone(),
        })
    }

    fn find_equals(&self, field: &str, value: Value, params: &QueryParams) -> RepoResult<Page<M>> {
        self.require_column(field)?;
        let tail = format!(" WHERE 1 = 1 AND {field} = ?");
        self.paged_query(tail, vec![value], params)
    }

    fn find_by(&self, field: &str, value: &str, per_page: Option<u32>) -> RepoResult<Listing<M>> {
        self.require_column(field)?;
        let pattern = Value::Text(format!("%{value}%"));

        if per_page.is_none() {
            let sql = format!("{} WHERE {field} LIKE ?;", self.select_sql);
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query([pattern])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                items.push(M::from_row(row)?);
            }
            return Ok(Listing::Complete(items));
        }

        let tail = format!(" WHERE 1 = 1 AND {field} LIKE ?");
        let page = self.paged_query(tail, vec![pattern], &QueryParams::default())?;
        Ok(Listing::Paged(page))
    }

    fn create(&self, fields: &[(&str, Value)]) -> RepoResult<M> {
        let descriptor = self.descriptor();
        let mut accepted: Vec<(&str, Value)> = fields
            .iter()
            .filter(|(field, _)| descriptor.is_fillable(field))
            .map(|(field, value)| (*field, value.clone()))
            .collect();

        let generated_key = if self.use_uuid {
            let key = Uuid::new_v4().to_string();
            accepted.retain(|(field, _)| *field != descriptor.primary_key);
            accepted.push((descriptor.primary_key, Value::Text(key.clone())));
            Some(key)
        } else {
            None
        };

        if accepted.is_empty() {
            let sql = format!("INSERT INTO {} DEFAULT VALUES;", descriptor.table);
            self.conn.execute(&sql, [])?;
        } else {
            let columns = accepted
                .iter()
                .map(|(field, _)| *field)
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = vec!["?"; accepted.len()].join(", ");
            let sql = format!(
                "INSERT INTO {} ({columns}) VALUES ({placeholders});",
                descriptor.table
            );
            let bind_values: Vec<Value> = accepted.into_iter().map(|(_, value)| value).collect();
            self.conn.execute(&sql, params_from_iter(bind_values))?;
        }

        let id = match generated_key {
            Some(key) => RecordId::Text(key),
            None => RecordId::Int(self.conn.last_insert_rowid()),
        };
        self.find_or_fail(&id)
    }

    fn insert(&self, rows: &[Vec<(&str, Value)>]) -> RepoResult<usize> {
        let descriptor = self.descriptor();
        let Some(first) = rows.first() else {
            return Ok(0);
        };

        let columns: Vec<&str> = first.iter().map(|(field, _)| *field).collect();
        if columns.is_empty() {
            return Err(RepoError::InvalidData(
                "bulk insert rows must name at least one column".to_string(),
            ));
        }
        for column in &columns {
            self.require_column(column)?;
        }

        let row_placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
        let all_placeholders = vec![row_placeholders.as_str(); rows.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {all_placeholders};",
            descriptor.table,
            columns.join(", ")
        );

        let mut bind_values: Vec<Value> = Vec::with_capacity(columns.len() * rows.len());
        for row in rows {
            for column in &columns {
                let value = row
                    .iter()
                    .find(|(field, _)| field == column)
                    .map(|(_, value)| value.clone())
                    .ok_or_else(|| {
                        RepoError::InvalidData(format!(
                            "bulk insert row is missing column `{column}`"
                        ))
                    })?;
                bind_values.push(value);
            }
        }

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(changed)
    }

    fn update(&self, id: &RecordId, fields: &[(&str, Value)]) -> RepoResult<M> {
        let descriptor = self.descriptor();
        let current = self.find_or_fail(id)?;

        let accepted: Vec<(&str, Value)> = fields
            .iter()
            .filter(|(field, _)| {
                descriptor.is_fillable(field) && *field != descriptor.primary_key
            })
            .map(|(field, value)| (*field, value.clone()))
            .collect();
        if accepted.is_empty() {
            return Ok(current);
        }

        let assignments = accepted
            .iter()
            .map(|(field, _)| format!("{field} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {} = ?;",
            descriptor.table, descriptor.primary_key
        );
        let mut bind_values: Vec<Value> =
            accepted.into_iter().map(|(_, value)| value).collect();
        bind_values.push(id.to_value());

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: descriptor.entity,
                id: id.clone(),
            });
        }

        self.find_or_fail(id)
    }

    fn delete(&self, id: &RecordId) -> RepoResult<()> {
        let descriptor = self.descriptor();
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?;",
            descriptor.table, descriptor.primary_key
        );
        let changed = self.conn.execute(&sql, [id.to_value()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: descriptor.entity,
                id: id.clone(),
            });
        }
        Ok(())
    }

    fn get_fields(&self, fields: &[&str]) -> RepoResult<Vec<Record>> {
        let descriptor = self.descriptor();
        let selected: Vec<&str> = if fields.is_empty() {
            descriptor.columns.to_vec()
        } else {
            fields.to_vec()
        };
        for field in &selected {
            self.require_column(field)?;
        }

        let sql = format!("SELECT {} FROM {};", selected.join(", "), descriptor.table);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (index, field) in selected.iter().enumerate() {
                record.insert((*field).to_string(), sql_value_to_json(row.get_ref(index)?));
            }
            records.push(record);
        }
        Ok(records)
    }

    fn get_selectable_field(&self, field: &str) -> RepoResult<BTreeMap<String, String>> {
        let records = self.get_fields(&[field])?;
        let mut options = BTreeMap::new();
        for record in records {
            let Some(value) = record.get(field) else {
                continue;
            };
            let text = match value {
                JsonValue::Null => continue,
                JsonValue::String(text) => text.clone(),
                other => other.to_string(),
            };
            options.insert(text.clone(), text);
        }
        Ok(options)
    }
}

fn ensure_storage_ready(conn: &Connection, descriptor: &ModelDescriptor) -> RepoResult<()> {
    if !table_exists(conn, descriptor.table)? {
        return Err(RepoError::MissingRequiredTable(descriptor.table));
    }
    for column in descriptor.columns {
        if !table_has_column(conn, descriptor.table, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: descriptor.table,
                column,
            });
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
