//! Object-safe record repository surface.
//!
//! # Responsibility
//! - Erase typed repositories behind a trait object for name-based access.
//! - Carry rows as JSON records at the erased boundary.
//!
//! # Invariants
//! - Every operation delegates to the typed repository; no SQL lives here.

use crate::model::{json_value_to_sql, record_from_model, Model, Record, RecordId};
use crate::query::{Listing, Page, QueryParams};
use crate::repo::crud::{CrudRepository, RepoResult, SqliteCrudRepository};
use rusqlite::types::Value;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Type-erased repository over JSON records.
///
/// Mirrors [`CrudRepository`] with records in place of typed models, so
/// registry lookups can return one trait object for any entity.
pub trait RecordRepository {
    /// Returns the canonical entity name served by this repository.
    fn entity(&self) -> &'static str;
    fn all(&self, with: &[&str], params: &QueryParams) -> RepoResult<Page<Record>>;
    fn count(&self) -> RepoResult<u64>;
    fn find(&self, id: &RecordId) -> RepoResult<Option<Record>>;
    fn find_or_fail(&self, id: &RecordId) -> RepoResult<Record>;
    fn find_equals(
        &self,
        field: &str,
        value: &JsonValue,
        params: &QueryParams,
    ) -> RepoResult<Page<Record>>;
    fn find_by(&self, field: &str, value: &str, per_page: Option<u32>)
        -> RepoResult<Listing<Record>>;
    fn create(&self, fields: &Record) -> RepoResult<Record>;
    fn insert(&self, rows: &[Record]) -> RepoResult<usize>;
    fn update(&self, id: &RecordId, fields: &Record) -> RepoResult<Record>;
    fn delete(&self, id: &RecordId) -> RepoResult<()>;
    fn get_fields(&self, fields: &[&str]) -> RepoResult<Vec<Record>>;
    fn get_selectable_field(&self, field: &str) -> RepoResult<BTreeMap<String, String>>;
}

impl std::fmt::Debug for dyn RecordRepository + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordRepository")
            .field("entity", &self.entity())
            .finish()
    }
}

impl<M: Model> RecordRepository for SqliteCrudRepository<'_, M> {
    fn entity(&self) -> &'static str {
        M::descriptor().entity
    }

    fn all(&self, with: &[&str], params: &QueryParams) -> RepoResult<Page<Record>> {
        record_page(CrudRepository::all(self, with, params)?)
    }

    fn count(&self) -> RepoResult<u64> {
        CrudRepository::count(self)
    }

    fn find(&self, id: &RecordId) -> RepoResult<Option<Record>> {
        match CrudRepository::find(self, id)? {
            Some(model) => Ok(Some(record_from_model(&model)?)),
            None => Ok(None),
        }
    }

    fn find_or_fail(&self, id: &RecordId) -> RepoResult<Record> {
        let model = CrudRepository::find_or_fail(self, id)?;
        record_from_model(&model)
    }

    fn find_equals(
        &self,
        field: &str,
        value: &JsonValue,
        params: &QueryParams,
    ) -> RepoResult<Page<Record>> {
        let value = json_value_to_sql(value)?;
        record_page(CrudRepository::find_equals(self, field, value, params)?)
    }

    fn find_by(
        &self,
        field: &str,
        value: &str,
        per_page: Option<u32>,
    ) -> RepoResult<Listing<Record>> {
        match CrudRepository::find_by(self, field, value, per_page)? {
            Listing::Complete(items) => {
                let mut records = Vec::with_capacity(items.len());
                for model in &items {
                    records.push(record_from_model(model)?);
                }
                Ok(Listing::Complete(records))
            }
            Listing::Paged(page) => Ok(Listing::Paged(record_page(page)?)),
        }
    }

    fn create(&self, fields: &Record) -> RepoResult<Record> {
        let fields = sql_fields(fields)?;
        let model = CrudRepository::create(self, &fields)?;
        record_from_model(&model)
    }

    fn insert(&self, rows: &[Record]) -> RepoResult<usize> {
        let mut converted = Vec::with_capacity(rows.len());
        for row in rows {
            converted.push(sql_fields(row)?);
        }
        CrudRepository::insert(self, &converted)
    }

    fn update(&self, id: &RecordId, fields: &Record) -> RepoResult<Record> {
        let fields = sql_fields(fields)?;
        let model = CrudRepository::update(self, id, &fields)?;
        record_from_model(&model)
    }

    fn delete(&self, id: &RecordId) -> RepoResult<()> {
        CrudRepository::delete(self, id)
    }

    fn get_fields(&self, fields: &[&str]) -> RepoResult<Vec<Record>> {
        CrudRepository::get_fields(self, fields)
    }

    fn get_selectable_field(&self, field: &str) -> RepoResult<BTreeMap<String, String>> {
        CrudRepository::get_selectable_field(self, field)
    }
}

fn sql_fields(record: &Record) -> RepoResult<Vec<(&str, Value)>> {
    let mut fields = Vec::with_capacity(record.len());
    for (field, value) in record {
        fields.push((field.as_str(), json_value_to_sql(value)?));
    }
    Ok(fields)
}

fn record_page<M: Model>(page: Page<M>) -> RepoResult<Page<Record>> {
    let mut items = Vec::with_capacity(page.items.len());
    for model in &page.items {
        items.push(record_from_model(model)?);
    }
    Ok(Page {
        items,
        total: page.total,
        per_page: page.per_page,
        offset: page.offset,
    })
}
