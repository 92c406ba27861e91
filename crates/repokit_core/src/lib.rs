//! Generic repository layer over SQLite.
//! This crate is the single source of truth for persistence conventions.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod naming;
pub mod query;
pub mod registry;
pub mod repo;

pub use config::RepoConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    json_value_to_sql, record_from_model, sql_value_to_json, DescriptorError, Model,
    ModelDescriptor, Record, RecordId,
};
pub use query::{
    Comparator, FilterClause, FilterParseError, Listing, Page, QueryParams, Sort, SortDirection,
    DEFAULT_PAGE_SIZE,
};
pub use registry::{ModelBuilder, RegistryError, RepositoryBuilder, RepositoryRegistry};
pub use repo::crud::{CrudRepository, RepoError, RepoResult, SqliteCrudRepository};
pub use repo::dynamic::RecordRepository;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
