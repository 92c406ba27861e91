//! Entity-name registry for repository resolution.
//!
//! # Responsibility
//! - Map canonical entity names onto repository builders.
//! - Validate entity names and descriptors eagerly, at registration time.
//!
//! # Invariants
//! - A registered entity always carries a valid descriptor; lookup can no
//!   longer fail on descriptor problems.
//! - Lookups accept any spelling `normalize_entity_name` accepts.

use crate::config::RepoConfig;
use crate::model::{DescriptorError, Model, ModelDescriptor};
use crate::naming::{normalize_entity_name, resolve_model_name, resolve_repository_name};
use crate::repo::crud::{RepoError, RepoResult, SqliteCrudRepository};
use crate::repo::dynamic::RecordRepository;
use log::info;
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

/// Registration and lookup errors.
#[derive(Debug)]
pub enum RegistryError {
    InvalidEntityName(String),
    DuplicateEntity(String),
    EntityNotFound {
        name: String,
        expected: String,
    },
    InvalidDescriptor {
        entity: &'static str,
        error: DescriptorError,
    },
    Construction(RepoError),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEntityName(value) => write!(f, "entity name is invalid: {value}"),
            Self::DuplicateEntity(value) => write!(f, "entity already registered: {value}"),
            Self::EntityNotFound { name, expected } => write!(
                f,
                "no repository registered for `{name}` (expected `{expected}`)"
            ),
            Self::InvalidDescriptor { entity, error } => {
                write!(f, "descriptor for `{entity}` is invalid: {error}")
            }
            Self::Construction(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidDescriptor { error, .. } => Some(error),
            Self::Construction(err) => Some(err),
            Self::InvalidEntityName(_)
            | Self::DuplicateEntity(_)
            | Self::EntityNotFound { .. } => None,
        }
    }
}

/// Builds a repository instance for one registered entity.
pub trait RepositoryBuilder: Send + Sync {
    /// Returns the descriptor of the entity this builder serves.
    fn descriptor(&self) -> &'static ModelDescriptor;
    /// Builds an erased repository bound to `conn`.
    fn build<'conn>(
        &self,
        conn: &'conn Connection,
        config: &RepoConfig,
    ) -> RepoResult<Box<dyn RecordRepository + 'conn>>;
}

impl std::fmt::Debug for dyn RepositoryBuilder + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryBuilder")
            .field("entity", &self.descriptor().entity)
            .finish()
    }
}

/// Standard builder producing a [`SqliteCrudRepository`] for a model type.
pub struct ModelBuilder<M: Model + 'static> {
    _model: PhantomData<fn() -> M>,
}

impl<M: Model + 'static> ModelBuilder<M> {
    pub fn new() -> Self {
        Self {
            _model: PhantomData,
        }
    }
}

impl<M: Model + 'static> Default for ModelBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model + 'static> RepositoryBuilder for ModelBuilder<M> {
    fn descriptor(&self) -> &'static ModelDescriptor {
        M::descriptor()
    }

    fn build<'conn>(
        &self,
        conn: &'conn Connection,
        config: &RepoConfig,
    ) -> RepoResult<Box<dyn RecordRepository + 'conn>> {
        Ok(Box::new(SqliteCrudRepository::<M>::try_new(conn, config)?))
    }
}

/// Registry of repository builders keyed by canonical entity name.
pub struct RepositoryRegistry {
    config: RepoConfig,
    builders: BTreeMap<String, Arc<dyn RepositoryBuilder>>,
}

impl RepositoryRegistry {
    pub fn new(config: RepoConfig) -> Self {
        Self {
            config,
            builders: BTreeMap::new(),
        }
    }

    /// Returns the configuration repositories are built with.
    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Registers one entity builder.
    ///
    /// The builder's descriptor entity is the registration key and must be
    /// canonical: studly case, alphanumeric, without the repository suffix.
    ///
    /// # Errors
    /// - `InvalidEntityName` for non-canonical entity names.
    /// - `InvalidDescriptor` when the descriptor fails validation.
    /// - `DuplicateEntity` when the entity is already registered.
    pub fn register(&mut self, builder: Arc<dyn RepositoryBuilder>) -> Result<(), RegistryError> {
        let descriptor = builder.descriptor();
        let entity = descriptor.entity.trim().to_string();
        if !is_canonical_entity_name(&entity, &self.config) {
            return Err(RegistryError::InvalidEntityName(entity));
        }
        if let Err(error) = descriptor.validate() {
            return Err(RegistryError::InvalidDescriptor {
                entity: descriptor.entity,
                error,
            });
        }
        if self.builders.contains_key(entity.as_str()) {
            return Err(RegistryError::DuplicateEntity(entity));
        }

        let model_name =
            resolve_model_name(&self.config, &entity).unwrap_or_else(|| entity.clone());
        info!(
            "event=repository_registered module=registry status=ok entity={entity} table={} model={model_name}",
            descriptor.table
        );
        self.builders.insert(entity, builder);
        Ok(())
    }

    /// Registers the standard builder for one model type.
    pub fn register_model<M: Model + 'static>(&mut self) -> Result<(), RegistryError> {
        self.register(Arc::new(ModelBuilder::<M>::new()))
    }

    /// Returns the builder for an entity name in any accepted spelling.
    pub fn get(&self, name: &str) -> Result<Arc<dyn RepositoryBuilder>, RegistryError> {
        let key = normalize_entity_name(&self.config, name);
        match self.builders.get(key.as_str()) {
            Some(builder) => Ok(Arc::clone(builder)),
            None => Err(RegistryError::EntityNotFound {
                name: name.trim().to_string(),
                expected: resolve_repository_name(&self.config, &key),
            }),
        }
    }

    /// Resolves an entity name and builds its repository on `conn`.
    pub fn repository<'conn>(
        &self,
        conn: &'conn Connection,
        name: &str,
    ) -> Result<Box<dyn RecordRepository + 'conn>, RegistryError> {
        let builder = self.get(name)?;
        builder
            .build(conn, &self.config)
            .map_err(RegistryError::Construction)
    }

    /// Returns sorted canonical entity names.
    pub fn entity_names(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

fn is_canonical_entity_name(value: &str, config: &RepoConfig) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_uppercase() {
        return false;
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    let suffix = config.repository_suffix.as_str();
    if !suffix.is_empty() && value.len() > suffix.len() && value.ends_with(suffix) {
        return false;
    }
    true
}
