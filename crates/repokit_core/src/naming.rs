//! Naming conventions for entities, models, and repositories.
//!
//! # Responsibility
//! - Map free-form entity names onto canonical studly-case form.
//! - Resolve logical model and repository names from configuration.
//!
//! # Invariants
//! - All helpers are pure; no IO, no process-wide state.
//! - Normalization is stable: normalizing a normalized name is a no-op.

use crate::config::RepoConfig;

/// Separator between logical namespace segments.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Converts a name to studly case: `ticket_item` -> `TicketItem`.
///
/// Words are split on underscores, dashes, and spaces. The first character of
/// each word is upper-cased; remaining characters are kept as written.
pub fn studly_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    for word in name.split(['_', '-', ' ']) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.extend(chars);
        }
    }
    result
}

/// Appends `suffix` unless `name` already ends with it.
pub fn ensure_suffix(name: &str, suffix: &str) -> String {
    if !suffix.is_empty() && !name.ends_with(suffix) {
        format!("{name}{suffix}")
    } else {
        name.to_string()
    }
}

/// Resolves the logical model name for an entity.
///
/// Returns `None` when `name` is already namespace-qualified or carries the
/// repository suffix; such names never denote a model.
pub fn resolve_model_name(config: &RepoConfig, name: &str) -> Option<String> {
    if name.contains(NAMESPACE_SEPARATOR) {
        return None;
    }
    if !config.repository_suffix.is_empty() && name.ends_with(config.repository_suffix.as_str()) {
        return None;
    }
    Some(format!("{}{name}", config.models_namespace))
}

/// Resolves the logical repository name for an entity.
pub fn resolve_repository_name(config: &RepoConfig, name: &str) -> String {
    format!(
        "{}{}",
        config.repositories_namespace,
        ensure_suffix(name, config.repository_suffix.as_str())
    )
}

/// Normalizes a free-form entity name to canonical form.
///
/// Trims whitespace, converts to studly case, and strips one trailing
/// repository suffix: `ticket_repository` and `Ticket` both normalize
/// to `Ticket`.
pub fn normalize_entity_name(config: &RepoConfig, raw: &str) -> String {
    let studly = studly_case(raw.trim());
    let suffix = config.repository_suffix.as_str();
    if !suffix.is_empty() && studly.len() > suffix.len() && studly.ends_with(suffix) {
        studly[..studly.len() - suffix.len()].to_string()
    } else {
        studly
    }
}
