//! Typed filter, sort, and pagination pipeline.
//!
//! # Responsibility
//! - Model list-query parameters as explicit values instead of loose maps.
//! - Translate clauses into SQL fragments with positional bind values.
//!
//! # Invariants
//! - Clauses touching non-fillable fields are skipped silently; the rest of
//!   the query still runs.
//! - Field names reach SQL only after passing the descriptor's fillable set.

use crate::model::ModelDescriptor;
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Page size used when a caller opts into pagination without a limit.
pub const DEFAULT_PAGE_SIZE: u32 = 15;

/// Binary comparison operators accepted in filter clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl Comparator {
    /// Returns the SQL spelling of this comparator.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
        }
    }

    /// Parses a comparator token. `like` is matched case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "=" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            _ if token.eq_ignore_ascii_case("like") => Some(Self::Like),
            _ => None,
        }
    }
}

/// One filter condition over a single field.
///
/// Clauses combine conjunctively: every clause must hold for a row to match.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// `field = value`.
    Equals { field: String, value: Value },
    /// `field IN (values...)`. An empty value list matches no rows.
    Membership { field: String, values: Vec<Value> },
    /// `field <comparator> value`.
    Comparison {
        field: String,
        comparator: Comparator,
        value: Value,
    },
}

impl FilterClause {
    /// Returns the field this clause constrains.
    pub fn field(&self) -> &str {
        match self {
            Self::Equals { field, .. }
            | Self::Membership { field, .. }
            | Self::Comparison { field, .. } => field,
        }
    }

    /// Builds a clause from an operator token and value list.
    ///
    /// The `in` operator is matched case-insensitively and takes the whole
    /// value list; every other operator takes exactly one value.
    pub fn parse(
        field: &str,
        operator: &str,
        mut values: Vec<Value>,
    ) -> Result<Self, FilterParseError> {
        if operator.eq_ignore_ascii_case("in") {
            return Ok(Self::Membership {
                field: field.to_string(),
                values,
            });
        }

        let comparator = Comparator::parse(operator)
            .ok_or_else(|| FilterParseError::UnknownOperator(operator.to_string()))?;
        if values.len() != 1 {
            return Err(FilterParseError::ExpectedSingleValue {
                operator: operator.to_string(),
                got: values.len(),
            });
        }
        let value = values.remove(0);

        if comparator == Comparator::Eq {
            return Ok(Self::Equals {
                field: field.to_string(),
                value,
            });
        }
        Ok(Self::Comparison {
            field: field.to_string(),
            comparator,
            value,
        })
    }
}

/// Errors raised while building a [`FilterClause`] from tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterParseError {
    UnknownOperator(String),
    ExpectedSingleValue { operator: String, got: usize },
}

impl Display for FilterParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownOperator(token) => write!(f, "unknown filter operator `{token}`"),
            Self::ExpectedSingleValue { operator, got } => write!(
                f,
                "operator `{operator}` takes exactly one value, got {got}"
            ),
        }
    }
}

impl Error for FilterParseError {}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Parses a direction token case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if token.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }
}

/// Single-field ordering request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Desc,
        }
    }
}

/// List-query parameters shared by the collection-returning operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    /// Conjunctive filter clauses.
    pub filter: Vec<FilterClause>,
    /// Optional single-field ordering.
    pub sort: Option<Sort>,
    /// Page size. `None` selects [`DEFAULT_PAGE_SIZE`].
    pub limit: Option<u32>,
    /// Rows to skip before the page starts.
    pub offset: u32,
}

/// One page of results with the matching total.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total rows matching the filter, across all pages.
    pub total: u64,
    pub per_page: u32,
    pub offset: u32,
}

/// Either a complete result set or one page of it.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<T> {
    Complete(Vec<T>),
    Paged(Page<T>),
}

/// Appends WHERE fragments for `clauses` onto `sql`.
///
/// `sql` must already contain a `WHERE 1 = 1` base. Clauses naming fields
/// outside the fillable set are dropped without error.
pub(crate) fn apply_where(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    clauses: &[FilterClause],
    descriptor: &ModelDescriptor,
) {
    for clause in clauses {
        if !descriptor.is_fillable(clause.field()) {
            continue;
        }
        match clause {
            FilterClause::Equals { field, value } => {
                sql.push_str(&format!(" AND {field} = ?"));
                bind_values.push(value.clone());
            }
            FilterClause::Membership { field, values } => {
                if values.is_empty() {
                    sql.push_str(" AND 1 = 0");
                    continue;
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!(" AND {field} IN ({placeholders})"));
                bind_values.extend(values.iter().cloned());
            }
            FilterClause::Comparison {
                field,
                comparator,
                value,
            } => {
                sql.push_str(&format!(" AND {field} {} ?", comparator.as_sql()));
                bind_values.push(value.clone());
            }
        }
    }
}

/// Appends an ORDER BY fragment when the sort field is fillable.
pub(crate) fn apply_order_by(sql: &mut String, sort: Option<&Sort>, descriptor: &ModelDescriptor) {
    if let Some(sort) = sort {
        if descriptor.is_fillable(&sort.field) {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                sort.field,
                sort.direction.as_sql()
            ));
        }
    }
}
