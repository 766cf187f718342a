//! Filtering, ordering and pagination types for store queries
//!
//! Field names are `&'static str` taken from an [`EntitySchema`](crate::schema::EntitySchema),
//! so a condition can only ever name a column the schema declares.
//!
//! # Example
//!
//! ```rust
//! use crud_service::repository::{FilterCondition, OrderBy, OrderDirection, Pagination, QueryFilter};
//!
//! let filter = QueryFilter::new()
//!     .and(FilterCondition::eq("status", "active"))
//!     .any_of(vec![
//!         FilterCondition::contains("name", "ann"),
//!         FilterCondition::contains("email", "ann"),
//!     ]);
//! let order = OrderBy::new("id", OrderDirection::Descending);
//! let page = Pagination::page(2, 15);
//!
//! assert_eq!(filter.all.len(), 1);
//! assert_eq!(order.to_string(), "id desc");
//! assert_eq!(page.offset, 15);
//! ```

use std::fmt;
use std::str::FromStr;

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl OrderDirection {
    /// SQL keyword for this direction
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// Error returned when a sort direction is neither `asc` nor `desc`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sort direction `{0}`, expected `asc` or `desc`")]
pub struct ParseOrderDirectionError(pub String);

impl FromStr for OrderDirection {
    type Err = ParseOrderDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Ascending),
            "desc" => Ok(Self::Descending),
            _ => Err(ParseOrderDirectionError(s.to_string())),
        }
    }
}

/// Column and direction for `ORDER BY`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    /// Column to sort by
    pub column: &'static str,
    /// Sort direction
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Sort by `column` in `direction`
    pub const fn new(column: &'static str, direction: OrderDirection) -> Self {
        Self { column, direction }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction)
    }
}

/// Pagination parameters for limiting query results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of results to skip
    pub offset: u64,
    /// Maximum number of results to return
    pub limit: u64,
}

impl Pagination {
    /// Create new pagination parameters
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Pagination for a specific page number (1-indexed)
    ///
    /// Page 0 is treated as page 1.
    #[must_use]
    pub const fn page(page_number: u64, page_size: u64) -> Self {
        let offset = page_number.saturating_sub(1).saturating_mul(page_size);
        Self {
            offset,
            limit: page_size,
        }
    }
}

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Case-insensitive substring match (LIKE with `\` as escape character)
    Like,
    /// Value is in a list (IN)
    In,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::In => write!(f, "IN"),
        }
    }
}

/// A value bound into a filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// List of integer values (for IN operator)
    IntegerList(Vec<i64>),
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(list: Vec<i64>) -> Self {
        Self::IntegerList(list)
    }
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The column to filter on
    pub field: &'static str,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: &'static str, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }

    /// Equality filter (field = value)
    pub fn eq(field: &'static str, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// Lower bound filter (field >= value)
    pub fn gte(field: &'static str, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// Upper bound filter (field <= value)
    pub fn lte(field: &'static str, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// Substring match; `%`, `_` and `\` in `term` match literally
    pub fn contains(field: &'static str, term: &str) -> Self {
        let mut pattern = String::with_capacity(term.len() + 2);
        pattern.push('%');
        for c in term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        Self::new(field, FilterOperator::Like, FilterValue::String(pattern))
    }

    /// Membership filter (field IN (...))
    pub fn in_integers(field: &'static str, values: Vec<i64>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::IntegerList(values))
    }
}

/// Conditions for a `WHERE` clause
///
/// Every condition in `all` must hold, and at least one in `any` must hold
/// when `any` is non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    /// Conjunctive conditions
    pub all: Vec<FilterCondition>,
    /// Disjunctive group
    pub any: Vec<FilterCondition>,
}

impl QueryFilter {
    /// Empty filter matching every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required condition
    #[must_use]
    pub fn and(mut self, condition: FilterCondition) -> Self {
        self.all.push(condition);
        self
    }

    /// Add conditions to the OR group
    #[must_use]
    pub fn any_of(mut self, conditions: Vec<FilterCondition>) -> Self {
        self.any.extend(conditions);
        self
    }

    /// Whether the filter matches every row
    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }
}
