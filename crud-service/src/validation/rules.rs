//! Validation rule grammar
//!
//! Rules are written as pipe-separated strings, e.g.
//! `"required|string|max:255"` or `"sometimes|required|email|unique:users,email"`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One validation rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Field must be present and not empty
    Required,
    /// Skip every other rule when the field is absent
    Sometimes,
    /// `null` is accepted and skips every other rule
    Nullable,
    /// Must be a string
    String,
    /// Must be an integer (numeric strings accepted)
    Integer,
    /// Must be `true`, `false`, `0`, `1`, `"0"` or `"1"`
    Boolean,
    /// Must look like an email address
    Email,
    /// Minimum length, or minimum value for integer fields
    Min(u64),
    /// Maximum length, or maximum value for integer fields
    Max(u64),
    /// Must be one of the listed values
    In(Vec<String>),
    /// No row of `table` may already hold the value in `column`
    Unique {
        /// Table to check
        table: String,
        /// Column to check
        column: String,
    },
    /// Some row of `table` must hold the value in `column`
    Exists {
        /// Table to check
        table: String,
        /// Column to check
        column: String,
    },
}

impl Rule {
    /// Whether the rule needs a database lookup
    pub fn is_database_rule(&self) -> bool {
        matches!(self, Self::Unique { .. } | Self::Exists { .. })
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::Sometimes => write!(f, "sometimes"),
            Self::Nullable => write!(f, "nullable"),
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Boolean => write!(f, "boolean"),
            Self::Email => write!(f, "email"),
            Self::Min(n) => write!(f, "min:{}", n),
            Self::Max(n) => write!(f, "max:{}", n),
            Self::In(values) => write!(f, "in:{}", values.join(",")),
            Self::Unique { table, column } => write!(f, "unique:{},{}", table, column),
            Self::Exists { table, column } => write!(f, "exists:{},{}", table, column),
        }
    }
}

/// Error raised for a malformed rule string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleParseError {
    /// The rule name is not recognised
    #[error("unknown rule `{0}`")]
    Unknown(String),

    /// The rule's argument is missing or malformed
    #[error("rule `{rule}` expects {expected}")]
    BadArgument {
        /// Rule name
        rule: String,
        /// Description of the expected argument
        expected: &'static str,
    },
}

impl FromStr for Rule {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, argument) = match s.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument.trim())),
            None => (s, None),
        };
        let bad = |expected: &'static str| RuleParseError::BadArgument {
            rule: name.to_string(),
            expected,
        };

        let rule = match (name, argument) {
            ("required", None) => Self::Required,
            ("sometimes", None) => Self::Sometimes,
            ("nullable", None) => Self::Nullable,
            ("string", None) => Self::String,
            ("integer", None) => Self::Integer,
            ("boolean", None) => Self::Boolean,
            ("email", None) => Self::Email,
            ("min", Some(n)) => Self::Min(n.parse().map_err(|_| bad("a non-negative integer"))?),
            ("max", Some(n)) => Self::Max(n.parse().map_err(|_| bad("a non-negative integer"))?),
            ("in", Some(list)) if !list.is_empty() => {
                Self::In(list.split(',').map(|v| v.trim().to_string()).collect())
            }
            ("unique", Some(target)) => {
                let (table, column) = table_column(target).ok_or_else(|| bad("`table,column`"))?;
                Self::Unique { table, column }
            }
            ("exists", Some(target)) => {
                let (table, column) = table_column(target).ok_or_else(|| bad("`table,column`"))?;
                Self::Exists { table, column }
            }
            ("min" | "max", None) => return Err(bad("a non-negative integer")),
            ("in", _) => return Err(bad("a comma-separated list")),
            ("unique" | "exists", None) => return Err(bad("`table,column`")),
            (
                "required" | "sometimes" | "nullable" | "string" | "integer" | "boolean" | "email",
                Some(_),
            ) => return Err(bad("no argument")),
            _ => return Err(RuleParseError::Unknown(s.to_string())),
        };
        Ok(rule)
    }
}

fn table_column(target: &str) -> Option<(String, String)> {
    let (table, column) = target.split_once(',')?;
    let (table, column) = (table.trim(), column.trim());
    if table.is_empty() || column.is_empty() {
        return None;
    }
    Some((table.to_string(), column.to_string()))
}

/// Parse a pipe-separated rule string
///
/// ```rust
/// use crud_service::validation::{parse_rules, Rule};
///
/// let rules = parse_rules("required|string|max:255").unwrap();
/// assert_eq!(rules, vec![Rule::Required, Rule::String, Rule::Max(255)]);
/// ```
pub fn parse_rules(definition: &str) -> Result<Vec<Rule>, RuleParseError> {
    definition.split('|')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}
