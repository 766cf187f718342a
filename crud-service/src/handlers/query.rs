//! Index query parameters
//!
//! Listing requests carry `filters[<field>]=<value>` pairs, `search`,
//! `page`, `per_page`, `sort_column` and `sort_direction` in the query
//! string. [`IndexQuery`] collects them as sent; [`IndexQuery::into_params`]
//! applies defaults and limits.
//!
//! # Example
//!
//! ```rust
//! use crud_service::config::PaginationConfig;
//! use crud_service::handlers::IndexQuery;
//!
//! let query = IndexQuery::from_pairs(vec![
//!     ("filters[status]".to_string(), "active".to_string()),
//!     ("per_page".to_string(), "5".to_string()),
//! ]);
//! let params = query.into_params("/user", &PaginationConfig::default()).unwrap();
//! assert_eq!(params.filters["status"], "active");
//! assert_eq!(params.per_page, 5);
//! assert_eq!(params.sort_column, "id");
//! ```

use std::collections::BTreeMap;

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};

use super::error::{ApiError, ApiOperation};
use crate::config::PaginationConfig;
use crate::repository::{ListParams, OrderDirection};
use crate::schema::ID_COLUMN;

/// Index query as sent by the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexQuery {
    /// `filters[<field>]` values by field
    pub filters: BTreeMap<String, String>,
    /// Free-text search term
    pub search: Option<String>,
    /// Requested page
    pub page: Option<String>,
    /// Requested page size
    pub per_page: Option<String>,
    /// Requested sort column
    pub sort_column: Option<String>,
    /// Requested sort direction
    pub sort_direction: Option<String>,
}

impl IndexQuery {
    /// Collect decoded query string pairs
    ///
    /// Unknown keys are ignored. A repeated key keeps its last value.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            if let Some(field) = filter_key(&key) {
                query.filters.insert(field.to_string(), value);
                continue;
            }
            match key.as_str() {
                "search" => query.search = Some(value),
                "page" => query.page = Some(value),
                "per_page" => query.per_page = Some(value),
                "sort_column" => query.sort_column = Some(value),
                "sort_direction" => query.sort_direction = Some(value),
                _ => {}
            }
        }
        query
    }

    /// Apply defaults and limits
    ///
    /// A missing or unusable `page` means page 1. `per_page` must be a
    /// positive integer and is capped at `max_per_page`. `sort_direction`
    /// must be `asc` or `desc`. Blank values count as missing.
    pub fn into_params(
        self,
        path: impl Into<String>,
        pagination: &PaginationConfig,
    ) -> Result<ListParams, ApiError> {
        let page = present(self.page)
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1);

        let per_page = match present(self.per_page) {
            None => pagination.default_per_page,
            Some(raw) => {
                let per_page = raw.parse::<i64>().map_err(|_| {
                    invalid("per_page", "The per page field must be an integer.")
                })?;
                if per_page < 1 {
                    return Err(invalid("per_page", "The per page field must be at least 1."));
                }
                (per_page as u64).min(pagination.max_per_page.max(1))
            }
        };

        let sort_direction = match present(self.sort_direction) {
            None => OrderDirection::Ascending,
            Some(raw) => raw
                .parse()
                .map_err(|_| invalid("sort_direction", "The selected sort direction is invalid."))?,
        };

        Ok(ListParams {
            filters: self.filters,
            search: present(self.search),
            page,
            per_page,
            sort_column: present(self.sort_column).unwrap_or_else(|| ID_COLUMN.to_string()),
            sort_direction,
            path: path.into(),
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for IndexQuery {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| invalid("query", rejection.body_text()))?;
        Ok(Self::from_pairs(pairs))
    }
}

/// Field name of a `filters[<field>]` key
fn filter_key(key: &str) -> Option<&str> {
    key.strip_prefix("filters[")
        .and_then(|rest| rest.strip_suffix(']'))
        .filter(|field| !field.is_empty())
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid(field: &str, message: impl Into<String>) -> ApiError {
    ApiError::invalid_field(field, message).with_operation(ApiOperation::Index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn pairs(items: &[(&str, &str)]) -> IndexQuery {
        IndexQuery::from_pairs(
            items
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn test_filter_key() {
        assert_eq!(filter_key("filters[status]"), Some("status"));
        assert_eq!(filter_key("filters[]"), None);
        assert_eq!(filter_key("filters"), None);
        assert_eq!(filter_key("status"), None);
    }

    #[test]
    fn test_defaults() {
        let params = IndexQuery::default()
            .into_params("/post", &PaginationConfig::default())
            .unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 15);
        assert_eq!(params.sort_column, "id");
        assert_eq!(params.sort_direction, OrderDirection::Ascending);
        assert_eq!(params.search, None);
        assert_eq!(params.path, "/post");
    }

    #[test]
    fn test_values_are_collected() {
        let params = pairs(&[
            ("filters[status]", "active"),
            ("filters[role_id]", ""),
            ("search", " ann "),
            ("page", "3"),
            ("sort_column", "name"),
            ("sort_direction", "DESC"),
            ("unrelated", "x"),
        ])
        .into_params("/user", &PaginationConfig::default())
        .unwrap();

        assert_eq!(params.filters.len(), 2);
        assert_eq!(params.filters["status"], "active");
        assert_eq!(params.search.as_deref(), Some("ann"));
        assert_eq!(params.page, 3);
        assert_eq!(params.sort_column, "name");
        assert_eq!(params.sort_direction, OrderDirection::Descending);
    }

    #[test]
    fn test_per_page_limits() {
        let pagination = PaginationConfig {
            default_per_page: 15,
            max_per_page: 50,
        };
        let params = pairs(&[("per_page", "500")])
            .into_params("/user", &pagination)
            .unwrap();
        assert_eq!(params.per_page, 50);

        let error = pairs(&[("per_page", "0")])
            .into_params("/user", &pagination)
            .unwrap_err();
        assert_eq!(
            error.errors.unwrap().get("per_page").unwrap(),
            ["The per page field must be at least 1."]
        );

        let error = pairs(&[("per_page", "many")])
            .into_params("/user", &pagination)
            .unwrap_err();
        assert!(error.errors.unwrap().has("per_page"));
    }

    #[test]
    fn test_bad_page_falls_back_to_first() {
        let params = pairs(&[("page", "zero")])
            .into_params("/user", &PaginationConfig::default())
            .unwrap();
        assert_eq!(params.page, 1);
    }

    #[test]
    fn test_bad_sort_direction() {
        let error = pairs(&[("sort_direction", "sideways")])
            .into_params("/user", &PaginationConfig::default())
            .unwrap_err();
        assert_eq!(
            error.errors.unwrap().get("sort_direction").unwrap(),
            ["The selected sort direction is invalid."]
        );
    }

    #[tokio::test]
    async fn test_extract_bracketed_filters() {
        let request = Request::builder()
            .uri("/user?filters%5Bstatus%5D=active&filters%5Brole_id%5D=2&search=a%20b")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let query = IndexQuery::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(query.filters["status"], "active");
        assert_eq!(query.filters["role_id"], "2");
        assert_eq!(query.search.as_deref(), Some("a b"));
    }
}
