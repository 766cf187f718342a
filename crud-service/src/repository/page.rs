//! Paginated listing results

use serde::{Deserialize, Serialize};

/// One page of a listing plus navigation metadata
///
/// ```rust
/// use crud_service::repository::PageResult;
///
/// let page = PageResult::new(vec!["a", "b"], 2, 2, 5, "/user");
/// assert_eq!(page.last_page, 3);
/// assert_eq!(page.next_page_url.as_deref(), Some("/user?page=3"));
/// assert_eq!(page.prev_page_url.as_deref(), Some("/user?page=1"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    /// Items on this page
    pub data: Vec<T>,
    /// 1-indexed page number
    pub current_page: u64,
    /// Number of matching records across all pages
    pub total: u64,
    /// Page size
    pub per_page: u64,
    /// Last page number, at least 1
    pub last_page: u64,
    /// Link to the next page, if there is one
    pub next_page_url: Option<String>,
    /// Link to the previous page, if there is one
    pub prev_page_url: Option<String>,
}

impl<T> PageResult<T> {
    /// Build a page; links are `{path}?page=N`
    pub fn new(data: Vec<T>, current_page: u64, per_page: u64, total: u64, path: &str) -> Self {
        let current_page = current_page.max(1);
        let per_page = per_page.max(1);
        let last_page = calculate_last_page(total, per_page);

        let link = |page: u64| format!("{}?page={}", path, page);
        let next_page_url = (current_page < last_page).then(|| link(current_page + 1));
        let prev_page_url = (current_page > 1).then(|| link(current_page - 1));

        Self {
            data,
            current_page,
            total,
            per_page,
            last_page,
            next_page_url,
            prev_page_url,
        }
    }

    /// Transform every item, keeping the metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            data: self.data.into_iter().map(f).collect(),
            current_page: self.current_page,
            total: self.total,
            per_page: self.per_page,
            last_page: self.last_page,
            next_page_url: self.next_page_url,
            prev_page_url: self.prev_page_url,
        }
    }
}

/// Number of pages, rounding up, never below 1
fn calculate_last_page(total: u64, per_page: u64) -> u64 {
    let pages = total.saturating_add(per_page).saturating_sub(1) / per_page;
    pages.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_last_page() {
        assert_eq!(calculate_last_page(0, 15), 1);
        assert_eq!(calculate_last_page(15, 15), 1);
        assert_eq!(calculate_last_page(16, 15), 2);
        assert_eq!(calculate_last_page(45, 20), 3);
    }

    #[test]
    fn test_first_page_has_no_prev() {
        let page = PageResult::new(vec![1, 2], 1, 2, 3, "/post");
        assert_eq!(page.prev_page_url, None);
        assert_eq!(page.next_page_url.as_deref(), Some("/post?page=2"));
    }

    #[test]
    fn test_page_beyond_last_is_empty_but_valid() {
        let page: PageResult<i32> = PageResult::new(vec![], 9, 15, 20, "/comment");
        assert_eq!(page.last_page, 2);
        assert_eq!(page.next_page_url, None);
        assert_eq!(page.prev_page_url.as_deref(), Some("/comment?page=8"));
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = PageResult::new(vec![1, 2], 1, 2, 2, "/user").map(|n| n * 10);
        assert_eq!(page.data, vec![10, 20]);
        assert_eq!(page.total, 2);
        assert_eq!(page.last_page, 1);
    }
}
