//! Response shaping
//!
//! A [`Shaper`] turns stored records into response JSON. Without a transform
//! a record is rendered as is.

use serde_json::Value;

use crate::record::Record;
use crate::repository::PageResult;

/// Per-resource output transform
pub type Transform = fn(&Record) -> Value;

/// Renders records for responses
#[derive(Debug, Clone, Copy, Default)]
pub struct Shaper {
    transform: Option<Transform>,
}

impl Shaper {
    /// Render records as stored
    pub const fn passthrough() -> Self {
        Self { transform: None }
    }

    /// Render records with `transform`
    pub const fn new(transform: Transform) -> Self {
        Self {
            transform: Some(transform),
        }
    }

    /// Shape one record
    pub fn one(&self, record: &Record) -> Value {
        match self.transform {
            Some(transform) => transform(record),
            None => record.to_json(),
        }
    }

    /// Shape every record of a page, keeping its metadata
    pub fn page(&self, page: PageResult<Record>) -> PageResult<Value> {
        page.map(|record| self.one(&record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::{json, Map};
    use std::collections::BTreeMap;

    fn record(id: i64) -> Record {
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!(format!("post {}", id)));
        Record {
            id,
            fields,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            relations: BTreeMap::new(),
        }
    }

    fn title_only(record: &Record) -> Value {
        json!({"title": record.get("title")})
    }

    #[test]
    fn test_passthrough_renders_record() {
        let record = record(1);
        assert_eq!(Shaper::passthrough().one(&record), record.to_json());
    }

    #[test]
    fn test_transform_applies_to_each_element() {
        let shaper = Shaper::new(title_only);
        assert_eq!(shaper.one(&record(1)), json!({"title": "post 1"}));
        assert_eq!(shaper.one(&record(2)), json!({"title": "post 2"}));

        let page = shaper.page(PageResult::new(vec![record(3)], 2, 1, 2, "/post"));
        assert_eq!(page.data, vec![json!({"title": "post 3"})]);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.prev_page_url.as_deref(), Some("/post?page=1"));
    }
}
