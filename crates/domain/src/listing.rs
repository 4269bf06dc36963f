//! Paginated list shapes and response normalization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::{PayloadPath, lookup, path};

/// Containers that may carry pagination metadata, in lookup order.
pub const META_CONTAINERS: &[&[&str]] = &[&[], &["meta"], &["data"]];

const DEFAULT_PER_PAGE: u64 = 10;

/// Pagination metadata in the console's uniform shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// One-based current page.
    pub current_page: u64,
    /// One-based last page.
    pub last_page: u64,
    /// Page size.
    pub per_page: u64,
    /// Total matching rows across all pages.
    pub total: u64,
}

/// One page of list results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// Pagination metadata.
    pub meta: PageMeta,
}

impl<T> Page<T> {
    /// Maps every item, keeping the metadata.
    pub fn map<U>(self, transform: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(transform).collect(),
            meta: self.meta,
        }
    }
}

/// Ordered locations tried when looking for the collection array.
pub const COLLECTION_PATHS: &[PayloadPath] = &[
    path(&["data", "data"], "paginator nested in data envelope"),
    path(&["result", "data"], "paginator nested in result envelope"),
    path(&["items"], "generic items array"),
    path(&["permissions"], "permissions array"),
    path(&["roles"], "roles array"),
    path(&["users"], "users array"),
    path(&["products"], "products array"),
    path(&["categories"], "categories array"),
    path(&["orders"], "orders array"),
    path(&["data"], "array in data envelope"),
    path(&["result"], "array in result envelope"),
    path(&["data", "items"], "generic items array in data envelope"),
    path(&["data", "permissions"], "permissions array in data envelope"),
    path(&["data", "roles"], "roles array in data envelope"),
    path(&["data", "users"], "users array in data envelope"),
    path(&["data", "products"], "products array in data envelope"),
    path(&["data", "categories"], "categories array in data envelope"),
    path(&["data", "orders"], "orders array in data envelope"),
    path(&["result", "items"], "generic items array in result envelope"),
    path(&["result", "users"], "users array in result envelope"),
    path(&["result", "roles"], "roles array in result envelope"),
    path(&["result", "permissions"], "permissions array in result envelope"),
    path(&["result", "products"], "products array in result envelope"),
    path(&["result", "categories"], "categories array in result envelope"),
    path(&["result", "orders"], "orders array in result envelope"),
];

fn positive_number(value: &Value) -> Option<u64> {
    let number = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };

    number.filter(|number| *number > 0)
}

fn meta_field(payload: &Value, key: &str) -> Option<u64> {
    META_CONTAINERS.iter().find_map(|container| {
        container
            .iter()
            .try_fold(payload, |current, segment| current.get(*segment))
            .and_then(|source| source.get(key))
            .and_then(positive_number)
    })
}

/// Normalizes a bare array or any known paginated envelope into a [`Page`].
///
/// Missing metadata defaults to page 1 of 1, `per_page` to the item count
/// (or 10 when empty) and `total` to the item count.
#[must_use]
pub fn normalize_paginated(payload: &Value) -> Page<Value> {
    let items: Vec<Value> = match payload {
        Value::Array(items) => items.clone(),
        _ => COLLECTION_PATHS
            .iter()
            .filter_map(|path| lookup(payload, path))
            .find_map(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    };

    let item_count = u64::try_from(items.len()).unwrap_or(u64::MAX);
    let per_page_default = if item_count == 0 {
        DEFAULT_PER_PAGE
    } else {
        item_count
    };

    let meta = if payload.is_array() {
        PageMeta {
            current_page: 1,
            last_page: 1,
            per_page: per_page_default,
            total: item_count,
        }
    } else {
        PageMeta {
            current_page: meta_field(payload, "current_page").unwrap_or(1),
            last_page: meta_field(payload, "last_page").unwrap_or(1),
            per_page: meta_field(payload, "per_page").unwrap_or(per_page_default),
            total: meta_field(payload, "total").unwrap_or(item_count),
        }
    };

    Page { items, meta }
}

/// Filters accepted by list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// One-based page number.
    pub page: Option<u64>,
    /// Requested page size.
    pub per_page: Option<u64>,
    /// Free-text search.
    pub search: Option<String>,
    /// Status filter (orders, products).
    pub status: Option<String>,
    /// Inclusive lower date bound, `YYYY-MM-DD`.
    pub date_from: Option<String>,
    /// Inclusive upper date bound, `YYYY-MM-DD`.
    pub date_to: Option<String>,
}

impl ListQuery {
    /// Renders the query as URL parameters, skipping unset and blank values.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_owned(), page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("per_page".to_owned(), per_page.to_string()));
        }

        let text_filters = [
            ("search", &self.search),
            ("status", &self.status),
            ("date_from", &self.date_from),
            ("date_to", &self.date_to),
        ];
        for (key, value) in text_filters {
            if let Some(value) = value.as_deref().map(str::trim)
                && !value.is_empty()
            {
                pairs.push((key.to_owned(), value.to_owned()));
            }
        }

        pairs
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ListQuery, PageMeta, normalize_paginated};

    #[test]
    fn bare_array_gets_default_meta() {
        let page = normalize_paginated(&json!([{"id": 1}, {"id": 2}]));
        assert_eq!(page.items.len(), 2);
        assert_eq!(
            page.meta,
            PageMeta {
                current_page: 1,
                last_page: 1,
                per_page: 2,
                total: 2
            }
        );
    }

    #[test]
    fn nested_paginator_in_data_envelope() {
        let page = normalize_paginated(&json!({
            "data": {"data": [{"id": 1}], "current_page": 2, "last_page": 5, "total": 42}
        }));

        assert_eq!(page.items, vec![json!({"id": 1})]);
        assert_eq!(
            page.meta,
            PageMeta {
                current_page: 2,
                last_page: 5,
                per_page: 1,
                total: 42
            }
        );
    }

    #[test]
    fn laravel_resource_collection_with_meta() {
        let page = normalize_paginated(&json!({
            "data": [{"id": 1}, {"id": 2}, {"id": 3}],
            "meta": {"current_page": 3, "last_page": 4, "per_page": 3, "total": 11}
        }));

        assert_eq!(page.items.len(), 3);
        assert_eq!(page.meta.current_page, 3);
        assert_eq!(page.meta.per_page, 3);
        assert_eq!(page.meta.total, 11);
    }

    #[test]
    fn resource_named_key_nested_under_result() {
        let page = normalize_paginated(&json!({"result": {"users": [{"id": 9}]}, "total": 30}));
        assert_eq!(page.items, vec![json!({"id": 9})]);
        assert_eq!(page.meta.total, 30);
    }

    #[test]
    fn unknown_shape_yields_empty_page() {
        let page = normalize_paginated(&json!({"message": "ok"}));
        assert!(page.items.is_empty());
        assert_eq!(
            page.meta,
            PageMeta {
                current_page: 1,
                last_page: 1,
                per_page: 10,
                total: 0
            }
        );
    }

    #[test]
    fn list_query_skips_blank_filters() {
        let query = ListQuery {
            page: Some(2),
            search: Some("  ".to_owned()),
            status: Some("pending".to_owned()),
            ..ListQuery::default()
        };

        assert_eq!(
            query.to_query_pairs(),
            vec![
                ("page".to_owned(), "2".to_owned()),
                ("status".to_owned(), "pending".to_owned()),
            ]
        );
    }
}
