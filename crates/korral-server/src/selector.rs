/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Resource Selector
//!
//! Filter, sort and paginate any collection whose items expose a name and a
//! creation time.
//!
//! The pipeline is always applied in the same order:
//!
//! 1. keep items whose name contains the filter (literal, case-sensitive)
//! 2. record `total`, the filtered but unpaginated count
//! 3. sort by creation time, newest first (stable)
//! 4. cut the requested page
//!
//! A non-positive `limit` or `page` disables pagination and the whole
//! filtered, sorted set is returned. A page past the end is empty, never an
//! error.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The two attributes selection needs from a resource.
pub trait ResourceCell {
    fn name(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

/// Name filter plus optional pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionQuery {
    filter: String,
    page: Option<PageRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageRequest {
    limit: usize,
    page: usize,
}

impl SelectionQuery {
    /// Builds a query. Pagination is active only when both `limit` and `page`
    /// are positive.
    pub fn new(filter: impl Into<String>, limit: i64, page: i64) -> Self {
        let page = match (usize::try_from(limit), usize::try_from(page)) {
            (Ok(limit), Ok(page)) if limit > 0 && page > 0 => Some(PageRequest { limit, page }),
            _ => None,
        };
        SelectionQuery {
            filter: filter.into(),
            page,
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// `(limit, page)` when pagination is active.
    pub fn pagination(&self) -> Option<(usize, usize)> {
        self.page.map(|p| (p.limit, p.page))
    }
}

/// One page of a selection and the filtered total it was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection<T> {
    pub total: usize,
    pub items: Vec<T>,
}

impl<T> Selection<T> {
    /// Converts every item, keeping `total`.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Selection<U>, E> {
        Ok(Selection {
            total: self.total,
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
        })
    }
}

/// Runs filter, sort and paginate over `items`.
///
/// # Arguments
///
/// * `items` - The full, unordered collection
/// * `query` - Filter and pagination to apply
///
/// # Returns
///
/// A `Selection` whose `total` counts every item that passed the filter.
pub fn select<T: ResourceCell>(mut items: Vec<T>, query: &SelectionQuery) -> Selection<T> {
    if !query.filter.is_empty() {
        items.retain(|item| item.name().contains(query.filter.as_str()));
    }
    let total = items.len();

    items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

    let items = match query.page {
        None => items,
        Some(PageRequest { limit, page }) => {
            let start = limit.saturating_mul(page - 1);
            if start >= items.len() {
                Vec::new()
            } else {
                let end = limit.saturating_mul(page).min(items.len());
                items.into_iter().skip(start).take(end - start).collect()
            }
        }
    };

    Selection { total, items }
}
