/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer for WatchedEvent operations.
//!
//! Records are append-only: this module only inserts, checks existence and
//! lists. Retention is handled outside of korral.

use crate::dal::DAL;
use crate::events::store::StoreError;
use diesel::dsl::exists;
use diesel::pg::Pg;
use diesel::prelude::*;
use korral_models::models::watched_events::{EventKey, NewWatchedEvent, WatchedEvent};
use korral_models::schema::watched_events;
use serde::Deserialize;

/// Filter and pagination for listing stored events.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventQuery {
    /// Substring of the involved object's name.
    pub name: Option<String>,
    /// Exact cluster name.
    pub cluster: Option<String>,
    pub limit: i64,
    pub page: i64,
}

/// Data Access Layer for WatchedEvent operations.
pub struct WatchedEventsDAL<'a> {
    /// Reference to the main DAL instance.
    pub dal: &'a DAL,
}

impl WatchedEventsDAL<'_> {
    /// Inserts a watched event unless its uniqueness tuple is already stored.
    ///
    /// # Returns
    ///
    /// `true` when a row was written, `false` when the unique index already
    /// held the tuple.
    pub fn create(&self, new_event: &NewWatchedEvent) -> Result<bool, StoreError> {
        let conn = &mut self.dal.pool.get()?;
        let rows = diesel::insert_into(watched_events::table)
            .values(new_event)
            .on_conflict_do_nothing()
            .execute(conn)?;
        Ok(rows == 1)
    }

    /// Whether a record with this uniqueness tuple exists.
    pub fn exists(&self, key: &EventKey) -> Result<bool, StoreError> {
        let conn = &mut self.dal.pool.get()?;
        let found = diesel::select(exists(
            watched_events::table
                .filter(watched_events::name.eq(&key.name))
                .filter(watched_events::kind.eq(&key.kind))
                .filter(watched_events::namespace.eq(&key.namespace))
                .filter(watched_events::reason.eq(&key.reason))
                .filter(watched_events::event_time.eq(key.event_time))
                .filter(watched_events::cluster.eq(&key.cluster)),
        ))
        .get_result::<bool>(conn)?;
        Ok(found)
    }

    /// Lists stored events, newest `event_time` first.
    ///
    /// # Arguments
    ///
    /// * `query` - Name substring, exact cluster and pagination. A non-positive
    ///   `limit` or `page` returns every matching record.
    ///
    /// # Returns
    ///
    /// The number of matching records before pagination and the requested page.
    pub fn list(&self, query: &EventQuery) -> Result<(i64, Vec<WatchedEvent>), StoreError> {
        let conn = &mut self.dal.pool.get()?;

        let total = filtered(query).count().get_result::<i64>(conn)?;

        let mut page = filtered(query).order((
            watched_events::event_time.desc(),
            watched_events::id.desc(),
        ));
        if query.limit > 0 && query.page > 0 {
            page = page
                .limit(query.limit)
                .offset(query.limit.saturating_mul(query.page - 1));
        }

        let items = page.load::<WatchedEvent>(conn)?;
        Ok((total, items))
    }
}

fn filtered(query: &EventQuery) -> watched_events::BoxedQuery<'static, Pg> {
    let mut boxed = watched_events::table.into_boxed();

    if let Some(name) = query.name.as_deref().filter(|n| !n.is_empty()) {
        boxed = boxed.filter(watched_events::name.like(format!("%{}%", escape_like(name))));
    }
    if let Some(cluster) = query.cluster.as_deref().filter(|c| !c.is_empty()) {
        boxed = boxed.filter(watched_events::cluster.eq(cluster.to_string()));
    }

    boxed
}

/// Escapes LIKE wildcards so the name filter stays a literal substring.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("pod-a"), "pod-a");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_event_query_defaults() {
        let query: EventQuery = serde_json::from_str("{}").expect("empty query");
        assert_eq!(query.limit, 0);
        assert_eq!(query.page, 0);
        assert!(query.name.is_none());
    }
}
