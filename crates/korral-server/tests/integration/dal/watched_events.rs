/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::{new_event, TestFixture};
use korral_server::dal::EventQuery;
use korral_server::events::ingestor::{ingest, IngestOutcome};
use korral_server::events::EventStore;
use std::sync::Arc;

fn cluster_name() -> String {
    format!("c-{}", uuid::Uuid::new_v4())
}

#[test]
#[ignore = "requires DATABASE_URL"]
fn test_create_is_idempotent_per_tuple() {
    let fixture = TestFixture::new();
    let cluster = cluster_name();
    let event = new_event("pod-a", "Scheduled", &cluster, 0);

    assert!(fixture.dal.watched_events().create(&event).unwrap());
    assert!(!fixture.dal.watched_events().create(&event).unwrap());

    let mut other_message = event.clone();
    other_message.message = "different text".to_string();
    assert!(!fixture.dal.watched_events().create(&other_message).unwrap());

    let query = EventQuery {
        cluster: Some(cluster),
        ..Default::default()
    };
    let (total, items) = fixture.dal.watched_events().list(&query).unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].reason, "Scheduled");
}

#[test]
#[ignore = "requires DATABASE_URL"]
fn test_exists_matches_full_key() {
    let fixture = TestFixture::new();
    let cluster = cluster_name();
    let event = new_event("pod-a", "Scheduled", &cluster, 0);

    assert!(!fixture.dal.exists(&event.key()).unwrap());
    fixture.dal.insert(&event).unwrap();
    assert!(fixture.dal.exists(&event.key()).unwrap());

    let elsewhere = new_event("pod-a", "Scheduled", &cluster_name(), 0);
    assert!(!fixture.dal.exists(&elsewhere.key()).unwrap());
}

#[test]
#[ignore = "requires DATABASE_URL"]
fn test_list_filters_sorts_and_paginates() {
    let fixture = TestFixture::new();
    let cluster = cluster_name();
    let events = fixture.dal.watched_events();

    events.create(&new_event("web-1", "Pulled", &cluster, 10)).unwrap();
    events.create(&new_event("web-2", "Pulled", &cluster, 20)).unwrap();
    events.create(&new_event("db_1", "Pulled", &cluster, 5)).unwrap();

    let query = EventQuery {
        name: Some("web".to_string()),
        cluster: Some(cluster.clone()),
        limit: 1,
        page: 1,
    };
    let (total, items) = events.list(&query).unwrap();
    assert_eq!(total, 2);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "web-2");

    let all = EventQuery {
        cluster: Some(cluster.clone()),
        ..Default::default()
    };
    let (total, items) = events.list(&all).unwrap();
    assert_eq!(total, 3);
    let names: Vec<&str> = items.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["web-2", "web-1", "db_1"]);

    let past_end = EventQuery {
        cluster: Some(cluster.clone()),
        limit: 2,
        page: 3,
        ..Default::default()
    };
    let (total, items) = events.list(&past_end).unwrap();
    assert_eq!(total, 3);
    assert!(items.is_empty());

    // Underscore is matched literally, not as a LIKE wildcard.
    let literal = EventQuery {
        name: Some("b_".to_string()),
        cluster: Some(cluster),
        ..Default::default()
    };
    let (total, _) = events.list(&literal).unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_ingesting_twice_stores_one_record() {
    let fixture = TestFixture::new();
    let cluster = cluster_name();
    let store = Arc::new(fixture.dal.clone());
    let event = new_event("pod-a", "Scheduled", &cluster, 0);

    assert_eq!(ingest(store.clone(), event.clone()).await, IngestOutcome::Stored);
    assert_eq!(ingest(store, event).await, IngestOutcome::Duplicate);

    let query = EventQuery {
        cluster: Some(cluster),
        ..Default::default()
    };
    let (total, _) = fixture.dal.watched_events().list(&query).unwrap();
    assert_eq!(total, 1);
}
