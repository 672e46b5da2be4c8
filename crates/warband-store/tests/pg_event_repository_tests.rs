//! Integration tests for the PostgreSQL adapters.
//!
//! These need a live database (`DATABASE_URL`) and are ignored by default;
//! run them with `cargo test -p warband-store -- --ignored`.

use chrono::{TimeZone, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use warband_core::catalog::{CompositionCatalog, CompositionTemplate};
use warband_core::error::DomainError;
use warband_core::registry::{Profile, ProfileRegistry, UserId};
use warband_core::repository::{EventRepository, StoredEvent};
use warband_store::{PgCompositionCatalog, PgEventRepository, PgProfileRegistry};

fn make_stored_event(aggregate_id: Uuid, sequence_number: i64) -> StoredEvent {
    StoredEvent {
        event_id: Uuid::new_v4(),
        aggregate_id,
        event_type: "signup.session_opened".to_string(),
        payload: serde_json::json!({"key": "value"}),
        sequence_number,
        correlation_id: Uuid::new_v4(),
        causation_id: Uuid::new_v4(),
        occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_append_and_load_preserves_sequence_order(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let aggregate_id = Uuid::new_v4();
    let events = vec![
        make_stored_event(aggregate_id, 1),
        make_stored_event(aggregate_id, 2),
    ];

    repo.append_events(aggregate_id, 0, &events).await.unwrap();

    let loaded = repo.load_events(aggregate_id).await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].sequence_number, 1);
    assert_eq!(loaded[1].sequence_number, 2);
    assert_eq!(loaded[0].payload, events[0].payload);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_stale_expected_version_is_a_concurrency_conflict(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let aggregate_id = Uuid::new_v4();
    repo.append_events(aggregate_id, 0, &[make_stored_event(aggregate_id, 1)])
        .await
        .unwrap();

    let result = repo
        .append_events(aggregate_id, 0, &[make_stored_event(aggregate_id, 1)])
        .await;

    assert!(matches!(
        result,
        Err(DomainError::ConcurrencyConflict { .. })
    ));
    assert_eq!(repo.load_events(aggregate_id).await.unwrap().len(), 1);
}

fn make_closed_event(aggregate_id: Uuid, sequence_number: i64) -> StoredEvent {
    StoredEvent {
        event_type: "signup.session_closed".to_string(),
        ..make_stored_event(aggregate_id, sequence_number)
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_open_aggregate_ids_skips_closed_streams(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let open_id = Uuid::new_v4();
    let closed_id = Uuid::new_v4();
    repo.append_events(open_id, 0, &[make_stored_event(open_id, 1)])
        .await
        .unwrap();
    repo.append_events(
        closed_id,
        0,
        &[make_stored_event(closed_id, 1), make_closed_event(closed_id, 2)],
    )
    .await
    .unwrap();

    let ids = repo
        .open_aggregate_ids("signup.session_opened", "signup.session_closed")
        .await
        .unwrap();

    assert_eq!(ids, vec![open_id]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_evict_closed_before_deletes_whole_finished_streams(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let open_id = Uuid::new_v4();
    let closed_id = Uuid::new_v4();
    repo.append_events(open_id, 0, &[make_stored_event(open_id, 1)])
        .await
        .unwrap();
    repo.append_events(
        closed_id,
        0,
        &[make_stored_event(closed_id, 1), make_closed_event(closed_id, 2)],
    )
    .await
    .unwrap();
    let cutoff = Utc.with_ymd_and_hms(2026, 1, 16, 10, 0, 0).unwrap();

    let evicted = repo
        .evict_closed_before("signup.session_closed", cutoff)
        .await
        .unwrap();

    assert_eq!(evicted, 1);
    assert!(repo.load_events(closed_id).await.unwrap().is_empty());
    assert_eq!(repo.load_events(open_id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_profile_upsert_replaces_existing_profile(pool: PgPool) {
    let registry = PgProfileRegistry::new(pool);
    let user_id = UserId::from("42");
    let mut profile = Profile {
        user_id: user_id.clone(),
        display_name: "aldric".to_owned(),
        in_game_name: "Aldric".to_owned(),
        group_tag: "Phoenix Rebels".to_owned(),
        registered_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    };
    registry.upsert_profile(profile.clone()).await.unwrap();
    profile.group_tag = "Iron Wolves".to_owned();
    registry.upsert_profile(profile.clone()).await.unwrap();

    let resolved = registry.resolve_profile(&user_id).await.unwrap();

    assert_eq!(resolved, Some(profile));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_catalog_round_trip_keeps_role_order(pool: PgPool) {
    let catalog = PgCompositionCatalog::new(pool);
    let template = CompositionTemplate {
        name: "Castle Siege".to_owned(),
        role_slots: vec!["Tank".to_owned(), "Healer".to_owned(), "Tank".to_owned()],
        created_by: UserId::from("7"),
        created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    };
    catalog.insert(template.clone()).await.unwrap();

    let found = catalog.find_by_name("castle siege").await.unwrap();
    let duplicate = catalog.insert(template.clone()).await;

    assert_eq!(found, Some(template));
    assert!(matches!(duplicate, Err(DomainError::Validation(_))));
    assert_eq!(catalog.list_names().await.unwrap(), vec!["Castle Siege".to_owned()]);
}
