//! End-to-end behaviour of catch-up and change handling over in-memory fakes.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use common::{at, FakeDatabase, FakeSearchEngine, Harness};
use content_indexer_pipeline::Transformer;
use content_indexer_repository::InMemoryStateStore;
use content_indexer_shared::{ChangeNotification, ChangeOperation, EntityKind};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn three_pending_rows_with_batch_size_two() {
    let harness = Harness::new(2);
    let films = [
        harness.db.add_film("Mirror", at(1)),
        harness.db.add_film("Stalker", at(2)),
        harness.db.add_film("Nostalghia", at(3)),
    ];

    let mut reader = harness
        .extractor
        .fetch(EntityKind::Movies, DateTime::UNIX_EPOCH, vec![], 2);
    let mut sizes = Vec::new();
    for _ in 0..3 {
        sizes.push(reader.next_batch().await.unwrap().len());
    }
    assert_eq!(sizes, vec![2, 1, 0]);

    let pipeline = harness.pipeline();
    let mut rx = pipeline.shutdown_handle().subscribe();
    let report = pipeline.catch_up(&mut rx).await;

    assert_eq!(report.kind(EntityKind::Movies).unwrap().batches, 2);
    assert_eq!(harness.search.count("movies"), 3);
    assert_eq!(
        harness.state.raw("movies_time").await.unwrap(),
        at(3).to_rfc3339()
    );
    let ids: Vec<String> =
        serde_json::from_str(&harness.state.raw("movies_ids").await.unwrap()).unwrap();
    assert_eq!(ids, vec![films[2].to_string()]);
}

#[tokio::test]
async fn catch_up_groups_people_by_role() {
    let harness = Harness::new(10);
    let film = harness.db.add_film("Persona", at(1));
    let bergman = harness.db.add_person("Ingmar Bergman", at(1));
    let ullmann = harness.db.add_person("Liv Ullmann", at(1));
    let nykvist = harness.db.add_person("Sven Nykvist", at(1));
    harness.db.link_person(film, bergman, "director");
    harness.db.link_person(film, bergman, "writer");
    harness.db.link_person(film, ullmann, "actor");
    harness.db.link_person(film, nykvist, "cinematographer");

    let pipeline = harness.pipeline();
    let mut rx = pipeline.shutdown_handle().subscribe();
    pipeline.catch_up(&mut rx).await;

    let doc = harness.search.doc("movies", film).unwrap();
    assert_eq!(doc["directors_names"], json!(["Ingmar Bergman"]));
    assert_eq!(doc["writers_names"], json!(["Ingmar Bergman"]));
    assert_eq!(doc["actors_names"], json!(["Liv Ullmann"]));
    assert!(doc["rating"].is_null());
    assert_eq!(doc["genres"], json!([]));
    assert_eq!(harness.search.count("persons"), 3);
}

#[tokio::test]
async fn genre_link_insert_refreshes_only_the_linked_film() {
    let harness = Harness::new(10);
    let film = harness.db.add_film("Solaris", at(1));
    harness.db.add_film("Andrei Rublev", at(2));
    let pipeline = harness.pipeline();
    let mut rx = pipeline.shutdown_handle().subscribe();
    pipeline.catch_up(&mut rx).await;

    let genre = harness.db.add_genre("Sci-Fi", at(5));
    let link = harness.db.link_genre(film, genre);
    harness.db.point_queries.store(0, Ordering::SeqCst);
    harness.search.single_writes.store(0, Ordering::SeqCst);

    let change = ChangeNotification::new("genre_film_work", ChangeOperation::Insert, link);
    let outcome = harness.listener().handle_change(&change).await.unwrap();

    assert_eq!(outcome.refreshed, 1);
    assert_eq!(harness.db.point_queries.load(Ordering::SeqCst), 1);
    assert_eq!(harness.search.single_writes.load(Ordering::SeqCst), 1);
    let doc = harness.search.doc("movies", film).unwrap();
    assert_eq!(doc["genres"][0]["name"], "Sci-Fi");
}

#[tokio::test]
async fn genre_rename_reaches_film_documents() {
    let harness = Harness::new(10);
    let genre = harness.db.add_genre("Drama", at(1));
    let first = harness.db.add_film("Persona", at(1));
    let second = harness.db.add_film("Cries and Whispers", at(2));
    harness.db.link_genre(first, genre);
    harness.db.link_genre(second, genre);
    let pipeline = harness.pipeline();
    let mut rx = pipeline.shutdown_handle().subscribe();
    pipeline.catch_up(&mut rx).await;

    harness.db.rename_genre(genre, "Psychological drama", at(10));
    let change = ChangeNotification::new("genre", ChangeOperation::Update, genre);
    let outcome = harness.listener().handle_change(&change).await.unwrap();

    assert_eq!(outcome.indexed, 1);
    assert_eq!(outcome.refreshed, 2);
    for film in [first, second] {
        let doc = harness.search.doc("movies", film).unwrap();
        assert_eq!(doc["genres"][0]["name"], "Psychological drama");
    }
    assert_eq!(
        harness.search.doc("genres", genre).unwrap()["name"],
        "Psychological drama"
    );
}

#[tokio::test]
async fn deleted_film_disappears_from_the_index() {
    let harness = Harness::new(10);
    let film = harness.db.add_film("The Sacrifice", at(1));
    let pipeline = harness.pipeline();
    let mut rx = pipeline.shutdown_handle().subscribe();
    pipeline.catch_up(&mut rx).await;
    assert!(harness.search.doc("movies", film).is_some());

    harness.db.remove_film(film);
    let change = ChangeNotification::new("film_work", ChangeOperation::Delete, film);
    let outcome = harness.listener().handle_change(&change).await.unwrap();

    assert_eq!(outcome.deleted, 1);
    assert!(harness.search.doc("movies", film).is_none());
    assert!(harness
        .loader
        .get("movies", &film.to_string())
        .await
        .unwrap()
        .is_none());

    // a repeated delete is harmless
    harness.listener().handle_change(&change).await.unwrap();
}

#[tokio::test]
async fn loading_twice_leaves_the_same_index() {
    let harness = Harness::new(2);
    for i in 0..5 {
        harness.db.add_film(&format!("Film {}", i), at(i));
    }
    let pipeline = harness.pipeline();
    let mut rx = pipeline.shutdown_handle().subscribe();

    pipeline.catch_up(&mut rx).await;
    let first = harness.search.snapshot();

    let cursors = harness.cursors();
    for kind in EntityKind::ALL {
        cursors.reset(kind).await.unwrap();
    }
    pipeline.catch_up(&mut rx).await;

    assert_eq!(harness.search.snapshot(), first);
    assert_eq!(harness.search.count("movies"), 5);
}

#[tokio::test]
async fn restart_after_crash_before_cursor_save() {
    let db = Arc::new(FakeDatabase::default());
    let search = Arc::new(FakeSearchEngine::default());
    let state = Arc::new(InMemoryStateStore::new("etl_state:"));
    for i in 0..3 {
        db.add_film(&format!("Film {}", i), at(i));
    }

    // First run loads a batch and dies before saving the cursor.
    let crashed = Harness::assemble(db.clone(), search.clone(), state.clone(), 2);
    let rows = crashed
        .extractor
        .fetch(EntityKind::Movies, DateTime::UNIX_EPOCH, vec![], 2)
        .next_batch()
        .await
        .unwrap();
    let documents = Transformer::new().transform_batch(&rows);
    crashed.loader.load_bulk("movies", &documents).await.unwrap();
    assert!(state.raw("movies_time").await.is_none());

    let restarted = Harness::assemble(db, search.clone(), state.clone(), 2);
    let pipeline = restarted.pipeline();
    let mut rx = pipeline.shutdown_handle().subscribe();
    let report = pipeline.catch_up(&mut rx).await;

    assert_eq!(report.kind(EntityKind::Movies).unwrap().loaded, 3);
    assert_eq!(search.count("movies"), 3);
    assert_eq!(state.raw("movies_time").await.unwrap(), at(2).to_rfc3339());
}

#[tokio::test]
async fn restart_inside_a_timestamp_tie_loads_only_the_rest() {
    let db = Arc::new(FakeDatabase::default());
    let search = Arc::new(FakeSearchEngine::default());
    let state = Arc::new(InMemoryStateStore::new("etl_state:"));
    let mut films: Vec<Uuid> = (0..3)
        .map(|i| db.add_film(&format!("Tie {}", i), at(5)))
        .collect();
    films.sort();

    // First run saves the cursor of its first batch, then dies.
    let first = Harness::assemble(db.clone(), search.clone(), state.clone(), 2);
    let cursors = first.cursors();
    let mut cursor = cursors.load(EntityKind::Movies).await.unwrap();
    let rows = first
        .extractor
        .fetch_from(EntityKind::Movies, &cursor)
        .next_batch()
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    first
        .loader
        .load_bulk("movies", &Transformer::new().transform_batch(&rows))
        .await
        .unwrap();
    assert!(cursor.advance(&rows));
    cursors.save(EntityKind::Movies, &cursor).await.unwrap();

    let restarted = Harness::assemble(db, search.clone(), state.clone(), 2);
    let pipeline = restarted.pipeline();
    let mut rx = pipeline.shutdown_handle().subscribe();
    let report = pipeline.catch_up(&mut rx).await;

    let movies = report.kind(EntityKind::Movies).unwrap();
    assert_eq!(movies.loaded, 1);
    assert_eq!(movies.batches, 1);
    assert_eq!(search.count("movies"), 3);
    assert_eq!(state.raw("movies_time").await.unwrap(), at(5).to_rfc3339());
    let mut ids: Vec<String> =
        serde_json::from_str(&state.raw("movies_ids").await.unwrap()).unwrap();
    ids.sort();
    let expected: Vec<String> = films.iter().map(Uuid::to_string).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn cursor_never_moves_backwards() {
    let harness = Harness::new(10);
    let film = harness.db.add_film("Ivan's Childhood", at(10));
    let pipeline = harness.pipeline();
    let mut rx = pipeline.shutdown_handle().subscribe();
    let cursors = harness.cursors();

    pipeline.catch_up(&mut rx).await;
    let before = cursors.load(EntityKind::Movies).await.unwrap();
    assert_eq!(before.last_seen_timestamp, at(10));

    // A row backdated behind the cursor is not picked up and moves nothing.
    harness.db.add_film("Backdated", at(3));
    pipeline.catch_up(&mut rx).await;
    assert_eq!(cursors.load(EntityKind::Movies).await.unwrap(), before);

    harness.db.touch_film(film, "Ivan's Childhood (restored)", at(20));
    pipeline.catch_up(&mut rx).await;
    let after = cursors.load(EntityKind::Movies).await.unwrap();
    assert!(after.last_seen_timestamp > before.last_seen_timestamp);
    assert_eq!(
        harness.search.doc("movies", film).unwrap()["title"],
        "Ivan's Childhood (restored)"
    );
}

#[tokio::test(start_paused = true)]
async fn run_catches_up_then_listens_until_shutdown() {
    let harness = Harness::new(10);
    harness.db.add_film("Zerkalo", at(1));
    harness.db.add_genre("Drama", at(1));
    let mut pipeline = harness.pipeline();
    let handle = pipeline.shutdown_handle();

    let (result, _) = tokio::join!(pipeline.run(), async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        let _ = handle.send(());
    });

    result.unwrap();
    assert_eq!(harness.search.count("movies"), 1);
    assert_eq!(harness.search.count("genres"), 1);
    assert!(harness.state.raw("genres_time").await.is_some());
}
