use rusqlite::params;
use tempfile::tempdir;
use tutorpath::core::broker;
use tutorpath::core::config::TutorConfig;
use tutorpath::core::db;
use tutorpath::core::error::TutorError;
use tutorpath::core::store::{Store, StoreKind};
use tutorpath::plugins::scoring::SkillScore;
use tutorpath::plugins::state::{
    LearnerState, MemoryStateStore, SqliteStateStore, StateStore, open_state_store,
};

fn sample_state(id: &str) -> LearnerState {
    let mut state = LearnerState::new(id, "prereq.math.basics");
    state.current_node = "core.bigO.time".to_string();
    state.skipped_diagnostic = true;
    state.record_grade("core.bigO.time", true, 3);
    state.record_grade("core.bigO.time", false, 3);
    state.pending_index.insert("core.bigO.time".to_string(), 2);
    state
}

fn exercise_store(store: &dyn StateStore) {
    assert_eq!(store.load("s1").unwrap(), None);

    let state = sample_state("s1");
    store.save(&state).unwrap();
    assert_eq!(store.load("s1").unwrap(), Some(state.clone()));

    let mut updated = state.clone();
    updated.record_grade("core.bigO.time", true, 3);
    updated.current_node = "core.arrays".to_string();
    store.save(&updated).unwrap();
    let loaded = store.load("s1").unwrap().unwrap();
    assert_eq!(loaded.scores["core.bigO.time"], SkillScore::new(2, 3));
    assert_eq!(loaded.current_node, "core.arrays");

    store.save(&sample_state("s0")).unwrap();
    assert_eq!(store.list().unwrap(), vec!["s0", "s1"]);

    assert!(store.delete("s1").unwrap());
    assert_eq!(store.load("s1").unwrap(), None);
    assert!(!store.delete("s1").unwrap());
    assert_eq!(store.list().unwrap(), vec!["s0"]);
}

#[test]
fn memory_store_contract() {
    exercise_store(&MemoryStateStore::new());
}

#[test]
fn sqlite_store_contract() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let store = SqliteStateStore::open(root, &db::learner_db_path(root)).unwrap();
    assert_eq!(store.kind(), StoreKind::Sqlite);
    exercise_store(&store);
}

#[test]
fn sqlite_state_survives_reopen() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let db_path = db::learner_db_path(root);
    {
        let store = SqliteStateStore::open(root, &db_path).unwrap();
        store.save(&sample_state("durable")).unwrap();
    }
    let reopened = SqliteStateStore::open(root, &db_path).unwrap();
    assert_eq!(reopened.load("durable").unwrap(), Some(sample_state("durable")));
}

#[test]
fn sqlite_operations_are_brokered_with_session_ref() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let store = SqliteStateStore::open(root, &db::learner_db_path(root)).unwrap();
    store.save(&sample_state("s9")).unwrap();
    store.load("s9").unwrap();

    let events = broker::read_events(root).unwrap();
    let ops: Vec<&str> = events.iter().map(|e| e.op.as_str()).collect();
    assert_eq!(ops, vec!["learner.init", "state.save", "state.load"]);
    assert_eq!(events[1].intent_ref.as_deref(), Some("s9"));
    assert!(events.iter().all(|e| e.status == "success"));
    assert_eq!(events[1].db_id, "learner.db");
}

#[test]
fn inflated_rows_are_clamped_on_load() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let db_path = db::learner_db_path(root);
    let store = SqliteStateStore::open(root, &db_path).unwrap();

    let conn = db::db_connect(&db_path.to_string_lossy()).unwrap();
    conn.execute(
        "INSERT INTO learner_state(session_id, current_node, skipped_diagnostic, scores_json, pending_json, updated_at)
         VALUES(?1, ?2, 0, ?3, '{}', '0Z')",
        params!["legacy", "core.arrays", r#"{"core.arrays":{"correct":7,"total":3}}"#],
    )
    .unwrap();
    drop(conn);

    let loaded = store.load("legacy").unwrap().unwrap();
    assert_eq!(loaded.scores["core.arrays"], SkillScore::new(3, 3));
}

#[test]
fn corrupt_rows_surface_as_persistence_failure() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let db_path = db::learner_db_path(root);
    let store = SqliteStateStore::open(root, &db_path).unwrap();

    let conn = db::db_connect(&db_path.to_string_lossy()).unwrap();
    conn.execute(
        "INSERT INTO learner_state(session_id, current_node, skipped_diagnostic, scores_json, pending_json, updated_at)
         VALUES('bad', 'x', 0, 'not json', '{}', '0Z')",
        [],
    )
    .unwrap();
    drop(conn);

    let err = store.load("bad").unwrap_err();
    assert!(matches!(err, TutorError::PersistenceFailure(_)));
    assert_eq!(err.code(), "persistence_failure");
}

#[test]
fn unopenable_database_is_a_persistence_failure() {
    let tmp = tempdir().unwrap();
    // a directory where the database file should be
    let db_path = tmp.path().join("learner.db");
    std::fs::create_dir_all(&db_path).unwrap();
    let err = SqliteStateStore::open(tmp.path(), &db_path)
        .err()
        .expect("open should fail");
    assert!(matches!(err, TutorError::PersistenceFailure(_)));
}

#[test]
fn backend_is_chosen_by_store_kind() {
    let tmp = tempdir().unwrap();
    let config = TutorConfig::default();

    let memory = open_state_store(&Store::new(StoreKind::Memory, tmp.path()), &config).unwrap();
    assert_eq!(memory.kind(), StoreKind::Memory);

    let sqlite = open_state_store(&Store::new(StoreKind::Sqlite, tmp.path()), &config).unwrap();
    assert_eq!(sqlite.kind(), StoreKind::Sqlite);
    assert!(tmp.path().join("learner.db").exists());
}
