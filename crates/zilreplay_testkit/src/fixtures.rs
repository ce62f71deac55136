//! Store fixtures and replay helpers.

use zilreplay_core::{ReplayConfig, ReplayEngine, ReplayOutcome, ReplayResult};
use zilreplay_store::{InMemoryObjectStore, ObjectId, ROOT_OBJECT_ID};

/// Id of the `docs` directory in [`populated_store`].
pub const DOCS_DIR: ObjectId = ObjectId(2);
/// Id of `docs/readme.txt` in [`populated_store`].
pub const README_FILE: ObjectId = ObjectId(10);
/// Id of `notes.txt` in [`populated_store`].
pub const NOTES_FILE: ObjectId = ObjectId(11);
/// Contents of `docs/readme.txt`.
pub const README_CONTENTS: &[u8] = b"hello, world";

/// A store with a small tree:
///
/// ```text
/// /                 (1)
/// /docs             (2)
/// /docs/readme.txt  (10)
/// /notes.txt        (11)
/// ```
///
/// The seeding calls are not recorded.
pub fn populated_store() -> InMemoryObjectStore {
    let store = InMemoryObjectStore::new();
    store
        .insert_directory(ROOT_OBJECT_ID, b"docs", DOCS_DIR)
        .expect("Failed to seed docs directory");
    store
        .insert_file(DOCS_DIR, b"readme.txt", README_FILE, README_CONTENTS)
        .expect("Failed to seed readme");
    store
        .insert_file(ROOT_OBJECT_ID, b"notes.txt", NOTES_FILE, b"")
        .expect("Failed to seed notes");
    store
}

/// Runs `f` with a populated store and an engine over it.
///
/// Fails the test if any object reference is still held when `f` returns.
///
/// # Example
///
/// ```rust
/// use zilreplay_core::ReplayOutcome;
/// use zilreplay_testkit::{builders, with_engine, NOTES_FILE};
///
/// with_engine(|store, engine| {
///     let record = builders::write(NOTES_FILE.0, 0, b"abc").build();
///     assert_eq!(engine.replay_record(&record, false).unwrap(), ReplayOutcome::Applied);
///     assert_eq!(store.object(NOTES_FILE).unwrap().file_data(), Some(&b"abc"[..]));
/// });
/// ```
pub fn with_engine<F, R>(f: F) -> R
where
    F: FnOnce(&InMemoryObjectStore, &ReplayEngine<'_, InMemoryObjectStore>) -> R,
{
    with_engine_config(ReplayConfig::default(), f)
}

/// Like [`with_engine`], with the given configuration.
pub fn with_engine_config<F, R>(config: ReplayConfig, f: F) -> R
where
    F: FnOnce(&InMemoryObjectStore, &ReplayEngine<'_, InMemoryObjectStore>) -> R,
{
    let store = populated_store();
    let engine = ReplayEngine::with_config(&store, config);
    let result = f(&store, &engine);
    assert_eq!(
        store.outstanding_refs(),
        0,
        "object references leaked by replay"
    );
    result
}

/// Replays `record` on two fresh populated stores, once as is and once after
/// converting it to the opposite byte order, and returns both results along
/// with the two stores.
pub fn replay_both_orders(
    record: &[u8],
) -> (
    (ReplayResult<ReplayOutcome>, InMemoryObjectStore),
    (ReplayResult<ReplayOutcome>, InMemoryObjectStore),
) {
    let native = populated_store();
    let native_result = ReplayEngine::new(&native).replay_record(record, false);

    let mut foreign_record = record.to_vec();
    let swapped = populated_store();
    let swapped_result = match zilreplay_core::denormalize(&mut foreign_record) {
        Ok(()) => ReplayEngine::new(&swapped).replay_record(&foreign_record, true),
        Err(err) => Err(err),
    };
    ((native_result, native), (swapped_result, swapped))
}
