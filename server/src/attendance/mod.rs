//! Attendance Store
//!
//! All records live in one JSON document that is rewritten as a whole on every change.
//! Reads go straight to the file. Every change is funneled through the single
//! [`AttendanceWriter`](actor::AttendanceWriter) actor, which handles one message at a time,
//! so no two load-mutate-store cycles can interleave.
//!
//! On disk the document is a flat string to string map. Only what comes in through
//! [`AttendanceStore::upsert`] is validated; entries that were written some other way
//! are kept in the file but left out of [`AttendanceStore::get_all`].

use async_std::{future::timeout, task};
use hannibal::{Actor, Addr};
use thiserror::Error;

use std::{
    collections::BTreeMap,
    path::PathBuf,
    time::{Duration, Instant},
};

use crate::storage::{FileError, JsonFile};

pub use attendance_protocol::{ParseError, RecordKey, Records, Status};

pub mod actor;
pub mod command;

use actor::AttendanceWriter;
use command::Upsert;

/// Extra time granted to the writer to report back after the deadline of a change.
const COMMIT_GRACE: Duration = Duration::from_millis(250);

/// The document as it is stored
pub(crate) type Document = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ParseError),

    #[error(transparent)]
    Io(FileError),

    #[error("storage did not answer within {0:?}")]
    Timeout(Duration),

    #[error("attendance writer is unavailable: {0}")]
    Unavailable(anyhow::Error),
}

/// Handle to the attendance records, cheap to clone
#[derive(Clone)]
pub struct AttendanceStore {
    file: JsonFile,
    writer: Addr<AttendanceWriter>,
    io_timeout: Duration,
}

impl AttendanceStore {
    /// Creates the document if it is missing and starts the writer.
    pub async fn open(path: impl Into<PathBuf>, io_timeout: Duration) -> Result<Self, StoreError> {
        let file = JsonFile::new(path);

        let initial = file.clone();
        blocking(io_timeout, move || initial.materialize(&Document::new())).await?;

        let writer = AttendanceWriter::new(file.clone(), io_timeout)
            .start()
            .await
            .map_err(|error| StoreError::Unavailable(error.into()))?;

        tracing::info!("attendance records at {}", file.path().display());
        Ok(AttendanceStore {
            file,
            writer,
            io_timeout,
        })
    }

    /// Everything that was persisted, empty if nothing ever was.
    pub async fn get_all(&self) -> Result<Records, StoreError> {
        let file = self.file.clone();
        let document = blocking(self.io_timeout, move || file.load::<Document>()).await?;
        Ok(records(document.unwrap_or_default()))
    }

    /// Validates raw input and stores it.
    pub async fn upsert(&self, key: &str, status: &str) -> Result<(), StoreError> {
        let key = key.parse::<RecordKey>()?;
        let status = status.parse::<Status>()?;
        self.set(key, status).await
    }

    /// Inserts or overwrites one record, returns once the whole document is persisted.
    ///
    /// A change that misses its deadline is abandoned by the writer and never lands later.
    pub async fn set(&self, key: RecordKey, status: Status) -> Result<(), StoreError> {
        tracing::trace!("requesting {} -> {}", key, status);
        let deadline = Instant::now() + self.io_timeout;

        timeout(
            self.io_timeout + COMMIT_GRACE,
            self.writer.call(Upsert { key, status, deadline }),
        )
        .await
        .map_err(|_| StoreError::Timeout(self.io_timeout))?
        .map_err(|error| StoreError::Unavailable(error.into()))?
    }
}

fn records(document: Document) -> Records {
    document
        .into_iter()
        .filter_map(|(key, status)| match (key.parse::<RecordKey>(), status.parse::<Status>()) {
            (Ok(record), Ok(status)) => Some((record, status)),
            (Err(error), _) | (_, Err(error)) => {
                tracing::warn!("skipping stored record {:?}: {}", key, error);
                None
            }
        })
        .collect()
}

fn settle<T>(limit: Duration, result: Result<T, FileError>) -> Result<T, StoreError> {
    result.map_err(|error| match error {
        FileError::DeadlinePassed { .. } => StoreError::Timeout(limit),
        error => StoreError::Io(error),
    })
}

/// Runs file I/O outside the writer on the blocking pool, bounded by `limit`.
pub(crate) async fn blocking<T, F>(limit: Duration, io: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, FileError> + Send + 'static,
    T: Send + 'static,
{
    let result = timeout(limit, task::spawn_blocking(io))
        .await
        .map_err(|_| StoreError::Timeout(limit))?;
    settle(limit, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use futures::future::join_all;
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn store(dir: &TempDir) -> AttendanceStore {
        AttendanceStore::open(dir.path().join("attendance.json"), TIMEOUT)
            .await
            .unwrap()
    }

    fn key(username: &str, day: u32) -> RecordKey {
        RecordKey::new(username, NaiveDate::from_ymd_opt(2024, 5, day).unwrap())
    }

    #[async_std::test]
    async fn opening_materializes_an_empty_document() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        assert!(store.get_all().await.unwrap().is_empty());
        let raw = std::fs::read_to_string(dir.path().join("attendance.json")).unwrap();
        assert_eq!(raw.trim(), "{}");
    }

    #[async_std::test]
    async fn vanished_document_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        std::fs::remove_file(dir.path().join("attendance.json")).unwrap();

        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[async_std::test]
    async fn upsert_then_read() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        store.upsert("john_2024-05-02", "present").await.unwrap();

        let records = store.get_all().await.unwrap();
        assert_eq!(records.get(&key("john", 2)), Some(&Status::Present));
    }

    #[async_std::test]
    async fn repeated_upsert_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        store.upsert("john_2024-05-02", "present").await.unwrap();
        let once = store.get_all().await.unwrap();
        store.upsert("john_2024-05-02", "present").await.unwrap();
        let twice = store.get_all().await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
    }

    #[async_std::test]
    async fn overwrites_existing_status() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        store.set(key("jane", 3), Status::Present).await.unwrap();
        store.set(key("jane", 3), Status::Absent).await.unwrap();

        assert_eq!(store.get_all().await.unwrap()[&key("jane", 3)], Status::Absent);
    }

    #[async_std::test]
    async fn invalid_input_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.set(key("bob", 1), Status::Present).await.unwrap();
        let before = store.get_all().await.unwrap();

        for (key, status) in [
            ("", "present"),
            ("bob_2024-05-01", ""),
            ("bob", "present"),
            ("bob_2024-05-01", "late"),
        ] {
            let result = store.upsert(key, status).await;
            assert!(matches!(result, Err(StoreError::Validation(_))), "{key:?} {status:?}");
        }

        assert_eq!(store.get_all().await.unwrap(), before);
    }

    #[async_std::test]
    async fn concurrent_upserts_to_distinct_keys_all_persist() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let users = ["admin", "john", "jane", "bob", "alice"];
        let writes = users
            .iter()
            .flat_map(|user| (1..=8).map(move |day| key(user, day)))
            .map(|key| {
                let store = store.clone();
                task::spawn(async move { store.set(key, Status::Present).await })
            })
            .collect::<Vec<_>>();

        for result in join_all(writes).await {
            result.unwrap();
        }

        let records = store.get_all().await.unwrap();
        assert_eq!(records.len(), users.len() * 8);
        assert!(records.values().all(|status| *status == Status::Present));

        let on_disk: Records =
            serde_json::from_slice(&std::fs::read(dir.path().join("attendance.json")).unwrap()).unwrap();
        assert_eq!(on_disk, records);
    }

    #[async_std::test]
    async fn concurrent_upserts_to_one_key_leave_one_of_them() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.set(key("alice", 9), Status::Present).await.unwrap();

        let present = {
            let store = store.clone();
            task::spawn(async move { store.set(key("alice", 10), Status::Present).await })
        };
        let absent = {
            let store = store.clone();
            task::spawn(async move { store.set(key("alice", 10), Status::Absent).await })
        };
        present.await.unwrap();
        absent.await.unwrap();

        let records = store.get_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[&key("alice", 9)], Status::Present);
        assert!(matches!(records[&key("alice", 10)], Status::Present | Status::Absent));
    }

    #[async_std::test]
    async fn corrupt_document_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        std::fs::write(dir.path().join("attendance.json"), b"[1, 2").unwrap();

        assert!(matches!(store.get_all().await, Err(StoreError::Io(FileError::Corrupt { .. }))));
        assert!(matches!(
            store.set(key("john", 1), Status::Present).await,
            Err(StoreError::Io(FileError::Corrupt { .. }))
        ));
        let raw = std::fs::read(dir.path().join("attendance.json")).unwrap();
        assert_eq!(raw, b"[1, 2", "failed writes must not touch the document");
    }

    #[async_std::test]
    async fn unreadable_entries_do_not_take_the_store_down() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let path = dir.path().join("attendance.json");
        std::fs::write(
            &path,
            r#"{"john_2024-05-01": "present", "legacy": "present", "jane_2024-05-01": "late"}"#,
        )
        .unwrap();

        let records = store.get_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[&key("john", 1)], Status::Present);

        store.upsert("jane_2024-05-02", "present").await.unwrap();

        let on_disk: Document = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk["legacy"], "present");
        assert_eq!(on_disk["jane_2024-05-01"], "late");
        assert_eq!(on_disk["jane_2024-05-02"], "present");
        assert_eq!(store.get_all().await.unwrap().len(), 2);
    }

    #[async_std::test]
    async fn expired_change_is_abandoned() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.set(key("bob", 1), Status::Present).await.unwrap();

        let result = store
            .writer
            .call(Upsert {
                key: key("bob", 2),
                status: Status::Present,
                deadline: Instant::now(),
            })
            .await
            .unwrap();

        assert!(matches!(result, Err(StoreError::Timeout(_))), "{result:?}");
        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }

    #[async_std::test]
    async fn timed_out_change_never_overtakes_a_later_one() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let preloaded = (0..20_000)
            .map(|i| (format!("user{i}_2024-05-01"), String::from("present")))
            .collect::<Document>();
        std::fs::write(
            dir.path().join("attendance.json"),
            serde_json::to_vec(&preloaded).unwrap(),
        )
        .unwrap();

        let hurried = AttendanceStore {
            io_timeout: Duration::ZERO,
            ..store.clone()
        };
        let late = task::spawn(async move { hurried.set(key("alice", 1), Status::Present).await });
        let patient = {
            let store = store.clone();
            task::spawn(async move { store.set(key("alice", 2), Status::Absent).await })
        };

        assert!(matches!(late.await, Err(StoreError::Timeout(_))));
        patient.await.unwrap();

        // give a stray cycle every chance to land
        task::sleep(COMMIT_GRACE * 2).await;

        let records = store.get_all().await.unwrap();
        assert_eq!(records.len(), preloaded.len() + 1);
        assert_eq!(records[&key("alice", 2)], Status::Absent);
        assert!(!records.contains_key(&key("alice", 1)));
    }

    #[async_std::test]
    async fn zero_timeout_changes_never_land() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let hurried = AttendanceStore {
            io_timeout: Duration::ZERO,
            ..store.clone()
        };

        assert!(matches!(
            hurried.set(key("john", 3), Status::Present).await,
            Err(StoreError::Timeout(_))
        ));
        store.set(key("john", 4), Status::Present).await.unwrap();

        let records = store.get_all().await.unwrap();
        assert_eq!(records.keys().collect::<Vec<_>>(), [&key("john", 4)]);
    }
}
