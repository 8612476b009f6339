//! Whole-document JSON persistence for trainers and gyms.

use crate::errors::{StoreError, StoreResult};
use crate::gym::Gym;
use crate::player::Trainer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};

/// Trainer id -> trainer record.
pub type TrainerBook = BTreeMap<String, Trainer>;
/// Gym name -> gym record.
pub type GymBook = BTreeMap<String, Gym>;

/// A JSON document on disk guarded by an async mutex.
///
/// Every read-modify-write goes through [`JsonStore::lock`]; changes reach the
/// disk only through [`StoreGuard::commit`].
#[derive(Debug)]
pub struct JsonStore<T> {
    path: PathBuf,
    lock: Mutex<()>,
    default_document: T,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send,
{
    /// Opens the document, writing `default_document` if the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>, default_document: T) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let store = Self {
            path,
            lock: Mutex::new(()),
            default_document,
        };
        if !tokio::fs::try_exists(&store.path).await.unwrap_or(false) {
            log::info!("creating {}", store.path.display());
            write_atomically(&store.path, &store.default_document).await?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Takes the store lock and loads the current document.
    pub async fn lock(&self) -> StoreResult<StoreGuard<'_, T>> {
        let guard = self.lock.lock().await;
        let document = self.load().await?;
        Ok(StoreGuard {
            _guard: guard,
            path: &self.path,
            document,
        })
    }

    /// A snapshot of the document for read-only use.
    pub async fn read(&self) -> StoreResult<T> {
        Ok(self.lock().await?.document)
    }

    async fn load(&self) -> StoreResult<T> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
                path: self.path.clone(),
                source,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(self.default_document.clone()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Exclusive access to a loaded document. Dropping it without committing
/// discards every change.
pub struct StoreGuard<'a, T> {
    _guard: MutexGuard<'a, ()>,
    path: &'a Path,
    document: T,
}

impl<T: Serialize> StoreGuard<'_, T> {
    pub async fn commit(&self) -> StoreResult<()> {
        write_atomically(self.path, &self.document).await
    }

    async fn stage(&self) -> StoreResult<StagedWrite> {
        StagedWrite::new(self.path, &self.document).await
    }
}

/// Commits two documents together. Both are written to temp files before
/// either replaces its target, so an encode or write failure leaves both
/// documents as they were.
pub async fn commit_pair<A: Serialize, B: Serialize>(
    first: &StoreGuard<'_, A>,
    second: &StoreGuard<'_, B>,
) -> StoreResult<()> {
    let first = first.stage().await?;
    let second = match second.stage().await {
        Ok(staged) => staged,
        Err(err) => {
            first.discard().await;
            return Err(err);
        }
    };
    first.publish().await?;
    second.publish().await
}

impl<T> Deref for StoreGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.document
    }
}

impl<T> DerefMut for StoreGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.document
    }
}

/// A complete document written next to its target, waiting to be renamed over it.
struct StagedWrite {
    tmp_path: PathBuf,
    path: PathBuf,
}

impl StagedWrite {
    async fn new<T: Serialize>(path: &Path, document: &T) -> StoreResult<Self> {
        let bytes = serde_json::to_vec_pretty(document).map_err(StoreError::Encode)?;
        let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, &bytes).await.map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        Ok(Self {
            tmp_path,
            path: path.to_path_buf(),
        })
    }

    async fn publish(self) -> StoreResult<()> {
        tokio::fs::rename(&self.tmp_path, &self.path)
            .await
            .map_err(|source| StoreError::Io { path: self.path, source })
    }

    async fn discard(self) {
        if let Err(err) = tokio::fs::remove_file(&self.tmp_path).await {
            log::warn!("could not remove {}: {}", self.tmp_path.display(), err);
        }
    }
}

/// Writes a sibling temp file and renames it over the target, so readers only
/// ever see a complete document.
async fn write_atomically<T: Serialize>(path: &Path, document: &T) -> StoreResult<()> {
    StagedWrite::new(path, document).await?.publish().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schema::Item;

    fn sample_book() -> TrainerBook {
        let mut book = TrainerBook::new();
        book.insert(
            "ash".to_string(),
            Trainer::new("ash", "Trainer", BTreeMap::from([(Item::Potion, 3)])),
        );
        book
    }

    #[tokio::test]
    async fn test_open_writes_default_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("trainers.json");
        let store = JsonStore::open(&path, sample_book()).await.unwrap();

        assert!(path.exists());
        assert_eq!(store.read().await.unwrap(), sample_book());
    }

    #[tokio::test]
    async fn test_changes_persist_only_after_commit() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("trainers.json"), TrainerBook::new())
            .await
            .unwrap();

        {
            let mut book = store.lock().await.unwrap();
            book.insert("misty".to_string(), Trainer::new("misty", "Trainer", BTreeMap::new()));
            // dropped without commit
        }
        assert!(store.read().await.unwrap().is_empty());

        {
            let mut book = store.lock().await.unwrap();
            book.insert("misty".to_string(), Trainer::new("misty", "Trainer", BTreeMap::new()));
            book.commit().await.unwrap();
        }
        let reloaded = store.read().await.unwrap();
        assert!(reloaded.contains_key("misty"));
        assert!(!dir.path().join("trainers.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gyms.json");
        let store = JsonStore::open(&path, GymBook::new()).await.unwrap();
        std::fs::write(&path, b"{ not json").unwrap();

        let locked = store.lock().await;
        match locked {
            Err(StoreError::Decode { path: failed, .. }) => assert_eq!(failed, path),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("corrupt document loaded"),
        }
    }

    #[tokio::test]
    async fn test_paired_commit_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let trainers = JsonStore::open(dir.path().join("trainers.json"), sample_book())
            .await
            .unwrap();
        let gyms = JsonStore::open(dir.path().join("gyms.json"), GymBook::new()).await.unwrap();
        // A directory in the way of the gym temp file makes its write fail.
        std::fs::create_dir(dir.path().join("gyms.json.tmp")).unwrap();

        {
            let mut trainer_book = trainers.lock().await.unwrap();
            let gym_book = gyms.lock().await.unwrap();
            trainer_book.remove("ash");
            assert!(matches!(
                commit_pair(&trainer_book, &gym_book).await,
                Err(StoreError::Io { .. })
            ));
        }
        assert_eq!(trainers.read().await.unwrap(), sample_book());
        assert!(!dir.path().join("trainers.json.tmp").exists());

        std::fs::remove_dir(dir.path().join("gyms.json.tmp")).unwrap();
        {
            let mut trainer_book = trainers.lock().await.unwrap();
            let gym_book = gyms.lock().await.unwrap();
            trainer_book.remove("ash");
            commit_pair(&trainer_book, &gym_book).await.unwrap();
        }
        assert!(trainers.read().await.unwrap().is_empty());
    }
}
