#![cfg(test)]
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use models::{Principal, Record};

use crate::errors::ServiceError;
use crate::ids::TimeOrderedIds;
use crate::storage::document::{DocumentBackend, MemoryDocumentCollection};
use crate::storage::json_file::JsonFileBackend;
use crate::storage::{Change, Persistence};
use crate::store::CollectionStore;

/// Unique file path under the system temp dir.
pub fn temp_path(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{prefix}_{}.json", Uuid::new_v4()))
}

pub fn principal(id: &str) -> Principal {
    Principal { id: id.into(), fullname: format!("User {id}"), score: 0, is_admin: false }
}

pub fn admin() -> Principal {
    Principal { id: "admin".into(), fullname: "Admin".into(), score: 100, is_admin: true }
}

pub async fn memory_store<R: Record>() -> CollectionStore<R> {
    let backend: Arc<dyn Persistence<R>> =
        Arc::new(DocumentBackend::new(Arc::new(MemoryDocumentCollection::new(R::COLLECTION))));
    CollectionStore::open(backend, Arc::new(TimeOrderedIds)).await.expect("memory store opens")
}

pub async fn file_store<R: Record>(prefix: &str) -> Result<(CollectionStore<R>, PathBuf), ServiceError> {
    let path = temp_path(prefix);
    let backend: Arc<dyn Persistence<R>> = Arc::new(JsonFileBackend::new(&path));
    let store = CollectionStore::open(backend, Arc::new(TimeOrderedIds)).await?;
    Ok((store, path))
}

/// Backend whose writes can be switched to fail.
pub struct FlakyBackend<R> {
    fail: AtomicBool,
    persisted: Mutex<usize>,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Default for FlakyBackend<R> {
    fn default() -> Self {
        Self { fail: AtomicBool::new(false), persisted: Mutex::new(0), _marker: PhantomData }
    }
}

impl<R> FlakyBackend<R> {
    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Collection size as of the last successful write.
    pub fn persisted_len(&self) -> usize {
        *self.persisted.lock().unwrap()
    }
}

#[async_trait]
impl<R: Record> Persistence<R> for FlakyBackend<R> {
    async fn load(&self) -> Result<Vec<R>, ServiceError> {
        Ok(Vec::new())
    }

    async fn persist(&self, snapshot: &[R], _change: Change<'_, R>) -> Result<(), ServiceError> {
        self.flush(snapshot).await
    }

    async fn flush(&self, snapshot: &[R]) -> Result<(), ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::Persistence("disk full".into()));
        }
        *self.persisted.lock().unwrap() = snapshot.len();
        Ok(())
    }
}
