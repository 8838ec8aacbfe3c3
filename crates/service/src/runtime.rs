//! Store lifecycle: open every collection on one storage target at startup
//! and flush them at shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::{error, info};

use models::{Car, Record, Toy, User};

use crate::collections::{CarStore, ToyStore, UserStore};
use crate::errors::ServiceError;
use crate::ids::{IdGenerator, TimeOrderedIds};
use crate::storage::document::{DocumentBackend, MemoryDocumentCollection};
use crate::storage::json_file::JsonFileBackend;
use crate::storage::seaorm::SeaOrmDocumentCollection;
use crate::storage::Persistence;
use crate::store::CollectionStore;

/// Where collections are persisted.
#[derive(Clone)]
pub enum StorageTarget {
    /// `<dir>/car.json`, `<dir>/toy.json`, `<dir>/user.json`
    Files(PathBuf),
    /// Shared `document` table.
    Database(DatabaseConnection),
    /// Nothing durable; state dies with the process.
    Memory,
}

impl StorageTarget {
    fn backend<R: Record>(&self) -> Arc<dyn Persistence<R>> {
        match self {
            StorageTarget::Files(dir) => Arc::new(JsonFileBackend::for_collection(dir, R::COLLECTION)),
            StorageTarget::Database(db) => Arc::new(DocumentBackend::new(Arc::new(SeaOrmDocumentCollection::new(
                db.clone(),
                R::COLLECTION,
            )))),
            StorageTarget::Memory => {
                Arc::new(DocumentBackend::new(Arc::new(MemoryDocumentCollection::new(R::COLLECTION))))
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            StorageTarget::Files(_) => "file",
            StorageTarget::Database(_) => "database",
            StorageTarget::Memory => "memory",
        }
    }
}

/// One store per collection, shared by all request handlers.
#[derive(Clone)]
pub struct Stores {
    pub cars: Arc<CarStore>,
    pub toys: Arc<ToyStore>,
    pub users: Arc<UserStore>,
}

impl Stores {
    pub async fn open(target: &StorageTarget) -> Result<Self, ServiceError> {
        let ids: Arc<dyn IdGenerator> = Arc::new(TimeOrderedIds);
        let cars = CollectionStore::<Car>::open(target.backend(), Arc::clone(&ids)).await?;
        let toys = CollectionStore::<Toy>::open(target.backend(), Arc::clone(&ids)).await?;
        let users = UserStore::open(target.backend(), ids).await?;
        info!(
            backend = target.label(),
            cars = cars.len(),
            toys = toys.len(),
            users = users.len(),
            "stores opened"
        );
        Ok(Self { cars: Arc::new(cars), toys: Arc::new(toys), users: Arc::new(users) })
    }

    /// Flush every collection; keeps going past failures and returns the first.
    pub async fn flush_all(&self) -> Result<(), ServiceError> {
        let results = [
            (Car::COLLECTION, self.cars.flush().await),
            (Toy::COLLECTION, self.toys.flush().await),
            (User::COLLECTION, self.users.flush().await),
        ];
        let mut first_err = None;
        for (collection, res) in results {
            if let Err(e) = res {
                error!(%collection, error = %e, "flush failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => {
                info!("stores flushed");
                Ok(())
            }
        }
    }
}

/// Ensure the data directory exists before file-backed stores open.
pub async fn ensure_env(data_dir: &str) -> anyhow::Result<()> {
    common::env::ensure_data_dir(data_dir).await
}
