//! Generic collection store shared by every entity type.
//!
//! Readers load an immutable snapshot of the collection and never wait on
//! writers. Writers are serialized by a per-collection mutex: each mutation
//! clones the current snapshot, applies the change, hands it to the backend
//! and only then publishes the new snapshot. A failed write therefore leaves
//! the visible collection untouched.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use models::{Draft, Principal, QueryFilter, Record};

use crate::errors::ServiceError;
use crate::ids::IdGenerator;
use crate::policy;
use crate::storage::{Change, Persistence};

/// In-memory working set of one collection mirrored onto a [`Persistence`]
/// backend.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use models::{Draft, Principal, QueryFilter, Toy, ToyFields};
/// use service::ids::TimeOrderedIds;
/// use service::storage::Persistence;
/// use service::storage::document::{DocumentBackend, MemoryDocumentCollection};
/// use service::store::CollectionStore;
///
/// let backend: Arc<dyn Persistence<Toy>> =
///     Arc::new(DocumentBackend::new(Arc::new(MemoryDocumentCollection::new("toy"))));
/// let toys = tokio_test::block_on(CollectionStore::open(backend, Arc::new(TimeOrderedIds))).unwrap();
/// let muki = Principal { id: "u1".into(), fullname: "Muki".into(), score: 0, is_admin: false };
/// let fields = ToyFields { name: "Zorro".into(), price: Some(20.0), labels: vec![], in_stock: true };
/// let toy = tokio_test::block_on(toys.save(Draft::new(fields), Some(&muki))).unwrap();
/// assert_eq!(toy.owner.id, "u1");
/// assert_eq!(toys.query(&QueryFilter::text("zor")).len(), 1);
/// ```
pub struct CollectionStore<R: Record> {
    records: ArcSwap<Vec<R>>,
    writer: Mutex<()>,
    backend: Arc<dyn Persistence<R>>,
    ids: Arc<dyn IdGenerator>,
}

impl<R: Record> CollectionStore<R> {
    /// Load the collection from `backend`.
    pub async fn open(backend: Arc<dyn Persistence<R>>, ids: Arc<dyn IdGenerator>) -> Result<Self, ServiceError> {
        let records = backend.load().await?;
        info!(collection = R::COLLECTION, count = records.len(), "collection loaded");
        Ok(Self { records: ArcSwap::from_pointee(records), writer: Mutex::new(()), backend, ids })
    }

    /// Current collection state.
    pub fn snapshot(&self) -> Arc<Vec<R>> {
        self.records.load_full()
    }

    pub fn len(&self) -> usize {
        self.records.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records matching `filter`, in collection order.
    pub fn query(&self, filter: &QueryFilter) -> Vec<R> {
        self.records.load().iter().filter(|r| r.matches(filter)).cloned().collect()
    }

    pub fn get_by_id(&self, id: &str) -> Result<R, ServiceError> {
        self.records
            .load()
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(R::COLLECTION, id))
    }

    /// First record satisfying `pred`.
    pub fn find_by<F>(&self, pred: F) -> Option<R>
    where
        F: Fn(&R) -> bool,
    {
        self.records.load().iter().find(|r| pred(r)).cloned()
    }

    /// Create (no id) or update (id present) a record on behalf of `principal`.
    pub async fn save(&self, draft: Draft<R::Fields>, principal: Option<&Principal>) -> Result<R, ServiceError> {
        let Draft { id, fields } = draft;
        match id.filter(|id| !id.trim().is_empty()) {
            Some(id) => self.update(&id, fields, principal).await,
            None => self.create(fields, principal).await,
        }
    }

    #[instrument(skip_all, fields(collection = R::COLLECTION))]
    async fn create(&self, fields: R::Fields, principal: Option<&Principal>) -> Result<R, ServiceError> {
        if R::REQUIRES_PRINCIPAL && principal.is_none() {
            return Err(ServiceError::Unauthorized(format!("login required to add a {}", R::COLLECTION)));
        }

        let _guard = self.writer.lock().await;
        let current = self.records.load_full();
        let id = self.fresh_id(&current);
        let record = R::create(id, principal.map(Principal::owner_snapshot), fields)?;
        ensure_unique(&current, &record, None)?;

        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(record.clone());
        self.backend.persist(&next, Change::Inserted(&record)).await?;
        self.records.store(Arc::new(next));

        info!(id = record.id(), owner = record.owner_id(), "record_created");
        Ok(record)
    }

    #[instrument(skip_all, fields(collection = R::COLLECTION, id = %id))]
    async fn update(&self, id: &str, fields: R::Fields, principal: Option<&Principal>) -> Result<R, ServiceError> {
        let _guard = self.writer.lock().await;
        let current = self.records.load_full();
        let idx = position(&current, id)?;
        policy::authorize(principal, current[idx].owner_id(), R::COLLECTION)?;

        let mut next: Vec<R> = (*current).clone();
        next[idx].apply(fields)?;
        ensure_unique(&next, &next[idx], Some(idx))?;
        self.backend
            .persist(&next, Change::Updated { before: &current[idx], after: &next[idx] })
            .await?;
        let updated = next[idx].clone();
        self.records.store(Arc::new(next));

        info!("record_updated");
        Ok(updated)
    }

    /// Delete a record. A second removal of the same id is `NotFound`.
    #[instrument(skip_all, fields(collection = R::COLLECTION, id = %id))]
    pub async fn remove(&self, id: &str, principal: Option<&Principal>) -> Result<(), ServiceError> {
        let _guard = self.writer.lock().await;
        let current = self.records.load_full();
        let idx = position(&current, id)?;
        policy::authorize(principal, current[idx].owner_id(), R::COLLECTION)?;

        let mut next: Vec<R> = (*current).clone();
        next.remove(idx);
        self.backend.persist(&next, Change::Removed(id)).await?;
        self.records.store(Arc::new(next));

        info!("record_removed");
        Ok(())
    }

    /// Write the full collection through the backend (shutdown path).
    pub async fn flush(&self) -> Result<(), ServiceError> {
        let _guard = self.writer.lock().await;
        let current = self.records.load_full();
        self.backend.flush(&current).await
    }

    fn fresh_id(&self, current: &[R]) -> String {
        loop {
            let id = self.ids.next_id();
            if !current.iter().any(|r| r.id() == id) {
                return id;
            }
        }
    }
}

fn position<R: Record>(records: &[R], id: &str) -> Result<usize, ServiceError> {
    records
        .iter()
        .position(|r| r.id() == id)
        .ok_or_else(|| ServiceError::not_found(R::COLLECTION, id))
}

/// `candidate`'s unique key must not appear on any other record. `skip` is
/// the candidate's own index when it is already part of `records`.
fn ensure_unique<R: Record>(records: &[R], candidate: &R, skip: Option<usize>) -> Result<(), ServiceError> {
    let Some(key) = candidate.unique_key() else {
        return Ok(());
    };
    let taken = records
        .iter()
        .enumerate()
        .any(|(i, r)| Some(i) != skip && r.unique_key() == Some(key));
    if taken {
        return Err(ServiceError::Conflict(format!("{} {key} already taken", R::COLLECTION)));
    }
    Ok(())
}
