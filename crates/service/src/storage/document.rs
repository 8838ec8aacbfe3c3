//! Document persistence strategy.
//!
//! [`DocumentCollection`] is the minimal document-database surface the store
//! needs (`find`, `find_one`, `insert_one`, `update_one` with `$set` and
//! `$unset` semantics, `delete_one`), each call independently durable.
//! [`DocumentBackend`] adapts any such collection to [`Persistence`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::warn;

use models::Record;

use crate::errors::ServiceError;
use crate::storage::{Change, Persistence};

pub type Document = Map<String, Value>;

/// Equality criterion on one top-level field, e.g. `{_id: ...}` or
/// `{username: ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocFilter {
    pub field: String,
    pub value: Value,
}

impl DocFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { field: field.into(), value: value.into() }
    }

    pub fn by_id(id: &str) -> Self {
        Self::eq("_id", id)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        doc.get(&self.field) == Some(&self.value)
    }
}

pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get("_id").and_then(Value::as_str)
}

/// `$set` then `$unset` on one document. `_id` is never removed.
pub fn apply_update(doc: &mut Document, set: Document, unset: &[String]) {
    doc.extend(set);
    for key in unset.iter().filter(|k| k.as_str() != "_id") {
        doc.remove(key);
    }
}

/// Split an update into `$set` (every field of `after` except `_id`) and
/// `$unset` (fields `before` had that `after` no longer serializes).
pub fn update_parts(before: Document, mut after: Document) -> (Document, Vec<String>) {
    after.remove("_id");
    let unset = before.keys().filter(|k| k.as_str() != "_id" && !after.contains_key(*k)).cloned().collect();
    (after, unset)
}

#[async_trait]
pub trait DocumentCollection: Send + Sync {
    fn name(&self) -> &str;
    /// All matching documents in insertion order.
    async fn find(&self, filter: Option<&DocFilter>) -> Result<Vec<Document>, ServiceError>;
    async fn find_one(&self, filter: &DocFilter) -> Result<Option<Document>, ServiceError>;
    /// Fails with `Conflict` when the `_id` already exists.
    async fn insert_one(&self, doc: Document) -> Result<(), ServiceError>;
    /// Merge `set` into the document with `_id == id` and drop the `unset`
    /// keys; `false` if none matched.
    async fn update_one(&self, id: &str, set: Document, unset: &[String]) -> Result<bool, ServiceError>;
    /// `false` if no document matched.
    async fn delete_one(&self, id: &str) -> Result<bool, ServiceError>;
}

/// Process-local document collection. Used for tests and for running the
/// service without any durable storage.
pub struct MemoryDocumentCollection {
    name: String,
    docs: RwLock<Vec<Document>>,
}

impl MemoryDocumentCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), docs: RwLock::new(Vec::new()) }
    }
}

#[async_trait]
impl DocumentCollection for MemoryDocumentCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, filter: Option<&DocFilter>) -> Result<Vec<Document>, ServiceError> {
        let docs = self.docs.read().await;
        Ok(docs.iter().filter(|d| filter.map_or(true, |f| f.matches(d))).cloned().collect())
    }

    async fn find_one(&self, filter: &DocFilter) -> Result<Option<Document>, ServiceError> {
        let docs = self.docs.read().await;
        Ok(docs.iter().find(|d| filter.matches(d)).cloned())
    }

    async fn insert_one(&self, doc: Document) -> Result<(), ServiceError> {
        let id = document_id(&doc)
            .ok_or_else(|| ServiceError::Validation("document without _id".into()))?
            .to_string();
        let mut docs = self.docs.write().await;
        if docs.iter().any(|d| document_id(d) == Some(id.as_str())) {
            return Err(ServiceError::Conflict(format!("duplicate _id {id} in {}", self.name)));
        }
        docs.push(doc);
        Ok(())
    }

    async fn update_one(&self, id: &str, set: Document, unset: &[String]) -> Result<bool, ServiceError> {
        let mut docs = self.docs.write().await;
        match docs.iter_mut().find(|d| document_id(d) == Some(id)) {
            Some(doc) => {
                apply_update(doc, set, unset);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_one(&self, id: &str) -> Result<bool, ServiceError> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|d| document_id(d) != Some(id));
        Ok(docs.len() != before)
    }
}

/// [`Persistence`] over a [`DocumentCollection`]: one document call per
/// change, nothing to do on flush.
#[derive(Clone)]
pub struct DocumentBackend {
    collection: Arc<dyn DocumentCollection>,
}

impl DocumentBackend {
    pub fn new(collection: Arc<dyn DocumentCollection>) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &Arc<dyn DocumentCollection> {
        &self.collection
    }
}

pub fn to_document<R: Record>(record: &R) -> Result<Document, ServiceError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ServiceError::Persistence(format!("{} is not a JSON object", R::COLLECTION))),
        Err(e) => Err(ServiceError::Persistence(e.to_string())),
    }
}

pub fn from_document<R: Record>(doc: Document) -> Result<R, ServiceError> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| ServiceError::Persistence(format!("malformed {} document: {e}", R::COLLECTION)))
}

#[async_trait]
impl<R: Record> Persistence<R> for DocumentBackend {
    async fn load(&self) -> Result<Vec<R>, ServiceError> {
        self.collection
            .find(None)
            .await?
            .into_iter()
            .map(from_document::<R>)
            .collect()
    }

    async fn persist(&self, _snapshot: &[R], change: Change<'_, R>) -> Result<(), ServiceError> {
        match change {
            Change::Inserted(record) => self.collection.insert_one(to_document(record)?).await,
            Change::Updated { before, after: record } => {
                let (set, unset) = update_parts(to_document(before)?, to_document(record)?);
                if !self.collection.update_one(record.id(), set, &unset).await? {
                    return Err(ServiceError::Persistence(format!(
                        "{} {} missing from {}",
                        R::COLLECTION,
                        record.id(),
                        self.collection.name()
                    )));
                }
                Ok(())
            }
            Change::Removed(id) => {
                if !self.collection.delete_one(id).await? {
                    warn!(collection = self.collection.name(), %id, "document already absent on delete");
                }
                Ok(())
            }
        }
    }

    async fn flush(&self, _snapshot: &[R]) -> Result<(), ServiceError> {
        Ok(())
    }
}
