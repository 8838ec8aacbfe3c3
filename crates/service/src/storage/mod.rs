//! Persistence strategies for collection stores.
//!
//! A store stages every mutation on a private copy of its collection and
//! hands the result to a [`Persistence`] backend. The bulk-file strategy
//! rewrites the whole collection; the document strategy applies the single
//! change. The staged copy is only published once the backend succeeded.

use async_trait::async_trait;

use models::Record;

use crate::errors::ServiceError;

pub mod json_file;
pub mod document;
pub mod seaorm;

/// The mutation a store is about to publish.
#[derive(Debug, Clone, Copy)]
pub enum Change<'a, R> {
    Inserted(&'a R),
    /// The record as published before and after the change.
    Updated { before: &'a R, after: &'a R },
    Removed(&'a str),
}

#[async_trait]
pub trait Persistence<R: Record>: Send + Sync {
    /// Full collection snapshot, read once when the store opens.
    async fn load(&self) -> Result<Vec<R>, ServiceError>;

    /// Durably record `change`. `snapshot` is the complete collection with
    /// the change already applied.
    async fn persist(&self, snapshot: &[R], change: Change<'_, R>) -> Result<(), ServiceError>;

    /// Write out the full collection, e.g. at shutdown.
    async fn flush(&self, snapshot: &[R]) -> Result<(), ServiceError>;
}
