//! Record identifiers.
//!
//! Ids are UUID version 7 strings: the leading 48 bits are the Unix time in
//! milliseconds, so a record's creation time can be read back from its id
//! without storing it separately.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Time-ordered UUIDv7 ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeOrderedIds;

impl IdGenerator for TimeOrderedIds {
    fn next_id(&self) -> String {
        Uuid::now_v7().to_string()
    }
}

/// Creation time embedded in an id produced by [`TimeOrderedIds`].
/// Ids in any other format (e.g. hand-written seed data) yield `None`.
pub fn created_at(id: &str) -> Option<DateTime<Utc>> {
    let uuid = Uuid::parse_str(id).ok()?;
    if uuid.get_version_num() != 7 {
        return None;
    }
    let (secs, nanos) = uuid.get_timestamp()?.to_unix();
    DateTime::<Utc>::from_timestamp(i64::try_from(secs).ok()?, nanos)
}
