//! Collection stores for cars, toys and users.
//! - `store`: generic query/get/save/remove over an in-memory working set.
//! - `storage`: bulk JSON file and document-collection persistence.
//! - `policy`: owner/admin write authorization.
//! - `ids`: time-ordered record ids with recoverable creation time.

pub mod errors;
pub mod policy;
pub mod ids;
pub mod storage;
pub mod store;
pub mod collections;
pub mod runtime;
#[cfg(test)]
pub mod test_support;
