//! Entity schemas for the collections (cars, toys, users), the principal and
//! owner snapshot types, query filters and the database document table.

pub mod errors;
pub mod db;
pub mod document;
pub mod owner;
pub mod filter;
pub mod record;
pub mod car;
pub mod toy;
pub mod user;

pub use car::{Car, CarFields};
pub use filter::QueryFilter;
pub use owner::{Owner, Principal};
pub use record::{Draft, Record};
pub use toy::{Toy, ToyFields};
pub use user::{User, UserFields, UserView};
