//! Concrete stores per entity type.

pub mod user;

use models::{Car, Toy};

use crate::store::CollectionStore;

pub type CarStore = CollectionStore<Car>;
pub type ToyStore = CollectionStore<Toy>;

pub use user::UserStore;
