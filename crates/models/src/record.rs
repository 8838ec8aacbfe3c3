//! Contract every stored entity type fulfils so one generic collection store
//! can serve cars, toys and users alike.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::errors::ModelError;
use crate::filter::QueryFilter;
use crate::owner::Owner;

pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Whitelisted domain fields a caller may set; never includes `_id` or `owner`.
    type Fields: Clone + Send + Sync + 'static;

    /// Collection name; doubles as the data file stem and document namespace.
    const COLLECTION: &'static str;

    /// Whether creating a record needs an acting principal.
    const REQUIRES_PRINCIPAL: bool;

    fn id(&self) -> &str;

    /// Id of the principal allowed to mutate this record besides admins.
    fn owner_id(&self) -> &str;

    fn create(id: String, owner: Option<Owner>, fields: Self::Fields) -> Result<Self, ModelError>;

    /// Copy the whitelisted fields onto an existing record.
    fn apply(&mut self, fields: Self::Fields) -> Result<(), ModelError>;

    fn matches(&self, filter: &QueryFilter) -> bool;

    /// Value that must be unique across the collection, if any.
    fn unique_key(&self) -> Option<&str> {
        None
    }
}

/// Payload of a save call: no id means create, an id means update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Draft<F> {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: F,
}

impl<F> Draft<F> {
    pub fn new(fields: F) -> Self { Self { id: None, fields } }

    pub fn update(id: impl Into<String>, fields: F) -> Self { Self { id: Some(id.into()), fields } }

    /// Target id for updates; blank ids count as absent.
    pub fn target_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}
