use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::filter::QueryFilter;
use crate::owner::Owner;
use crate::record::Record;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Car {
    #[serde(rename = "_id")]
    pub id: String,
    pub vendor: String,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub price: f64,
    pub owner: Owner,
}

/// Mutable car fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CarFields {
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub price: f64,
}

pub fn validate_vendor(vendor: &str) -> Result<(), ModelError> {
    if vendor.trim().is_empty() {
        return Err(ModelError::required("vendor"));
    }
    Ok(())
}

impl Record for Car {
    type Fields = CarFields;
    const COLLECTION: &'static str = "car";
    const REQUIRES_PRINCIPAL: bool = true;

    fn id(&self) -> &str { &self.id }

    fn owner_id(&self) -> &str { &self.owner.id }

    fn create(id: String, owner: Option<Owner>, fields: CarFields) -> Result<Self, ModelError> {
        validate_vendor(&fields.vendor)?;
        let owner = owner.ok_or_else(|| ModelError::required("owner"))?;
        Ok(Car { id, vendor: fields.vendor, speed: fields.speed, price: fields.price, owner })
    }

    fn apply(&mut self, fields: CarFields) -> Result<(), ModelError> {
        validate_vendor(&fields.vendor)?;
        self.vendor = fields.vendor;
        self.speed = fields.speed;
        self.price = fields.price;
        Ok(())
    }

    fn matches(&self, filter: &QueryFilter) -> bool {
        filter.text_matches(&[self.vendor.as_str()]) && filter.price_matches(Some(self.price))
    }
}
