use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::filter::QueryFilter;
use crate::owner::Owner;
use crate::record::Record;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Toy {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(rename = "inStock", default)]
    pub in_stock: bool,
    pub owner: Owner,
}

/// Mutable toy fields. A toy may be listed without a price.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToyFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(rename = "inStock", default)]
    pub in_stock: bool,
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::required("name"));
    }
    Ok(())
}

impl Record for Toy {
    type Fields = ToyFields;
    const COLLECTION: &'static str = "toy";
    const REQUIRES_PRINCIPAL: bool = true;

    fn id(&self) -> &str { &self.id }

    fn owner_id(&self) -> &str { &self.owner.id }

    fn create(id: String, owner: Option<Owner>, fields: ToyFields) -> Result<Self, ModelError> {
        validate_name(&fields.name)?;
        let owner = owner.ok_or_else(|| ModelError::required("owner"))?;
        Ok(Toy {
            id,
            name: fields.name,
            price: fields.price,
            labels: fields.labels,
            in_stock: fields.in_stock,
            owner,
        })
    }

    fn apply(&mut self, fields: ToyFields) -> Result<(), ModelError> {
        validate_name(&fields.name)?;
        self.name = fields.name;
        self.price = fields.price;
        self.labels = fields.labels;
        self.in_stock = fields.in_stock;
        Ok(())
    }

    fn matches(&self, filter: &QueryFilter) -> bool {
        filter.text_matches(&[self.name.as_str()])
            && filter.price_matches(self.price)
            && filter.stock_matches(self.in_stock)
    }
}
