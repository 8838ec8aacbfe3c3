use serde::{Deserialize, Serialize};

/// Query criteria shared by every collection. Each record type decides which
/// of these it honours; the rest are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryFilter {
    #[serde(default, alias = "text", skip_serializing_if = "Option::is_none")]
    pub txt: Option<String>,
    #[serde(rename = "maxPrice", default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(rename = "stockStatus", default, skip_serializing_if = "Option::is_none")]
    pub stock_status: Option<String>,
}

impl QueryFilter {
    pub fn text(txt: impl Into<String>) -> Self {
        Self { txt: Some(txt.into()), ..Self::default() }
    }

    pub fn with_max_price(mut self, max_price: f64) -> Self {
        self.max_price = Some(max_price);
        self
    }

    pub fn with_stock_status(mut self, status: impl Into<String>) -> Self {
        self.stock_status = Some(status.into());
        self
    }

    /// Case-insensitive substring match against any of `fields`.
    /// An empty or missing `txt` matches everything.
    pub fn text_matches(&self, fields: &[&str]) -> bool {
        let needle = match self.txt.as_deref() {
            Some(t) if !t.is_empty() => t.to_lowercase(),
            _ => return true,
        };
        fields.iter().any(|f| f.to_lowercase().contains(&needle))
    }

    /// Active only for a present, non-zero bound. Records without a price
    /// never satisfy an active bound.
    pub fn price_matches(&self, price: Option<f64>) -> bool {
        match self.max_price {
            Some(max) if max != 0.0 => price.is_some_and(|p| p <= max),
            _ => true,
        }
    }

    /// `"true"` / `"false"` select on stock; any other value is no filter.
    pub fn in_stock(&self) -> Option<bool> {
        match self.stock_status.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }

    pub fn stock_matches(&self, in_stock: bool) -> bool {
        self.in_stock().map_or(true, |wanted| wanted == in_stock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_case_insensitive_substring() {
        let f = QueryFilter::text("zo");
        assert!(f.text_matches(&["Zorro"]));
        assert!(f.text_matches(&["amaZOn"]));
        assert!(!f.text_matches(&["Ball"]));
        assert!(f.text_matches(&["Ball", "zoe"]));
    }

    #[test]
    fn empty_text_matches_all() {
        assert!(QueryFilter::default().text_matches(&["anything"]));
        assert!(QueryFilter::text("").text_matches(&[""]));
    }

    #[test]
    fn zero_max_price_is_no_filter() {
        let f = QueryFilter::default().with_max_price(0.0);
        assert!(f.price_matches(Some(1_000_000.0)));
        assert!(f.price_matches(None));
    }

    #[test]
    fn max_price_is_inclusive() {
        let f = QueryFilter::default().with_max_price(100.0);
        assert!(f.price_matches(Some(100.0)));
        assert!(f.price_matches(Some(0.5)));
        assert!(!f.price_matches(Some(100.01)));
        assert!(!f.price_matches(None));
    }

    #[test]
    fn stock_status_only_honours_literals() {
        assert_eq!(QueryFilter::default().with_stock_status("true").in_stock(), Some(true));
        assert_eq!(QueryFilter::default().with_stock_status("false").in_stock(), Some(false));
        assert_eq!(QueryFilter::default().with_stock_status("TRUE").in_stock(), None);
        assert_eq!(QueryFilter::default().with_stock_status("").in_stock(), None);
        assert!(QueryFilter::default().with_stock_status("yes").stock_matches(false));
        assert!(!QueryFilter::default().with_stock_status("true").stock_matches(false));
    }

    #[test]
    fn deserializes_request_keys() {
        let f: QueryFilter = serde_json::from_str(r#"{"txt":"a","maxPrice":20,"stockStatus":"false","bogus":1}"#).unwrap();
        assert_eq!(f.txt.as_deref(), Some("a"));
        assert_eq!(f.max_price, Some(20.0));
        assert_eq!(f.in_stock(), Some(false));
    }
}
