use serde::{Deserialize, Serialize};

/// Acting user for a store call, as handed over by the auth layer.
/// The store never validates tokens; it only reads these fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Principal {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub score: i64,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
}

impl Principal {
    /// Frozen copy stored on records created by this principal.
    pub fn owner_snapshot(&self) -> Owner {
        Owner {
            id: self.id.clone(),
            fullname: self.fullname.clone(),
            score: self.score,
            is_admin: self.is_admin,
        }
    }
}

/// Denormalized owner snapshot. Captured once at creation and never refreshed
/// when the owning user's profile changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Owner {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub score: i64,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
}
