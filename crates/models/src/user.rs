use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::filter::QueryFilter;
use crate::owner::{Owner, Principal};
use crate::record::Record;

/// Stored user. Holds the password hash and must never leave the service
/// layer as-is; callers get a [`UserView`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub score: i64,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
}

/// Signup/update payload. `password` is only read on creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserFields {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Public projection of a user: no password, derived creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub fullname: String,
    pub score: i64,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

pub fn validate_username(username: &str) -> Result<(), ModelError> {
    if username.trim().is_empty() {
        return Err(ModelError::required("username"));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ModelError::Validation("username must not contain whitespace".into()));
    }
    Ok(())
}

impl User {
    pub fn to_view(&self, created_at: Option<DateTime<Utc>>) -> UserView {
        UserView {
            id: self.id.clone(),
            username: self.username.clone(),
            fullname: self.fullname.clone(),
            score: self.score,
            is_admin: self.is_admin,
            created_at,
        }
    }
}

impl From<&UserView> for Principal {
    fn from(u: &UserView) -> Self {
        Principal { id: u.id.clone(), fullname: u.fullname.clone(), score: u.score, is_admin: u.is_admin }
    }
}

impl Record for User {
    type Fields = UserFields;
    const COLLECTION: &'static str = "user";
    const REQUIRES_PRINCIPAL: bool = false;

    fn id(&self) -> &str { &self.id }

    /// Users own themselves.
    fn owner_id(&self) -> &str { &self.id }

    fn create(id: String, _owner: Option<Owner>, fields: UserFields) -> Result<Self, ModelError> {
        validate_username(&fields.username)?;
        let password = fields
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ModelError::required("password"))?;
        let fullname = if fields.fullname.trim().is_empty() { fields.username.clone() } else { fields.fullname };
        Ok(User {
            id,
            username: fields.username,
            fullname,
            password,
            score: fields.score.unwrap_or(0),
            is_admin: false,
        })
    }

    fn apply(&mut self, fields: UserFields) -> Result<(), ModelError> {
        if !fields.username.is_empty() {
            validate_username(&fields.username)?;
            self.username = fields.username;
        }
        if !fields.fullname.trim().is_empty() {
            self.fullname = fields.fullname;
        }
        if let Some(score) = fields.score {
            self.score = score;
        }
        Ok(())
    }

    fn matches(&self, filter: &QueryFilter) -> bool {
        filter.text_matches(&[self.username.as_str(), self.fullname.as_str()])
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(username: &str, password: Option<&str>) -> UserFields {
        UserFields { username: username.into(), fullname: "Puki Reactof".into(), score: None, password: password.map(Into::into) }
    }

    #[test]
    fn create_defaults_score_and_never_admin() {
        let u = User::create("id1".into(), None, signup("puki", Some("hash"))).unwrap();
        assert_eq!(u.score, 0);
        assert!(!u.is_admin);
        assert_eq!(u.owner_id(), "id1");
        assert_eq!(u.unique_key(), Some("puki"));
    }

    #[test]
    fn create_requires_username_and_password() {
        assert!(User::create("id".into(), None, signup("", Some("x"))).is_err());
        assert!(User::create("id".into(), None, signup("puki", None)).is_err());
        assert!(User::create("id".into(), None, signup("pu ki", Some("x"))).is_err());
    }

    #[test]
    fn apply_never_touches_password_or_admin() {
        let mut u = User::create("id1".into(), None, signup("puki", Some("hash"))).unwrap();
        u.apply(UserFields { username: String::new(), fullname: "New Name".into(), score: Some(7), password: Some("other".into()) }).unwrap();
        assert_eq!(u.password, "hash");
        assert_eq!(u.username, "puki");
        assert_eq!(u.fullname, "New Name");
        assert_eq!(u.score, 7);
        assert!(!u.is_admin);
    }

    #[test]
    fn text_filter_checks_username_or_fullname() {
        let u = User::create("id1".into(), None, signup("puki", Some("hash"))).unwrap();
        assert!(u.matches(&QueryFilter::text("PUK")));
        assert!(u.matches(&QueryFilter::text("react")));
        assert!(!u.matches(&QueryFilter::text("muki")));
    }

    #[test]
    fn view_has_no_password() {
        let u = User::create("id1".into(), None, signup("puki", Some("hash"))).unwrap();
        let json = serde_json::to_value(u.to_view(None)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("createdAt").is_none());
    }
}
