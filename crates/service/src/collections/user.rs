use std::sync::Arc;

use argon2::{password_hash::{PasswordHasher, PasswordVerifier, SaltString}, Argon2, PasswordHash};
use rand::rngs::OsRng;
use tracing::{debug, info, instrument, warn};

use models::{Draft, Principal, QueryFilter, User, UserFields, UserView};

use crate::errors::ServiceError;
use crate::ids::{self, IdGenerator};
use crate::storage::Persistence;
use crate::store::CollectionStore;

/// User collection. Wraps the generic store to hash passwords on signup and
/// to hand out [`UserView`]s only, never stored passwords.
pub struct UserStore {
    store: CollectionStore<User>,
}

fn view(user: &User) -> UserView {
    user.to_view(ids::created_at(&user.id))
}

fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::Internal(format!("cannot hash password: {e}")))?
        .to_string();
    Ok(hash)
}

impl UserStore {
    pub fn new(store: CollectionStore<User>) -> Self {
        Self { store }
    }

    pub async fn open(backend: Arc<dyn Persistence<User>>, ids: Arc<dyn IdGenerator>) -> Result<Self, ServiceError> {
        Ok(Self::new(CollectionStore::open(backend, ids).await?))
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Matching users sorted by full name, descending.
    pub fn query(&self, filter: &QueryFilter) -> Vec<UserView> {
        let mut users: Vec<UserView> = self.store.query(filter).iter().map(view).collect();
        users.sort_by(|a, b| b.fullname.cmp(&a.fullname));
        users
    }

    pub fn get_by_id(&self, id: &str) -> Result<UserView, ServiceError> {
        self.store.get_by_id(id).map(|u| view(&u))
    }

    pub fn get_by_username(&self, username: &str) -> Result<UserView, ServiceError> {
        self.store
            .find_by(|u| u.username == username)
            .map(|u| view(&u))
            .ok_or_else(|| ServiceError::not_found("user", username))
    }

    /// Signup when `draft` has no id, profile update otherwise. Updates may
    /// only touch username, fullname and score.
    pub async fn save(&self, mut draft: Draft<UserFields>, principal: Option<&Principal>) -> Result<UserView, ServiceError> {
        if draft.target_id().is_none() {
            // fail fast before paying for the hash
            if self.get_by_username(&draft.fields.username).is_ok() {
                return Err(ServiceError::Conflict(format!("username {} already taken", draft.fields.username)));
            }
            draft.fields.password = match draft.fields.password.as_deref() {
                Some(p) if !p.is_empty() => Some(hash_password(p)?),
                _ => None,
            };
        } else {
            draft.fields.password = None;
        }
        let user = self.store.save(draft, principal).await?;
        Ok(view(&user))
    }

    pub async fn remove(&self, id: &str, principal: Option<&Principal>) -> Result<(), ServiceError> {
        self.store.remove(id, principal).await
    }

    /// Check a username/password pair; the same error for unknown users and
    /// wrong passwords.
    #[instrument(skip(self, password))]
    pub fn authenticate(&self, username: &str, password: &str) -> Result<UserView, ServiceError> {
        let denied = || ServiceError::Unauthorized("invalid username or password".into());
        let user = self.store.find_by(|u| u.username == username).ok_or_else(denied)?;
        let parsed = match PasswordHash::new(&user.password) {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(user_id = %user.id, "stored password is not a hash; login refused");
                return Err(denied());
            }
        };
        if Argon2::default().verify_password(password.as_bytes(), &parsed).is_err() {
            debug!("password mismatch");
            return Err(denied());
        }
        info!(user_id = %user.id, "user_authenticated");
        Ok(view(&user))
    }

    pub async fn flush(&self) -> Result<(), ServiceError> {
        self.store.flush().await
    }
}
