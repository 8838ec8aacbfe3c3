use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use configs::AuthSettings;
use models::Principal;
use service::runtime::Stores;

/// Cookie carrying the signed login token.
pub const LOGIN_COOKIE: &str = "loginToken";

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Clone)]
pub struct ServerState {
    pub stores: Stores,
    pub auth: ServerAuthConfig,
}

/// Principal attached to every API request; `None` means anonymous.
#[derive(Clone, Debug, Default)]
pub struct CurrentUser(pub Option<Principal>);

impl CurrentUser {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    fullname: String,
    score: i64,
    #[serde(rename = "isAdmin")]
    is_admin: bool,
    exp: usize,
}

impl ServerAuthConfig {
    pub fn from_settings(settings: &AuthSettings) -> Self {
        let jwt_secret = match settings.jwt_secret.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => {
                warn!("no JWT secret configured, using development secret");
                DEV_SECRET.to_string()
            }
        };
        Self { jwt_secret, token_ttl_hours: settings.token_ttl_hours }
    }

    /// Sign a token for the given principal.
    pub fn issue(&self, principal: &Principal) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = (Utc::now() + Duration::hours(self.token_ttl_hours)).timestamp().max(0) as usize;
        let claims = Claims {
            sub: principal.id.clone(),
            fullname: principal.fullname.clone(),
            score: principal.score,
            is_admin: principal.is_admin,
            exp,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.jwt_secret.as_bytes()))
    }

    pub fn verify(&self, token: &str) -> Result<Principal, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;
        let c = data.claims;
        Ok(Principal { id: c.sub, fullname: c.fullname, score: c.score, is_admin: c.is_admin })
    }

    pub fn login_cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(LOGIN_COOKIE, token);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_secure(false);
        cookie.set_same_site(SameSite::Lax);
        cookie
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers).get(LOGIN_COOKIE).map(|c| c.value().to_string())
}

/// Resolve the caller from the bearer header or login cookie. Invalid or
/// expired tokens fall back to anonymous; the stores decide what that may do.
pub async fn attach_principal(State(state): State<ServerState>, mut req: Request, next: Next) -> Response {
    let principal = bearer_token(req.headers())
        .or_else(|| cookie_token(req.headers()))
        .and_then(|token| match state.auth.verify(&token) {
            Ok(p) => Some(p),
            Err(e) => {
                debug!(error = %e, "ignoring invalid login token");
                None
            }
        });
    req.extensions_mut().insert(CurrentUser(principal));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ServerAuthConfig {
        ServerAuthConfig { jwt_secret: "unit-secret".into(), token_ttl_hours: 1 }
    }

    #[test]
    fn token_carries_principal() {
        let p = Principal { id: "u1".into(), fullname: "Puki".into(), score: 7, is_admin: true };
        let token = cfg().issue(&p).unwrap();
        assert_eq!(cfg().verify(&token).unwrap(), p);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let p = Principal { id: "u1".into(), fullname: String::new(), score: 0, is_admin: false };
        let other = ServerAuthConfig { jwt_secret: "other".into(), token_ttl_hours: 1 };
        let token = other.issue(&p).unwrap();
        assert!(cfg().verify(&token).is_err());
    }

    #[test]
    fn missing_secret_falls_back_to_dev_secret() {
        let settings = AuthSettings { jwt_secret: Some("  ".into()), token_ttl_hours: 3 };
        let c = ServerAuthConfig::from_settings(&settings);
        assert_eq!(c.jwt_secret, DEV_SECRET);
        assert_eq!(c.token_ttl_hours, 3);
    }

    #[test]
    fn reads_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
    }
}
