use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use tracing::info;

use models::{Draft, Principal, UserFields, UserView};

use crate::auth::{ServerState, LOGIN_COOKIE};
use crate::errors::ApiError;

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

fn with_login_cookie(state: &ServerState, jar: CookieJar, user: &UserView) -> Result<CookieJar, ApiError> {
    let token = state
        .auth
        .issue(&Principal::from(user))
        .map_err(|e| ApiError::Internal(format!("token generation failed: {e}")))?;
    Ok(jar.add(state.auth.login_cookie(token)))
}

/// Create an account and log it in. The admin flag can never be set here.
pub async fn signup(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(fields): Json<UserFields>,
) -> Result<(CookieJar, Json<UserView>), ApiError> {
    let user = state.stores.users.save(Draft::new(fields), None).await?;
    let jar = with_login_cookie(&state, jar, &user)?;
    info!(user_id = %user.id, "user_signed_up");
    Ok((jar, Json(user)))
}

pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Json<UserView>), ApiError> {
    let user = state.stores.users.authenticate(&input.username, &input.password)?;
    let jar = with_login_cookie(&state, jar, &user)?;
    Ok((jar, Json(user)))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::from(LOGIN_COOKIE));
    (jar, StatusCode::NO_CONTENT)
}
