use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use models::{Draft, QueryFilter, UserFields, UserView};

use crate::auth::{CurrentUser, ServerState};
use crate::errors::ApiError;
use crate::routes::FilterParams;

pub async fn list(State(state): State<ServerState>, Query(params): Query<FilterParams>) -> Json<Vec<UserView>> {
    Json(state.stores.users.query(&QueryFilter::from(params)))
}

pub async fn get_one(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Json<UserView>, ApiError> {
    Ok(Json(state.stores.users.get_by_id(&id)?))
}

/// Profile update by the user themselves or an admin. Passwords and the
/// admin flag are not changeable here.
pub async fn update(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(fields): Json<UserFields>,
) -> Result<Json<UserView>, ApiError> {
    let saved = state.stores.users.save(Draft::update(id, fields), user.principal()).await?;
    Ok(Json(saved))
}

pub async fn remove(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.stores.users.remove(&id, user.principal()).await?;
    Ok(StatusCode::NO_CONTENT)
}
