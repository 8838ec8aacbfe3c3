//! Handlers shared by the owned collections (cars, toys). Each is generic
//! over the record type and picks its store from the server state.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::de::DeserializeOwned;

use models::{Car, Draft, QueryFilter, Record, Toy};
use service::runtime::Stores;
use service::store::CollectionStore;

use crate::auth::{CurrentUser, ServerState};
use crate::errors::ApiError;
use crate::routes::FilterParams;

/// Record types served through the generic collection routes.
pub trait Served: Record
where
    Self::Fields: DeserializeOwned,
{
    fn store(stores: &Stores) -> &Arc<CollectionStore<Self>>;
}

impl Served for Car {
    fn store(stores: &Stores) -> &Arc<CollectionStore<Self>> {
        &stores.cars
    }
}

impl Served for Toy {
    fn store(stores: &Stores) -> &Arc<CollectionStore<Self>> {
        &stores.toys
    }
}

pub async fn list<R>(State(state): State<ServerState>, Query(params): Query<FilterParams>) -> Json<Vec<R>>
where
    R: Served,
    R::Fields: DeserializeOwned,
{
    let filter = QueryFilter::from(params);
    Json(R::store(&state.stores).query(&filter))
}

pub async fn get_one<R>(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Json<R>, ApiError>
where
    R: Served,
    R::Fields: DeserializeOwned,
{
    Ok(Json(R::store(&state.stores).get_by_id(&id)?))
}

pub async fn create<R>(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(fields): Json<R::Fields>,
) -> Result<Json<R>, ApiError>
where
    R: Served,
    R::Fields: DeserializeOwned,
{
    let saved = R::store(&state.stores).save(Draft::new(fields), user.principal()).await?;
    Ok(Json(saved))
}

/// Full replacement of the whitelisted fields; the path id wins over any id in the body.
pub async fn update<R>(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(fields): Json<R::Fields>,
) -> Result<Json<R>, ApiError>
where
    R: Served,
    R::Fields: DeserializeOwned,
{
    let saved = R::store(&state.stores).save(Draft::update(id, fields), user.principal()).await?;
    Ok(Json(saved))
}

pub async fn remove<R>(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    R: Served,
    R::Fields: DeserializeOwned,
{
    R::store(&state.stores).remove(&id, user.principal()).await?;
    Ok(StatusCode::NO_CONTENT)
}
