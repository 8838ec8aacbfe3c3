use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use models::{Car, QueryFilter, Toy};

use crate::auth::{self as principal, ServerState};

pub mod auth;
pub mod collection;
pub mod user;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Raw list query. Values arrive as strings; unparsable numbers are ignored
/// rather than rejected.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub txt: Option<String>,
    #[serde(rename = "maxPrice", default)]
    pub max_price: Option<String>,
    #[serde(rename = "stockStatus", default)]
    pub stock_status: Option<String>,
}

impl From<FilterParams> for QueryFilter {
    fn from(p: FilterParams) -> Self {
        QueryFilter {
            txt: p.txt.filter(|t| !t.is_empty()),
            max_price: p.max_price.and_then(|v| v.trim().parse::<f64>().ok()),
            stock_status: p.stock_status.filter(|s| !s.is_empty()),
        }
    }
}

/// Build the application router: health, the three collections and auth.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/api/car", get(collection::list::<Car>).post(collection::create::<Car>))
        .route(
            "/api/car/:id",
            get(collection::get_one::<Car>)
                .put(collection::update::<Car>)
                .delete(collection::remove::<Car>),
        )
        .route("/api/toy", get(collection::list::<Toy>).post(collection::create::<Toy>))
        .route(
            "/api/toy/:id",
            get(collection::get_one::<Toy>)
                .put(collection::update::<Toy>)
                .delete(collection::remove::<Toy>),
        )
        .route("/api/user", get(user::list))
        .route("/api/user/:id", get(user::get_one).put(user::update).delete(user::remove))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route_layer(middleware::from_fn_with_state(state.clone(), principal::attach_principal));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
