use axum::{routing::get, Router};

pub mod admin;
pub mod common;
pub mod stations;
pub mod system;

/// Router for endpoints riders reach without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/stations", stations::router())
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/admin/stations", admin::router())
}
