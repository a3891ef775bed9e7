//! Rider-facing read-only station views.

use axum::{
    extract::{Extension, Path},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use bikeshare_infra::InventoryError;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_open_stations))
        .route("/:id", get(get_station))
}

/// Closed stations are hidden from riders.
pub async fn list_open_stations(
    Extension(services): Extension<AppServices>,
) -> Result<Response, Response> {
    let stations = services
        .engine()
        .list()
        .await
        .map_err(errors::inventory_error_to_response)?;

    let open = stations.into_iter().filter(|s| s.is_open()).collect();
    Ok(Json(dto::stations_to_response(open)).into_response())
}

/// Closed stations answer 404 here, matching their absence from the list.
pub async fn get_station(
    Extension(services): Extension<AppServices>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id = errors::parse_station_id(&id)?;
    let station = services
        .engine()
        .get(id)
        .await
        .map_err(errors::inventory_error_to_response)?;

    if !station.is_open() {
        return Err(errors::inventory_error_to_response(InventoryError::NotFound));
    }

    Ok(Json(dto::StationResponse::from(&station)).into_response())
}
