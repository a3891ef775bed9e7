//! Station administration: CRUD plus the two inventory operations.
//!
//! Every handler authorizes first, then validates the body, then calls the
//! inventory engine. A rider with a malformed body sees 403, not 400.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use bikeshare_auth::Permission;

use crate::app::routes::common::CmdAuth;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_stations).post(create_station))
        .route(
            "/:id",
            get(get_station)
                .patch(replace_station)
                .put(replace_station)
                .delete(delete_station),
        )
        .route("/:id/inventory", post(adjust_inventory))
        .route("/:id/capacity", post(set_capacity))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(b)| b)
        .map_err(errors::json_rejection_to_response)
}

pub async fn list_stations(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, Response> {
    CmdAuth::new((), Permission::STATIONS_READ).check(&principal)?;

    let stations = services
        .engine()
        .list()
        .await
        .map_err(errors::inventory_error_to_response)?;

    Ok(Json(dto::stations_to_response(stations)).into_response())
}

pub async fn create_station(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::CreateStationRequest>, JsonRejection>,
) -> Result<Response, Response> {
    let payload = CmdAuth::new(payload, Permission::STATIONS_CREATE).check(&principal)?;
    let input = body(payload)?
        .into_new_station()
        .map_err(errors::inventory_error_to_response)?;

    let station = services
        .engine()
        .create(input)
        .await
        .map_err(errors::inventory_error_to_response)?;

    Ok((StatusCode::CREATED, Json(dto::StationResponse::from(&station))).into_response())
}

pub async fn get_station(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id = CmdAuth::new(id, Permission::STATIONS_READ).check(&principal)?;
    let id = errors::parse_station_id(&id)?;

    let station = services
        .engine()
        .get(id)
        .await
        .map_err(errors::inventory_error_to_response)?;

    Ok(Json(dto::StationResponse::from(&station)).into_response())
}

pub async fn replace_station(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateStationRequest>, JsonRejection>,
) -> Result<Response, Response> {
    let payload = CmdAuth::new(payload, Permission::STATIONS_UPDATE).check(&principal)?;
    let id = errors::parse_station_id(&id)?;
    let patch = body(payload)?
        .into_patch()
        .map_err(errors::inventory_error_to_response)?;

    let station = services
        .engine()
        .replace(id, patch)
        .await
        .map_err(errors::inventory_error_to_response)?;

    Ok(Json(dto::StationResponse::from(&station)).into_response())
}

pub async fn delete_station(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id = CmdAuth::new(id, Permission::STATIONS_DELETE).check(&principal)?;
    let id = errors::parse_station_id(&id)?;

    services
        .engine()
        .delete(id)
        .await
        .map_err(errors::inventory_error_to_response)?;

    Ok(Json(serde_json::json!({ "success": true })).into_response())
}

pub async fn adjust_inventory(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::AdjustInventoryRequest>, JsonRejection>,
) -> Result<Response, Response> {
    let payload = CmdAuth::new(payload, Permission::STATIONS_INVENTORY).check(&principal)?;
    let id = errors::parse_station_id(&id)?;
    let req = body(payload)?;

    let station = services
        .engine()
        .adjust_inventory(id, req.delta)
        .await
        .map_err(errors::inventory_error_to_response)?;

    Ok(Json(dto::StationResponse::from(&station)).into_response())
}

pub async fn set_capacity(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::SetCapacityRequest>, JsonRejection>,
) -> Result<Response, Response> {
    let payload = CmdAuth::new(payload, Permission::STATIONS_CAPACITY).check(&principal)?;
    let id = errors::parse_station_id(&id)?;
    let capacity = body(payload)?
        .capacity()
        .map_err(errors::inventory_error_to_response)?;

    let station = services
        .engine()
        .set_capacity(id, capacity)
        .await
        .map_err(errors::inventory_error_to_response)?;

    Ok(Json(dto::StationResponse::from(&station)).into_response())
}
