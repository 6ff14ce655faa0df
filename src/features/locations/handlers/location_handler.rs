use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::LocationsState;
use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::guards::RequireAdmin;
use crate::features::locations::dtos::{
    CreateLocationDto, DeletedLocationDto, LocationResponseDto, UpdateLocationDto,
};
use crate::shared::types::ApiResponse;

/// A malformed id can never match a record, so it reads as not found
fn parse_location_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("Location {} not found", raw)))
}

/// List all locations, most recently updated first
#[utoipa::path(
    get,
    path = "/api/locations",
    responses(
        (status = 200, description = "All map locations", body = ApiResponse<Vec<LocationResponseDto>>),
        (status = 500, description = "Store unavailable")
    ),
    tag = "locations"
)]
pub async fn list_locations(
    State(state): State<LocationsState>,
) -> Result<Json<ApiResponse<Vec<LocationResponseDto>>>> {
    let locations = state.service.list().await?;
    Ok(Json(ApiResponse::success(locations)))
}

/// Create a location (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/locations",
    request_body = CreateLocationDto,
    responses(
        (status = 200, description = "Location created", body = ApiResponse<LocationResponseDto>),
        (status = 400, description = "Missing or invalid name, lat or lng"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only")
    ),
    tag = "locations",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_location(
    RequireAdmin(user): RequireAdmin,
    State(state): State<LocationsState>,
    AppJson(dto): AppJson<CreateLocationDto>,
) -> Result<Json<ApiResponse<LocationResponseDto>>> {
    tracing::debug!(admin = %user.sub, "Creating location");
    let location = state.service.create(dto).await?;
    Ok(Json(ApiResponse::success(location)))
}

/// Patch a location; only supplied fields change (admin only)
#[utoipa::path(
    put,
    path = "/api/admin/locations/{id}",
    params(
        ("id" = Uuid, Path, description = "Location ID")
    ),
    request_body = UpdateLocationDto,
    responses(
        (status = 200, description = "Location updated", body = ApiResponse<LocationResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Location not found")
    ),
    tag = "locations",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_location(
    RequireAdmin(user): RequireAdmin,
    State(state): State<LocationsState>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<UpdateLocationDto>,
) -> Result<Json<ApiResponse<LocationResponseDto>>> {
    let id = parse_location_id(&id)?;
    tracing::debug!(admin = %user.sub, location_id = %id, "Updating location");
    let location = state.service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(location)))
}

/// Delete a location (admin only)
#[utoipa::path(
    delete,
    path = "/api/admin/locations/{id}",
    params(
        ("id" = Uuid, Path, description = "Location ID")
    ),
    responses(
        (status = 200, description = "Location deleted", body = ApiResponse<DeletedLocationDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Location not found")
    ),
    tag = "locations",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_location(
    RequireAdmin(user): RequireAdmin,
    State(state): State<LocationsState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeletedLocationDto>>> {
    let id = parse_location_id(&id)?;
    tracing::debug!(admin = %user.sub, location_id = %id, "Deleting location");
    let deleted = state.service.delete(id).await?;
    Ok(Json(ApiResponse::success(deleted)))
}
