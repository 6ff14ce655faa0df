use axum::{
    routing::{get, post, put},
    Router,
};

use crate::features::locations::handlers::{self, LocationsState};

/// Public location routes: the list and the live stream
pub fn public_routes(state: LocationsState) -> Router {
    Router::new()
        .route("/api/locations", get(handlers::list_locations))
        .route("/api/locations/stream", get(handlers::stream_locations))
        .with_state(state)
}

/// Admin mutation routes
///
/// Note: Callers must layer authentication on top; handlers enforce the admin role.
pub fn admin_routes(state: LocationsState) -> Router {
    Router::new()
        .route("/api/admin/locations", post(handlers::create_location))
        .route(
            "/api/admin/locations/{id}",
            put(handlers::update_location).delete(handlers::delete_location),
        )
        .with_state(state)
}
