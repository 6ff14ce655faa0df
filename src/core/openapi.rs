use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::locations::{dtos as locations_dtos, events, handlers as locations_handlers};
use crate::shared::types::ApiResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Locations (public)
        locations_handlers::list_locations,
        locations_handlers::stream_locations,
        // Locations (admin)
        locations_handlers::create_location,
        locations_handlers::update_location,
        locations_handlers::delete_location,
    ),
    components(
        schemas(
            // Locations
            locations_dtos::Coordinate,
            locations_dtos::CreateLocationDto,
            locations_dtos::UpdateLocationDto,
            locations_dtos::LocationResponseDto,
            locations_dtos::DeletedLocationDto,
            events::LocationEventKind,
            events::LocationEvent,
            ApiResponse<Vec<locations_dtos::LocationResponseDto>>,
            ApiResponse<locations_dtos::LocationResponseDto>,
            ApiResponse<locations_dtos::DeletedLocationDto>,
        )
    ),
    tags(
        (name = "locations", description = "Map locations and their live update stream"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Pinboard API",
        version = "0.1.0",
        description = "API documentation for Pinboard",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_location_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/locations",
            "/api/locations/stream",
            "/api/admin/locations",
            "/api/admin/locations/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_swagger_info_modifier() {
        let mut doc = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Custom".to_string(),
            version: "9.9.9".to_string(),
            description: "Overridden".to_string(),
        }
        .modify(&mut doc);
        assert_eq!(doc.info.title, "Custom");
        assert_eq!(doc.info.description.as_deref(), Some("Overridden"));
    }
}
