pub mod dtos;
pub mod events;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use handlers::LocationsState;
pub use repositories::{LocationRepository, PgLocationRepository};
pub use services::LocationService;
