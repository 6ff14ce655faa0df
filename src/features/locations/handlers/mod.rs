mod location_handler;
mod stream_handler;

pub use location_handler::*;
pub use stream_handler::*;

use std::sync::Arc;
use std::time::Duration;

use crate::features::locations::services::LocationService;
use crate::modules::realtime::Broadcaster;

/// State shared by the location handlers
#[derive(Clone)]
pub struct LocationsState {
    pub service: Arc<LocationService>,
    pub broadcaster: Arc<Broadcaster>,
    /// Interval between keep-alive comments on idle streams
    pub keep_alive: Duration,
}
