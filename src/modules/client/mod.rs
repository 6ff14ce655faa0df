//! Consumer side of the location API.
//!
//! [`ApiClient`] performs JSON calls against the REST surface and opens the
//! event stream, and [`LocationSubscriber`] keeps a [`LocationView`] in sync
//! with the server.

mod api_client;
mod location_view;
mod subscriber;

pub use api_client::{ApiClient, ClientError, UnauthorizedHook};
pub use location_view::LocationView;
pub use subscriber::{LocationSubscriber, ReconnectPolicy};
