mod location;

pub use location::{next_updated_at, Location, LocationPatch, NewLocation};
