//! Map-location service for the marketplace: admin CRUD over map pins,
//! a server-sent-events channel that pushes every change to connected
//! subscribers, and the client that keeps a live view of those pins.

pub mod core;
pub mod features;
pub mod modules;
pub mod shared;
