pub mod client;
pub mod realtime;
