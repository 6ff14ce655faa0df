//! Server-sent-events fan-out.
//!
//! Every open stream owns a bounded channel whose sender is registered with
//! the [`Broadcaster`]. Publishing serializes the payload once and hands a
//! cheap clone of the frame to each registered channel. Events are ephemeral:
//! a subscriber only sees what is published while it is registered, and
//! catches up by fetching the full list.

mod broadcaster;
mod connection;

pub use broadcaster::Broadcaster;
pub use connection::{ConnectionGuard, ConnectionId, FrameSender, SseFrame, Subscription};
