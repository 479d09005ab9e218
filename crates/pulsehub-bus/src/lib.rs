//! Topic-based pub/sub fan-out with per-subscriber backpressure tolerance.
//!
//! Subscribers register once per connection and join topics by name; a
//! broadcast serializes its payload once and hands it to every subscriber
//! of that topic whose outstanding-bytes counter is below the configured
//! threshold. Subscribers above the threshold simply miss that payload —
//! delivery is best-effort, not guaranteed.

pub mod error;
pub mod registry;

pub use error::{BusError, BusErrorKind};
pub use registry::{
    BroadcastStats, ConnectionId, DEFAULT_BACKPRESSURE_BYTES, Frame, Registration, TopicRegistry,
};
