pub mod coalescer;
pub mod hub;
pub mod messages;

pub use hub::{ConnectionId, ConnectionRegistry, RealtimeHub, RealtimePublisher};
pub use messages::{Audience, ClientCommand, RealtimeMessage};
