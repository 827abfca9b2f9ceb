//! Phone ↔ wearable sync channel.
//!
//! Delivery is opportunistic. Real-time workout commands go out only while
//! the companion is reachable; the progress context is latest-wins and
//! replayed on reconnect. Nothing here reports failure to the engine.

mod channel;
mod link;
pub mod message;
mod status;

pub use channel::{CompanionChannel, DisconnectedChannel};
pub use link::{CompanionLink, CompanionPeer, InboundStream};
pub use message::{InboundMessage, OutboundMessage, WorkoutSummary};
pub use status::{CompanionStatus, StatusSnapshot};
