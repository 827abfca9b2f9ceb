use crate::progress::ProgressContext;

use super::message::OutboundMessage;

/// Best-effort link to the companion wearable.
///
/// Implementations never block and never report failure to the caller:
/// every send is tried once, logged, and forgotten.
pub trait CompanionChannel: Send + Sync {
    fn is_reachable(&self) -> bool;

    /// Fire-and-forget real-time message. Dropped if unreachable.
    fn send(&self, message: OutboundMessage);

    /// Replace the durable progress context. A newer call supersedes any
    /// context not yet delivered.
    fn update_context(&self, context: ProgressContext);
}

/// Channel for when no companion is paired or syncing is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedChannel;

impl CompanionChannel for DisconnectedChannel {
    fn is_reachable(&self) -> bool {
        false
    }

    fn send(&self, message: OutboundMessage) {
        tracing::trace!(kind = message.kind(), "no companion paired, message dropped");
    }

    fn update_context(&self, _context: ProgressContext) {}
}
