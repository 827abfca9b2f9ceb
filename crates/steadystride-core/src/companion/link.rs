//! In-process companion link.
//!
//! `CompanionLink` is the phone side and implements [`CompanionChannel`].
//! `CompanionPeer` is the wearable side: it receives encoded payloads and
//! pushes raw JSON back through the link. Decoded inbound messages are
//! forwarded on an [`InboundStream`] for the session actor.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::mpsc;

use super::channel::CompanionChannel;
use super::message::{self, InboundMessage, OutboundMessage};
use super::status::CompanionStatus;
use crate::error::CompanionError;
use crate::progress::ProgressContext;

/// Decoded messages from the companion, in arrival order.
pub type InboundStream = mpsc::UnboundedReceiver<InboundMessage>;

pub struct CompanionLink {
    status: CompanionStatus,
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedSender<InboundMessage>,
    /// Context waiting for the companion to become reachable.
    pending_context: Mutex<Option<ProgressContext>>,
    /// Last context handed to the link, re-sent on `requestSync`.
    last_context: Mutex<Option<ProgressContext>>,
}

impl CompanionLink {
    /// Create a connected link/peer pair. The link starts unreachable.
    pub fn pair() -> (Arc<CompanionLink>, CompanionPeer, InboundStream) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let link = Arc::new(CompanionLink {
            status: CompanionStatus::new(),
            outbound: out_tx,
            inbound: in_tx,
            pending_context: Mutex::new(None),
            last_context: Mutex::new(None),
        });
        let peer = CompanionPeer {
            link: Arc::clone(&link),
            payloads: out_rx,
        };
        (link, peer, in_rx)
    }

    pub fn status(&self) -> &CompanionStatus {
        &self.status
    }

    /// Update reachability. Becoming reachable replays any pending context.
    pub fn set_reachable(&self, reachable: bool) {
        let was = self.status.is_reachable();
        self.status.set_reachable(reachable);
        if reachable && !was {
            tracing::debug!("companion reachable");
            let pending = lock(&self.pending_context).take();
            if let Some(context) = pending {
                self.deliver_context(context);
            }
        } else if !reachable && was {
            tracing::debug!("companion unreachable");
        }
    }

    /// Handle a raw payload received from the companion.
    ///
    /// # Errors
    /// Returns the decode error; the payload is discarded.
    pub fn receive(&self, raw: &str) -> Result<(), CompanionError> {
        let message = message::decode(raw)?;
        match &message {
            InboundMessage::HeartRateUpdate { heart_rate } => {
                self.status.set_heart_rate(*heart_rate);
            }
            InboundMessage::EndWorkout { .. } | InboundMessage::WorkoutComplete { .. } => {
                self.status.set_workout_active(false);
            }
            InboundMessage::RequestSync => {
                let last = lock(&self.last_context).clone();
                if let Some(context) = last {
                    self.deliver_context(context);
                }
            }
            InboundMessage::PostureAlert { .. } => {}
        }
        if self.inbound.send(message).is_err() {
            tracing::debug!("no inbound listener, companion message discarded");
        }
        Ok(())
    }

    fn transmit(&self, message: &OutboundMessage) -> bool {
        let raw = match message::encode(message, message::epoch_secs()) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(kind = message.kind(), error = %e, "failed to encode companion message");
                return false;
            }
        };
        if self.outbound.send(raw).is_err() {
            tracing::warn!(kind = message.kind(), "companion peer gone, message dropped");
            return false;
        }
        true
    }

    fn deliver_context(&self, context: ProgressContext) {
        if self.transmit(&OutboundMessage::SyncProgress(context)) {
            self.status.mark_synced(Utc::now());
        }
    }
}

impl CompanionChannel for CompanionLink {
    fn is_reachable(&self) -> bool {
        self.status.is_reachable()
    }

    fn send(&self, message: OutboundMessage) {
        if !message.is_realtime() {
            if let OutboundMessage::SyncProgress(context) = message {
                self.update_context(context);
            }
            return;
        }
        if !self.is_reachable() {
            tracing::warn!(kind = message.kind(), "companion not reachable, message dropped");
            return;
        }
        match &message {
            OutboundMessage::StartWorkout { .. } => self.status.set_workout_active(true),
            OutboundMessage::EndWorkout => self.status.set_workout_active(false),
            _ => {}
        }
        self.transmit(&message);
    }

    fn update_context(&self, context: ProgressContext) {
        *lock(&self.last_context) = Some(context.clone());
        if self.is_reachable() {
            *lock(&self.pending_context) = None;
            self.deliver_context(context);
        } else {
            tracing::debug!("companion not reachable, progress context queued");
            *lock(&self.pending_context) = Some(context);
        }
    }
}

/// Wearable end of a [`CompanionLink`].
pub struct CompanionPeer {
    link: Arc<CompanionLink>,
    payloads: mpsc::UnboundedReceiver<String>,
}

impl CompanionPeer {
    pub fn set_reachable(&self, reachable: bool) {
        self.link.set_reachable(reachable);
    }

    /// Wait for the next payload from the phone.
    pub async fn recv(&mut self) -> Option<OutboundMessage> {
        loop {
            let raw = self.payloads.recv().await?;
            if let Some(message) = parse_outbound(&raw) {
                return Some(message);
            }
        }
    }

    /// Next payload already delivered, if any.
    pub fn try_recv(&mut self) -> Option<OutboundMessage> {
        while let Ok(raw) = self.payloads.try_recv() {
            if let Some(message) = parse_outbound(&raw) {
                return Some(message);
            }
        }
        None
    }

    /// Everything delivered so far.
    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Send a message to the phone as the wearable would.
    ///
    /// # Errors
    /// Propagates encode or decode failures.
    pub fn send(&self, message: &InboundMessage) -> Result<(), CompanionError> {
        let raw = message::encode(message, message::epoch_secs())?;
        self.link.receive(&raw)
    }
}

fn parse_outbound(raw: &str) -> Option<OutboundMessage> {
    match serde_json::from_str(raw) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::warn!(error = %e, "companion peer received malformed payload");
            None
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
