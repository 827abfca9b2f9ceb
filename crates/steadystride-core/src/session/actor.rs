//! Serialized mailbox around a [`SessionEngine`].
//!
//! One tokio task owns the engine. Ticks, user commands and inbound
//! companion messages are merged with `select!` so no two mutations ever
//! interleave. Produced events are broadcast; the latest state is
//! published on a `watch` channel.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use super::engine::{SessionEngine, SessionState};
use super::record::SessionRecord;
use crate::companion::{InboundMessage, InboundStream};
use crate::error::SessionError;
use crate::events::Event;

const EVENT_CAPACITY: usize = 256;
const MAILBOX_CAPACITY: usize = 32;

/// Where ticks come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ticker {
    /// Real clock. With `catch_up`, late ticks are delivered in a burst;
    /// without it, missed ticks are dropped (pure counting).
    Interval { period: Duration, catch_up: bool },
    /// Caller delivers ticks through [`SessionControl::tick`].
    Manual,
}

impl Ticker {
    pub fn every_second() -> Self {
        Ticker::Interval {
            period: Duration::from_secs(1),
            catch_up: false,
        }
    }

    /// `speed` divides the period; 0 is treated as 1.
    pub fn interval_ms(period_ms: u64, speed: u32, catch_up: bool) -> Self {
        let period = Duration::from_millis(period_ms.max(1)) / speed.max(1);
        Ticker::Interval {
            period: period.max(Duration::from_millis(1)),
            catch_up,
        }
    }

    fn build(self) -> Option<Interval> {
        match self {
            Ticker::Interval { period, catch_up } => {
                let mut interval = time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(if catch_up {
                    MissedTickBehavior::Burst
                } else {
                    MissedTickBehavior::Skip
                });
                Some(interval)
            }
            Ticker::Manual => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Pause,
    Resume,
    Skip,
    CompleteCurrent,
    Cancel,
    Tick,
    Snapshot,
}

struct Request {
    command: Command,
    reply: oneshot::Sender<Result<Vec<Event>, SessionError>>,
}

pub struct SessionActor;

impl SessionActor {
    /// Move `engine` into a new task and return a handle to it.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(
        engine: SessionEngine,
        ticker: Ticker,
        inbound: Option<InboundStream>,
    ) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(engine.state().clone());

        let outlets = Outlets {
            events: event_tx.clone(),
            state: state_tx,
        };
        let task = tokio::spawn(run(engine, ticker, command_rx, inbound, outlets));

        SessionHandle {
            control: SessionControl {
                commands: command_tx,
                events: event_tx,
                state: state_rx,
            },
            task,
        }
    }
}

struct Outlets {
    events: broadcast::Sender<Event>,
    state: watch::Sender<SessionState>,
}

impl Outlets {
    fn publish(&self, engine: &SessionEngine, events: &[Event]) {
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event.clone());
        }
        self.state.send_replace(engine.state().clone());
    }
}

async fn run(
    mut engine: SessionEngine,
    ticker: Ticker,
    mut commands: mpsc::Receiver<Request>,
    mut inbound: Option<InboundStream>,
    outlets: Outlets,
) -> Option<SessionRecord> {
    let mut interval = ticker.build();

    while !engine.is_terminal() {
        tokio::select! {
            biased;

            request = commands.recv() => {
                let Some(Request { command, reply }) = request else {
                    tracing::debug!("all session handles dropped, cancelling");
                    if let Ok(events) = engine.cancel() {
                        outlets.publish(&engine, &events);
                    }
                    break;
                };
                let result = apply(&mut engine, command);
                if let Ok(events) = &result {
                    outlets.publish(&engine, events);
                }
                // Caller may have stopped waiting.
                let _ = reply.send(result);
            }

            message = recv_inbound(&mut inbound) => match message {
                Some(message) => {
                    if let Some(event) = inbound_event(message) {
                        outlets.publish(&engine, &[event]);
                    }
                }
                None => {
                    tracing::debug!("companion inbound stream closed");
                    inbound = None;
                }
            },

            _ = next_tick(&mut interval) => {
                let events = engine.tick();
                outlets.publish(&engine, &events);
            }
        }
    }

    engine.record().cloned()
}

fn apply(engine: &mut SessionEngine, command: Command) -> Result<Vec<Event>, SessionError> {
    match command {
        Command::Pause => engine.pause(),
        Command::Resume => engine.resume(),
        Command::Skip => engine.skip(),
        Command::CompleteCurrent => engine.complete_current(),
        Command::Cancel => engine.cancel(),
        Command::Tick => Ok(engine.tick()),
        Command::Snapshot => Ok(vec![engine.snapshot()]),
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn recv_inbound(inbound: &mut Option<InboundStream>) -> Option<InboundMessage> {
    match inbound {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Map a companion message to the event shown to the presentation layer.
fn inbound_event(message: InboundMessage) -> Option<Event> {
    let at = Utc::now();
    if let Some(summary) = message.companion_summary() {
        // Local state stays authoritative.
        tracing::warn!("companion ended its workout while the session is active");
        return Some(Event::CompanionEndedWorkout { summary, at });
    }
    match message {
        InboundMessage::HeartRateUpdate { heart_rate } => Some(Event::HeartRateUpdated {
            bpm: heart_rate,
            at,
        }),
        InboundMessage::PostureAlert { message } => Some(Event::PostureAlert { message, at }),
        // The link already answered with the last context.
        InboundMessage::RequestSync => None,
        InboundMessage::EndWorkout { .. } | InboundMessage::WorkoutComplete { .. } => None,
    }
}

/// Cloneable command side of a running session.
#[derive(Clone)]
pub struct SessionControl {
    commands: mpsc::Sender<Request>,
    events: broadcast::Sender<Event>,
    state: watch::Receiver<SessionState>,
}

impl SessionControl {
    pub async fn pause(&self) -> Result<Vec<Event>, SessionError> {
        self.request(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<Vec<Event>, SessionError> {
        self.request(Command::Resume).await
    }

    pub async fn skip(&self) -> Result<Vec<Event>, SessionError> {
        self.request(Command::Skip).await
    }

    pub async fn complete_current(&self) -> Result<Vec<Event>, SessionError> {
        self.request(Command::CompleteCurrent).await
    }

    pub async fn cancel(&self) -> Result<Vec<Event>, SessionError> {
        self.request(Command::Cancel).await
    }

    /// Deliver one tick. Only meaningful with [`Ticker::Manual`].
    pub async fn tick(&self) -> Result<Vec<Event>, SessionError> {
        self.request(Command::Tick).await
    }

    pub async fn snapshot(&self) -> Result<Event, SessionError> {
        let mut events = self.request(Command::Snapshot).await?;
        events.pop().ok_or_else(|| self.terminated())
    }

    /// Latest published state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    async fn request(&self, command: Command) -> Result<Vec<Event>, SessionError> {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Request { command, reply }).await.is_err() {
            return Err(self.terminated());
        }
        response.await.unwrap_or_else(|_| Err(self.terminated()))
    }

    fn terminated(&self) -> SessionError {
        SessionError::SessionTerminated {
            phase: self.state.borrow().phase,
        }
    }
}

/// Owner of a running session. Dropping every handle and control cancels it.
pub struct SessionHandle {
    control: SessionControl,
    task: JoinHandle<Option<SessionRecord>>,
}

impl SessionHandle {
    pub fn control(&self) -> &SessionControl {
        &self.control
    }

    pub fn state(&self) -> SessionState {
        self.control.state()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.control.subscribe()
    }

    /// Wait for the session to end. Resolves to the record on completion,
    /// `None` on cancellation.
    pub async fn join(self) -> Option<SessionRecord> {
        let SessionHandle { control, task } = self;
        let record = match task.await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, "session task failed");
                None
            }
        };
        drop(control);
        record
    }
}
