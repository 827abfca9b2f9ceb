use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Subcommand;
use steadystride_core::companion::{
    CompanionChannel, CompanionLink, CompanionPeer, DisconnectedChannel, InboundMessage,
};
use steadystride_core::session::{
    Collaborators, MemoryStore, SessionActor, SessionControl, SessionEngine, SessionStore,
    SpokenCoach, Ticker,
};
use steadystride_core::{Config, Database, Event, ProgressContext};
use tokio::sync::{broadcast, mpsc, oneshot};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a routine. Reads p/r/s/c/q from stdin; prints events as JSON lines.
    Run {
        /// Routine id or name
        routine: String,
        /// Divide the tick interval (2 = twice as fast)
        #[arg(long, default_value_t = 1)]
        speed: u32,
        /// Attach a simulated companion wearable
        #[arg(long)]
        companion: bool,
        /// Keep the session record in memory only
        #[arg(long)]
        dry_run: bool,
    },
}

pub async fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run {
            routine,
            speed,
            companion,
            dry_run,
        } => run_session(&routine, speed, companion, dry_run).await,
    }
}

async fn run_session(
    key: &str,
    speed: u32,
    with_companion: bool,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let library = config.routine_library();
    let routine = library
        .find(key)
        .ok_or_else(|| format!("unknown routine: {key}"))?
        .clone();

    let store: Box<dyn SessionStore> = if dry_run {
        Box::new(MemoryStore::new())
    } else {
        Box::new(Database::open()?)
    };

    let period_ms = config.session.tick_interval_ms;
    let (channel, link, inbound, wearable) = if with_companion && config.companion.enabled {
        let (link, peer, inbound) = CompanionLink::pair();
        // Reachable before the engine sends startWorkout.
        peer.set_reachable(true);
        let heart_rate_every = (Duration::from_millis(period_ms.max(1) * 5) / speed.max(1))
            .max(Duration::from_millis(1));
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(simulate_wearable(peer, heart_rate_every, stop_rx));
        let channel: Arc<dyn CompanionChannel> = link.clone();
        (channel, Some(link), Some(inbound), Some((stop_tx, task)))
    } else {
        let channel: Arc<dyn CompanionChannel> = Arc::new(DisconnectedChannel);
        (channel, None, None, None)
    };

    let collaborators = Collaborators::new(
        Arc::new(SpokenCoach::new(config.voice.enabled, config.voice.speed)),
        channel,
        store,
    );
    let (engine, started) = SessionEngine::start(&routine, collaborators)?;
    for event in &started {
        print_event(event)?;
    }

    let ticker = Ticker::interval_ms(period_ms, speed, config.session.catch_up_missed_ticks);
    let handle = SessionActor::spawn(engine, ticker, inbound);
    let printer = tokio::spawn(print_events(handle.subscribe()));
    let input = tokio::spawn(read_commands(handle.control().clone()));

    let record = handle.join().await;
    input.abort();
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "event printer stopped early");
    }

    if let (Some(record), Some(link)) = (&record, &link) {
        if config.companion.sync_progress_on_complete {
            let today = Utc::now().date_naive();
            let context = if dry_run {
                ProgressContext::from_records(std::slice::from_ref(record), today)
            } else {
                Database::open()?.progress_context(today)?
            };
            link.update_context(context);
        }
    }

    if let Some((stop, task)) = wearable {
        // Receiver only goes away if the task already ended.
        let _ = stop.send(());
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "simulated wearable failed");
        }
    }
    Ok(())
}

fn print_event(event: &Event) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<Event>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Err(e) = print_event(&event) {
                    tracing::error!(error = %e, "failed to encode event");
                }
                if event.is_terminal() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event printer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Stdin is read on a plain thread: a blocked read there cannot hold up
/// runtime shutdown.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn read_commands(control: SessionControl) {
    let mut lines = stdin_lines();
    while let Some(line) = lines.recv().await {
        let result = match line.trim() {
            "p" | "pause" => control.pause().await,
            "r" | "resume" => control.resume().await,
            "s" | "skip" => control.skip().await,
            "c" | "complete" => control.complete_current().await,
            "q" | "quit" | "cancel" => control.cancel().await,
            "" => continue,
            other => {
                eprintln!("unknown command: {other} (p, r, s, c, q)");
                continue;
            }
        };
        if let Err(e) = result {
            eprintln!("error: {e}");
        }
    }
}

/// Stand-in wearable: logs what it receives and reports a heart rate.
async fn simulate_wearable(
    mut peer: CompanionPeer,
    heart_rate_every: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut pulse = tokio::time::interval(heart_rate_every);
    pulse.tick().await;
    let mut beats = 0u32;

    loop {
        tokio::select! {
            _ = &mut stop => {
                for message in peer.drain() {
                    tracing::info!(kind = message.kind(), "wearable received");
                }
                break;
            }
            message = peer.recv() => match message {
                Some(message) => tracing::info!(kind = message.kind(), "wearable received"),
                None => break,
            },
            _ = pulse.tick() => {
                beats += 1;
                let heart_rate = 88.0 + f64::from(beats % 7) * 2.0;
                if let Err(e) = peer.send(&InboundMessage::HeartRateUpdate { heart_rate }) {
                    tracing::warn!(error = %e, "wearable could not report heart rate");
                }
            }
        }
    }
}

