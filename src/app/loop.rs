use crate::app::{
    action::SyncAction,
    command::SyncCommand,
    reducer::{self, TimerSync},
    state::CountdownState,
};
use crate::domain::models::Snapshot;
use crate::domain::session::{SessionEvent, SessionProvider};

use anyhow::Result;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    pub tick_rate: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            tick_rate: Duration::from_secs(1),
        }
    }
}

/// Where the loop publishes. Every view fragment subscribes to the same
/// countdown; expiry is broadcast once per expiry.
#[derive(Debug, Clone)]
pub struct SyncOutputs {
    pub countdown: watch::Sender<CountdownState>,
    pub expired: broadcast::Sender<()>,
}

/// Where the loop listens besides the provider. `expired_reports` carries
/// expiries noticed by a view fragment on its own.
#[derive(Debug)]
pub struct SyncInputs {
    pub shutdown: watch::Receiver<bool>,
    pub expired_reports: mpsc::Receiver<()>,
}

/// Handle to a spawned sync loop.
pub struct SyncHandle {
    pub countdown: watch::Receiver<CountdownState>,
    expired: broadcast::Sender<()>,
    reports: mpsc::Sender<()>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<()>>,
}

impl SyncHandle {
    #[must_use]
    pub fn subscribe_expired(&self) -> broadcast::Receiver<()> {
        self.expired.subscribe()
    }

    /// Tells the loop a fragment saw the timer run out. The countdown goes
    /// inactive; subscribers are not notified a second time.
    pub async fn report_expired(&self) -> Result<()> {
        self.reports.send(()).await?;
        Ok(())
    }

    #[must_use]
    pub fn current(&self) -> CountdownState {
        *self.countdown.borrow()
    }

    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        self.task.await?
    }
}

pub fn spawn_sync(provider: Arc<dyn SessionProvider>, settings: SyncSettings) -> SyncHandle {
    let (countdown_tx, countdown_rx) = watch::channel(CountdownState::default());
    let (expired_tx, _) = broadcast::channel(8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (reports_tx, reports_rx) = mpsc::channel(4);
    let outputs = SyncOutputs {
        countdown: countdown_tx,
        expired: expired_tx.clone(),
    };
    let inputs = SyncInputs {
        shutdown: shutdown_rx,
        expired_reports: reports_rx,
    };
    let task = tokio::spawn(run_sync_loop(provider, settings, inputs, outputs));
    SyncHandle {
        countdown: countdown_rx,
        expired: expired_tx,
        reports: reports_tx,
        shutdown: shutdown_tx,
        task,
    }
}

/// Polls the provider, listens for push events and counts down locally until
/// `shutdown` flips to true or its sender goes away.
pub async fn run_sync_loop(
    provider: Arc<dyn SessionProvider>,
    settings: SyncSettings,
    inputs: SyncInputs,
    outputs: SyncOutputs,
) -> Result<()> {
    let SyncInputs {
        mut shutdown,
        mut expired_reports,
    } = inputs;
    let (action_tx, mut action_rx) = mpsc::channel(16);
    let mut events = provider.events();
    let mut events_open = true;

    // First poll tick fires immediately and loads the initial state.
    let mut poll = interval(settings.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticker = interval(settings.tick_rate);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();

    let mut sync = TimerSync::new();

    loop {
        let action = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }

            _ = poll.tick() => SyncAction::PollDue,

            _ = ticker.tick() => {
                let now = Instant::now();
                let elapsed = now.duration_since(last_tick);
                last_tick = now;
                SyncAction::Tick(elapsed)
            }

            event = events.next(), if events_open => match event {
                Some(SessionEvent::Started(session)) => SyncAction::Started(session),
                Some(SessionEvent::Stopped) => SyncAction::Stopped,
                None => {
                    tracing::debug!("session event stream closed, polling only");
                    events_open = false;
                    continue;
                }
            },

            // Disabled once every handle is gone.
            Some(()) = expired_reports.recv() => SyncAction::Expired,

            // Async results
            Some(a) = action_rx.recv() => a,
        };

        let before = sync.countdown;
        let command = reducer::update(&mut sync, action);
        if sync.countdown != before {
            outputs.countdown.send_replace(sync.countdown);
        }

        match command {
            Some(SyncCommand::FetchSnapshot(seq)) => {
                handle_fetch(seq, provider.clone(), action_tx.clone());
            }
            Some(SyncCommand::NotifyExpired) => {
                // No subscribers is fine.
                let _ = outputs.expired.send(());
            }
            None => {}
        }
    }

    Ok(())
}

pub(crate) fn handle_fetch(
    seq: u64,
    provider: Arc<dyn SessionProvider>,
    tx: mpsc::Sender<SyncAction>,
) {
    tokio::spawn(async move {
        let action = match provider.fetch().await {
            Ok(session) => SyncAction::SnapshotFetched(Snapshot { seq, session }),
            Err(e) => SyncAction::FetchFailed(format!("{e:#}")),
        };
        let _ = tx.send(action).await;
    });
}

#[cfg(test)]
#[path = "loop_tests.rs"]
mod tests;
