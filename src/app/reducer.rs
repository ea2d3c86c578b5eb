use super::{action::SyncAction, command::SyncCommand, state::CountdownState};
use crate::domain::models::{Snapshot, TimerSession};
use std::time::Duration;

/// Countdown plus the bookkeeping needed to order snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerSync {
    pub countdown: CountdownState,
    next_seq: u64,
    last_applied: Option<u64>,
    // Sub-second remainder of local ticks.
    carry: Duration,
}

impl TimerSync {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence numbers are drawn when a poll is issued or an event arrives.
    pub fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Applies a snapshot unless a newer one has already been applied.
    pub fn apply(&mut self, snapshot: Snapshot) -> bool {
        if self.last_applied.is_some_and(|last| snapshot.seq < last) {
            tracing::debug!(seq = snapshot.seq, last = ?self.last_applied, "dropping stale snapshot");
            return false;
        }
        self.last_applied = Some(snapshot.seq);
        self.countdown.reconcile(&snapshot.session);
        self.carry = Duration::ZERO;
        true
    }

    fn apply_event(&mut self, session: TimerSession) {
        let seq = self.next_seq();
        self.apply(Snapshot { seq, session });
    }
}

pub fn update(sync: &mut TimerSync, action: SyncAction) -> Option<SyncCommand> {
    match action {
        SyncAction::PollDue => {
            return Some(SyncCommand::FetchSnapshot(sync.next_seq()));
        }
        SyncAction::SnapshotFetched(snapshot) => {
            sync.apply(snapshot);
        }
        SyncAction::FetchFailed(err) => {
            tracing::warn!(error = %err, "timer session poll failed, keeping local countdown");
        }
        SyncAction::Started(session) => {
            sync.apply_event(session);
        }
        SyncAction::Stopped => {
            sync.apply_event(TimerSession::stopped());
        }
        SyncAction::Tick(elapsed) => {
            if !sync.countdown.is_active {
                sync.carry = Duration::ZERO;
                return None;
            }
            sync.carry += elapsed;
            let whole = sync.carry.as_secs();
            sync.carry -= Duration::from_secs(whole);
            if sync.countdown.tick(whole) {
                tracing::info!("timer expired");
                return Some(SyncCommand::NotifyExpired);
            }
        }
        SyncAction::Expired => {
            sync.countdown.on_expired();
        }
    }
    None
}
