use crate::domain::models::{Snapshot, TimerSession};
use std::time::Duration;

/// Inputs to the timer sync reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    // --- Scheduling ---
    PollDue,
    Tick(Duration),

    // --- Server state ---
    SnapshotFetched(Snapshot), // Poll response, stamped when the poll was issued
    FetchFailed(String),
    Started(TimerSession), // Push event
    Stopped,               // Push event

    // --- Local signals ---
    Expired, // Raised by another fragment sharing the countdown
}
