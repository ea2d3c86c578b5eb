/// Side effects requested by the timer sync reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCommand {
    FetchSnapshot(u64),
    NotifyExpired,
}
