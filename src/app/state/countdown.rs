use crate::domain::models::TimerSession;

/// Client-side projection of the server timer. `time_left_seconds` never
/// goes below zero and an inactive countdown always reads zero after expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountdownState {
    pub time_left_seconds: u64,
    pub is_active: bool,
}

impl CountdownState {
    pub fn reconcile(&mut self, session: &TimerSession) {
        let minutes = session.remaining_minutes;
        let seconds = if session.is_active && minutes.is_finite() && minutes > 0.0 {
            (minutes * 60.0).round() as u64
        } else {
            0
        };
        // Zero seconds left is never active, even if the server still says so.
        self.time_left_seconds = seconds;
        self.is_active = seconds > 0;
    }

    /// Forces the countdown inactive. Returns true only on the transition,
    /// so callers can fire their expiry signal exactly once.
    pub fn on_expired(&mut self) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.time_left_seconds = 0;
        true
    }

    /// Counts down by whole seconds. Returns true when this tick expired it.
    pub fn tick(&mut self, seconds: u64) -> bool {
        if !self.is_active || seconds == 0 {
            return false;
        }
        self.time_left_seconds = self.time_left_seconds.saturating_sub(seconds);
        if self.time_left_seconds == 0 {
            return self.on_expired();
        }
        false
    }
}
