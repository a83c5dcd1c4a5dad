use tokio::time::{Duration, Instant};

/// Length of one screening window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Screenings admitted per window.
pub const MAX_PER_WINDOW: u32 = 6;

/// Fixed-window join limiter.
///
/// The window is reset lazily by the first join at or past its end, not by a
/// timer, so a burst straddling the boundary can exceed the ceiling within a
/// real 60 s span.
#[derive(Debug, Default)]
pub struct JoinLimiter {
    count: u32,
    window_start: Option<Instant>,
}

impl JoinLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a screening may run at `now`. Resets an expired window.
    /// Does not consume a slot; call [`record`](Self::record) after a
    /// successful screening.
    pub fn admit(&mut self, now: Instant) -> bool {
        let expired = match self.window_start {
            None => true,
            Some(start) => now.saturating_duration_since(start) >= WINDOW,
        };
        if expired {
            self.count = 0;
            self.window_start = Some(now);
            return true;
        }
        self.count < MAX_PER_WINDOW
    }

    pub fn record(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}
