use std::time::Duration;

/// Doubling delay schedule, capped at `max`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    factor: u32,
    current: Option<Duration>,
    polls: u32,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            factor: 2,
            current: None,
            polls: 0,
        }
    }

    pub fn with_factor(mut self, factor: u32) -> Self {
        self.factor = factor.max(1);
        self
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            None => self.initial.min(self.max),
            Some(prev) => prev.saturating_mul(self.factor).min(self.max),
        };
        self.current = Some(delay);
        self.polls += 1;
        delay
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.polls = 0;
    }

    /// Number of delays handed out since the last reset
    pub fn polls(&self) -> u32 {
        self.polls
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(250), Duration::from_secs(2))
    }
}
