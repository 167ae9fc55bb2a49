use std::time::Duration;

/// Nominal time counters for floor-timer fault detection. `elapsed` grows
/// with every simulated wait; `deadline` is reset when the car starts a new
/// leg and grows by 1.5x of every travel increment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TravelClock {
    elapsed: Duration,
    deadline: Duration,
}

const DEADLINE_FACTOR: f64 = 1.5;

impl TravelClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants 1.5x `base` on top of the time spent so far.
    pub fn start_leg(&mut self, base: Duration) {
        self.deadline = self.elapsed + base.mul_f64(DEADLINE_FACTOR);
    }

    pub fn extend(&mut self, increment: Duration) {
        self.deadline += increment.mul_f64(DEADLINE_FACTOR);
    }

    pub fn advance(&mut self, spent: Duration) {
        self.elapsed += spent;
    }

    pub fn is_overdue(&self) -> bool {
        self.elapsed > self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}
