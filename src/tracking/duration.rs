use std::time::Duration;

use tokio::time::Instant;

/// Tracks how long a sampled value has stayed unchanged.
///
/// Time is read from the tokio monotonic clock, so tests running with a
/// paused runtime fully control it. The accumulator keeps full nanosecond
/// precision and only whole seconds are reported, so many short ticks do
/// not lose time to truncation.
///
/// One tracker per signal; it is not meant to be shared between callers.
#[derive(Debug)]
pub struct DurationTracker<T> {
    previous: Option<T>,
    accumulated: Duration,
    last_sample: Instant,
}

impl<T: PartialEq> DurationTracker<T> {
    pub fn new() -> Self {
        Self {
            previous: None,
            accumulated: Duration::ZERO,
            last_sample: Instant::now(),
        }
    }

    /// Observe `current` and return how long it has been held.
    pub fn update(&mut self, current: T) -> Duration {
        self.update_counting(current, true)
    }

    /// Like [`update`](Self::update), but the time since the previous sample
    /// is only added while `counting` is true. A changed value still resets
    /// the accumulator either way.
    pub fn update_counting(&mut self, current: T, counting: bool) -> Duration {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_sample);
        self.last_sample = now;

        match &self.previous {
            Some(previous) if *previous == current => {
                if counting {
                    self.accumulated += elapsed;
                }
            }
            _ => {
                self.accumulated = Duration::ZERO;
                self.previous = Some(current);
            }
        }

        self.held()
    }

    /// Advance the clock reading without observing a value, so the gap is
    /// not attributed to the held value on the next update.
    pub fn skip(&mut self) {
        self.last_sample = Instant::now();
    }

    /// Forget the held value and the accumulated time. The next update
    /// returns zero whatever it observes.
    pub fn reset(&mut self) {
        self.previous = None;
        self.accumulated = Duration::ZERO;
    }

    /// Accumulated time in whole seconds.
    pub fn held(&self) -> Duration {
        Duration::from_secs(self.accumulated.as_secs())
    }

    pub fn previous(&self) -> Option<&T> {
        self.previous.as_ref()
    }
}

impl<T: PartialEq> Default for DurationTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}
