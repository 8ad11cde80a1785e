use std::time::Instant;

/// Wall-clock elapsed time for one session.
///
/// `tick` hands out whole-second deltas since the previous tick so the store
/// can add them to a cumulative total; fractional seconds carry over.
#[derive(Debug, Clone)]
pub struct SessionClock {
    started: Instant,
    flushed_secs: u64,
}

impl SessionClock {
    pub fn start() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started: Instant) -> Self {
        Self {
            started,
            flushed_secs: 0,
        }
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs_at(Instant::now())
    }

    pub fn elapsed_secs_at(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started).as_secs()
    }

    /// Seconds accounted for by previous ticks
    pub fn flushed_secs(&self) -> u64 {
        self.flushed_secs
    }

    pub fn tick(&mut self) -> u64 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> u64 {
        let elapsed = self.elapsed_secs_at(now);
        let delta = elapsed.saturating_sub(self.flushed_secs);
        self.flushed_secs = self.flushed_secs.max(elapsed);
        delta
    }
}
