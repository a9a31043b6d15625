//! Timer capability interface and the built-in `soft` timer

use crate::errors::{Result, SwitchError};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Name of the built-in timer
pub const SOFT_TIMER: &str = "soft";

/// Parameters a timer is started with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSpec {
    /// Time between ticks
    pub interval: Duration,
    /// Samples added to the running count per tick
    pub samples: u32,
}

/// A timer implementation
pub trait TimerInterface: Send + Sync {
    /// Registry name
    fn name(&self) -> &str;

    /// Start a timer ticking every `spec.interval`
    fn start(&self, spec: &TimerSpec) -> Result<Box<dyn TimerState>>;
}

/// State of one running timer
pub trait TimerState: Send {
    /// Block until the next tick
    fn next(&mut self) -> Result<()>;

    /// Release implementation resources
    fn destroy(&mut self) {}
}

/// A started timer
pub struct Timer {
    name: String,
    spec: TimerSpec,
    samplecount: u64,
    state: Option<Box<dyn TimerState>>,
}

impl Timer {
    /// Start `interface` with the given interval and samples per tick
    pub fn start(interface: &dyn TimerInterface, interval_ms: u32, samples: u32) -> Result<Self> {
        if interval_ms == 0 {
            return Err(SwitchError::config("timer interval must be at least 1 ms"));
        }
        let spec = TimerSpec {
            interval: Duration::from_millis(u64::from(interval_ms)),
            samples,
        };
        let state = interface.start(&spec)?;
        debug!(timer = interface.name(), interval_ms, samples, "Timer started");
        Ok(Self {
            name: interface.name().to_string(),
            spec,
            samplecount: 0,
            state: Some(state),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> TimerSpec {
        self.spec
    }

    /// Samples counted so far
    pub fn samplecount(&self) -> u64 {
        self.samplecount
    }

    /// Wait for the next tick; returns the updated sample count
    pub fn next(&mut self) -> Result<u64> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| SwitchError::failed(format!("timer {} was destroyed", self.name)))?;
        state.next()?;
        self.samplecount += u64::from(self.spec.samples);
        Ok(self.samplecount)
    }

    /// Stop the timer. Idempotent.
    pub fn destroy(&mut self) {
        if let Some(mut state) = self.state.take() {
            state.destroy();
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .field("samplecount", &self.samplecount)
            .finish()
    }
}

/// Sleep-based timer ticking on absolute deadlines, so jitter does not accumulate
#[derive(Debug, Default)]
pub struct SoftTimer;

impl TimerInterface for SoftTimer {
    fn name(&self) -> &str {
        SOFT_TIMER
    }

    fn start(&self, spec: &TimerSpec) -> Result<Box<dyn TimerState>> {
        Ok(Box::new(SoftTimerState {
            interval: spec.interval,
            deadline: Instant::now() + spec.interval,
        }))
    }
}

struct SoftTimerState {
    interval: Duration,
    deadline: Instant,
}

impl TimerState for SoftTimerState {
    fn next(&mut self) -> Result<()> {
        let now = Instant::now();
        if self.deadline > now {
            std::thread::sleep(self.deadline - now);
        }
        self.deadline += self.interval;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_timer_counts_samples() {
        let mut timer = Timer::start(&SoftTimer, 5, 40).unwrap();
        let started = Instant::now();

        assert_eq!(timer.next().unwrap(), 40);
        assert_eq!(timer.next().unwrap(), 80);
        assert_eq!(timer.next().unwrap(), 120);
        assert!(started.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_destroyed_timer_fails() {
        let mut timer = Timer::start(&SoftTimer, 1, 8).unwrap();
        timer.destroy();
        assert!(timer.next().is_err());
        assert_eq!(timer.samplecount(), 0);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(matches!(Timer::start(&SoftTimer, 0, 8), Err(SwitchError::Config(_))));
    }
}
