//! The capture → analyze → present → clean up → sleep loop.
//!
//! [`CycleController`] runs one iteration at a time on the calling thread.
//! Errors are routed by [`Severity`]: fatal ones stop the loop, recoverable
//! ones become [`FALLBACK_SUGGESTION`], best-effort ones are only logged.
//! Cadence is start-to-start: the display time is subtracted from the
//! interval before sleeping.

use crate::clock::{Clock, StopSignal, SystemClock};
use crate::error::{Error, Result, Severity};
use crate::llm::Advisor;
use crate::notice::Notifier;
use crate::viewer::Viewer;
use nudgectl_capture::{Capturer, ImageArtifact};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Shown when the model could not be reached or answered garbage.
pub const FALLBACK_SUGGESTION: &str = "Error talking to AI. Check the console for details.";

/// Used when the user enters an empty goal.
pub const DEFAULT_GOAL: &str = "Help me figure out what to do next.";

pub const MIN_INTERVAL: Duration = Duration::from_millis(500);
pub const MIN_DISPLAY: Duration = Duration::from_millis(100);

/// Trim the user's goal, substituting [`DEFAULT_GOAL`] when it is empty.
pub fn resolve_goal(input: &str) -> String {
    let goal = input.trim();
    if goal.is_empty() {
        DEFAULT_GOAL.to_string()
    } else {
        goal.to_string()
    }
}

/// Immutable loop timing, fixed at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleConfig {
    interval: Duration,
    display_duration: Duration,
    max_cycles: Option<u64>,
}

impl CycleConfig {
    /// Build from user-facing units, raising values below the floors.
    pub fn new(interval_seconds: f64, display_ms: u64) -> Self {
        let interval = if interval_seconds.is_nan() || interval_seconds < MIN_INTERVAL.as_secs_f64()
        {
            warn!(
                "Interval {}s is below the {}s minimum, using the minimum",
                interval_seconds,
                MIN_INTERVAL.as_secs_f64()
            );
            MIN_INTERVAL
        } else {
            // Only overflow is left: huge or infinite intervals wait until stopped
            Duration::try_from_secs_f64(interval_seconds).unwrap_or(Duration::MAX)
        };

        let display_duration = Duration::from_millis(display_ms);
        let display_duration = if display_duration < MIN_DISPLAY {
            warn!(
                "Display time {}ms is below the {}ms minimum, using the minimum",
                display_ms,
                MIN_DISPLAY.as_millis()
            );
            MIN_DISPLAY
        } else {
            display_duration
        };

        Self {
            interval,
            display_duration,
            max_cycles: None,
        }
    }

    /// Stop cleanly after `max` complete cycles.
    pub fn with_max_cycles(mut self, max: Option<u64>) -> Self {
        self.max_cycles = max;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn display_duration(&self) -> Duration {
        self.display_duration
    }

    pub fn max_cycles(&self) -> Option<u64> {
        self.max_cycles
    }

    /// Sleep left after the display so captures start `interval` apart.
    pub fn sleep_after_display(&self) -> Duration {
        self.interval.saturating_sub(self.display_duration)
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self::new(5.0, 1000)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Capturing,
    Analyzing,
    Presenting,
    CleaningUp,
    Sleeping,
    Stopped,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleState::Idle => "idle",
            CycleState::Capturing => "capturing",
            CycleState::Analyzing => "analyzing",
            CycleState::Presenting => "presenting",
            CycleState::CleaningUp => "cleaning up",
            CycleState::Sleeping => "sleeping",
            CycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Why the loop ended without a fatal error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    CycleLimit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Cycles that reached the capture step.
    pub cycles: u64,
    pub reason: StopReason,
}

/// Observes state transitions of the loop.
pub trait CycleObserver {
    fn on_state(&self, _cycle: u64, _state: CycleState, _at: Instant) {}
    fn on_suggestion(&self, _cycle: u64, _suggestion: &str, _fallback: bool) {}
}

/// Default observer that does nothing
pub struct NoopObserver;

impl CycleObserver for NoopObserver {}

/// Drives the capture cycle until stopped.
pub struct CycleController<'a> {
    config: &'a CycleConfig,
    capturer: &'a dyn Capturer,
    advisor: &'a dyn Advisor,
    viewer: &'a Viewer,
    notifier: &'a dyn Notifier,
    stop: StopSignal,
    clock: &'a dyn Clock,
    observer: &'a dyn CycleObserver,
}

impl<'a> CycleController<'a> {
    pub fn new(
        config: &'a CycleConfig,
        capturer: &'a dyn Capturer,
        advisor: &'a dyn Advisor,
        viewer: &'a Viewer,
        notifier: &'a dyn Notifier,
        stop: StopSignal,
    ) -> Self {
        Self {
            config,
            capturer,
            advisor,
            viewer,
            notifier,
            stop,
            clock: &SystemClock,
            observer: &NoopObserver,
        }
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn CycleObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Run until interrupted, the cycle limit is hit, or a fatal error occurs.
    pub fn run(&self, goal: &str) -> Result<CycleOutcome> {
        let mut cycles = 0u64;
        self.enter(cycles, CycleState::Idle);

        loop {
            if self.stop.is_stopped() {
                return Ok(self.finish(cycles, StopReason::Interrupted));
            }
            if self.limit_reached(cycles) {
                return Ok(self.finish(cycles, StopReason::CycleLimit));
            }

            cycles += 1;
            if let Err(e) = self.run_cycle(cycles, goal) {
                self.enter(cycles, CycleState::Stopped);
                return Err(e);
            }

            if self.limit_reached(cycles) {
                return Ok(self.finish(cycles, StopReason::CycleLimit));
            }

            self.enter(cycles, CycleState::Sleeping);
            let pause = self.config.sleep_after_display();
            debug!("Cycle {} done, sleeping {:?}", cycles, pause);
            if self.clock.sleep_until_stopped(pause, &self.stop) {
                info!("Stop requested while sleeping");
                return Ok(self.finish(cycles, StopReason::Interrupted));
            }
        }
    }

    fn run_cycle(&self, cycle: u64, goal: &str) -> Result<()> {
        self.enter(cycle, CycleState::Capturing);
        let artifact = self.capturer.capture().map_err(|e| {
            error!("Screen capture failed: {}", e);
            Error::from(e)
        })?;
        debug!("Cycle {}: captured {}", cycle, artifact.path().display());

        self.enter(cycle, CycleState::Analyzing);
        let (suggestion, fallback) = match self.advisor.analyze(&artifact, goal) {
            Ok(suggestion) => {
                debug!("Suggestion: {}", suggestion);
                (suggestion, false)
            }
            Err(e) if e.severity() == Severity::Fatal => {
                error!("{}", e);
                self.clean_up(cycle, artifact);
                return Err(e);
            }
            Err(e) => {
                warn!("LLM request failed: {}", e);
                if let Some(payload) = e.payload() {
                    debug!("LLM response payload: {}", payload);
                }
                (FALLBACK_SUGGESTION.to_string(), true)
            }
        };
        self.observer.on_suggestion(cycle, &suggestion, fallback);

        self.enter(cycle, CycleState::Presenting);
        self.viewer
            .present(&artifact, self.config.display_duration(), self.clock);
        if let Err(e) = self.notifier.notify(&suggestion) {
            warn!("Failed to show suggestion: {}", e);
        }

        self.clean_up(cycle, artifact);
        Ok(())
    }

    fn clean_up(&self, cycle: u64, artifact: ImageArtifact) {
        self.enter(cycle, CycleState::CleaningUp);
        let path = artifact.path().to_path_buf();
        if let Err(e) = artifact.delete() {
            let err = Error::Cleanup(format!("{}: {}", path.display(), e));
            debug!("{}", err);
        }
    }

    fn limit_reached(&self, cycles: u64) -> bool {
        self.config.max_cycles().is_some_and(|max| cycles >= max)
    }

    fn finish(&self, cycles: u64, reason: StopReason) -> CycleOutcome {
        self.enter(cycles, CycleState::Stopped);
        CycleOutcome { cycles, reason }
    }

    fn enter(&self, cycle: u64, state: CycleState) {
        self.observer.on_state(cycle, state, self.clock.now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_below_the_floor_are_raised() {
        let config = CycleConfig::new(0.1, 10);
        assert_eq!(config.interval(), Duration::from_millis(500));
        assert_eq!(config.display_duration(), Duration::from_millis(100));
    }

    #[test]
    fn nonsense_intervals_use_the_floor() {
        assert_eq!(CycleConfig::new(f64::NAN, 1000).interval(), MIN_INTERVAL);
        assert_eq!(CycleConfig::new(-3.0, 1000).interval(), MIN_INTERVAL);
    }

    #[test]
    fn oversized_intervals_saturate_instead_of_hitting_the_floor() {
        assert_eq!(CycleConfig::new(f64::INFINITY, 1000).interval(), Duration::MAX);
        assert_eq!(CycleConfig::new(1e30, 1000).interval(), Duration::MAX);
        assert_eq!(CycleConfig::new(f64::NEG_INFINITY, 1000).interval(), MIN_INTERVAL);
        assert_eq!(CycleConfig::new(3600.0, 1000).interval(), Duration::from_secs(3600));
    }

    #[test]
    fn sleep_subtracts_display_time() {
        let config = CycleConfig::new(5.0, 1000);
        assert_eq!(config.sleep_after_display(), Duration::from_secs(4));
    }

    #[test]
    fn display_longer_than_interval_means_no_sleep() {
        let config = CycleConfig::new(1.0, 2500);
        assert_eq!(config.sleep_after_display(), Duration::ZERO);
    }

    #[test]
    fn default_matches_cli_defaults() {
        let config = CycleConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert_eq!(config.display_duration(), Duration::from_secs(1));
        assert_eq!(config.max_cycles(), None);
    }

    #[test]
    fn goal_is_trimmed_or_defaulted() {
        assert_eq!(resolve_goal("  win the game \n"), "win the game");
        assert_eq!(resolve_goal("   "), DEFAULT_GOAL);
    }
}
