#![forbid(unsafe_code)]

//! Scheduler configuration.
//!
//! Values can be set through builders or read from the environment:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `FRANKENRX_MAX_FRAMES` | Horizon past which `flush` leaves work queued (virtual time only) |
//! | `FRANKENRX_TRACE_ACTIONS` | `1`/`true`/`yes`/`on` enables per-action trace events |

use crate::error::ErrorSink;
use crate::scheduler::VirtualTime;

/// Environment variable holding the flush horizon.
pub const MAX_FRAMES_ENV: &str = "FRANKENRX_MAX_FRAMES";

/// Environment variable toggling per-action tracing.
pub const TRACE_ACTIONS_ENV: &str = "FRANKENRX_TRACE_ACTIONS";

/// Configuration shared by every scheduler kind.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Initial virtual time.
    pub start: VirtualTime,
    /// Work due after this tick is never run by a drain. Only honoured by
    /// [`VirtualTimeScheduler`](crate::scheduler::VirtualTimeScheduler); a
    /// `QueueScheduler` cannot be flushed later, so it runs everything.
    pub max_frames: Option<u64>,
    /// Emit a trace event for every queue, cancel, and run.
    pub trace_actions: bool,
    /// Where failed work and teardown faults are reported.
    pub error_sink: ErrorSink,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            start: VirtualTime::ZERO,
            max_frames: None,
            trace_actions: false,
            error_sink: ErrorSink::default(),
        }
    }
}

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl SchedulerConfig {
    /// Read overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read overrides through a custom environment lookup.
    ///
    /// Unparseable values are ignored and logged.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = get_env(MAX_FRAMES_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(max) => config.max_frames = Some(max),
                Err(err) => {
                    tracing::warn!(
                        value = %raw,
                        error = %err,
                        "ignoring invalid {}",
                        MAX_FRAMES_ENV
                    );
                }
            }
        }
        if let Some(raw) = get_env(TRACE_ACTIONS_ENV) {
            config.trace_actions = env_flag(&raw);
        }
        config
    }

    /// Set the initial virtual time.
    #[must_use]
    pub fn with_start(mut self, start: VirtualTime) -> Self {
        self.start = start;
        self
    }

    /// Set the flush horizon.
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Enable or disable per-action tracing.
    #[must_use]
    pub fn with_trace_actions(mut self, enabled: bool) -> Self {
        self.trace_actions = enabled;
        self
    }

    /// Route unhandled faults to `sink`.
    #[must_use]
    pub fn with_error_sink(mut self, sink: ErrorSink) -> Self {
        self.error_sink = sink;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn defaults_without_env() {
        let config = SchedulerConfig::from_env_with(|_| None);
        assert_eq!(config.start, VirtualTime::ZERO);
        assert_eq!(config.max_frames, None);
        assert!(!config.trace_actions);
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = SchedulerConfig::from_env_with(lookup(&[
            (MAX_FRAMES_ENV, " 750 "),
            (TRACE_ACTIONS_ENV, "Yes"),
        ]));
        assert_eq!(config.max_frames, Some(750));
        assert!(config.trace_actions);
    }

    #[test]
    fn invalid_max_frames_is_ignored() {
        let config = SchedulerConfig::from_env_with(lookup(&[
            (MAX_FRAMES_ENV, "lots"),
            (TRACE_ACTIONS_ENV, "off"),
        ]));
        assert_eq!(config.max_frames, None);
        assert!(!config.trace_actions);
    }

    #[test]
    fn builders_chain() {
        let config = SchedulerConfig::default()
            .with_start(VirtualTime::new(3))
            .with_max_frames(9)
            .with_trace_actions(true);
        assert_eq!(config.start, VirtualTime::new(3));
        assert_eq!(config.max_frames, Some(9));
        assert!(config.trace_actions);
    }
}
