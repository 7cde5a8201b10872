//! Firing policies.
//!
//! Each timer carries exactly one [`FiringPolicy`], which decides when the
//! timer completes and whether it re-arms afterwards. The update logic in
//! [`crate::components::timer`] dispatches on it with a plain `match`.
//!
//! | Policy       | Fires                          | Ends when                      |
//! |--------------|--------------------------------|--------------------------------|
//! | `Delay`      | once, after `duration` seconds | first fire                     |
//! | `DelayFrame` | once, after `duration` frames  | first fire                     |
//! | `Loop`       | every `duration` seconds       | cancelled                      |
//! | `LoopUntil`  | every `duration` seconds       | predicate returns `true`       |
//! | `LoopCount`  | every `duration` seconds       | `count` completions have fired |

use std::fmt;
use std::str::FromStr;

/// Public tag naming a timer's flavour.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Delay,
    DelayFrame,
    Loop,
    LoopUntil,
    LoopCount,
}

impl TimerKind {
    /// Whether the timer can complete more than once.
    pub fn is_looping(&self) -> bool {
        matches!(
            self,
            TimerKind::Loop | TimerKind::LoopUntil | TimerKind::LoopCount
        )
    }

    /// Whether the timer has an `on_finished` callback distinct from `on_complete`.
    pub fn has_finish(&self) -> bool {
        matches!(self, TimerKind::LoopUntil | TimerKind::LoopCount)
    }
}

/// How frame-delay timers measure frames.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FrameMode {
    /// Count `update` calls on the timer itself. Immune to how the host
    /// represents its frame counter.
    #[default]
    TickCount,
    /// Compare the clock's frame counter against `start + frames`, with a
    /// small tolerance.
    FrameCounter,
}

impl FrameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameMode::TickCount => "ticks",
            FrameMode::FrameCounter => "frames",
        }
    }
}

impl fmt::Display for FrameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ticks" | "tick_count" => Ok(FrameMode::TickCount),
            "frames" | "frame_counter" => Ok(FrameMode::FrameCounter),
            other => Err(format!("unknown frame mode '{}'", other)),
        }
    }
}

/// Tolerance used by [`FrameMode::FrameCounter`] when testing the fire frame.
pub const FRAME_EPSILON: f64 = 1e-4;

/// Per-variant policy state.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FiringPolicy {
    Delay,
    DelayFrame { mode: FrameMode, ticks: u64 },
    Loop { execute_on_start: bool },
    /// The predicate lives with the other callbacks so it can be taken out
    /// and called with the timer itself.
    LoopUntil { execute_on_start: bool },
    LoopCount { execute_on_start: bool, count: u32 },
}

impl FiringPolicy {
    pub fn kind(&self) -> TimerKind {
        match self {
            FiringPolicy::Delay => TimerKind::Delay,
            FiringPolicy::DelayFrame { .. } => TimerKind::DelayFrame,
            FiringPolicy::Loop { .. } => TimerKind::Loop,
            FiringPolicy::LoopUntil { .. } => TimerKind::LoopUntil,
            FiringPolicy::LoopCount { .. } => TimerKind::LoopCount,
        }
    }

    pub fn execute_on_start(&self) -> bool {
        match self {
            FiringPolicy::Loop { execute_on_start }
            | FiringPolicy::LoopUntil { execute_on_start }
            | FiringPolicy::LoopCount {
                execute_on_start, ..
            } => *execute_on_start,
            FiringPolicy::Delay | FiringPolicy::DelayFrame { .. } => false,
        }
    }

    /// Change `execute_on_start`. Ignored by the delay variants.
    pub fn set_execute_on_start(&mut self, value: bool) {
        match self {
            FiringPolicy::Loop { execute_on_start }
            | FiringPolicy::LoopUntil { execute_on_start }
            | FiringPolicy::LoopCount {
                execute_on_start, ..
            } => *execute_on_start = value,
            FiringPolicy::Delay | FiringPolicy::DelayFrame { .. } => {}
        }
    }

    /// Target count for `LoopCount`.
    pub fn count(&self) -> Option<u32> {
        match self {
            FiringPolicy::LoopCount { count, .. } => Some(*count),
            _ => None,
        }
    }

    /// Frames counted so far by a `TickCount` frame delay.
    pub fn ticks(&self) -> Option<u64> {
        match self {
            FiringPolicy::DelayFrame {
                mode: FrameMode::TickCount,
                ticks,
            } => Some(*ticks),
            _ => None,
        }
    }

    /// Clear per-run counters.
    pub fn reset(&mut self) {
        if let FiringPolicy::DelayFrame { ticks, .. } = self {
            *ticks = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(FiringPolicy::Delay.kind(), TimerKind::Delay);
        assert_eq!(
            FiringPolicy::LoopCount {
                execute_on_start: false,
                count: 3
            }
            .kind(),
            TimerKind::LoopCount
        );
        assert!(TimerKind::LoopUntil.is_looping());
        assert!(!TimerKind::DelayFrame.is_looping());
        assert!(TimerKind::LoopCount.has_finish());
        assert!(!TimerKind::Loop.has_finish());
    }

    #[test]
    fn test_execute_on_start_ignored_for_delays() {
        let mut policy = FiringPolicy::Delay;
        policy.set_execute_on_start(true);
        assert!(!policy.execute_on_start());

        let mut policy = FiringPolicy::Loop {
            execute_on_start: false,
        };
        policy.set_execute_on_start(true);
        assert!(policy.execute_on_start());
    }

    #[test]
    fn test_reset_clears_tick_counter() {
        let mut policy = FiringPolicy::DelayFrame {
            mode: FrameMode::TickCount,
            ticks: 7,
        };
        policy.reset();
        assert_eq!(policy.ticks(), Some(0));
    }

    #[test]
    fn test_frame_mode_parse() {
        assert_eq!("ticks".parse::<FrameMode>(), Ok(FrameMode::TickCount));
        assert_eq!("Frames".parse::<FrameMode>(), Ok(FrameMode::FrameCounter));
        assert!("both".parse::<FrameMode>().is_err());
    }
}
