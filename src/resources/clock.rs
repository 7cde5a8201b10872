//! Clock abstraction read by timers.
//!
//! A [`ClockSource`] supplies the current time in one of three bases plus a
//! frame counter. Timers never advance clocks themselves; the host does that
//! once per tick (see [`crate::systems::time::update_world_time`]).
//!
//! - [`TimeBasis`] – which reading a timer uses
//! - [`ManualClock`] – explicitly driven clock for tests and headless hosts
//!
//! The engine clock lives in [`crate::resources::worldtime::WorldTime`].

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

/// Which clock reading a timer follows.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimeBasis {
    /// Game time, affected by the clock's time scale (slow-mo, pause).
    #[default]
    Scalable,
    /// Game time that ignores the time scale.
    Unscaled,
    /// Wall-clock time since startup.
    Real,
}

impl TimeBasis {
    /// Name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeBasis::Scalable => "scalable",
            TimeBasis::Unscaled => "unscaled",
            TimeBasis::Real => "real",
        }
    }
}

impl fmt::Display for TimeBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scalable" | "scaled" | "game" => Ok(TimeBasis::Scalable),
            "unscaled" => Ok(TimeBasis::Unscaled),
            "real" | "realtime" => Ok(TimeBasis::Real),
            other => Err(format!("unknown time basis '{}'", other)),
        }
    }
}

/// Source of monotonic time readings.
///
/// Both readings must be non-decreasing within a basis. Implementations are
/// shared behind an `Rc` and read through `&self`, so they use interior
/// mutability if the host advances them.
pub trait ClockSource {
    /// Current time in seconds for the given basis.
    fn now(&self, basis: TimeBasis) -> f64;
    /// Number of frames (ticks) the host has completed.
    fn frame_count(&self) -> u64;
}

/// A clock whose readings are set by hand.
///
/// Every basis is stored independently; [`ManualClock::advance`] moves all
/// three by the same amount and bumps the frame counter, which is what a
/// simulated host tick looks like.
#[derive(Debug, Default)]
pub struct ManualClock {
    scalable: Cell<f64>,
    unscaled: Cell<f64>,
    real: Cell<f64>,
    frames: Cell<u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance every basis by `dt` seconds and count one frame.
    pub fn advance(&self, dt: f64) {
        self.scalable.set(self.scalable.get() + dt);
        self.unscaled.set(self.unscaled.get() + dt);
        self.real.set(self.real.get() + dt);
        self.frames.set(self.frames.get() + 1);
    }

    /// Advance a single basis without touching the others or the frame counter.
    pub fn advance_basis(&self, basis: TimeBasis, dt: f64) {
        let cell = self.cell(basis);
        cell.set(cell.get() + dt);
    }

    /// Overwrite the reading of one basis.
    pub fn set(&self, basis: TimeBasis, value: f64) {
        self.cell(basis).set(value);
    }

    fn cell(&self, basis: TimeBasis) -> &Cell<f64> {
        match basis {
            TimeBasis::Scalable => &self.scalable,
            TimeBasis::Unscaled => &self.unscaled,
            TimeBasis::Real => &self.real,
        }
    }
}

impl ClockSource for ManualClock {
    fn now(&self, basis: TimeBasis) -> f64 {
        self.cell(basis).get()
    }

    fn frame_count(&self) -> u64 {
        self.frames.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_basis_parse() {
        assert_eq!("scalable".parse::<TimeBasis>(), Ok(TimeBasis::Scalable));
        assert_eq!(" Real ".parse::<TimeBasis>(), Ok(TimeBasis::Real));
        assert_eq!("unscaled".parse::<TimeBasis>(), Ok(TimeBasis::Unscaled));
        assert!("fast".parse::<TimeBasis>().is_err());
    }

    #[test]
    fn test_time_basis_display_roundtrips() {
        for basis in [TimeBasis::Scalable, TimeBasis::Unscaled, TimeBasis::Real] {
            assert_eq!(basis.to_string().parse::<TimeBasis>(), Ok(basis));
        }
    }

    #[test]
    fn test_manual_clock_advance_moves_all_bases() {
        let clock = ManualClock::new();
        clock.advance(0.5);
        clock.advance(0.25);
        assert_eq!(clock.now(TimeBasis::Scalable), 0.75);
        assert_eq!(clock.now(TimeBasis::Unscaled), 0.75);
        assert_eq!(clock.now(TimeBasis::Real), 0.75);
        assert_eq!(clock.frame_count(), 2);
    }

    #[test]
    fn test_manual_clock_advance_basis_is_isolated() {
        let clock = ManualClock::new();
        clock.advance_basis(TimeBasis::Real, 3.0);
        assert_eq!(clock.now(TimeBasis::Real), 3.0);
        assert_eq!(clock.now(TimeBasis::Scalable), 0.0);
        assert_eq!(clock.frame_count(), 0);
    }
}
