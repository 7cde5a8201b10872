//! Host simulation clock.
//!
//! [`WorldTime`] tracks scaled game time, unscaled game time, wall-clock time
//! since startup and a frame counter. It is shared behind an `Rc` between the
//! host loop and every timer, so all readings sit in `Cell`s and are advanced
//! through `&self`.
use std::cell::Cell;
use std::time::Instant;

use crate::resources::clock::{ClockSource, TimeBasis};

#[derive(Debug)]
pub struct WorldTime {
    elapsed: Cell<f64>,
    unscaled_elapsed: Cell<f64>,
    delta: Cell<f64>,
    time_scale: Cell<f64>,
    frame_count: Cell<u64>,
    startup: Instant,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: Cell::new(0.0),
            unscaled_elapsed: Cell::new(0.0),
            delta: Cell::new(0.0),
            time_scale: Cell::new(1.0),
            frame_count: Cell::new(0),
            startup: Instant::now(),
        }
    }
}

impl WorldTime {
    pub fn with_time_scale(self, time_scale: f64) -> Self {
        self.set_time_scale(time_scale);
        self
    }

    /// Advance by one frame of `dt` unscaled seconds.
    ///
    /// Scaled time moves by `dt * time_scale`, unscaled time by `dt`.
    pub fn advance(&self, dt: f64) {
        let dt = dt.max(0.0);
        let scaled_dt = dt * self.time_scale.get();
        self.elapsed.set(self.elapsed.get() + scaled_dt);
        self.unscaled_elapsed.set(self.unscaled_elapsed.get() + dt);
        self.delta.set(scaled_dt);
        self.frame_count.set(self.frame_count.get() + 1);
    }

    /// Scaled seconds since startup.
    pub fn elapsed(&self) -> f64 {
        self.elapsed.get()
    }

    /// Unscaled seconds since startup.
    pub fn unscaled_elapsed(&self) -> f64 {
        self.unscaled_elapsed.get()
    }

    /// Scaled delta of the last frame.
    pub fn delta(&self) -> f64 {
        self.delta.get()
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale.get()
    }

    /// Set the scale applied to future frames. Negative values clamp to zero.
    pub fn set_time_scale(&self, time_scale: f64) {
        self.time_scale.set(time_scale.max(0.0));
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count.get()
    }
}

impl ClockSource for WorldTime {
    fn now(&self, basis: TimeBasis) -> f64 {
        match basis {
            TimeBasis::Scalable => self.elapsed.get(),
            TimeBasis::Unscaled => self.unscaled_elapsed.get(),
            TimeBasis::Real => self.startup.elapsed().as_secs_f64(),
        }
    }

    fn frame_count(&self) -> u64 {
        self.frame_count.get()
    }
}
