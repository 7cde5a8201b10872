//! Timer construction and restart parameters.
//!
//! [`TimerBuilder`] is returned by the factory methods on
//! [`TimerManager`](crate::resources::timermanager::TimerManager) and collects
//! the optional parameters before [`TimerBuilder::start`] registers the timer.
//!
//! ```ignore
//! let blink = manager
//!     .looping(0.5)
//!     .on_complete(|n| log::info!("blink #{}", n))
//!     .basis(TimeBasis::Unscaled)
//!     .execute_on_start()
//!     .start();
//! ```
//!
//! [`Restart`] carries the parameters a restart may swap in one step.

use log::debug;

use crate::components::callbacks::{Callbacks, LoopUntil, OnComplete, OnFinished, OnUpdate};
use crate::components::owner::OwnerHandle;
use crate::components::policy::{FiringPolicy, FrameMode, TimerKind};
use crate::components::timer::{Timer, TimerSetup};
use crate::resources::clock::TimeBasis;
use crate::resources::timermanager::TimerManager;

/// Optional-parameter factory for one timer.
#[must_use = "a timer is only scheduled once `start()` is called"]
pub struct TimerBuilder {
    manager: TimerManager,
    duration: f64,
    basis: TimeBasis,
    policy: FiringPolicy,
    callbacks: Callbacks,
    persistent: bool,
    owner: Option<OwnerHandle>,
}

impl TimerBuilder {
    pub(crate) fn new(manager: &TimerManager, duration: f64, policy: FiringPolicy) -> Self {
        TimerBuilder {
            basis: manager.default_basis(),
            manager: manager.clone(),
            duration,
            policy,
            callbacks: Callbacks::default(),
            persistent: false,
            owner: None,
        }
    }

    pub(crate) fn with_loop_until(mut self, loop_until: LoopUntil) -> Self {
        self.callbacks.loop_until = Some(loop_until);
        self
    }

    pub fn kind(&self) -> TimerKind {
        self.policy.kind()
    }

    /// Called every unpaused tick with the elapsed time of the current cycle.
    pub fn on_update(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.callbacks.on_update = Some(Box::new(f));
        self
    }

    /// Called on every completion with the 1-based completion count.
    pub fn on_complete(mut self, f: impl FnMut(u32) + 'static) -> Self {
        self.callbacks.on_complete = Some(Box::new(f));
        self
    }

    /// Called once when a loop-until or loop-count timer reaches its end.
    /// Ignored by other kinds.
    pub fn on_finished(mut self, f: impl FnMut() + 'static) -> Self {
        self.callbacks.on_finished = Some(Box::new(f));
        self
    }

    /// Clock reading to follow. Frame delays ignore this.
    pub fn basis(mut self, basis: TimeBasis) -> Self {
        self.basis = basis;
        self
    }

    /// Shorthand for `basis(TimeBasis::Real)`.
    pub fn real_time(self) -> Self {
        self.basis(TimeBasis::Real)
    }

    /// How a frame delay counts frames. Ignored by other kinds.
    pub fn frame_mode(mut self, frame_mode: FrameMode) -> Self {
        if let FiringPolicy::DelayFrame { mode, .. } = &mut self.policy {
            *mode = frame_mode;
        }
        self
    }

    /// Fire the first completion immediately on start. Loops only.
    pub fn execute_on_start(mut self) -> Self {
        self.policy.set_execute_on_start(true);
        self
    }

    /// Keep this timer out of the manager's cancel/pause/resume-all.
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// End this timer when the owner is destroyed.
    pub fn owner(mut self, owner: OwnerHandle) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Register the timer with the manager.
    ///
    /// A non-positive or NaN duration (or a zero count) is a request to fire
    /// right away: the callbacks run synchronously and no timer is returned.
    pub fn start(self) -> Option<Timer> {
        let TimerBuilder {
            manager,
            duration,
            basis,
            policy,
            callbacks,
            persistent,
            owner,
        } = self;
        let kind = policy.kind();
        let degenerate = duration.is_nan() || duration <= 0.0 || policy.count() == Some(0);
        let timer = Timer::new(
            &manager,
            TimerSetup {
                duration,
                basis,
                policy,
                callbacks,
                persistent,
                owner,
            },
        );

        if degenerate {
            debug!(
                "[Timer] {:?} with duration {} fires immediately",
                kind, duration
            );
            timer.complete_degenerate();
            return None;
        }

        manager.register(&timer);
        timer.fire_on_start();
        Some(timer)
    }
}

/// Parameters swapped in by [`Timer::restart_with`].
///
/// Unset fields keep their current value. `count` only applies to loop-count
/// timers and `loop_until` only to loop-until timers; a loop-count timer's
/// end condition is its counter and cannot be replaced.
#[derive(Default)]
#[must_use]
pub struct Restart {
    pub(crate) duration: Option<f64>,
    pub(crate) basis: Option<TimeBasis>,
    pub(crate) execute_on_start: Option<bool>,
    pub(crate) count: Option<u32>,
    pub(crate) on_update: Option<OnUpdate>,
    pub(crate) on_complete: Option<OnComplete>,
    pub(crate) on_finished: Option<OnFinished>,
    pub(crate) loop_until: Option<LoopUntil>,
}

impl Restart {
    pub fn new() -> Self {
        Self::default()
    }

    /// New duration (seconds) or interval.
    pub fn duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// New frame count for frame delays.
    pub fn frames(mut self, frames: u32) -> Self {
        self.duration = Some(frames as f64);
        self
    }

    pub fn basis(mut self, basis: TimeBasis) -> Self {
        self.basis = Some(basis);
        self
    }

    pub fn execute_on_start(mut self, execute_on_start: bool) -> Self {
        self.execute_on_start = Some(execute_on_start);
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn on_update(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnMut(u32) + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn on_finished(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_finished = Some(Box::new(f));
        self
    }

    pub fn loop_until(mut self, f: impl FnMut(&Timer) -> bool + 'static) -> Self {
        self.loop_until = Some(Box::new(f));
        self
    }
}
