//! Timer manager resource.
//!
//! The [`TimerManager`] owns every registered [`Timer`] and advances them once
//! per host tick. Timers live in two categories:
//!
//! - **ordinary** timers, affected by [`TimerManager::cancel_all`],
//!   [`TimerManager::pause_all`] and [`TimerManager::resume_all`];
//! - **persistent** timers, which ignore those bulk operations (think of
//!   timers that must survive a scene reset).
//!
//! Each category keeps a live set plus a pending buffer. New and restarted
//! timers land in the pending buffer and join the live set at the start of
//! the next [`TimerManager::advance`], so a callback that schedules a timer
//! mid-tick never disturbs the traversal in progress. The new timer is first
//! updated on the following tick.
//!
//! # Tick order
//!
//! 1. drain both pending buffers into their live sets
//! 2. ordinary: update every live timer in insertion order, reap the ones
//!    that are done
//! 3. persistent: same
//!
//! # Usage
//!
//! ```ignore
//! let clock = Rc::new(WorldTime::default());
//! let manager = TimerManager::new(clock.clone());
//! manager.delay(1.5).on_complete(|_| log::info!("ding")).start();
//! loop {
//!     clock.advance(frame_dt);
//!     manager.advance();
//! }
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, warn};
use smallvec::SmallVec;

use crate::components::builder::TimerBuilder;
use crate::components::owner::OwnerHandle;
use crate::components::policy::{FiringPolicy, FrameMode};
use crate::components::timer::Timer;
use crate::resources::clock::{ClockSource, TimeBasis};
use crate::resources::timerconfig::TimerConfig;

type PendingTimers = SmallVec<[Timer; 8]>;

#[derive(Default)]
struct TimerSet {
    live: RefCell<Vec<Timer>>,
    pending: RefCell<PendingTimers>,
    /// Set while the live set is being walked.
    walking: Cell<bool>,
}

impl TimerSet {
    fn snapshot(&self) -> Vec<Timer> {
        let mut timers = self.live.borrow().clone();
        timers.extend(self.pending.borrow().iter().cloned());
        timers
    }

    fn len(&self) -> usize {
        self.live.borrow().len() + self.pending.borrow().len()
    }
}

pub(crate) struct ManagerShared {
    clock: Rc<dyn ClockSource>,
    default_basis: TimeBasis,
    frame_mode: FrameMode,
    ordinary: TimerSet,
    persistent: TimerSet,
    advancing: Cell<bool>,
}

/// Raises a flag for its lifetime, clearing it even if a tick unwinds.
struct FlagGuard<'a>(&'a Cell<bool>);

impl<'a> FlagGuard<'a> {
    fn raise(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        FlagGuard(flag)
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Shared handle to the timer registry. Clones refer to the same manager.
#[derive(Clone)]
pub struct TimerManager(Rc<ManagerShared>);

impl TimerManager {
    /// Create a manager reading time from `clock`.
    pub fn new(clock: Rc<dyn ClockSource>) -> Self {
        Self::with_config(clock, &TimerConfig::default())
    }

    /// Create a manager whose factories use the defaults in `config`.
    pub fn with_config(clock: Rc<dyn ClockSource>, config: &TimerConfig) -> Self {
        TimerManager(Rc::new(ManagerShared {
            clock,
            default_basis: config.default_basis,
            frame_mode: config.frame_mode,
            ordinary: TimerSet::default(),
            persistent: TimerSet::default(),
            advancing: Cell::new(false),
        }))
    }

    pub(crate) fn from_shared(shared: Rc<ManagerShared>) -> Self {
        TimerManager(shared)
    }

    pub(crate) fn downgrade(&self) -> Weak<ManagerShared> {
        Rc::downgrade(&self.0)
    }

    pub fn clock(&self) -> Rc<dyn ClockSource> {
        Rc::clone(&self.0.clock)
    }

    pub fn default_basis(&self) -> TimeBasis {
        self.0.default_basis
    }

    fn set_for(&self, persistent: bool) -> &TimerSet {
        if persistent {
            &self.0.persistent
        } else {
            &self.0.ordinary
        }
    }

    // ==================== FACTORIES ====================

    /// One-shot timer firing after `duration` seconds.
    pub fn delay(&self, duration: f64) -> TimerBuilder {
        TimerBuilder::new(self, duration, FiringPolicy::Delay)
    }

    /// One-shot timer firing after `frames` ticks.
    pub fn delay_frames(&self, frames: u32) -> TimerBuilder {
        TimerBuilder::new(
            self,
            frames as f64,
            FiringPolicy::DelayFrame {
                mode: self.0.frame_mode,
                ticks: 0,
            },
        )
    }

    /// Timer firing every `interval` seconds until cancelled.
    pub fn looping(&self, interval: f64) -> TimerBuilder {
        TimerBuilder::new(
            self,
            interval,
            FiringPolicy::Loop {
                execute_on_start: false,
            },
        )
    }

    /// Timer firing every `interval` seconds until `until` returns `true`.
    ///
    /// The predicate runs after every single completion, including each one
    /// of a multi-interval catch-up.
    pub fn loop_until(
        &self,
        interval: f64,
        until: impl FnMut(&Timer) -> bool + 'static,
    ) -> TimerBuilder {
        TimerBuilder::new(
            self,
            interval,
            FiringPolicy::LoopUntil {
                execute_on_start: false,
            },
        )
        .with_loop_until(Box::new(until))
    }

    /// Timer firing every `interval` seconds, `count` times.
    pub fn loop_count(&self, interval: f64, count: u32) -> TimerBuilder {
        TimerBuilder::new(
            self,
            interval,
            FiringPolicy::LoopCount {
                execute_on_start: false,
                count,
            },
        )
    }

    // ==================== REGISTRATION ====================

    /// Queue a timer for the next tick. No-op if it is already tracked.
    pub fn register(&self, timer: &Timer) {
        if timer.is_tracked() {
            return;
        }
        if !timer.belongs_to(&self.0) {
            warn!("[TimerManager] registering a timer created by another manager");
        }
        timer.set_tracked(true);
        self.set_for(timer.is_persistent())
            .pending
            .borrow_mut()
            .push(timer.clone());
        debug!(
            "[TimerManager] registered {:?} timer (persistent={})",
            timer.kind(),
            timer.is_persistent()
        );
    }

    /// Whether the timer is currently pending or live in this manager.
    pub fn is_tracked(&self, timer: &Timer) -> bool {
        timer.is_tracked()
            && [&self.0.ordinary, &self.0.persistent].iter().any(|set| {
                set.live.borrow().iter().any(|t| t.ptr_eq(timer))
                    || set.pending.borrow().iter().any(|t| t.ptr_eq(timer))
            })
    }

    /// Timers tracked in both categories, pending included.
    pub fn len(&self) -> usize {
        self.0.ordinary.len() + self.0.persistent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timers waiting to join a live set on the next tick.
    pub fn pending_len(&self) -> usize {
        self.0.ordinary.pending.borrow().len() + self.0.persistent.pending.borrow().len()
    }

    // ==================== TICK ====================

    /// Advance every live timer by one tick. Call once per host frame.
    pub fn advance(&self) {
        if self.0.advancing.replace(true) {
            warn!("[TimerManager] advance() called from inside a timer callback; ignored");
            return;
        }
        let _guard = FlagGuard(&self.0.advancing);
        for set in [&self.0.ordinary, &self.0.persistent] {
            let arrivals = std::mem::take(&mut *set.pending.borrow_mut());
            set.live.borrow_mut().extend(arrivals);
        }
        Self::advance_set(&self.0.ordinary);
        Self::advance_set(&self.0.persistent);
    }

    fn advance_set(set: &TimerSet) {
        let walking = FlagGuard::raise(&set.walking);

        // Entries are only appended through `pending` and only unlinked
        // below, so indices stay stable for the whole walk.
        let mut index = 0;
        loop {
            let next = set.live.borrow().get(index).cloned();
            let Some(timer) = next else {
                break;
            };
            timer.update();
            index += 1;
        }
        drop(walking);

        let live = std::mem::take(&mut *set.live.borrow_mut());
        let (kept, reaped): (Vec<Timer>, Vec<Timer>) =
            live.into_iter().partition(|timer| !timer.is_done());
        for timer in &reaped {
            timer.set_tracked(false);
        }
        if !reaped.is_empty() {
            debug!("[TimerManager] reaped {} finished timer(s)", reaped.len());
        }
        *set.live.borrow_mut() = kept;
    }

    // ==================== BULK CONTROL ====================

    /// Cancel every ordinary timer. Persistent timers keep running.
    pub fn cancel_all(&self) {
        let set = &self.0.ordinary;
        for timer in set.snapshot() {
            timer.cancel();
        }
        self.untrack(set, |_| true);
    }

    /// Pause every ordinary timer. Persistent timers keep running.
    pub fn pause_all(&self) {
        for timer in self.0.ordinary.snapshot() {
            timer.pause();
        }
    }

    /// Resume every ordinary timer.
    pub fn resume_all(&self) {
        for timer in self.0.ordinary.snapshot() {
            timer.resume();
        }
    }

    /// Cancel every timer bound to `owner`, persistent ones included.
    pub fn cancel_all_by_owner(&self, owner: &OwnerHandle) {
        let owned = |timer: &Timer| timer.owner().is_some_and(|o| o.same_owner(owner));
        for set in [&self.0.ordinary, &self.0.persistent] {
            for timer in set.snapshot().iter().filter(|t| owned(t)) {
                timer.cancel();
            }
            self.untrack(set, owned);
        }
    }

    /// Unlink matching timers. A live set that is being walked is left to its
    /// reap pass, which drops the now-cancelled entries itself.
    fn untrack(&self, set: &TimerSet, matches: impl Fn(&Timer) -> bool) {
        let detach = |timer: &Timer| {
            if matches(timer) {
                timer.set_tracked(false);
                false
            } else {
                true
            }
        };
        set.pending.borrow_mut().retain(|timer| detach(timer));
        if !set.walking.get() {
            set.live.borrow_mut().retain(|timer| detach(timer));
        }
    }
}

impl std::fmt::Debug for TimerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerManager")
            .field("ordinary", &self.0.ordinary.len())
            .field("persistent", &self.0.persistent.len())
            .field("pending", &self.pending_len())
            .field("default_basis", &self.0.default_basis)
            .field("frame_mode", &self.0.frame_mode)
            .finish()
    }
}
