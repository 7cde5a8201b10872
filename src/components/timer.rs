//! Timer state machine.
//!
//! A [`Timer`] is a cheap, cloneable handle to one scheduled action. The
//! [`TimerManager`](crate::resources::timermanager::TimerManager) keeps a clone
//! in its live set and calls [`Timer::update`] once per tick; user code keeps
//! another clone to query progress or to pause, resume, cancel and restart.
//!
//! # States
//!
//! A timer is `Running`, `Completed` or `Cancelled`. Pausing is a flag on a
//! running timer, and owner destruction is detected lazily the first time it
//! is observed and then latched. A timer is *done* when it is completed,
//! cancelled, or its owner is gone; a done timer never resumes unless it is
//! explicitly restarted.
//!
//! # Elapsed time
//!
//! [`Timer::elapsed`] answers, in order of precedence:
//!
//! 1. the full duration when completed,
//! 2. the elapsed value frozen at cancellation,
//! 3. the elapsed value frozen at pause,
//! 4. the elapsed value frozen when the owner was found destroyed,
//! 5. `now - start_time` from the clock.
//!
//! Resuming re-bases `start_time` so elapsed picks up exactly where the pause
//! froze it, whenever in a tick either call happens.
//!
//! # Re-entrancy
//!
//! Callbacks run with no internal borrow held. They may freely query or
//! mutate their own timer (cancel it, restart it, read `loop_times()`) and may
//! register new timers.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use log::{debug, warn};

use crate::components::builder::Restart;
use crate::components::callbacks::{CallbackKind, Callbacks, safe_call};
use crate::components::owner::OwnerHandle;
use crate::components::policy::{FRAME_EPSILON, FiringPolicy, FrameMode, TimerKind};
use crate::resources::clock::{ClockSource, TimeBasis};
use crate::resources::timermanager::{ManagerShared, TimerManager};

/// Completions a loop may fire in one tick before the rest is left for the
/// following ticks.
pub const MAX_CATCH_UP: u32 = 10_000;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Completion {
    Running,
    Completed,
    Cancelled { elapsed: f64 },
}

#[derive(Debug)]
struct TimerState {
    duration: f64,
    basis: TimeBasis,
    policy: FiringPolicy,
    completion: Completion,
    paused_at: Option<f64>,
    owner_destroyed_at: Option<f64>,
    start_time: f64,
    loop_times: u32,
    /// Bumped on every restart so in-flight firing loops can notice.
    epoch: u64,
}

impl TimerState {
    fn now(&self, clock: &dyn ClockSource) -> f64 {
        if let Some(ticks) = self.policy.ticks() {
            return ticks as f64;
        }
        match self.policy {
            FiringPolicy::DelayFrame { .. } => clock.frame_count() as f64,
            _ => clock.now(self.basis),
        }
    }

    fn fire_time(&self) -> f64 {
        self.start_time + self.duration
    }

    fn elapsed(&self, clock: &dyn ClockSource) -> f64 {
        match self.completion {
            Completion::Completed => self.duration,
            Completion::Cancelled { elapsed } => elapsed,
            Completion::Running => self
                .paused_at
                .or(self.owner_destroyed_at)
                .unwrap_or_else(|| self.now(clock) - self.start_time),
        }
    }

    fn rearm(&mut self, clock: &dyn ClockSource) {
        self.completion = Completion::Running;
        self.paused_at = None;
        self.owner_destroyed_at = None;
        self.loop_times = 0;
        self.policy.reset();
        self.start_time = self.now(clock);
        self.epoch += 1;
    }
}

/// Everything needed to build a timer; produced by
/// [`TimerBuilder`](crate::components::builder::TimerBuilder).
pub(crate) struct TimerSetup {
    pub duration: f64,
    pub basis: TimeBasis,
    pub policy: FiringPolicy,
    pub callbacks: Callbacks,
    pub persistent: bool,
    pub owner: Option<OwnerHandle>,
}

struct TimerInner {
    state: RefCell<TimerState>,
    callbacks: RefCell<Callbacks>,
    clock: Rc<dyn ClockSource>,
    manager: Weak<ManagerShared>,
    owner: Option<OwnerHandle>,
    persistent: bool,
    tracked: Cell<bool>,
}

/// Handle to a scheduled action.
///
/// Clones share the same timer. Equality is identity.
#[derive(Clone)]
pub struct Timer(Rc<TimerInner>);

impl Timer {
    pub(crate) fn new(manager: &TimerManager, setup: TimerSetup) -> Self {
        let clock = manager.clock();
        let mut state = TimerState {
            duration: setup.duration,
            basis: setup.basis,
            policy: setup.policy,
            completion: Completion::Running,
            paused_at: None,
            owner_destroyed_at: None,
            start_time: 0.0,
            loop_times: 0,
            epoch: 0,
        };
        state.start_time = state.now(&*clock);

        Timer(Rc::new(TimerInner {
            state: RefCell::new(state),
            callbacks: RefCell::new(setup.callbacks),
            clock,
            manager: manager.downgrade(),
            owner: setup.owner,
            persistent: setup.persistent,
            tracked: Cell::new(false),
        }))
    }

    // ==================== QUERIES ====================

    pub fn kind(&self) -> TimerKind {
        self.0.state.borrow().policy.kind()
    }

    /// Length of one cycle: seconds, or frames for frame delays.
    pub fn duration(&self) -> f64 {
        self.0.state.borrow().duration
    }

    pub fn basis(&self) -> TimeBasis {
        self.0.state.borrow().basis
    }

    /// Persistent timers ignore the manager's cancel/pause/resume-all.
    pub fn is_persistent(&self) -> bool {
        self.0.persistent
    }

    pub fn owner(&self) -> Option<&OwnerHandle> {
        self.0.owner.as_ref()
    }

    /// Completions fired since the last (re)start.
    pub fn loop_times(&self) -> u32 {
        self.0.state.borrow().loop_times
    }

    /// Target completions for loop-count timers.
    pub fn count(&self) -> Option<u32> {
        self.0.state.borrow().policy.count()
    }

    pub fn execute_on_start(&self) -> bool {
        self.0.state.borrow().policy.execute_on_start()
    }

    pub fn is_paused(&self) -> bool {
        self.0.state.borrow().paused_at.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.0.state.borrow().completion,
            Completion::Cancelled { .. }
        )
    }

    /// True only when the timer ran to completion; false when cancelled.
    pub fn is_completed(&self) -> bool {
        self.0.state.borrow().completion == Completion::Completed
    }

    /// Whether the owner has been destroyed.
    ///
    /// The first `false` liveness answer is latched together with the elapsed
    /// time at that moment.
    pub fn is_owner_destroyed(&self) -> bool {
        let Some(owner) = &self.0.owner else {
            return false;
        };
        if self.0.state.borrow().owner_destroyed_at.is_some() {
            return true;
        }
        if owner.is_alive() {
            return false;
        }
        let mut state = self.0.state.borrow_mut();
        let elapsed = state.elapsed(&*self.0.clock);
        state.owner_destroyed_at = Some(elapsed);
        debug!("[Timer] owner destroyed at elapsed {:.4}", elapsed);
        true
    }

    /// Completed, cancelled, or owner destroyed.
    pub fn is_done(&self) -> bool {
        let finished = self.0.state.borrow().completion != Completion::Running;
        finished || self.is_owner_destroyed()
    }

    /// Time elapsed in the current cycle. See the module docs for precedence.
    pub fn elapsed(&self) -> f64 {
        self.0.state.borrow().elapsed(&*self.0.clock)
    }

    /// `duration - elapsed`. Not clamped.
    pub fn remaining(&self) -> f64 {
        self.duration() - self.elapsed()
    }

    /// `elapsed / duration`. Not clamped; may exceed 1 right after firing.
    pub fn ratio_complete(&self) -> f64 {
        self.elapsed() / self.duration()
    }

    pub fn ratio_remaining(&self) -> f64 {
        1.0 - self.ratio_complete()
    }

    /// True when both handles point at the same timer.
    pub fn ptr_eq(&self, other: &Timer) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ==================== CONTROL ====================

    /// Freeze elapsed time. No-op if already paused or done.
    pub fn pause(&self) {
        if self.is_paused() || self.is_done() {
            return;
        }
        let mut state = self.0.state.borrow_mut();
        let elapsed = state.elapsed(&*self.0.clock);
        state.paused_at = Some(elapsed);
    }

    /// Continue from where [`pause`](Self::pause) left off. No-op if not
    /// paused or done.
    pub fn resume(&self) {
        if !self.is_paused() || self.is_done() {
            return;
        }
        let mut state = self.0.state.borrow_mut();
        if let Some(paused_at) = state.paused_at.take() {
            state.start_time = state.now(&*self.0.clock) - paused_at;
        }
    }

    /// Stop the timer without firing completion. The elapsed value at this
    /// moment stays frozen. No-op if already done.
    pub fn cancel(&self) {
        if self.is_done() {
            return;
        }
        let mut state = self.0.state.borrow_mut();
        let elapsed = state.elapsed(&*self.0.clock);
        state.completion = Completion::Cancelled { elapsed };
        state.paused_at = None;
    }

    /// Start over from zero with the current parameters.
    ///
    /// Works on running and done timers alike and re-registers with the
    /// manager when needed. No-op once the owner is destroyed.
    pub fn restart(&self) {
        self.restart_with(Restart::new());
    }

    /// Start over, swapping any parameters set on `params` in the same step.
    pub fn restart_with(&self, params: Restart) {
        if self.is_owner_destroyed() {
            debug!("[Timer] restart ignored, owner destroyed");
            return;
        }
        let kind = self.kind();
        let Restart {
            duration,
            basis,
            execute_on_start,
            count,
            on_update,
            on_complete,
            on_finished,
            loop_until,
        } = params;

        {
            let mut state = self.0.state.borrow_mut();
            if let Some(duration) = duration {
                state.duration = duration;
            }
            if let Some(basis) = basis {
                state.basis = basis;
            }
            if let Some(value) = execute_on_start {
                state.policy.set_execute_on_start(value);
            }
            if let Some(new_count) = count {
                match &mut state.policy {
                    FiringPolicy::LoopCount { count, .. } => *count = new_count,
                    _ => debug!("[Timer] count ignored on restart of {:?} timer", kind),
                }
            }
            state.rearm(&*self.0.clock);
        }

        {
            let mut callbacks = self.0.callbacks.borrow_mut();
            let mut replaced = false;
            if let Some(f) = on_update {
                callbacks.on_update = Some(f);
                replaced = true;
            }
            if let Some(f) = on_complete {
                callbacks.on_complete = Some(f);
                replaced = true;
            }
            if let Some(f) = on_finished {
                callbacks.on_finished = Some(f);
                replaced = true;
            }
            if let Some(f) = loop_until {
                // loop-count keeps its own counter-based condition
                if kind == TimerKind::LoopUntil {
                    callbacks.loop_until = Some(f);
                    replaced = true;
                } else {
                    debug!("[Timer] loop_until ignored on restart of {:?} timer", kind);
                }
            }
            if replaced {
                callbacks.revision += 1;
            }
        }

        let (duration, count) = {
            let state = self.0.state.borrow();
            (state.duration, state.policy.count())
        };
        if duration.is_nan() || duration <= 0.0 || count == Some(0) {
            debug!("[Timer] degenerate restart of {:?} timer, firing now", kind);
            self.complete_degenerate();
            return;
        }

        match self.0.manager.upgrade() {
            Some(shared) => TimerManager::from_shared(shared).register(self),
            None => debug!("[Timer] restart without a manager, timer will not tick"),
        }

        if self.execute_on_start() {
            self.complete_cycle();
        }
    }

    // ==================== MANAGER HOOKS ====================

    pub(crate) fn is_tracked(&self) -> bool {
        self.0.tracked.get()
    }

    pub(crate) fn set_tracked(&self, tracked: bool) {
        self.0.tracked.set(tracked);
    }

    pub(crate) fn belongs_to(&self, shared: &Rc<ManagerShared>) -> bool {
        std::ptr::eq(self.0.manager.as_ptr(), Rc::as_ptr(shared))
    }

    /// Fire the first completion right away when `execute_on_start` is set.
    pub(crate) fn fire_on_start(&self) {
        if self.execute_on_start() && !self.is_done() {
            self.complete_cycle();
        }
    }

    /// Finish a timer whose duration or count leaves nothing to wait for.
    ///
    /// Non-positive durations fire update(0) and one completion; a zero
    /// count fires only the finish callback.
    pub(crate) fn complete_degenerate(&self) {
        let kind = self.kind();
        let zero_count = {
            let mut state = self.0.state.borrow_mut();
            state.completion = Completion::Completed;
            let zero_count = state.duration > 0.0 && state.policy.count() == Some(0);
            if !zero_count {
                state.loop_times = 1;
            }
            zero_count
        };
        if !zero_count {
            self.call_update(0.0);
            self.call_complete(1);
        }
        if kind.has_finish() {
            self.call_finished();
        }
    }

    /// Advance by one tick: skip while paused, run on-update, then apply the
    /// firing policy. Called by the manager only.
    pub(crate) fn update(&self) {
        if self.is_done() {
            return;
        }

        {
            let mut state = self.0.state.borrow_mut();
            if state.paused_at.is_some() {
                return;
            }
            if let FiringPolicy::DelayFrame {
                mode: FrameMode::TickCount,
                ticks,
            } = &mut state.policy
            {
                *ticks += 1;
            }
        }

        let elapsed = self.elapsed();
        self.call_update(elapsed);
        if self.is_done() || self.is_paused() {
            return;
        }

        if self.kind().is_looping() {
            self.fire_loops();
        } else {
            self.fire_if_due();
        }
    }

    // ==================== FIRING ====================

    fn fire_if_due(&self) {
        let due = {
            let state = self.0.state.borrow();
            let now = state.now(&*self.0.clock);
            match state.policy {
                FiringPolicy::DelayFrame {
                    mode: FrameMode::FrameCounter,
                    ..
                } => now >= state.fire_time() - FRAME_EPSILON,
                _ => now >= state.fire_time(),
            }
        };
        if !due {
            return;
        }
        {
            let mut state = self.0.state.borrow_mut();
            state.completion = Completion::Completed;
            state.loop_times = 1;
        }
        self.call_complete(1);
    }

    /// Fire every boundary crossed since the last tick, carrying the overshoot
    /// of each into the next cycle.
    fn fire_loops(&self) {
        let clock = &*self.0.clock;
        let epoch = self.0.state.borrow().epoch;
        let mut fired = 0;
        loop {
            let overshoot = {
                let state = self.0.state.borrow();
                state.now(clock) - state.fire_time()
            };
            if overshoot < 0.0 {
                break;
            }
            self.complete_cycle();
            fired += 1;
            if self.is_done() || self.is_paused() {
                break;
            }
            let mut state = self.0.state.borrow_mut();
            if state.epoch != epoch {
                break;
            }
            state.start_time = state.now(clock) - overshoot;
            if state.fire_time() <= state.start_time {
                state.start_time = state.now(clock);
                warn!(
                    "[Timer] interval {} is below the clock resolution at t={}, firing once per tick",
                    state.duration, state.start_time
                );
                break;
            }
            if fired >= MAX_CATCH_UP {
                warn!(
                    "[Timer] loop fell {} completions behind, catching up next tick",
                    MAX_CATCH_UP
                );
                break;
            }
        }
    }

    /// One completion of a looping timer, followed by its end condition.
    fn complete_cycle(&self) {
        let (loop_times, epoch) = {
            let mut state = self.0.state.borrow_mut();
            state.loop_times += 1;
            (state.loop_times, state.epoch)
        };
        self.call_complete(loop_times);
        if self.is_done() || self.0.state.borrow().epoch != epoch {
            return;
        }

        let policy = self.0.state.borrow().policy.clone();
        let finished = match policy {
            FiringPolicy::LoopUntil { .. } => self.call_predicate(),
            FiringPolicy::LoopCount { count, .. } => self.loop_times() >= count,
            _ => false,
        };
        if !finished || self.is_done() || self.0.state.borrow().epoch != epoch {
            return;
        }
        self.0.state.borrow_mut().completion = Completion::Completed;
        self.call_finished();
    }

    // ==================== CALLBACK SLOTS ====================

    /// Take a callback out of its slot, run it through [`safe_call`] with no
    /// borrow held, then put it back unless the slot was replaced meanwhile.
    fn call_slot<T: ?Sized, R>(
        &self,
        kind: CallbackKind,
        slot: fn(&mut Callbacks) -> &mut Option<Box<T>>,
        call: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let (taken, revision) = {
            let mut callbacks = self.0.callbacks.borrow_mut();
            (slot(&mut callbacks).take(), callbacks.revision)
        };
        let mut f = taken?;
        let result = safe_call(kind, || call(&mut *f));
        let mut callbacks = self.0.callbacks.borrow_mut();
        if callbacks.revision == revision && slot(&mut callbacks).is_none() {
            *slot(&mut callbacks) = Some(f);
        }
        result
    }

    fn call_update(&self, elapsed: f64) {
        self.call_slot(CallbackKind::Update, |c| &mut c.on_update, |f| f(elapsed));
    }

    fn call_complete(&self, loop_times: u32) {
        self.call_slot(
            CallbackKind::Complete,
            |c| &mut c.on_complete,
            |f| f(loop_times),
        );
    }

    fn call_finished(&self) {
        self.call_slot(CallbackKind::Finished, |c| &mut c.on_finished, |f| f());
    }

    /// A missing or panicking predicate counts as `false`.
    fn call_predicate(&self) -> bool {
        self.call_slot(CallbackKind::Predicate, |c| &mut c.loop_until, |f| f(self))
            .unwrap_or(false)
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Timer {}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Timer");
        match self.0.state.try_borrow() {
            Ok(state) => {
                dbg.field("kind", &state.policy.kind())
                    .field("duration", &state.duration)
                    .field("basis", &state.basis)
                    .field("completion", &state.completion)
                    .field("paused", &state.paused_at.is_some())
                    .field("loop_times", &state.loop_times);
            }
            Err(_) => {
                dbg.field("state", &"<borrowed>");
            }
        }
        dbg.field("persistent", &self.0.persistent)
            .field("tracked", &self.0.tracked.get())
            .finish()
    }
}
