//! Owner liveness gating.
//!
//! A timer may be bound to an owner: some host object whose destruction must
//! end the timer. The timer never holds the owner itself, only an
//! [`OwnerHandle`] wrapping a [`Liveness`] check. Once the check reports
//! `false` the timer latches that result and is treated as done forever.
//!
//! Any `Weak<T>` works as a liveness check out of the box, so a host that
//! keeps its objects in `Rc`s can write:
//!
//! ```ignore
//! let enemy = Rc::new(Enemy::new());
//! manager.delay(2.0).owner(OwnerHandle::from_rc(&enemy)).on_complete(|_| fire()).start();
//! manager.cancel_all_by_owner(&OwnerHandle::from_rc(&enemy));
//! drop(enemy); // any remaining timer bound to it is done and never fires
//! ```
//!
//! [`Owner`] is a standalone token for hosts without such objects.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

/// "Is this owner still alive?"
pub trait Liveness {
    fn is_alive(&self) -> bool;
}

impl<T> Liveness for Weak<T> {
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }
}

struct FnLiveness<F>(F);

impl<F> Liveness for FnLiveness<F>
where
    F: Fn() -> bool,
{
    fn is_alive(&self) -> bool {
        (self.0)()
    }
}

/// Identity-comparable handle to an owner's liveness check.
///
/// Handles built with [`OwnerHandle::from_rc`] compare equal whenever they
/// point at the same allocation. Handles built with [`OwnerHandle::new`] or
/// [`OwnerHandle::from_fn`] only equal their own clones.
#[derive(Clone)]
pub struct OwnerHandle {
    liveness: Rc<dyn Liveness>,
    /// Address identifying the owner. The handle keeps the allocation
    /// reachable, so the address cannot be reused while it exists.
    key: *const (),
}

impl OwnerHandle {
    pub fn new(liveness: impl Liveness + 'static) -> Self {
        Self::keyed_by_self(Rc::new(liveness))
    }

    /// Build a handle from a closure answering "still alive?".
    pub fn from_fn(f: impl Fn() -> bool + 'static) -> Self {
        Self::keyed_by_self(Rc::new(FnLiveness(f)))
    }

    /// Handle tracking an `Rc`-owned object through a weak reference.
    pub fn from_rc<T: 'static>(owner: &Rc<T>) -> Self {
        let weak = Rc::downgrade(owner);
        let key = weak.as_ptr().cast::<()>();
        OwnerHandle {
            liveness: Rc::new(weak),
            key,
        }
    }

    fn keyed_by_self(liveness: Rc<dyn Liveness>) -> Self {
        let key = Rc::as_ptr(&liveness).cast::<()>();
        OwnerHandle { liveness, key }
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// True when both handles stand for the same owner.
    pub fn same_owner(&self, other: &OwnerHandle) -> bool {
        std::ptr::eq(self.key, other.key)
    }
}

impl PartialEq for OwnerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_owner(other)
    }
}

impl Eq for OwnerHandle {}

impl fmt::Debug for OwnerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Host-side owner token that can be destroyed explicitly.
///
/// Dropping the `Owner` also counts as destruction.
#[derive(Debug)]
pub struct Owner {
    alive: Rc<Cell<bool>>,
    handle: OwnerHandle,
}

impl Default for Owner {
    fn default() -> Self {
        Self::new()
    }
}

impl Owner {
    pub fn new() -> Self {
        let alive = Rc::new(Cell::new(true));
        let weak = Rc::downgrade(&alive);
        let handle = OwnerHandle::from_fn(move || weak.upgrade().is_some_and(|a| a.get()));
        Owner { alive, handle }
    }

    /// Handle to give to timers.
    pub fn handle(&self) -> OwnerHandle {
        self.handle.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Mark the owner as gone. Every timer bound to it is done from now on.
    pub fn destroy(&self) {
        self.alive.set(false);
    }
}
