//! User callback slots and the panic-absorbing call helper.
//!
//! Every user-supplied closure (update, complete, finished, loop-until
//! predicate) is invoked through [`safe_call`]. A panic inside the closure is
//! caught, logged with the callback kind, and turned into `None`; it never
//! unwinds into the tick loop.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use log::error;

use crate::components::timer::Timer;

/// Called every tick with the elapsed time of the current cycle.
pub type OnUpdate = Box<dyn FnMut(f64)>;
/// Called on each completion with the 1-based completion count.
pub type OnComplete = Box<dyn FnMut(u32)>;
/// Called once when a multi-fire timer ends by reaching its condition.
pub type OnFinished = Box<dyn FnMut()>;
/// Loop-until condition. Returning `true` ends the loop.
pub type LoopUntil = Box<dyn FnMut(&Timer) -> bool>;

/// Which callback is being invoked; used in log messages.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CallbackKind {
    Update,
    Complete,
    Finished,
    Predicate,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackKind::Update => "on_update",
            CallbackKind::Complete => "on_complete",
            CallbackKind::Finished => "on_finished",
            CallbackKind::Predicate => "loop_until",
        };
        f.write_str(name)
    }
}

/// Optional callback slots held by a timer.
///
/// `revision` is bumped whenever a slot is replaced through a restart, so a
/// callback that swaps its own slot while running is not overwritten when the
/// caller puts the running closure back.
#[derive(Default)]
pub struct Callbacks {
    pub on_update: Option<OnUpdate>,
    pub on_complete: Option<OnComplete>,
    pub on_finished: Option<OnFinished>,
    pub loop_until: Option<LoopUntil>,
    pub revision: u64,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_update", &self.on_update.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_finished", &self.on_finished.is_some())
            .field("loop_until", &self.loop_until.is_some())
            .field("revision", &self.revision)
            .finish()
    }
}

/// Run `f`, absorbing any panic.
///
/// Returns `None` when the callback panicked.
pub fn safe_call<R>(kind: CallbackKind, f: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            error!("[Timer] {} callback panicked: {}", kind, msg);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_call_returns_value() {
        assert_eq!(safe_call(CallbackKind::Update, || 7), Some(7));
    }

    #[test]
    fn test_safe_call_absorbs_panic() {
        let result: Option<bool> = safe_call(CallbackKind::Predicate, || panic!("boom"));
        assert_eq!(result, None);
    }

    #[test]
    fn test_safe_call_absorbs_formatted_panic() {
        let n = 3;
        let result: Option<()> = safe_call(CallbackKind::Complete, || panic!("bad {}", n));
        assert!(result.is_none());
    }

    #[test]
    fn test_callbacks_debug_shows_presence() {
        let cbs = Callbacks {
            on_update: Some(Box::new(|_| {})),
            ..Default::default()
        };
        let text = format!("{:?}", cbs);
        assert!(text.contains("on_update: true"));
        assert!(text.contains("on_complete: false"));
    }
}
