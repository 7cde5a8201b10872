//! Engine systems.
//!
//! Per-tick entry points operating on a `bevy_ecs::World`.
//!
//! Submodules overview
//! - [`time`] – advance the shared world clock
//! - [`timer`] – install the timer manager and advance registered timers

pub mod time;
pub mod timer;
