//! Aberred timer library.
//!
//! Cooperative, tick-driven timers: deferred, repeating and conditional
//! callbacks that fire on elapsed time or elapsed frames, advanced by the
//! host once per frame with no threads or OS timers involved.
//!
//! - [`components`] – the timer state machine and its parts
//! - [`resources`] – clocks, the timer manager and configuration
//! - [`systems`] – `bevy_ecs` entry points for the host loop

pub mod components;
pub mod resources;
pub mod systems;

pub use components::builder::{Restart, TimerBuilder};
pub use components::owner::{Liveness, Owner, OwnerHandle};
pub use components::policy::{FrameMode, TimerKind};
pub use components::timer::Timer;
pub use resources::clock::{ClockSource, ManualClock, TimeBasis};
pub use resources::timerconfig::TimerConfig;
pub use resources::timermanager::TimerManager;
pub use resources::worldtime::WorldTime;
