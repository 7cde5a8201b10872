//! Long-lived shared state.
//!
//! Overview
//! - `clock` – time bases, the clock trait and a manually driven clock
//! - `timerconfig` – INI-backed defaults for timer factories
//! - `timermanager` – registry that advances and reaps timers
//! - `worldtime` – simulation clock (scaled, unscaled, real time, frames)
pub mod clock;
pub mod timerconfig;
pub mod timermanager;
pub mod worldtime;
