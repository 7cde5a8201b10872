//! Time update system.
//!
//! Advances the shared [`WorldTime`](crate::resources::worldtime::WorldTime)
//! clock once per frame, applying its `time_scale` to the provided delta.
use std::rc::Rc;

use bevy_ecs::prelude::*;

use crate::resources::worldtime::WorldTime;

/// Advance the world clock by one frame.
///
/// `dt` is expected to be the unscaled frame delta in seconds. Scaled time,
/// unscaled time and the frame counter all move; real time is read from the
/// system clock and needs no update. Does nothing if no clock is installed.
pub fn update_world_time(world: &mut World, dt: f64) {
    if let Some(wt) = world.get_non_send_resource::<Rc<WorldTime>>() {
        wt.advance(dt);
    }
}
