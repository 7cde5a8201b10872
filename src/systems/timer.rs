//! Timer systems.
//!
//! - [`init_timer_manager`] – install the clock and manager resources (idempotent)
//! - [`update_timers`] – exclusive tick entry point
//! - [`advance_timers`] – the same, as a schedulable system
//!
//! # System Flow
//!
//! Each frame:
//!
//! 1. the host calls [`update_world_time`](crate::systems::time::update_world_time)
//! 2. `update_timers` (or `advance_timers` inside a schedule) advances every
//!    registered timer once; callbacks run inline
//!
//! Both resources are `NonSend`: timers hold `Rc`s and callbacks are not
//! required to be `Send`.

use std::rc::Rc;

use bevy_ecs::prelude::*;
use log::info;

use crate::resources::clock::ClockSource;
use crate::resources::timerconfig::TimerConfig;
use crate::resources::timermanager::TimerManager;
use crate::resources::worldtime::WorldTime;

/// Return the world's timer manager, creating it on first use.
///
/// Reuses an installed `Rc<WorldTime>` clock or installs a fresh one, and
/// applies a [`TimerConfig`] resource if present. Later calls return the
/// same manager.
pub fn init_timer_manager(world: &mut World) -> TimerManager {
    if let Some(manager) = world.get_non_send_resource::<TimerManager>() {
        return manager.clone();
    }

    let clock = match world.get_non_send_resource::<Rc<WorldTime>>() {
        Some(clock) => Rc::clone(clock),
        None => {
            let clock = Rc::new(WorldTime::default());
            world.insert_non_send_resource(Rc::clone(&clock));
            clock
        }
    };
    let config = world
        .get_resource::<TimerConfig>()
        .cloned()
        .unwrap_or_default();

    let clock: Rc<dyn ClockSource> = clock;
    let manager = TimerManager::with_config(clock, &config);
    world.insert_non_send_resource(manager.clone());
    info!(
        "Timer manager initialised (default_basis={}, frame_mode={})",
        config.default_basis, config.frame_mode
    );
    manager
}

/// Advance all timers by one tick. Does nothing before [`init_timer_manager`].
pub fn update_timers(world: &mut World) {
    if let Some(manager) = world.get_non_send_resource::<TimerManager>() {
        manager.advance();
    }
}

/// Schedulable form of [`update_timers`].
pub fn advance_timers(manager: NonSend<TimerManager>) {
    manager.advance();
}
