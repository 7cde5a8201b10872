//! Timer integration tests driving the manager through a `bevy_ecs` world.

use std::cell::Cell;
use std::rc::Rc;

use bevy_ecs::prelude::*;

use aberredtimer::components::owner::Owner;
use aberredtimer::components::policy::FrameMode;
use aberredtimer::resources::clock::TimeBasis;
use aberredtimer::resources::timerconfig::TimerConfig;
use aberredtimer::resources::timermanager::TimerManager;
use aberredtimer::resources::worldtime::WorldTime;
use aberredtimer::systems::time::update_world_time;
use aberredtimer::systems::timer::{advance_timers, init_timer_manager, update_timers};

const EPSILON: f64 = 1e-6;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn make_world(time_scale: f64) -> (World, TimerManager) {
    let mut world = World::new();
    world.insert_non_send_resource(Rc::new(WorldTime::default().with_time_scale(time_scale)));
    let manager = init_timer_manager(&mut world);
    (world, manager)
}

fn tick(world: &mut World, dt: f64) {
    update_world_time(world, dt);
    update_timers(world);
}

fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
    let c = Rc::new(Cell::new(0));
    (c.clone(), c)
}

// ==================== SETUP ====================

#[test]
fn test_init_timer_manager_is_idempotent() {
    let (mut world, manager) = make_world(1.0);
    manager.delay(1.0).start();

    let again = init_timer_manager(&mut world);
    assert_eq!(again.len(), 1);
    assert!(world.get_non_send_resource::<Rc<WorldTime>>().is_some());
}

#[test]
fn test_init_timer_manager_installs_a_clock() {
    let mut world = World::new();
    let manager = init_timer_manager(&mut world);
    assert!(world.get_non_send_resource::<Rc<WorldTime>>().is_some());

    let (fired, f) = counter();
    manager
        .delay(0.5)
        .on_complete(move |_| f.set(f.get() + 1))
        .start();
    tick(&mut world, 0.5);
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_update_timers_without_manager_is_noop() {
    let mut world = World::new();
    update_world_time(&mut world, 1.0);
    update_timers(&mut world);
    assert!(world.get_non_send_resource::<TimerManager>().is_none());
}

#[test]
fn test_config_resource_sets_default_basis() {
    let mut world = World::new();
    let mut config = TimerConfig::new();
    config
        .load_from_str("[timers]\ndefault_basis = unscaled\n")
        .unwrap();
    world.insert_resource(config);
    world.insert_non_send_resource(Rc::new(WorldTime::default().with_time_scale(0.0)));
    let manager = init_timer_manager(&mut world);

    let (fired, f) = counter();
    let timer = manager
        .delay(1.0)
        .on_complete(move |_| f.set(f.get() + 1))
        .start()
        .unwrap();
    assert_eq!(timer.basis(), TimeBasis::Unscaled);

    tick(&mut world, 1.0);
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_advance_timers_runs_in_a_schedule() {
    let (mut world, manager) = make_world(1.0);
    let (fired, f) = counter();
    manager
        .looping(0.25)
        .on_complete(move |_| f.set(f.get() + 1))
        .start();

    let mut schedule = Schedule::default();
    schedule.add_systems(advance_timers);
    for _ in 0..4 {
        update_world_time(&mut world, 0.25);
        schedule.run(&mut world);
    }
    assert_eq!(fired.get(), 4);
}

// ==================== FIRING ====================

#[test]
fn test_delay_fires_on_third_tick() {
    let (mut world, manager) = make_world(1.0);
    let (fired, f) = counter();
    let timer = manager
        .delay(5.0)
        .on_complete(move |_| f.set(f.get() + 1))
        .start()
        .unwrap();

    tick(&mut world, 2.0);
    tick(&mut world, 2.0);
    assert_eq!(fired.get(), 0);
    tick(&mut world, 2.0);
    assert_eq!(fired.get(), 1);
    assert!(approx_eq(timer.elapsed(), 5.0));

    tick(&mut world, 2.0);
    assert_eq!(fired.get(), 1);
    assert!(manager.is_empty());
}

#[test]
fn test_loop_catch_up_then_carry() {
    let (mut world, manager) = make_world(1.0);
    let (fired, f) = counter();
    let timer = manager
        .looping(1.0)
        .on_complete(move |_| f.set(f.get() + 1))
        .start()
        .unwrap();

    tick(&mut world, 2.6);
    assert_eq!(fired.get(), 2);
    tick(&mut world, 0.4);
    assert_eq!(fired.get(), 3);

    for _ in 0..1000 {
        tick(&mut world, 2.6);
        tick(&mut world, 0.4);
    }
    let now = world
        .get_non_send_resource::<Rc<WorldTime>>()
        .map(|wt| wt.elapsed())
        .unwrap();
    let accounted = timer.loop_times() as f64 + timer.elapsed();
    assert!((accounted - now).abs() < 1e-4);
}

#[test]
fn test_loop_count_finishes_once() {
    let (mut world, manager) = make_world(1.0);
    let (fired, f) = counter();
    let (finished, fin) = counter();
    manager
        .loop_count(0.5, 3)
        .on_complete(move |_| f.set(f.get() + 1))
        .on_finished(move || fin.set(fin.get() + 1))
        .start();

    tick(&mut world, 10.0);
    assert_eq!(fired.get(), 3);
    assert_eq!(finished.get(), 1);
    tick(&mut world, 10.0);
    assert_eq!(fired.get(), 3);
    assert_eq!(finished.get(), 1);
}

#[test]
fn test_loop_until_stops_on_predicate() {
    let (mut world, manager) = make_world(1.0);
    let charge = Rc::new(Cell::new(0u32));
    let c = charge.clone();
    let timer = manager
        .loop_until(0.5, move |_| {
            c.set(c.get() + 25);
            c.get() >= 100
        })
        .start()
        .unwrap();

    for _ in 0..10 {
        tick(&mut world, 0.5);
    }
    assert_eq!(charge.get(), 100);
    assert_eq!(timer.loop_times(), 4);
    assert!(timer.is_completed());
}

#[test]
fn test_frame_delay_counts_world_frames() {
    let mut world = World::new();
    world.insert_resource(TimerConfig {
        frame_mode: FrameMode::FrameCounter,
        ..TimerConfig::default()
    });
    let manager = init_timer_manager(&mut world);

    let (fired, f) = counter();
    manager
        .delay_frames(3)
        .on_complete(move |_| f.set(f.get() + 1))
        .start();

    tick(&mut world, 0.016);
    tick(&mut world, 0.016);
    assert_eq!(fired.get(), 0);
    tick(&mut world, 0.016);
    assert_eq!(fired.get(), 1);
}

// ==================== TIME BASES ====================

#[test]
fn test_time_scale_only_affects_scalable_timers() {
    let (mut world, manager) = make_world(0.5);
    let (scaled, s) = counter();
    let (unscaled, u) = counter();
    manager
        .delay(1.0)
        .on_complete(move |_| s.set(s.get() + 1))
        .start();
    manager
        .delay(1.0)
        .basis(TimeBasis::Unscaled)
        .on_complete(move |_| u.set(u.get() + 1))
        .start();

    tick(&mut world, 1.0);
    assert_eq!(unscaled.get(), 1);
    assert_eq!(scaled.get(), 0);
    tick(&mut world, 1.0);
    assert_eq!(scaled.get(), 1);
}

#[test]
fn test_zero_time_scale_freezes_scalable_timers() {
    let (mut world, manager) = make_world(0.0);
    let timer = manager.delay(1.0).start().unwrap();
    for _ in 0..10 {
        tick(&mut world, 1.0);
    }
    assert!(approx_eq(timer.elapsed(), 0.0));
    assert!(!timer.is_done());
}

// ==================== CONTROL ====================

#[test]
fn test_pause_and_resume_exclude_paused_span() {
    let (mut world, manager) = make_world(1.0);
    let (fired, f) = counter();
    let timer = manager
        .delay(3.0)
        .on_complete(move |_| f.set(f.get() + 1))
        .start()
        .unwrap();

    tick(&mut world, 1.0);
    timer.pause();
    for _ in 0..5 {
        tick(&mut world, 1.0);
    }
    timer.resume();
    tick(&mut world, 1.5);
    assert_eq!(fired.get(), 0);
    assert!(approx_eq(timer.elapsed(), 2.5));
    tick(&mut world, 0.5);
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_scene_reset_keeps_persistent_timers() {
    let (mut world, manager) = make_world(1.0);
    let (heartbeats, h) = counter();
    let (spawns, s) = counter();
    manager
        .looping(1.0)
        .persistent()
        .on_complete(move |_| h.set(h.get() + 1))
        .start();
    manager
        .looping(1.0)
        .on_complete(move |_| s.set(s.get() + 1))
        .start();

    tick(&mut world, 1.0);
    manager.cancel_all();
    tick(&mut world, 1.0);
    tick(&mut world, 1.0);
    assert_eq!(heartbeats.get(), 3);
    assert_eq!(spawns.get(), 1);
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_owner_destruction_stops_timers() {
    let (mut world, manager) = make_world(1.0);
    let (fired, f) = counter();
    let owner = Owner::new();
    let timer = manager
        .looping(1.0)
        .owner(owner.handle())
        .on_complete(move |_| f.set(f.get() + 1))
        .start()
        .unwrap();

    tick(&mut world, 1.0);
    drop(owner);
    tick(&mut world, 1.0);
    assert_eq!(fired.get(), 1);
    assert!(timer.is_owner_destroyed());
    assert!(manager.is_empty());
}

#[test]
fn test_callback_panic_does_not_break_the_tick() {
    let (mut world, manager) = make_world(1.0);
    let (fired, f) = counter();
    manager
        .delay(1.0)
        .on_complete(|_| panic!("boom"))
        .start();
    manager
        .delay(1.0)
        .on_complete(move |_| f.set(f.get() + 1))
        .start();

    tick(&mut world, 1.0);
    assert_eq!(fired.get(), 1);
    assert!(manager.is_empty());
}
