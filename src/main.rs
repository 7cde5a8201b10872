//! Aberred timer demo.
//!
//! Runs a headless simulated frame loop and schedules one timer of each
//! flavour, logging every firing. Useful to eyeball timer behaviour under
//! tick jitter and time scaling without a window.
//!
//! # Main Loop
//!
//! 1. Load `timers.ini` (if present) and insert it as a resource
//! 2. Install the clock and timer manager in an ECS world
//! 3. Schedule the demo timers
//! 4. For each frame: advance the world clock, run the schedule
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=debug cargo run --release -- --ticks 600 --fps 60 --jitter 0.25
//! ```

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use aberredtimer::resources::clock::{ClockSource, TimeBasis};
use aberredtimer::resources::timerconfig::TimerConfig;
use aberredtimer::resources::worldtime::WorldTime;
use aberredtimer::systems::time::update_world_time;
use aberredtimer::systems::timer::{advance_timers, init_timer_manager};
use aberredtimer::Owner;
use bevy_ecs::prelude::*;
use clap::Parser;

/// Aberred timer demo
#[derive(Parser)]
#[command(version, about = "Headless frame loop driving cooperative timers.")]
struct Cli {
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u32,

    /// Nominal frames per second.
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Scale applied to game time (0 freezes scalable timers).
    #[arg(long, default_value_t = 1.0)]
    time_scale: f64,

    /// Random frame-time jitter as a fraction of the nominal frame time.
    #[arg(long, default_value_t = 0.0)]
    jitter: f64,

    /// Timer configuration file.
    #[arg(long, value_name = "PATH", default_value = "./timers.ini")]
    config: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.fps <= 0.0 {
        eprintln!("Error: --fps must be positive");
        std::process::exit(1);
    }

    let mut config = TimerConfig::with_path(&cli.config);
    if let Err(e) = config.load_from_file() {
        log::debug!("{}; using defaults", e);
    }

    // --------------- ECS world + resources ---------------
    let mut world = World::new();
    let clock = Rc::new(WorldTime::default().with_time_scale(cli.time_scale));
    world.insert_non_send_resource(Rc::clone(&clock));
    world.insert_resource(config);
    let manager = init_timer_manager(&mut world);

    // --------------- Demo timers ---------------
    let clock_for_log = Rc::clone(&clock);
    manager
        .delay(1.5)
        .on_complete(move |_| {
            log::info!(
                "[delay] fired at t={:.3}",
                clock_for_log.now(TimeBasis::Scalable)
            )
        })
        .start();

    manager
        .delay_frames(30)
        .on_complete(|_| log::info!("[delay_frames] 30 frames elapsed"))
        .start();

    let heartbeat = manager
        .looping(1.0)
        .basis(TimeBasis::Unscaled)
        .execute_on_start()
        .persistent()
        .on_complete(|n| log::info!("[heartbeat] #{}", n))
        .start();

    let spawner = Owner::new();
    manager
        .loop_count(0.75, 4)
        .owner(spawner.handle())
        .on_complete(|n| log::info!("[spawner] wave {}", n))
        .on_finished(|| log::info!("[spawner] all waves out"))
        .start();

    let charge = Rc::new(Cell::new(0u32));
    let charge_in_loop = Rc::clone(&charge);
    manager
        .loop_until(0.4, move |timer| {
            charge_in_loop.set(timer.loop_times() * 20);
            charge_in_loop.get() >= 100
        })
        .on_update(|elapsed| log::trace!("[charge] cycle elapsed {:.3}", elapsed))
        .on_complete(|n| log::info!("[charge] step {}", n))
        .on_finished(|| log::info!("[charge] fully charged"))
        .start();

    // --------------- Main loop ---------------
    let mut update = Schedule::default();
    update.add_systems(advance_timers);

    let frame_time = 1.0 / cli.fps;
    let jitter = cli.jitter.clamp(0.0, 1.0);
    for frame in 0..cli.ticks {
        let dt = frame_time * (1.0 + jitter * (fastrand::f64() * 2.0 - 1.0));
        update_world_time(&mut world, dt);
        update.run(&mut world);

        // Halfway through, drop the spawner to show owner gating.
        if frame == cli.ticks / 2 && spawner.is_alive() {
            log::info!("[spawner] owner destroyed");
            spawner.destroy();
        }
    }

    if let Some(heartbeat) = heartbeat {
        log::info!(
            "Finished after {} frames: t={:.3}s scaled, {:.3}s unscaled, heartbeat fired {} time(s), charge {}",
            clock.frame_count(),
            clock.elapsed(),
            clock.unscaled_elapsed(),
            heartbeat.loop_times(),
            charge.get()
        );
    }
    log::info!("{} timer(s) still registered", manager.len());
}
