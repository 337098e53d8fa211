//! Headless host - loads a level, replays a scripted control track at the fixed tick rate
//! and logs what the simulation does.
//!
//! Usage: `server [LEVEL] [TUNING] [SCRIPT]`. Missing arguments fall back to
//! `JUNGLE_LEVEL`, `JUNGLE_TUNING` and `JUNGLE_SCRIPT`, then to the bundled assets.

mod script;

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use std::path::PathBuf;

use shared::{
    load_level_from_file, load_tuning_from_file, tick_duration, CueMessage, JunglePlugin, Simulation,
    SimulationSet, ThingMessage,
};

use script::{drive_controls, load_script_from_file, ScriptPlayer};

const DEFAULT_LEVEL: &str = "assets/levels/jungle.ron";
const DEFAULT_TUNING: &str = "assets/tuning.ron";
const DEFAULT_SCRIPT: &str = "assets/scripts/demo.ron";

/// Log the player's state every this many ticks.
const STATUS_INTERVAL: u64 = 30;

struct HostConfig {
    level: PathBuf,
    tuning: PathBuf,
    script: PathBuf,
}

impl HostConfig {
    fn from_args_and_env() -> Self {
        let mut args = std::env::args().skip(1);
        let mut pick = |var: &str, default: &str| -> PathBuf {
            args.next()
                .or_else(|| std::env::var(var).ok())
                .unwrap_or_else(|| default.to_string())
                .into()
        };
        Self {
            level: pick("JUNGLE_LEVEL", DEFAULT_LEVEL),
            tuning: pick("JUNGLE_TUNING", DEFAULT_TUNING),
            script: pick("JUNGLE_SCRIPT", DEFAULT_SCRIPT),
        }
    }
}

fn log_cues(mut cues: MessageReader<CueMessage>, sim: Res<Simulation>) {
    for CueMessage(cue) in cues.read() {
        info!("[tick {}] cue {:?}", sim.tick_count(), cue);
    }
}

fn log_things(mut things: MessageReader<ThingMessage>, sim: Res<Simulation>) {
    for ThingMessage(event) in things.read() {
        info!("[tick {}] thing {:?}", sim.tick_count(), event);
    }
}

fn log_player(sim: Res<Simulation>) {
    if sim.tick_count() % STATUS_INTERVAL != 0 {
        return;
    }
    let view = sim.player_view();
    info!(
        "[tick {}] player at ({:.1}, {:.1}) vel ({:.1}, {:.1}) {} facing {:?}, camera x {:.1}",
        sim.tick_count(),
        view.position.x,
        view.position.y,
        view.velocity.x,
        view.velocity.y,
        view.state.name(),
        view.facing,
        view.focus.x,
    );
}

fn main() {
    let config = HostConfig::from_args_and_env();

    let level = load_level_from_file(&config.level).unwrap_or_else(|e| panic!("Level load failed: {e}"));
    let tuning = load_tuning_from_file(&config.tuning).unwrap_or_else(|e| panic!("Tuning load failed: {e}"));
    let script = load_script_from_file(&config.script).unwrap_or_else(|e| panic!("Script load failed: {e}"));

    let mut app = App::new();

    // Headless: run the main loop at the fixed tick rate.
    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(tick_duration())));
    app.add_plugins(bevy::log::LogPlugin::default());
    app.add_plugins(JunglePlugin);

    app.insert_resource(Simulation::new(&level, tuning));
    app.insert_resource(ScriptPlayer::new(script));

    app.add_systems(
        FixedUpdate,
        (
            drive_controls.before(SimulationSet),
            (log_cues, log_things, log_player).after(SimulationSet),
        ),
    );

    info!(
        "Running {:?} with tuning {:?} and script {:?}",
        config.level, config.tuning, config.script
    );
    app.run();
}
