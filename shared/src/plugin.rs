//! Bevy wiring for the simulation.
//!
//! The host inserts a [`Simulation`] resource and writes [`Controls`] before
//! [`SimulationSet`]; one `logic` step then runs per fixed tick and whatever the step
//! produced is forwarded as messages.

use bevy::prelude::*;
use std::time::Duration;

use crate::controls::Controls;
use crate::cues::Cue;
use crate::matrix::ThingEvent;
use crate::simulation::Simulation;

/// Fixed timestep for game logic (60 Hz)
pub const FIXED_TIMESTEP_HZ: f64 = 60.0;

pub fn tick_duration() -> Duration {
    Duration::from_secs_f64(1.0 / FIXED_TIMESTEP_HZ)
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimulationSet;

/// A cue fired during the last tick.
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CueMessage(pub Cue);

/// A thing interaction from the last tick.
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThingMessage(pub ThingEvent);

pub struct JunglePlugin;

impl Plugin for JunglePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Controls>();
        app.add_message::<CueMessage>();
        app.add_message::<ThingMessage>();
        app.insert_resource(Time::<Fixed>::from_hz(FIXED_TIMESTEP_HZ));

        app.add_systems(
            FixedUpdate,
            tick_simulation
                .in_set(SimulationSet)
                .run_if(resource_exists::<Simulation>),
        );
    }
}

/// Advance the simulation by one fixed tick and publish its output.
pub fn tick_simulation(
    mut sim: ResMut<Simulation>,
    mut controls: ResMut<Controls>,
    time: Res<Time>,
    mut cues: MessageWriter<CueMessage>,
    mut things: MessageWriter<ThingMessage>,
) {
    sim.logic(&controls, time.delta_secs());
    controls.latch();

    for cue in sim.drain_cues() {
        cues.write(CueMessage(cue));
    }
    for event in sim.drain_thing_events() {
        things.write(ThingMessage(event));
    }
}
