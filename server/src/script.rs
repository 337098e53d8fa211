//! Scripted control track.
//!
//! Stands in for input-device polling: each step holds a set of buttons for a number of
//! fixed ticks. When the track runs out the app exits.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use shared::{Button, Controls};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub ticks: u32,
    #[serde(default)]
    pub hold: Vec<Button>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<ScriptStep>,
}

pub fn load_script_from_str(text: &str) -> Result<Script, String> {
    ron::from_str(text).map_err(|e| format!("script parse failed: {e}"))
}

pub fn load_script_from_file(path: impl AsRef<Path>) -> Result<Script, String> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| format!("failed to read {path:?}: {e}"))?;
    load_script_from_str(&text)
}

/// Playback position in a [`Script`].
#[derive(Resource, Debug)]
pub struct ScriptPlayer {
    script: Script,
    step: usize,
    ticks_in_step: u32,
}

impl ScriptPlayer {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            step: 0,
            ticks_in_step: 0,
        }
    }

    /// Buttons to hold this tick, or `None` once the track is over.
    pub fn advance(&mut self) -> Option<&[Button]> {
        while let Some(step) = self.script.steps.get(self.step) {
            if self.ticks_in_step < step.ticks {
                self.ticks_in_step += 1;
                return self.script.steps.get(self.step).map(|s| s.hold.as_slice());
            }
            self.step += 1;
            self.ticks_in_step = 0;
        }
        None
    }
}

/// Write this tick's scripted buttons, or request exit once the track is over.
pub fn drive_controls(
    mut player: ResMut<ScriptPlayer>,
    mut controls: ResMut<Controls>,
    mut exit: MessageWriter<AppExit>,
) {
    controls.release_all();
    match player.advance() {
        Some(hold) => {
            for button in hold {
                controls.set(*button, true);
            }
        }
        None => {
            info!("Control script finished");
            exit.write(AppExit::Success);
        }
    }
}
