//! Tile-world collision resolution and platformer motion.
//!
//! Everything here is engine-agnostic simulation state driven one tick at a time; the
//! [`plugin`] module wires it into a Bevy app.

pub mod category;
pub mod controls;
pub mod cues;
pub mod geometry;
pub mod level;
pub mod matrix;
pub mod motion;
pub mod partition;
pub mod plugin;
pub mod resolver;
pub mod scene;
pub mod simulation;
pub mod snapshot;
pub mod spatial;
pub mod timer;
pub mod tuning;

pub use category::{Category, CategoryPair};
pub use controls::{Button, Controls};
pub use cues::{Cue, CueQueue};
pub use geometry::WorldBox;
pub use level::{build_level, load_level_from_file, load_level_from_str, Level, LevelDef};
pub use matrix::{CollisionMatrix, PairHandler, ThingEvent};
pub use motion::{Facing, MoveState, PlayerMotion};
pub use partition::{CollisionEvent, Partitioner};
pub use plugin::{tick_duration, CueMessage, JunglePlugin, SimulationSet, ThingMessage};
pub use resolver::{resolve_to_static, Correction};
pub use scene::{NodeId, Scene};
pub use simulation::{PlayerView, Simulation};
pub use tuning::{load_tuning_from_file, load_tuning_from_str, Tuning};
