//! Per-tick simulation driver.
//!
//! One [`Simulation::logic`] call advances the level by one tick, in this order:
//! 1. age active cues
//! 2. run the player motion controller against this tick's probe contacts, then reset the
//!    player's history to a single snapshot and apply the walk displacement
//! 3. snapshot every other movable (things, projectiles)
//! 4. integrate acceleration and velocity into positions
//! 5. detect overlapping watched pairs and dispatch them through the collision matrix
//! 6. destroy projectiles scheduled for removal and prune dead registrations

use bevy::prelude::*;
use std::time::Duration;

use crate::category::Category;
use crate::controls::Controls;
use crate::cues::{Cue, CueQueue};
use crate::geometry::WorldBox;
use crate::level::{build_level, Level, LevelDef};
use crate::matrix::{dispatch_all, CollisionMatrix, Dispatch, Outcome, ThingEvent};
use crate::motion::{Contacts, Facing, MotionInput, MoveState, PlayerMotion};
use crate::partition::Partitioner;
use crate::scene::{NodeId, Scene};
use crate::timer::Deadline;
use crate::tuning::Tuning;

pub const BODY_PROBE: &str = "mask";
pub const FEET_PROBE: &str = "feetmask";
pub const SIDE_PROBE: &str = "sidemask";
const FOCUS_LEFT: &str = "focus_left";
const FOCUS_RIGHT: &str = "focus_right";

/// Where a fired projectile starts, relative to the shooter's origin.
const MUZZLE_OFFSET: Vec3 = Vec3::new(6.0, -8.0, 0.0);

fn probe_box(min: (f32, f32), max: (f32, f32)) -> WorldBox {
    WorldBox::new(Vec3::new(min.0, min.1, -5.0), Vec3::new(max.0, max.1, 5.0))
}

/// Read-only view of the player for hosts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerView {
    pub position: Vec3,
    pub velocity: Vec3,
    pub state: MoveState,
    pub facing: Facing,
    /// World position the camera should follow.
    pub focus: Vec3,
}

#[derive(Resource)]
pub struct Simulation {
    pub scene: Scene,
    pub partitioner: Partitioner,
    pub tuning: Tuning,
    pub motion: PlayerMotion,
    pub player: NodeId,
    pub level: Level,
    cues: CueQueue,
    things: Vec<ThingEvent>,
    removals: Vec<NodeId>,
    bullets: Vec<(NodeId, Deadline)>,
    tick: u64,
}

impl Simulation {
    /// Build the level, attach the player and place it at the first spawn.
    pub fn new(def: &LevelDef, tuning: Tuning) -> Self {
        let mut scene = Scene::new();
        let mut partitioner = Partitioner::new();
        CollisionMatrix::install(&mut partitioner);

        let level = build_level(def, &mut scene, &mut partitioner, &tuning);
        let player = setup_player(&mut scene, &mut partitioner, &tuning);

        let mut sim = Self {
            scene,
            partitioner,
            tuning,
            motion: PlayerMotion::new(),
            player,
            level,
            cues: CueQueue::new(),
            things: Vec::new(),
            removals: Vec::new(),
            bullets: Vec::new(),
            tick: 0,
        };
        sim.reset();
        sim
    }

    /// Move the player back to the first spawn point and forget its motion.
    ///
    /// Without a spawn point the player stays where it is.
    pub fn reset(&mut self) {
        match self.level.first_spawn() {
            Some(spawn) => self.scene.set_world_position(self.player, spawn),
            None => warn!("Level has no spawn point; leaving player at its current position"),
        }
        self.scene.set_velocity(self.player, Vec3::ZERO);
        self.scene.clear_snapshots(self.player);
        self.motion.reset();
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Advance the level by `dt` seconds.
    pub fn logic(&mut self, controls: &Controls, dt: f32) {
        let dt = dt.max(0.0);
        let elapsed = Duration::from_secs_f32(dt);
        self.tick += 1;
        self.cues.advance(elapsed);

        self.update_player(controls, dt);

        for &thing in &self.level.things {
            self.scene.clear_snapshots(thing);
            self.scene.snapshot(thing);
        }
        for (bullet, lifetime) in self.bullets.iter_mut() {
            self.scene.clear_snapshots(*bullet);
            self.scene.snapshot(*bullet);
            lifetime.advance(elapsed);
            if lifetime.elapsed() {
                self.removals.push(*bullet);
            }
        }

        self.scene.integrate(dt);

        let outcomes = {
            let mut ctx = Dispatch {
                scene: &mut self.scene,
                partitioner: &self.partitioner,
                cues: &mut self.cues,
                things: &mut self.things,
                removals: &mut self.removals,
                spawn: self.level.first_spawn(),
            };
            dispatch_all(&mut ctx)
        };
        if outcomes.contains(&Outcome::Respawned(self.player)) {
            self.motion.reset();
        }

        for node in self.removals.drain(..) {
            self.scene.destroy(node);
        }
        self.bullets.retain(|(bullet, _)| self.scene.is_alive(*bullet));
        self.level.things.retain(|thing| self.scene.is_alive(*thing));
        self.partitioner.prune(&self.scene);
    }

    /// Probe contacts the controller reads this tick.
    fn contacts(&self) -> Contacts {
        let probe = |name: &str| self.scene.hook(self.player, name);
        let feet = probe(FEET_PROBE);
        let sides = probe(SIDE_PROBE);
        let body_bottom = probe(BODY_PROBE)
            .and_then(|b| self.scene.world_box(b))
            .map(|b| b.max.y);

        let on_static = feet.is_some_and(|f| {
            !self
                .partitioner
                .get_collisions_for(&self.scene, f, Category::Static)
                .is_empty()
        });
        // Ledges only hold the actor up when its body sits entirely on top of them.
        let on_ledge = match (feet, body_bottom) {
            (Some(f), Some(bottom)) => self
                .partitioner
                .get_collisions_for(&self.scene, f, Category::Ledge)
                .into_iter()
                .filter_map(|l| self.scene.world_box(l))
                .any(|l| bottom <= l.min.y),
            _ => false,
        };

        // Sorted by handle, so "first" is stable.
        let wall_center_x = sides.and_then(|s| {
            self.partitioner
                .get_collisions_for(&self.scene, s, Category::Static)
                .first()
                .and_then(|w| self.scene.world_box(*w))
                .map(|w| w.center().x)
        });

        Contacts {
            grounded: on_static || on_ledge,
            wall_center_x,
        }
    }

    fn update_player(&mut self, controls: &Controls, dt: f32) {
        let player = self.player;
        let input = MotionInput {
            contacts: self.contacts(),
            actor_x: self.scene.world_position(player).map_or(0.0, |p| p.x),
            velocity: self.scene.velocity(player).unwrap_or(Vec3::ZERO),
            liftoff_cue_active: self.cues.is_active(Cue::Jump),
            dt,
        };
        let step = self.motion.step(&self.tuning, controls, input);

        for cue in &step.cues {
            self.cues.play(*cue);
            if *cue == Cue::Shoot {
                self.fire();
            }
        }

        self.scene.set_velocity(player, step.velocity);
        // Corrections roll back to the position right before this tick's motion.
        self.scene.clear_snapshots(player);
        self.scene.snapshot(player);
        self.scene.translate(player, step.displacement);
    }

    /// Fire a projectile from the player in its facing direction.
    fn fire(&mut self) {
        let Some(origin) = self.scene.world_position(self.player) else {
            return;
        };
        let dir = match self.motion.facing {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        };
        let muzzle = origin + Vec3::new(MUZZLE_OFFSET.x * dir, MUZZLE_OFFSET.y, MUZZLE_OFFSET.z);
        let velocity = Vec3::new(self.tuning.bullet_speed * dir, 0.0, 0.0);
        self.spawn_bullet(muzzle, velocity);
    }

    /// Spawn a projectile at `at` travelling with `velocity`.
    pub fn spawn_bullet(&mut self, at: Vec3, velocity: Vec3) -> NodeId {
        let bullet = self.scene.spawn("bullet");
        self.scene.set_position(bullet, at);
        self.scene.set_velocity(bullet, velocity);
        if let Some(mask) = self.scene.spawn_child(bullet, BODY_PROBE) {
            self.scene.set_local_box(mask, probe_box((-1.0, -1.0), (1.0, 1.0)));
            self.partitioner.register_object(mask, Category::Bullet);
        }
        let mut lifetime = Deadline::new();
        lifetime.set(self.tuning.bullet_lifetime());
        self.bullets.push((bullet, lifetime));
        bullet
    }

    pub fn bullets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.bullets.iter().map(|(b, _)| *b)
    }

    pub fn player_view(&self) -> PlayerView {
        let position = self.scene.world_position(self.player).unwrap_or(Vec3::ZERO);
        let anchor = match self.motion.focus {
            Facing::Left => FOCUS_LEFT,
            Facing::Right => FOCUS_RIGHT,
        };
        let focus = self
            .scene
            .hook(self.player, anchor)
            .and_then(|a| self.scene.world_position(a))
            .unwrap_or(position);
        PlayerView {
            position,
            velocity: self.scene.velocity(self.player).unwrap_or(Vec3::ZERO),
            state: self.motion.state,
            facing: self.motion.facing,
            focus,
        }
    }

    /// Cues fired since the last drain.
    pub fn drain_cues(&mut self) -> Vec<Cue> {
        self.cues.drain()
    }

    /// Thing notices produced since the last drain.
    pub fn drain_thing_events(&mut self) -> Vec<ThingEvent> {
        std::mem::take(&mut self.things)
    }
}

/// Create the player node with its probes and camera anchors.
fn setup_player(scene: &mut Scene, partitioner: &mut Partitioner, tuning: &Tuning) -> NodeId {
    let player = scene.spawn("player");
    scene.set_acceleration(player, Vec3::new(0.0, tuning.gravity, 0.0));

    let probes = [
        (BODY_PROBE, probe_box((-4.0, -14.0), (4.0, 2.0)), Category::Character),
        (FEET_PROBE, probe_box((-4.0, 0.0), (4.0, 4.0)), Category::CharacterFeet),
        (SIDE_PROBE, probe_box((-10.0, -10.0), (10.0, -2.0)), Category::CharacterSides),
    ];
    for (name, bounds, category) in probes {
        if let Some(probe) = scene.spawn_child(player, name) {
            scene.set_local_box(probe, bounds);
            partitioner.register_object(probe, category);
        }
    }

    for (name, x) in [(FOCUS_LEFT, -tuning.focus_offset), (FOCUS_RIGHT, tuning.focus_offset)] {
        if let Some(anchor) = scene.spawn_child(player, name) {
            scene.set_position(anchor, Vec3::new(x, 0.0, 0.0));
        }
    }

    player
}
