//! Player motion state machine.
//!
//! Consumes this tick's resolved contacts (feet/side probes against solid geometry) and
//! the control state, and decides the actor's velocity, walk displacement, movement state
//! and audio cues. All per-actor memory (jump timers, last wall-jump side, airborne flag)
//! lives in [`PlayerMotion`], so the transition function can be driven without a scene.
//!
//! Jump rules:
//! - A liftoff (from ground, off a wall, or inside the walk-off grace window) sets the
//!   vertical velocity to the jump impulse and arms the jump window.
//! - While jump stays held and the window is open, the impulse keeps being applied.
//!   Releasing jump closes the window immediately.
//! - Two wall-jumps in a row off the same side are refused until the actor touches
//!   ground; a refused wall-jump inside an open window still continues the current jump.

use bevy::prelude::*;
use std::time::Duration;

use crate::controls::{Button, Controls};
use crate::cues::Cue;
use crate::timer::Deadline;
use crate::tuning::Tuning;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MoveState {
    #[default]
    Stand,
    Walk,
    Jump,
    WallJump,
}

impl MoveState {
    pub fn name(self) -> &'static str {
        match self {
            MoveState::Stand => "stand",
            MoveState::Walk => "walk",
            MoveState::Jump => "jump",
            MoveState::WallJump => "walljump",
        }
    }
}

/// Horizontal direction. Used for sprite facing, camera focus and wall sides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Resolved probe contacts for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Contacts {
    /// Feet probe overlaps solid geometry.
    pub grounded: bool,
    /// World-space center X of the first solid the side probe overlaps, if any.
    pub wall_center_x: Option<f32>,
}

impl Contacts {
    /// Walls only count while airborne.
    pub fn wall(&self) -> Option<f32> {
        if self.grounded {
            None
        } else {
            self.wall_center_x
        }
    }
}

/// Everything the controller reads besides the controls.
#[derive(Clone, Copy, Debug)]
pub struct MotionInput {
    pub contacts: Contacts,
    /// Actor world X, for deciding which side a wall is on.
    pub actor_x: f32,
    /// Velocity after this tick's collision corrections.
    pub velocity: Vec3,
    /// A liftoff cue is still audible.
    pub liftoff_cue_active: bool,
    /// Tick duration in seconds.
    pub dt: f32,
}

/// Output of one controller tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MotionStep {
    /// Velocity to store on the actor.
    pub velocity: Vec3,
    /// Walk displacement to apply after the history reset.
    pub displacement: Vec3,
    pub cues: Vec<Cue>,
    /// A jump impulse was applied this tick.
    pub jumped: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PlayerMotion {
    pub state: MoveState,
    pub facing: Facing,
    /// Which camera focus anchor the host should follow.
    pub focus: Facing,
    last_wall_side: Option<Facing>,
    jump_timer: Deadline,
    ledge_grace: Deadline,
    was_in_air: bool,
}

impl PlayerMotion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Side of the last wall-jump since the actor last touched ground.
    pub fn last_wall_side(&self) -> Option<Facing> {
        self.last_wall_side
    }

    /// The post-liftoff jump window is still open.
    pub fn jump_window_open(&self) -> bool {
        !self.jump_timer.elapsed()
    }

    pub fn was_in_air(&self) -> bool {
        self.was_in_air
    }

    /// Forget jump state, e.g. after a respawn.
    pub fn reset(&mut self) {
        self.jump_timer.clear();
        self.ledge_grace.clear();
        self.last_wall_side = None;
        self.was_in_air = false;
    }

    pub fn step(&mut self, tuning: &Tuning, controls: &Controls, input: MotionInput) -> MotionStep {
        let dt = Duration::from_secs_f32(input.dt.max(0.0));
        self.jump_timer.advance(dt);
        self.ledge_grace.advance(dt);

        let eps = tuning.input_epsilon;
        let mut cues = Vec::new();
        let mut velocity = input.velocity;

        let in_air = !input.contacts.grounded;
        let wall_x = input.contacts.wall();
        let walljump = wall_x.is_some();

        // Ground friction: standing with nothing at our sides stops any horizontal drift.
        if !in_air && input.contacts.wall_center_x.is_none() {
            velocity.x = 0.0;
        }

        if walljump {
            self.state = MoveState::WallJump;
        } else if in_air {
            self.state = MoveState::Jump;
        }

        // Left the ground without a jump in progress and without rising: walked off an edge.
        // A released jump can still overlap the ground for a tick, so the timer alone is not
        // enough.
        let rising = input.velocity.y < 0.0;
        if in_air && !self.was_in_air && self.jump_timer.elapsed() && !rising {
            self.ledge_grace.set(tuning.ledge_grace());
        }
        if !in_air {
            self.ledge_grace.clear();
        }

        // Input only steers when nothing else is driving horizontal motion.
        let mut direction = Vec3::ZERO;
        if velocity.x.abs() < eps {
            if controls.held(Button::Left) {
                self.focus = Facing::Left;
                direction.x -= 1.0;
            }
            if controls.held(Button::Right) {
                self.focus = Facing::Right;
                direction.x += 1.0;
            }
        }

        if controls.pressed_now(Button::Shoot) {
            cues.push(Cue::Shoot);
        }

        let mut jumped = false;
        if controls.jump_held() {
            let in_grace = in_air && !self.ledge_grace.elapsed();
            let liftoff = !in_air || walljump || in_grace;
            let continuing = !self.jump_timer.elapsed();

            if liftoff || continuing {
                let mut blocked = false;
                if let Some(wall_x) = wall_x {
                    let previous = self.last_wall_side;
                    let side = if wall_x < input.actor_x + tuning.wall_bias {
                        Facing::Left
                    } else {
                        Facing::Right
                    };
                    self.last_wall_side = Some(side);
                    if previous == Some(side) {
                        trace!("Wall-jump off the same side ({:?}) refused", side);
                        blocked = true;
                    }
                }

                // Wall-jumps push straight up; no horizontal kick.
                let impulse = Vec3::new(0.0, -tuning.jump_impulse, 0.0);
                if !blocked {
                    velocity = impulse;
                    jumped = true;
                    if liftoff {
                        if !input.liftoff_cue_active {
                            cues.push(Cue::Jump);
                        }
                        self.jump_timer.set(tuning.jump_window());
                        self.ledge_grace.clear();
                    }
                } else if continuing {
                    velocity = impulse;
                    jumped = true;
                }
            }
        } else {
            self.jump_timer.clear();
        }

        if !in_air && self.was_in_air {
            cues.push(Cue::Land);
        }
        self.was_in_air = in_air;

        if !in_air {
            self.last_wall_side = None;
        }

        let mut displacement = Vec3::ZERO;
        if direction.length() > eps {
            if !in_air {
                self.state = MoveState::Walk;
            }
            let direction = direction.normalize();
            if direction.x < -eps {
                self.facing = Facing::Left;
            } else if direction.x > eps {
                self.facing = Facing::Right;
            }
            displacement = direction * tuning.walk_speed * input.dt;
        } else if !in_air {
            self.state = MoveState::Stand;
        }

        MotionStep {
            velocity,
            displacement,
            cues,
            jumped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    struct Rig {
        motion: PlayerMotion,
        tuning: Tuning,
        controls: Controls,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                motion: PlayerMotion::new(),
                tuning: Tuning::default(),
                controls: Controls::new(),
            }
        }

        fn tick(&mut self, contacts: Contacts, velocity: Vec3) -> MotionStep {
            let step = self.motion.step(
                &self.tuning,
                &self.controls,
                MotionInput {
                    contacts,
                    actor_x: 0.0,
                    velocity,
                    liftoff_cue_active: false,
                    dt: DT,
                },
            );
            self.controls.latch();
            step
        }
    }

    const GROUND: Contacts = Contacts {
        grounded: true,
        wall_center_x: None,
    };
    const AIR: Contacts = Contacts {
        grounded: false,
        wall_center_x: None,
    };
    const LEFT_WALL: Contacts = Contacts {
        grounded: false,
        wall_center_x: Some(-12.0),
    };
    const RIGHT_WALL: Contacts = Contacts {
        grounded: false,
        wall_center_x: Some(12.0),
    };

    fn falling() -> Vec3 {
        Vec3::new(0.0, 50.0, 0.0)
    }

    #[test]
    fn test_ground_jump_applies_impulse_and_cue() {
        let mut rig = Rig::new();
        rig.tick(GROUND, Vec3::ZERO);
        rig.controls.set(Button::Jump, true);
        let step = rig.tick(GROUND, Vec3::ZERO);
        assert!(step.jumped);
        assert_eq!(step.velocity, Vec3::new(0.0, -125.0, 0.0));
        assert_eq!(step.cues, vec![Cue::Jump]);
        assert!(rig.motion.jump_window_open());
    }

    #[test]
    fn test_holding_jump_continues_impulse_inside_window() {
        let mut rig = Rig::new();
        rig.tick(GROUND, Vec3::ZERO);
        rig.controls.set(Button::Jump, true);
        rig.tick(GROUND, Vec3::ZERO);

        // Airborne, still holding, gravity has started pulling.
        let step = rig.tick(AIR, Vec3::new(0.0, -116.0, 0.0));
        assert!(step.jumped);
        assert_eq!(step.velocity.y, -125.0);
        assert!(step.cues.is_empty());

        // Past the window the impulse stops.
        let mut last = step;
        for _ in 0..15 {
            last = rig.tick(AIR, Vec3::new(0.0, -50.0, 0.0));
        }
        assert!(!last.jumped);
        assert_eq!(last.velocity.y, -50.0);
    }

    #[test]
    fn test_release_closes_window() {
        let mut rig = Rig::new();
        rig.tick(GROUND, Vec3::ZERO);
        rig.controls.set(Button::Up, true);
        rig.tick(GROUND, Vec3::ZERO);
        rig.tick(AIR, Vec3::new(0.0, -116.0, 0.0));

        rig.controls.set(Button::Up, false);
        rig.tick(AIR, Vec3::new(0.0, -108.0, 0.0));
        assert!(!rig.motion.jump_window_open());

        rig.controls.set(Button::Up, true);
        let step = rig.tick(AIR, Vec3::new(0.0, -100.0, 0.0));
        assert!(!step.jumped);
        assert_eq!(step.velocity.y, -100.0);
    }

    #[test]
    fn test_walk_off_grace_allows_late_jump() {
        let mut rig = Rig::new();
        rig.tick(GROUND, Vec3::ZERO);
        rig.tick(GROUND, Vec3::ZERO);
        // Walked off the edge; jump not held.
        rig.tick(AIR, falling());
        for _ in 0..5 {
            rig.tick(AIR, falling());
        }
        // ~100 ms after leaving the ground.
        rig.controls.set(Button::Jump, true);
        let step = rig.tick(AIR, falling());
        assert!(step.jumped);
        assert_eq!(step.velocity.y, -125.0);
        assert_eq!(step.cues, vec![Cue::Jump]);
    }

    #[test]
    fn test_walk_off_grace_expires() {
        let mut rig = Rig::new();
        rig.tick(GROUND, Vec3::ZERO);
        rig.tick(AIR, falling());
        // ~250 ms later.
        for _ in 0..15 {
            rig.tick(AIR, falling());
        }
        rig.controls.set(Button::Jump, true);
        let step = rig.tick(AIR, falling());
        assert!(!step.jumped);
        assert_eq!(step.velocity, falling());
    }

    #[test]
    fn test_no_double_jump_from_grace_after_real_jump() {
        let mut rig = Rig::new();
        rig.tick(GROUND, Vec3::ZERO);
        rig.controls.set(Button::Jump, true);
        rig.tick(GROUND, Vec3::ZERO);
        rig.tick(AIR, Vec3::new(0.0, -116.0, 0.0));
        rig.controls.set(Button::Jump, false);
        rig.tick(AIR, Vec3::new(0.0, -108.0, 0.0));
        rig.controls.set(Button::Jump, true);
        let step = rig.tick(AIR, Vec3::new(0.0, -100.0, 0.0));
        assert!(!step.jumped);
    }

    #[test]
    fn test_tapped_jump_does_not_open_grace() {
        let mut rig = Rig::new();
        rig.tick(GROUND, Vec3::ZERO);
        rig.controls.set(Button::Jump, true);
        rig.tick(GROUND, Vec3::ZERO);
        // Released while the feet still touch the ground; already rising.
        rig.controls.set(Button::Jump, false);
        rig.tick(GROUND, Vec3::new(0.0, -116.0, 0.0));
        rig.tick(AIR, Vec3::new(0.0, -108.0, 0.0));
        rig.tick(AIR, Vec3::new(0.0, -100.0, 0.0));

        rig.controls.set(Button::Jump, true);
        let step = rig.tick(AIR, Vec3::new(0.0, -91.0, 0.0));
        assert!(!step.jumped);
        assert_eq!(step.velocity.y, -91.0);
        assert!(step.cues.is_empty());
    }

    #[test]
    fn test_reset_forgets_airborne() {
        let mut rig = Rig::new();
        rig.tick(AIR, falling());
        rig.motion.reset();
        assert!(!rig.motion.was_in_air());
        let step = rig.tick(GROUND, Vec3::ZERO);
        assert!(step.cues.is_empty());
    }

    #[test]
    fn test_same_wall_twice_is_refused() {
        let mut rig = Rig::new();
        rig.tick(AIR, falling());

        rig.controls.set(Button::Jump, true);
        let first = rig.tick(LEFT_WALL, falling());
        assert!(first.jumped);
        assert_eq!(rig.motion.last_wall_side(), Some(Facing::Left));
        assert_eq!(rig.motion.state, MoveState::WallJump);

        rig.controls.set(Button::Jump, false);
        rig.tick(LEFT_WALL, falling());

        rig.controls.set(Button::Jump, true);
        let second = rig.tick(LEFT_WALL, falling());
        assert!(!second.jumped);
        assert_eq!(second.velocity, falling());
    }

    #[test]
    fn test_refused_wall_jump_continues_open_window() {
        let mut rig = Rig::new();
        rig.tick(AIR, falling());
        rig.controls.set(Button::Jump, true);
        rig.tick(LEFT_WALL, falling());
        // Still holding, still on the same wall: refused as a new push-off, but the
        // current jump keeps its impulse.
        let step = rig.tick(LEFT_WALL, Vec3::new(0.0, -116.0, 0.0));
        assert!(step.jumped);
        assert_eq!(step.velocity.y, -125.0);
        assert!(step.cues.is_empty());
    }

    #[test]
    fn test_opposite_wall_is_allowed() {
        let mut rig = Rig::new();
        rig.tick(AIR, falling());
        rig.controls.set(Button::Jump, true);
        rig.tick(LEFT_WALL, falling());
        rig.controls.set(Button::Jump, false);
        rig.tick(AIR, falling());

        rig.controls.set(Button::Jump, true);
        let step = rig.tick(RIGHT_WALL, falling());
        assert!(step.jumped);
        assert_eq!(rig.motion.last_wall_side(), Some(Facing::Right));
    }

    #[test]
    fn test_ground_contact_resets_wall_side() {
        let mut rig = Rig::new();
        rig.tick(AIR, falling());
        rig.controls.set(Button::Jump, true);
        rig.tick(LEFT_WALL, falling());
        rig.controls.set(Button::Jump, false);
        rig.tick(GROUND, Vec3::ZERO);
        assert_eq!(rig.motion.last_wall_side(), None);
        rig.tick(AIR, falling());

        rig.controls.set(Button::Jump, true);
        let step = rig.tick(LEFT_WALL, falling());
        assert!(step.jumped);
    }

    #[test]
    fn test_wall_ignored_while_grounded() {
        let mut rig = Rig::new();
        let grounded_by_wall = Contacts {
            grounded: true,
            wall_center_x: Some(-12.0),
        };
        rig.tick(grounded_by_wall, Vec3::ZERO);
        assert_ne!(rig.motion.state, MoveState::WallJump);
        rig.controls.set(Button::Jump, true);
        rig.tick(grounded_by_wall, Vec3::ZERO);
        assert_eq!(rig.motion.last_wall_side(), None);
    }

    #[test]
    fn test_landing_cue_fires_once() {
        let mut rig = Rig::new();
        rig.tick(AIR, falling());
        let land = rig.tick(GROUND, Vec3::ZERO);
        assert_eq!(land.cues, vec![Cue::Land]);
        let after = rig.tick(GROUND, Vec3::ZERO);
        assert!(after.cues.is_empty());
    }

    #[test]
    fn test_liftoff_cue_not_restarted_while_active() {
        let mut rig = Rig::new();
        rig.tick(GROUND, Vec3::ZERO);
        rig.controls.set(Button::Jump, true);
        let step = rig.motion.step(
            &rig.tuning,
            &rig.controls,
            MotionInput {
                contacts: GROUND,
                actor_x: 0.0,
                velocity: Vec3::ZERO,
                liftoff_cue_active: true,
                dt: DT,
            },
        );
        assert!(step.jumped);
        assert!(step.cues.is_empty());
    }

    #[test]
    fn test_walk_sets_state_facing_and_displacement() {
        let mut rig = Rig::new();
        rig.controls.set(Button::Left, true);
        let step = rig.tick(GROUND, Vec3::ZERO);
        assert_eq!(rig.motion.state, MoveState::Walk);
        assert_eq!(rig.motion.facing, Facing::Left);
        assert_eq!(rig.motion.focus, Facing::Left);
        assert!((step.displacement.x + 100.0 * DT).abs() < 1e-5);

        rig.controls.set(Button::Left, false);
        let step = rig.tick(GROUND, Vec3::ZERO);
        assert_eq!(rig.motion.state, MoveState::Stand);
        assert_eq!(step.displacement, Vec3::ZERO);
        assert_eq!(rig.motion.facing, Facing::Left);
    }

    #[test]
    fn test_input_ignored_while_horizontal_velocity_nonzero() {
        let mut rig = Rig::new();
        rig.controls.set(Button::Right, true);
        let step = rig.tick(AIR, Vec3::new(40.0, 10.0, 0.0));
        assert_eq!(step.displacement, Vec3::ZERO);
        assert_eq!(step.velocity.x, 40.0);
        assert_eq!(rig.motion.state, MoveState::Jump);
    }

    #[test]
    fn test_ground_friction_zeroes_drift() {
        let mut rig = Rig::new();
        rig.controls.set(Button::Right, true);
        let step = rig.tick(GROUND, Vec3::new(40.0, 0.0, 0.0));
        assert_eq!(step.velocity.x, 0.0);
        assert!(step.displacement.x > 0.0);
    }

    #[test]
    fn test_opposing_buttons_cancel() {
        let mut rig = Rig::new();
        rig.controls.set(Button::Left, true);
        rig.controls.set(Button::Right, true);
        let step = rig.tick(GROUND, Vec3::ZERO);
        assert_eq!(step.displacement, Vec3::ZERO);
        assert_eq!(rig.motion.state, MoveState::Stand);
        assert_eq!(rig.motion.focus, Facing::Right);
    }

    #[test]
    fn test_shoot_edge_emits_cue_once() {
        let mut rig = Rig::new();
        rig.controls.set(Button::Shoot, true);
        assert_eq!(rig.tick(GROUND, Vec3::ZERO).cues, vec![Cue::Shoot]);
        assert!(rig.tick(GROUND, Vec3::ZERO).cues.is_empty());
    }
}
