//! Category collision matrix.
//!
//! Every watched category pair maps to one [`PairHandler`] variant. The partitioner
//! reports overlaps as [`CollisionEvent`] values; [`PairHandler::handle`] applies the
//! pair's behavior against a [`Dispatch`] context that borrows exactly the state a
//! handler may touch.
//!
//! Handlers may run against geometry an earlier event in the same pass already
//! corrected, so each of them re-checks the overlap before acting.

use bevy::prelude::*;

use crate::category::Category;
use crate::cues::{Cue, CueQueue};
use crate::partition::{CollisionEvent, Partitioner};
use crate::resolver::{resolve_to_static, Correction};
use crate::scene::{NodeId, Scene};

/// Behavior bound to a category pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairHandler {
    /// Push the `a` side's owner out of `b`.
    Solid,
    /// Like [`PairHandler::Solid`], but only when landing from above.
    OneWay,
    /// Respawn the `a` side's owner.
    Fatal,
    /// Remove the projectile side of the pair.
    Projectile,
    /// Tell the thing on the `b` side it was touched.
    Interaction,
}

/// Interaction notices for the host. The core never decides what a thing does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThingEvent {
    /// An actor's body overlapped the thing.
    Touched { thing: NodeId, actor: NodeId },
    /// A projectile hit the thing. The projectile is already scheduled for removal.
    Shot { thing: NodeId, bullet: NodeId },
}

/// What a single dispatch did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing applied (already resolved, approached a ledge from below, ...).
    Ignored,
    Corrected(Correction),
    /// The actor was moved back to its spawn.
    Respawned(NodeId),
    /// The projectile was scheduled for removal.
    Removed(NodeId),
    Notified(ThingEvent),
}

/// State a handler may read or mutate during a detection pass.
pub struct Dispatch<'a> {
    pub scene: &'a mut Scene,
    pub partitioner: &'a Partitioner,
    pub cues: &'a mut CueQueue,
    pub things: &'a mut Vec<ThingEvent>,
    /// Destroyed after the pass, so later events never see a half-removed node.
    pub removals: &'a mut Vec<NodeId>,
    /// Respawn target, if the level has one.
    pub spawn: Option<Vec3>,
}

/// The watched pairs and their handlers.
pub struct CollisionMatrix;

impl CollisionMatrix {
    pub const STANDARD: [(Category, Category, PairHandler); 8] = [
        (Category::Character, Category::Static, PairHandler::Solid),
        (Category::Character, Category::Ledge, PairHandler::OneWay),
        (Category::Character, Category::Fatal, PairHandler::Fatal),
        (Category::Thing, Category::Static, PairHandler::Solid),
        (Category::Thing, Category::Fatal, PairHandler::Solid),
        (Category::Thing, Category::Bullet, PairHandler::Projectile),
        (Category::Character, Category::Thing, PairHandler::Interaction),
        (Category::Bullet, Category::Static, PairHandler::Projectile),
    ];

    /// Register every standard pair on `partitioner`.
    pub fn install(partitioner: &mut Partitioner) {
        for (a, b, handler) in Self::STANDARD {
            partitioner.on_collision(a, b, handler);
        }
    }
}

fn overlapping(scene: &Scene, a: NodeId, b: NodeId) -> bool {
    match (scene.world_box(a), scene.world_box(b)) {
        (Some(a), Some(b)) => a.collides(&b),
        _ => false,
    }
}

impl PairHandler {
    pub fn handle(self, event: &CollisionEvent, ctx: &mut Dispatch) -> Outcome {
        let (a, b) = (event.a, event.b);
        if !ctx.scene.is_alive(a) || !ctx.scene.is_alive(b) {
            return Outcome::Ignored;
        }

        match self {
            PairHandler::Solid => {
                match resolve_to_static(ctx.scene, ctx.partitioner, a, b, None) {
                    Correction::Clear => Outcome::Ignored,
                    other => Outcome::Corrected(other),
                }
            }
            PairHandler::OneWay => {
                let mover = ctx.scene.owner(a);
                let falling = ctx.scene.velocity(mover).is_some_and(|v| v.y >= 0.0);
                // The probe's bottom edge, not the origin, must have been clear of the ledge top.
                let from_above = match (
                    ctx.scene.snapshot_at(mover, 0),
                    ctx.scene.world_box(a),
                    ctx.scene.world_position(mover),
                    ctx.scene.world_box(b),
                ) {
                    (Some(last), Some(probe), Some(now), Some(ledge)) => {
                        last.world_position.y + (probe.max.y - now.y) <= ledge.min.y
                    }
                    _ => false,
                };
                if !(falling && from_above) {
                    return Outcome::Ignored;
                }
                match resolve_to_static(ctx.scene, ctx.partitioner, a, b, Some(mover)) {
                    Correction::Clear => Outcome::Ignored,
                    other => Outcome::Corrected(other),
                }
            }
            PairHandler::Fatal => {
                if !overlapping(ctx.scene, a, b) {
                    return Outcome::Ignored;
                }
                let actor = ctx.scene.owner(a);
                ctx.cues.play(Cue::Death);
                match ctx.spawn {
                    Some(spawn) => {
                        debug!("Fatal contact for {:?}; respawning at {:?}", actor, spawn);
                        ctx.scene.set_world_position(actor, spawn);
                    }
                    None => warn!("Fatal contact for {:?} but the level has no spawn point", actor),
                }
                ctx.scene.set_velocity(actor, Vec3::ZERO);
                ctx.scene.clear_snapshots(actor);
                Outcome::Respawned(actor)
            }
            PairHandler::Projectile => {
                let (bullet_probe, other) = if event.pair.a == Category::Bullet { (a, b) } else { (b, a) };
                let bullet = ctx.scene.owner(bullet_probe);
                if ctx.removals.contains(&bullet) {
                    return Outcome::Ignored;
                }
                ctx.removals.push(bullet);
                if event.pair.a == Category::Bullet {
                    debug!("Projectile {:?} hit solid geometry", bullet);
                    ctx.cues.play(Cue::Impact);
                    Outcome::Removed(bullet)
                } else {
                    let notice = ThingEvent::Shot {
                        thing: ctx.scene.owner(other),
                        bullet,
                    };
                    ctx.things.push(notice);
                    Outcome::Notified(notice)
                }
            }
            PairHandler::Interaction => {
                let notice = ThingEvent::Touched {
                    thing: ctx.scene.owner(b),
                    actor: ctx.scene.owner(a),
                };
                ctx.things.push(notice);
                Outcome::Notified(notice)
            }
        }
    }
}

/// Run one detection pass and hand every event to its handler.
///
/// Events are snapshotted up front; handlers mutate positions while the list is walked.
pub fn dispatch_all(ctx: &mut Dispatch) -> Vec<Outcome> {
    let events = ctx.partitioner.detect(ctx.scene);
    events
        .iter()
        .map(|event| event.handler.handle(event, ctx))
        .collect()
}
