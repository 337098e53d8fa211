//! Level description and setup.
//!
//! A level is a RON document with tile layers and free-standing objects. Building it
//! creates scene nodes for the tile geometry and registers everything collidable with the
//! partitioner:
//! - layers flagged `depth` get one provider per category (STATIC, LEDGE, FATAL) backed by
//!   a spatial grid of that layer's tile masks; tiles are never registered one by one
//! - tiles or objects outside depth layers that carry their own `depth`/`fatal` flag are
//!   registered individually
//! - objects named `player_start` become hidden spawn markers
//! - objects flagged `thing` become falling, interactive THING bodies

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::category::Category;
use crate::geometry::WorldBox;
use crate::partition::Partitioner;
use crate::scene::{NodeId, Scene};
use crate::spatial::SpatialGrid;
use crate::tuning::Tuning;

pub const LEVEL_VERSION: u32 = 1;
pub const DEFAULT_TILE_SIZE: f32 = 16.0;

/// Object name that marks a spawn point.
pub const SPAWN_MARKER: &str = "player_start";

/// Near-plane Z of custom masks. Keeps them inside actor probe depth.
const MASK_Z_MIN: f32 = 5.0e-5;
const MASK_Z_MAX: f32 = 0.5;

fn one() -> u32 {
    1
}

fn default_tile_size() -> f32 {
    DEFAULT_TILE_SIZE
}

fn default_object_size() -> f32 {
    DEFAULT_TILE_SIZE
}

/// Per-tile or per-object flags.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Props {
    /// Collidable even outside a depth layer.
    pub depth: bool,
    pub fatal: bool,
    /// One-way platform.
    pub ledge: bool,
    /// Movable interactive object.
    pub thing: bool,
    /// Collision rectangle `[x0, y0, x1, y1]` in unit tile space.
    pub mask: Option<[f32; 4]>,
    pub hflip: bool,
    pub vflip: bool,
}

impl Props {
    /// Which category a collidable with these flags registers under.
    pub fn category(&self) -> Category {
        if self.fatal {
            Category::Fatal
        } else if self.ledge {
            Category::Ledge
        } else {
            Category::Static
        }
    }

    /// Collision box in unit space, flips applied.
    pub fn unit_mask(&self) -> WorldBox {
        let mut mask = match self.mask {
            Some([x0, y0, x1, y1]) => WorldBox::new(
                Vec3::new(x0, y0, MASK_Z_MIN),
                Vec3::new(x1, y1, MASK_Z_MAX),
            ),
            None => WorldBox::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(1.0, 1.0, 5.0)),
        };
        if self.hflip {
            mask.min.x = 1.0 - mask.min.x;
            mask.max.x = 1.0 - mask.max.x;
        }
        if self.vflip {
            mask.min.y = 1.0 - mask.min.y;
            mask.max.y = 1.0 - mask.max.y;
        }
        mask.normalized()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileDef {
    /// Tile column.
    pub x: i32,
    /// Tile row.
    pub y: i32,
    /// Number of identical tiles laid out to the right.
    #[serde(default = "one")]
    pub run: u32,
    #[serde(default)]
    pub props: Props,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerDef {
    pub name: String,
    #[serde(default)]
    pub depth: bool,
    #[serde(default)]
    pub tiles: Vec<TileDef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectDef {
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_object_size")]
    pub width: f32,
    #[serde(default = "default_object_size")]
    pub height: f32,
    #[serde(default)]
    pub props: Props,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelDef {
    pub version: u32,
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    #[serde(default)]
    pub layers: Vec<LayerDef>,
    #[serde(default)]
    pub objects: Vec<ObjectDef>,
}

/// Parse a level from RON text.
pub fn load_level_from_str(text: &str) -> Result<LevelDef, String> {
    let def: LevelDef = ron::from_str(text).map_err(|e| format!("level parse failed: {e}"))?;
    if def.version != LEVEL_VERSION {
        return Err(format!(
            "Unsupported level version {} (expected {})",
            def.version, LEVEL_VERSION
        ));
    }
    if def.tile_size <= 0.0 {
        return Err(format!("Tile size must be positive (got {})", def.tile_size));
    }
    Ok(def)
}

/// Load a level from a RON file.
pub fn load_level_from_file(path: impl AsRef<Path>) -> Result<LevelDef, String> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| format!("failed to read {path:?}: {e}"))?;
    load_level_from_str(&text)
}

/// A built tile layer.
#[derive(Clone, Debug)]
pub struct TileLayer {
    pub name: String,
    pub node: NodeId,
    /// Collision masks served through providers, per category.
    pub colliders: HashMap<Category, usize>,
}

/// Handles to everything a level build created.
#[derive(Clone, Debug)]
pub struct Level {
    /// Owns all tile and solid geometry.
    pub root: NodeId,
    pub layers: Vec<TileLayer>,
    pub spawns: Vec<Vec3>,
    pub things: Vec<NodeId>,
    /// Individually registered collision masks.
    pub solids: Vec<NodeId>,
}

impl Level {
    pub fn first_spawn(&self) -> Option<Vec3> {
        self.spawns.first().copied()
    }

    /// Destroy every node the level created. Registrations must be cleared separately.
    pub fn teardown(&self, scene: &mut Scene) {
        for thing in &self.things {
            scene.destroy(*thing);
        }
        scene.destroy(self.root);
    }
}

/// Attach a collision mask under `parent`, sized by `scale`.
fn attach_mask(scene: &mut Scene, parent: NodeId, props: &Props, scale: Vec3) -> Option<NodeId> {
    let mask = scene.spawn_child(parent, "mask")?;
    scene.set_local_box(mask, props.unit_mask().scaled(scale));
    Some(mask)
}

/// Create the level's nodes and register its geometry.
pub fn build_level(
    def: &LevelDef,
    scene: &mut Scene,
    partitioner: &mut Partitioner,
    tuning: &Tuning,
) -> Level {
    let root = scene.spawn("map");
    let mut level = Level {
        root,
        layers: Vec::new(),
        spawns: Vec::new(),
        things: Vec::new(),
        solids: Vec::new(),
    };
    let tile_scale = Vec3::new(def.tile_size, def.tile_size, 1.0);

    for layer_def in &def.layers {
        let Some(layer_node) = scene.spawn_child(root, layer_def.name.clone()) else {
            continue;
        };
        let mut grids: HashMap<Category, SpatialGrid<NodeId>> = HashMap::new();

        for tile in &layer_def.tiles {
            for i in 0..tile.run.max(1) {
                let Some(tile_node) = scene.spawn_child(layer_node, "tile") else {
                    continue;
                };
                let column = tile.x + i as i32;
                scene.set_position(
                    tile_node,
                    Vec3::new(column as f32 * def.tile_size, tile.y as f32 * def.tile_size, 0.0),
                );

                if !(layer_def.depth || tile.props.depth || tile.props.fatal) {
                    continue;
                }
                let Some(mask) = attach_mask(scene, tile_node, &tile.props, tile_scale) else {
                    continue;
                };
                let category = tile.props.category();
                if layer_def.depth {
                    if let Some(bounds) = scene.world_box(mask) {
                        grids.entry(category).or_default().insert(bounds, mask);
                    }
                } else {
                    partitioner.register_object(mask, category);
                    level.solids.push(mask);
                }
            }
        }

        let mut colliders = HashMap::new();
        for (category, grid) in grids {
            colliders.insert(category, grid.len());
            partitioner.register_provider(
                category,
                Box::new(move |_: &Scene, query: &WorldBox| {
                    grid.query(query).map(|entry| entry.value).collect::<Vec<_>>()
                }),
            );
        }
        level.layers.push(TileLayer {
            name: layer_def.name.clone(),
            node: layer_node,
            colliders,
        });
    }

    for object in &def.objects {
        let at = Vec3::new(object.x, object.y, 0.0);

        if object.name == SPAWN_MARKER {
            if let Some(marker) = scene.spawn_child(root, SPAWN_MARKER) {
                scene.set_position(marker, at);
                if let Some(node) = scene.node_mut(marker) {
                    node.visible = false;
                }
            }
            level.spawns.push(at);
            continue;
        }

        if object.props.thing {
            let thing = scene.spawn(object.name.clone());
            scene.set_position(thing, at);
            scene.set_local_box(
                thing,
                WorldBox::new(
                    Vec3::new(0.0, 0.0, -5.0),
                    Vec3::new(object.width, object.height, 5.0),
                ),
            );
            scene.set_acceleration(thing, Vec3::new(0.0, tuning.gravity, 0.0));
            partitioner.register_object(thing, Category::Thing);
            level.things.push(thing);
        } else if object.props.depth || object.props.fatal {
            let Some(node) = scene.spawn_child(root, object.name.clone()) else {
                continue;
            };
            scene.set_position(node, at);
            let scale = Vec3::new(object.width, object.height, 1.0);
            if let Some(mask) = attach_mask(scene, node, &object.props, scale) {
                partitioner.register_object(mask, object.props.category());
                level.solids.push(mask);
            }
        }
    }

    let tile_colliders: usize = level
        .layers
        .iter()
        .flat_map(|l| l.colliders.values())
        .sum();
    info!(
        "Level built: {} layers, {} tile colliders, {} solids, {} things, {} spawns",
        level.layers.len(),
        tile_colliders,
        level.solids.len(),
        level.things.len(),
        level.spawns.len()
    );

    level
}
