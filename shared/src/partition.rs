//! Broad-phase partitioner.
//!
//! Maps query boxes to the registered objects overlapping them, per category. Two kinds of
//! sources feed a category:
//! - objects registered one by one (actor probes, projectiles, loose solids)
//! - providers: closures that answer queries lazily from live map data (tile layers)
//!
//! Everything returned is a weak [`NodeId`]. Sources may hand back handles to nodes that
//! were destroyed after registration; those are dropped here and never reach callers.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::category::{Category, CategoryPair};
use crate::geometry::WorldBox;
use crate::matrix::PairHandler;
use crate::scene::{NodeId, Scene};

/// Lazily answers "which nodes of my category might overlap this box?".
pub type Provider = Box<dyn Fn(&Scene, &WorldBox) -> Vec<NodeId> + Send + Sync>;

/// One overlapping pair whose categories matched a registered handler.
///
/// Passed by value to dispatch; `a` always belongs to `pair.a`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionEvent {
    pub a: NodeId,
    pub b: NodeId,
    pub pair: CategoryPair,
    pub handler: PairHandler,
}

#[derive(Default)]
pub struct Partitioner {
    objects: HashMap<Category, Vec<NodeId>>,
    providers: HashMap<Category, Vec<Provider>>,
    handlers: Vec<(CategoryPair, PairHandler)>,
}

impl Partitioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_object(&mut self, node: NodeId, category: Category) {
        let list = self.objects.entry(category).or_default();
        if !list.contains(&node) {
            list.push(node);
        }
    }

    pub fn deregister_object(&mut self, node: NodeId) {
        for list in self.objects.values_mut() {
            list.retain(|n| *n != node);
        }
    }

    pub fn register_provider(&mut self, category: Category, provider: Provider) {
        self.providers.entry(category).or_default().push(provider);
    }

    /// Watch `(a, b)` overlaps and route them to `handler`. Re-registering a pair replaces it.
    pub fn on_collision(&mut self, a: Category, b: Category, handler: PairHandler) {
        let pair = CategoryPair::new(a, b);
        if let Some(entry) = self.handlers.iter_mut().find(|(p, _)| *p == pair) {
            entry.1 = handler;
        } else {
            self.handlers.push((pair, handler));
        }
    }

    pub fn handler_for(&self, a: Category, b: Category) -> Option<PairHandler> {
        let pair = CategoryPair::new(a, b);
        self.handlers.iter().find(|(p, _)| *p == pair).map(|(_, h)| *h)
    }

    /// Live registered objects of a category, in registration order.
    pub fn objects(&self, category: Category) -> impl Iterator<Item = NodeId> + '_ {
        self.objects.get(&category).into_iter().flatten().copied()
    }

    pub fn num_providers(&self, category: Category) -> usize {
        self.providers.get(&category).map_or(0, Vec::len)
    }

    /// Every live node of `category` whose world box overlaps `query`.
    ///
    /// Sorted by handle and deduplicated, so results are stable across runs.
    pub fn query(&self, scene: &Scene, query: &WorldBox, category: Category) -> Vec<NodeId> {
        let mut found = BTreeSet::new();

        for node in self.objects(category) {
            if scene.world_box(node).is_some_and(|b| b.collides(query)) {
                found.insert(node);
            }
        }

        if let Some(providers) = self.providers.get(&category) {
            for provider in providers {
                for node in provider(scene, query) {
                    // Dead weak references are silently skipped.
                    if scene.world_box(node).is_some_and(|b| b.collides(query)) {
                        found.insert(node);
                    }
                }
            }
        }

        found.into_iter().collect()
    }

    /// Nodes of `category` currently overlapping `probe`'s world box.
    pub fn get_collisions_for(&self, scene: &Scene, probe: NodeId, category: Category) -> Vec<NodeId> {
        let Some(probe_box) = scene.world_box(probe) else {
            return Vec::new();
        };
        let mut hits = self.query(scene, &probe_box, category);
        hits.retain(|n| *n != probe);
        hits
    }

    /// Run one detection pass and collect every overlapping watched pair.
    ///
    /// A node pair is reported at most once per pass, even if it matches through several
    /// sources. Providers only answer for the `b` side since they need a query box.
    pub fn detect(&self, scene: &Scene) -> Vec<CollisionEvent> {
        let mut events = Vec::new();
        let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();

        for &(pair, handler) in &self.handlers {
            for a in self.objects(pair.a) {
                if !scene.is_alive(a) {
                    continue;
                }
                for b in self.get_collisions_for(scene, a, pair.b) {
                    let key = if a < b { (a, b) } else { (b, a) };
                    if seen.insert(key) {
                        events.push(CollisionEvent { a, b, pair, handler });
                    }
                }
            }
        }

        events
    }

    /// Drop handles to destroyed nodes from the registration lists.
    pub fn prune(&mut self, scene: &Scene) {
        for list in self.objects.values_mut() {
            list.retain(|n| scene.is_alive(*n));
        }
    }

    /// Forget every registration, provider and handler.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.providers.clear();
        self.handlers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::prelude::*;
    use std::sync::Arc;

    fn boxed(scene: &mut Scene, name: &str, min: Vec3, max: Vec3) -> NodeId {
        let id = scene.spawn(name);
        scene.set_local_box(id, WorldBox::new(min, max));
        id
    }

    #[test]
    fn test_registered_object_query() {
        let mut scene = Scene::new();
        let wall = boxed(&mut scene, "wall", Vec3::new(0.0, 0.0, -5.0), Vec3::new(16.0, 16.0, 5.0));
        let probe = boxed(&mut scene, "probe", Vec3::new(10.0, 10.0, -5.0), Vec3::new(20.0, 20.0, 5.0));

        let mut part = Partitioner::new();
        part.register_object(wall, Category::Static);
        part.register_object(probe, Category::Character);

        assert_eq!(part.get_collisions_for(&scene, probe, Category::Static), vec![wall]);
        assert!(part.get_collisions_for(&scene, probe, Category::Fatal).is_empty());
    }

    #[test]
    fn test_provider_skips_destroyed_nodes() {
        let mut scene = Scene::new();
        let a = boxed(&mut scene, "a", Vec3::new(0.0, 0.0, -5.0), Vec3::new(16.0, 16.0, 5.0));
        let b = boxed(&mut scene, "b", Vec3::new(16.0, 0.0, -5.0), Vec3::new(32.0, 16.0, 5.0));
        let backing = Arc::new(vec![a, b]);

        let mut part = Partitioner::new();
        let source = backing.clone();
        part.register_provider(Category::Static, Box::new(move |_: &Scene, _: &WorldBox| source.to_vec()));

        let everything = WorldBox::new(Vec3::splat(-100.0), Vec3::splat(100.0));
        assert_eq!(part.query(&scene, &everything, Category::Static), vec![a, b]);

        scene.destroy(a);
        assert_eq!(part.query(&scene, &everything, Category::Static), vec![b]);

        scene.destroy(b);
        assert!(part.query(&scene, &everything, Category::Static).is_empty());
    }

    #[test]
    fn test_detect_reports_pair_once() {
        let mut scene = Scene::new();
        let wall = boxed(&mut scene, "wall", Vec3::new(0.0, 0.0, -5.0), Vec3::new(16.0, 16.0, 5.0));
        let probe = boxed(&mut scene, "probe", Vec3::new(10.0, 10.0, -5.0), Vec3::new(20.0, 20.0, 5.0));

        let mut part = Partitioner::new();
        part.register_object(wall, Category::Static);
        // Same node reachable through a provider too.
        part.register_provider(Category::Static, Box::new(move |_: &Scene, _: &WorldBox| vec![wall]));
        part.register_object(probe, Category::Character);
        part.on_collision(Category::Character, Category::Static, PairHandler::Solid);

        let events = part.detect(&scene);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].a, probe);
        assert_eq!(events[0].b, wall);
        assert_eq!(events[0].handler, PairHandler::Solid);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut scene = Scene::new();
        let wall = boxed(&mut scene, "wall", Vec3::ZERO, Vec3::ONE);
        let mut part = Partitioner::new();
        part.register_object(wall, Category::Static);
        part.on_collision(Category::Character, Category::Static, PairHandler::Solid);
        part.clear();
        assert_eq!(part.objects(Category::Static).count(), 0);
        assert!(part.handler_for(Category::Character, Category::Static).is_none());
    }
}
