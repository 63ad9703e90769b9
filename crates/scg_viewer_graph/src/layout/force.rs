// SPDX-License-Identifier: MIT OR Apache-2.0
//! Force-directed layout of nodes and links.
//!
//! Every node and link becomes a free particle and every edge a spring.
//! An edge that ends on another edge gets a pinned "dot point" particle in
//! place of that end, held at the middle of the edge it attaches to. After
//! each step the particle positions are written back to the scene and the
//! dot points follow their edges.

use super::simulation::{Particle, Simulation, Spring};
use super::{ForceSettings, Layout};
use crate::math::{RelPos, Vector2};
use crate::object::{EdgeShape, ObjectId, ObjectKind};
use crate::scene::{Scene, SceneError};
use std::collections::HashMap;

/// Scene object a particle stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Item {
    /// A node or link, moved by the simulation
    Object(ObjectId),
    /// Point where an edge attaches to the middle of this edge
    DotPoint(ObjectId),
}

/// Force-directed layout
#[derive(Debug, Default)]
pub struct ForceLayout {
    settings: ForceSettings,
    items: Vec<Item>,
    simulation: Option<Simulation>,
}

impl ForceLayout {
    /// Create a layout with the given settings
    pub fn new(settings: ForceSettings) -> Self {
        Self {
            settings,
            items: Vec::new(),
            simulation: None,
        }
    }

    /// Layout settings
    pub fn settings(&self) -> &ForceSettings {
        &self.settings
    }

    /// Whether the layout has been started and not stopped
    pub fn is_running(&self) -> bool {
        self.simulation.is_some()
    }

    /// Underlying simulation, while running
    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    /// Dot points with the edge each one is attached to
    pub fn dot_points(&self) -> impl Iterator<Item = (ObjectId, Vector2)> + '_ {
        self.items.iter().enumerate().filter_map(|(index, item)| match item {
            Item::DotPoint(edge) => self
                .simulation
                .as_ref()
                .and_then(|s| s.position(index))
                .map(|pos| (*edge, pos)),
            Item::Object(_) => None,
        })
    }

    /// Repulsion of a particle; well-connected objects repel less
    fn charge(&self, adjacent_count: usize) -> f32 {
        -(adjacent_count as f32).max(self.settings.min_repulsion)
    }

    fn prepare(&mut self, scene: &mut Scene) -> Result<Simulation, SceneError> {
        self.items.clear();
        let mut particles = Vec::new();
        let mut index = HashMap::new();

        let points: Vec<_> = scene
            .nodes()
            .chain(scene.links())
            .map(|o| (o.id(), o.position().unwrap_or(Vector2::ZERO), o.adjacent_count()))
            .collect();
        for (id, pos, adjacent_count) in points {
            index.insert(id, particles.len());
            particles.push(Particle::free(pos, self.charge(adjacent_count)));
            self.items.push(Item::Object(id));
        }

        // Dot points sit on the middle of a straight edge, so every
        // edge-to-edge end is moved there before any dot point is seeded
        let edges: Vec<_> = scene.edges().map(|o| o.id()).collect();
        let mut ends = Vec::with_capacity(edges.len());
        for &edge in &edges {
            scene.make_edge_simple(edge)?;
            let shape = edge_shape(scene, edge)?;
            let (source, target) = (shape.source(), shape.target());
            let (mut source_rel_pos, mut target_rel_pos) =
                (shape.source_rel_pos(), shape.target_rel_pos());
            if is_edge(scene, source) {
                source_rel_pos = RelPos::MIDDLE;
            }
            if is_edge(scene, target) {
                target_rel_pos = RelPos::MIDDLE;
            }
            scene.set_edge_rel_pos(edge, source_rel_pos, target_rel_pos)?;
            ends.push([source, target]);
        }
        scene.update_all()?;

        let mut springs = Vec::with_capacity(edges.len());
        for endpoints in ends {
            let mut distance = self.settings.base_distance;
            let mut particle_ends = [0usize; 2];
            for (end, endpoint) in particle_ends.iter_mut().zip(endpoints) {
                let object = scene
                    .object(endpoint)
                    .ok_or(SceneError::ObjectNotFound(endpoint))?;
                *end = match object.kind() {
                    ObjectKind::Edge => {
                        distance -= self.settings.edge_joint_shortening;
                        let mid = edge_shape(scene, endpoint)?.mid_point();
                        let charge = self.charge(object.adjacent_count());
                        particles.push(Particle::pinned(mid, charge));
                        self.items.push(Item::DotPoint(endpoint));
                        particles.len() - 1
                    }
                    ObjectKind::Link => {
                        if let Some(link) = object.as_link() {
                            let size = link.bounds().size;
                            distance += size.x.max(size.y);
                        }
                        particle_index(&index, endpoint)?
                    }
                    ObjectKind::Node => particle_index(&index, endpoint)?,
                };
            }

            springs.push(Spring {
                source: particle_ends[0],
                target: particle_ends[1],
                distance,
            });
        }

        let center = scene.view_size() / 2.0;
        tracing::debug!(
            "Force layout prepared: {} particles, {} springs, centre {:?}",
            particles.len(),
            springs.len(),
            center
        );
        Ok(Simulation::new(particles, springs, &self.settings, center))
    }
}

fn particle_index(index: &HashMap<ObjectId, usize>, id: ObjectId) -> Result<usize, SceneError> {
    index.get(&id).copied().ok_or(SceneError::ObjectNotFound(id))
}

fn is_edge(scene: &Scene, id: ObjectId) -> bool {
    scene.object(id).is_some_and(|o| o.kind() == ObjectKind::Edge)
}

fn edge_shape(scene: &Scene, id: ObjectId) -> Result<&EdgeShape, SceneError> {
    scene
        .object(id)
        .ok_or(SceneError::ObjectNotFound(id))?
        .as_edge()
        .ok_or(SceneError::NotAnEdge(id))
}

impl Layout for ForceLayout {
    fn start(&mut self, scene: &mut Scene) -> Result<(), SceneError> {
        let simulation = self.prepare(scene)?;
        self.simulation = Some(simulation);
        Ok(())
    }

    fn tick(&mut self, scene: &mut Scene) -> Result<bool, SceneError> {
        let Some(simulation) = self.simulation.as_mut() else {
            return Ok(false);
        };
        if !simulation.is_hot() {
            return Ok(false);
        }
        simulation.step();

        // Objects come before dot points, so edges see their moved ends
        for (index, item) in self.items.iter().enumerate() {
            match *item {
                Item::Object(id) => {
                    if let Some(pos) = simulation.position(index) {
                        scene.set_position(id, pos)?;
                    }
                }
                Item::DotPoint(edge) => {
                    scene.update_object(edge)?;
                    let mid = edge_shape(scene, edge)?.mid_point();
                    simulation.pin(index, mid);
                }
            }
        }
        scene.view_update();

        let hot = simulation.is_hot();
        if !hot {
            tracing::debug!("Force layout settled");
        }
        Ok(hot)
    }

    fn stop(&mut self) {
        self.simulation = None;
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;
    use crate::sc_type::ScType;
    use crate::scene::SceneEvent;

    struct Sample {
        scene: Scene,
        a: ObjectId,
        b: ObjectId,
        c: ObjectId,
        ab: ObjectId,
        c_ab: ObjectId,
    }

    /// Nodes a, b, c, edge a -> b and edge c -> (a -> b)
    fn sample() -> Sample {
        let mut scene = Scene::new();
        let a = scene.create_node(ScType::NODE_CONST, "a", None).unwrap();
        let b = scene.create_node(ScType::NODE_CONST, "b", None).unwrap();
        let c = scene.create_node(ScType::NODE_CONST, "c", None).unwrap();
        scene.set_position(a, Vector2::new(100.0, 100.0)).unwrap();
        scene.set_position(b, Vector2::new(300.0, 100.0)).unwrap();
        scene.set_position(c, Vector2::new(200.0, 300.0)).unwrap();
        let ab = scene
            .create_edge(ScType::EDGE_ACCESS_CONST_POS_PERM, a, b, "", None)
            .unwrap();
        let c_ab = scene
            .create_edge(ScType::EDGE_ACCESS_CONST_POS_PERM, c, ab, "", None)
            .unwrap();
        scene.update_all().unwrap();
        Sample {
            scene,
            a,
            b,
            c,
            ab,
            c_ab,
        }
    }

    #[test]
    fn test_prepare_particles() {
        let Sample { mut scene, ab, c_ab, .. } = sample();
        scene.set_edge_points(ab, &[Vector2::new(200.0, 0.0)]).unwrap();

        let mut layout = ForceLayout::default();
        layout.start(&mut scene).unwrap();

        let simulation = layout.simulation().unwrap();
        // Three nodes and one dot point
        assert_eq!(simulation.particles().len(), 4);
        assert!(simulation.particles()[3].pinned.is_some());
        assert_eq!(simulation.particles()[0].charge, -100.0);

        // Edges are straightened and the joint moved to the middle
        let edge = scene.object(ab).unwrap().as_edge().unwrap();
        assert_eq!(edge.points().len(), 2);
        assert_eq!(
            scene.object(c_ab).unwrap().as_edge().unwrap().target_rel_pos(),
            RelPos::MIDDLE
        );

        let dots: Vec<_> = layout.dot_points().collect();
        assert_eq!(dots.len(), 1);
        assert_eq!(dots[0].0, ab);
        assert!(dots[0].1.approx_eq(edge.mid_point(), 1.0e-3));
    }

    #[test]
    fn test_chained_dot_points_start_on_midpoints() {
        let Sample { mut scene, c_ab, .. } = sample();
        let d = scene.create_node(ScType::NODE_CONST, "d", None).unwrap();
        scene.set_position(d, Vector2::new(400.0, 300.0)).unwrap();
        let d_c_ab = scene
            .create_edge(ScType::EDGE_ACCESS_CONST_POS_PERM, d, c_ab, "", None)
            .unwrap();
        // Off-centre joint that the layout moves to the middle
        scene.set_edge_rel_pos(c_ab, 0.0, 0.2).unwrap();
        scene.update_all().unwrap();

        let mut layout = ForceLayout::default();
        layout.start(&mut scene).unwrap();
        assert_eq!(
            scene.object(d_c_ab).unwrap().as_edge().unwrap().target_rel_pos(),
            RelPos::MIDDLE
        );

        let dots: Vec<_> = layout.dot_points().collect();
        assert_eq!(dots.len(), 2);
        for (edge, dot) in dots {
            assert!(!scene.object(edge).unwrap().is_need_update());
            let mid = scene.object(edge).unwrap().as_edge().unwrap().mid_point();
            assert!(dot.approx_eq(mid, 1.0e-3), "dot {dot:?}, mid {mid:?}");
        }
    }

    #[test]
    fn test_dot_point_follows_edge_midpoint() {
        let Sample {
            mut scene, ab, c_ab, ..
        } = sample();
        let mut layout = ForceLayout::default();
        layout.start(&mut scene).unwrap();
        assert!(layout.tick(&mut scene).unwrap());
        scene.update_all().unwrap();

        let mid = scene.object(ab).unwrap().as_edge().unwrap().mid_point();
        let (edge, dot) = layout.dot_points().next().unwrap();
        assert_eq!(edge, ab);
        assert!(dot.approx_eq(mid, 1.0e-3), "dot {dot:?}, mid {mid:?}");

        // The attached edge ends on the same point
        let end = *scene.object(c_ab).unwrap().as_edge().unwrap().points().last().unwrap();
        assert!(end.approx_eq(mid, 1.0e-3), "end {end:?}, mid {mid:?}");
    }

    #[test]
    fn test_tick_writes_positions() {
        let Sample {
            mut scene, a, b, c, ..
        } = sample();
        let events = scene.subscribe();
        let before: Vec<_> = [a, b, c]
            .iter()
            .map(|id| scene.object(*id).unwrap().position().unwrap())
            .collect();

        let mut layout = ForceLayout::default();
        layout.start(&mut scene).unwrap();
        layout.tick(&mut scene).unwrap();

        let after: Vec<_> = [a, b, c]
            .iter()
            .map(|id| scene.object(*id).unwrap().position().unwrap())
            .collect();
        assert_ne!(before, after);
        // Only edge ends are brought up to date during a tick
        assert!(scene.object(c).unwrap().is_need_update());
        assert!(events.try_iter().any(|e| e == SceneEvent::ViewUpdate));
    }

    #[test]
    fn test_run_settles_around_center() {
        let Sample { mut scene, .. } = sample();
        scene.set_view_size(Vector2::new(1000.0, 800.0));

        let mut layout = ForceLayout::default();
        layout.run(&mut scene).unwrap();
        assert!(!layout.tick(&mut scene).unwrap());
        scene.update_all().unwrap();

        let positions: Vec<_> = scene.nodes().filter_map(|o| o.position()).collect();
        let mean = positions.iter().fold(Vector2::ZERO, |acc, p| acc + *p) / positions.len() as f32;
        // The dot point also counts towards the centre of mass
        assert!(mean.dist(Vector2::new(500.0, 400.0)) < 100.0, "mean {mean:?}");
        for (i, p) in positions.iter().enumerate() {
            for q in &positions[i + 1..] {
                assert!(p.dist(*q) > 10.0);
            }
        }
    }

    #[test]
    fn test_link_lengthens_spring() {
        let mut scene = Scene::new();
        let node = scene.create_node(ScType::NODE_CONST, "", None).unwrap();
        let link = scene
            .create_link(ScType::LINK_CONST, "", None, Some(&Content::from_text("wide content")))
            .unwrap();
        scene
            .create_edge(ScType::EDGE_DCOMMON_CONST, node, link, "", None)
            .unwrap();
        scene.set_position(link, Vector2::new(50.0, 0.0)).unwrap();
        scene.update_all().unwrap();
        let width = scene.object(link).unwrap().as_link().unwrap().bounds().size.x;

        let mut layout = ForceLayout::default();
        layout.run(&mut scene).unwrap();
        scene.update_all().unwrap();

        let distance = scene
            .object(node)
            .unwrap()
            .position()
            .unwrap()
            .dist(scene.object(link).unwrap().position().unwrap());
        assert!(distance > 100.0 + width * 0.5, "distance {distance}, width {width}");
    }

    #[test]
    fn test_stop() {
        let Sample { mut scene, .. } = sample();
        let mut layout = ForceLayout::default();
        assert!(!layout.tick(&mut scene).unwrap());

        layout.start(&mut scene).unwrap();
        assert!(layout.is_running());
        layout.stop();
        assert!(!layout.is_running());
        assert!(!layout.tick(&mut scene).unwrap());
        assert_eq!(layout.dot_points().count(), 0);
    }
}
