//! Physics collaborator.
//!
//! The scene does not simulate anything itself. Each frame it extracts the
//! nodes bound to a rigid body and hands them to a [`PhysicsSystem`], which
//! steps the simulation and writes results back with
//! [`SceneGraph::set_world_transform`].

use crate::scene::NodeHandle;
use crate::scene::graph::SceneGraph;

pub trait PhysicsExtractor {
    /// Collects physics-bound nodes of the subtree rooted at `handle`.
    fn run(&self, graph: &SceneGraph, handle: NodeHandle, bodies: &mut Vec<NodeHandle>);
}

/// Pre-order extraction of every active node carrying a rigid body.
/// Inactive nodes prune their subtree.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPhysicsExtractor;

impl PhysicsExtractor for DefaultPhysicsExtractor {
    fn run(&self, graph: &SceneGraph, handle: NodeHandle, bodies: &mut Vec<NodeHandle>) {
        let Some(node) = graph.get(handle) else {
            return;
        };
        if !node.active {
            return;
        }
        if node.rigid_body.is_some() {
            bodies.push(handle);
        }
        for &child in &node.children {
            if let Some(extractor) = graph.get(child).and_then(|c| c.physics_extractor.as_ref()) {
                extractor.run(graph, child, bodies);
            }
        }
    }
}

pub trait PhysicsSystem {
    fn start(&mut self) {}

    fn stop(&mut self) {}

    /// Advances the simulation by `dt` seconds and writes world transforms
    /// of `bodies` back into the graph.
    fn step(&mut self, dt: f64, graph: &mut SceneGraph, bodies: &[NodeHandle]);
}

/// A physics system that never moves anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPhysics;

impl PhysicsSystem for NullPhysics {
    fn step(&mut self, _dt: f64, _graph: &mut SceneGraph, _bodies: &[NodeHandle]) {}
}
