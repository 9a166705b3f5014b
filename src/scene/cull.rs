//! Visibility culling.
//!
//! A [`Culler`] decides whether its node lands in a camera's drawable
//! bucket and whether the traversal descends into the node's children.

use crate::scene::NodeHandle;
use crate::scene::camera::Camera;
use crate::scene::graph::SceneGraph;
use crate::scene::node::Node;

pub trait Culler {
    /// Appends drawable nodes of the subtree rooted at `handle` to `bucket`,
    /// in pre-order.
    fn run(
        &self,
        graph: &SceneGraph,
        camera: &Camera,
        handle: NodeHandle,
        bucket: &mut Vec<NodeHandle>,
    );
}

/// Frustum culler.
///
/// - an inactive node prunes its whole subtree
/// - a node outside the frustum is not added, but its children are still
///   visited with their own cullers
/// - a visible node with a mesh is appended
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCuller;

impl Culler for DefaultCuller {
    fn run(
        &self,
        graph: &SceneGraph,
        camera: &Camera,
        handle: NodeHandle,
        bucket: &mut Vec<NodeHandle>,
    ) {
        let Some(node) = graph.get(handle) else {
            return;
        };
        if !node.active {
            return;
        }
        if node.mesh.is_some() && node.world_bounds.in_frustum(camera.frustum()) {
            bucket.push(handle);
        }
        cull_children(graph, camera, node, bucket);
    }
}

/// Skips the frustum test. Used for overlays and full-screen geometry.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysPassCuller;

impl Culler for AlwaysPassCuller {
    fn run(
        &self,
        graph: &SceneGraph,
        camera: &Camera,
        handle: NodeHandle,
        bucket: &mut Vec<NodeHandle>,
    ) {
        let Some(node) = graph.get(handle) else {
            return;
        };
        if !node.active {
            return;
        }
        if node.mesh.is_some() {
            bucket.push(handle);
        }
        cull_children(graph, camera, node, bucket);
    }
}

/// Runs each child's own culler. Children without one are skipped with
/// their subtree.
pub fn cull_children(
    graph: &SceneGraph,
    camera: &Camera,
    node: &Node,
    bucket: &mut Vec<NodeHandle>,
) {
    for &child in &node.children {
        if let Some(culler) = graph.get(child).and_then(|c| c.culler.as_ref()) {
            culler.run(graph, camera, child, bucket);
        }
    }
}
