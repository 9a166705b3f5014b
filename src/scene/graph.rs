//! Scene Graph
//!
//! Owns every node of a scene in a [`SlotMap`] arena and implements the
//! hierarchy, transform and bounds propagation on top of it.
//!
//! # Dirty tracking
//!
//! - `translate` / `rotate` / `set_world_transform` recompute the node's own
//!   world matrix immediately, flag `dirty_transform` so descendants are
//!   refreshed by the next [`update`](SceneGraph::update), and mark
//!   `dirty_bounds` on the node and every ancestor up to the root.
//! - `scale` recomputes the node's bounds eagerly.
//! - `update` walks pre-order for transforms and post-order for bounds, so a
//!   parent always aggregates freshly computed child bounds.
//!
//! After `update` every node satisfies
//! `world_transform == parent.world_transform * transform` and
//! `world_bounds == bounds.transformed(world_transform)`.

use std::sync::Arc;

use glam::{DMat4, DVec3};
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::errors::{CanopyError, Result};
use crate::resources::mesh::Mesh;
use crate::scene::NodeHandle;
use crate::scene::bounds::Aabb;
use crate::scene::input::InputState;
use crate::scene::light::Light;
use crate::scene::node::Node;

type ChildList = SmallVec<[NodeHandle; 8]>;

pub struct SceneGraph {
    nodes: SlotMap<NodeHandle, Node>,
    root: NodeHandle,
}

impl SceneGraph {
    #[must_use]
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(root_name));
        Self { nodes, root }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocates a detached node. Attach it with [`add_child`](Self::add_child).
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeHandle {
        self.nodes.insert(Node::new(name))
    }

    /// Allocates a node and attaches it under `parent`.
    pub fn create_child(
        &mut self,
        parent: NodeHandle,
        name: impl Into<String>,
    ) -> Result<NodeHandle> {
        let child = self.create_node(name);
        if let Err(e) = self.add_child(parent, child) {
            self.nodes.remove(child);
            return Err(e);
        }
        Ok(child)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(handle)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    /// Mutable node access for data that does not feed into transforms or
    /// bounds (name, active flag, material, behaviours).
    #[inline]
    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    pub fn node(&self, handle: NodeHandle) -> Result<&Node> {
        self.nodes.get(handle).ok_or(CanopyError::NodeNotFound)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &Node)> {
        self.nodes.iter()
    }

    fn name_of(&self, handle: NodeHandle) -> String {
        self.nodes
            .get(handle)
            .map_or_else(|| "<stale>".to_string(), |n| n.name.clone())
    }

    fn children_of(&self, handle: NodeHandle) -> ChildList {
        self.nodes
            .get(handle)
            .map(|n| n.children.iter().copied().collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// `true` if `ancestor` is `node` or lies on its parent chain.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut cursor = Some(node);
        while let Some(h) = cursor {
            if h == ancestor {
                return true;
            }
            cursor = self.nodes.get(h).and_then(|n| n.parent);
        }
        false
    }

    /// Attaches a detached `child` under `parent`.
    ///
    /// The child's world transform is recomputed against the new parent and
    /// the parent chain is flagged for a bounds refresh.
    pub fn add_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()> {
        if !self.contains(parent) {
            return Err(CanopyError::NodeNotFound);
        }
        let current_parent = self.node(child)?.parent;

        if self.is_ancestor(child, parent) {
            let (child, parent) = (self.name_of(child), self.name_of(parent));
            log::warn!("Refusing to attach '{child}' under its own descendant '{parent}'");
            return Err(CanopyError::CyclicAttach { child, parent });
        }
        if let Some(existing) = current_parent {
            return Err(CanopyError::NodeAlreadyAttached {
                child: self.name_of(child),
                parent: self.name_of(existing),
            });
        }

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.dirty_transform = true;
        }
        self.update_transforms(child);
        self.mark_bounds_dirty(parent);
        Ok(())
    }

    /// Detaches `child` from `parent`. The child keeps its subtree and its
    /// local transform and becomes a detached root.
    ///
    /// Returns `false` if `child` was not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<bool> {
        let p = self.nodes.get_mut(parent).ok_or(CanopyError::NodeNotFound)?;
        let Some(index) = p.children.iter().position(|&c| c == child) else {
            return Ok(false);
        };
        p.children.remove(index);

        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
        }
        self.invalidate_subtree(child);
        self.update_transforms(child);
        self.mark_bounds_dirty(parent);
        Ok(true)
    }

    /// Destroys every descendant of `handle`. Mesh and behaviour references are
    /// dropped before each node is unlinked and freed.
    ///
    /// Returns the number of nodes freed.
    pub fn remove_children(&mut self, handle: NodeHandle) -> Result<usize> {
        let node = self.nodes.get_mut(handle).ok_or(CanopyError::NodeNotFound)?;
        let mut stack: Vec<NodeHandle> = std::mem::take(&mut node.children);
        let mut freed = 0;

        while let Some(h) = stack.pop() {
            if let Some(mut child) = self.nodes.remove(h) {
                child.clear_references();
                child.parent = None;
                stack.append(&mut child.children);
                freed += 1;
            }
        }

        self.mark_bounds_dirty(handle);
        Ok(freed)
    }

    /// Detaches `handle` from its parent and frees it together with its
    /// subtree. The root can only be emptied, never destroyed.
    pub fn destroy(&mut self, handle: NodeHandle) -> Result<usize> {
        if handle == self.root {
            log::warn!("Scene root cannot be destroyed, removing its children instead");
            return self.remove_children(handle);
        }
        if let Some(parent) = self.node(handle)?.parent {
            self.remove_child(parent, handle)?;
        }
        let freed = self.remove_children(handle)?;
        if let Some(mut node) = self.nodes.remove(handle) {
            node.clear_references();
        }
        Ok(freed + 1)
    }

    /// Marks every node of the subtree for a transform and bounds refresh.
    fn invalidate_subtree(&mut self, handle: NodeHandle) {
        let mut stack: ChildList = SmallVec::new();
        stack.push(handle);
        while let Some(h) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(h) {
                node.dirty_transform = true;
                node.dirty_bounds = true;
                stack.extend(node.children.iter().copied());
            }
        }
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    /// Recomputes the node's world matrix (and its inverse) from its parent's
    /// cached world matrix.
    fn update_transforms(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        let parent_world = node
            .parent
            .and_then(|p| self.nodes.get(p))
            .map(|p| p.world_transform);

        let Some(node) = self.nodes.get_mut(handle) else {
            return;
        };
        node.world_transform = match parent_world {
            Some(pw) => pw * node.transform,
            None => node.transform,
        };
        node.inverse_world_transform = node.world_transform.inverse();
    }

    /// Post-multiplies the local transform by `matrix`.
    fn apply_local(&mut self, handle: NodeHandle, matrix: DMat4) -> bool {
        let Some(node) = self.nodes.get_mut(handle) else {
            log::warn!("Transform applied to a stale node handle");
            return false;
        };
        node.transform *= matrix;
        node.dirty_transform = true;
        self.update_transforms(handle);
        true
    }

    /// Moves the node by `offset` in its own local frame.
    pub fn translate(&mut self, handle: NodeHandle, offset: DVec3) {
        if self.apply_local(handle, DMat4::from_translation(offset)) {
            self.mark_bounds_dirty(handle);
        }
    }

    /// Rotates the node by `angle_degrees` around `axis` (local frame).
    /// A zero axis is a no-op.
    pub fn rotate(&mut self, handle: NodeHandle, angle_degrees: f64, axis: DVec3) {
        let Some(axis) = axis.try_normalize() else {
            return;
        };
        let rotation = DMat4::from_axis_angle(axis, angle_degrees.to_radians());
        if self.apply_local(handle, rotation) {
            self.mark_bounds_dirty(handle);
        }
    }

    /// Scales the node in its local frame. Bounds of the node's subtree are
    /// resolved right away; its ancestors are flagged.
    pub fn scale(&mut self, handle: NodeHandle, factors: DVec3) {
        if self.apply_local(handle, DMat4::from_scale(factors)) {
            self.mark_bounds_dirty(handle);
            self.resolve_bounds(handle);
        }
    }

    /// Replaces the local transform.
    pub fn set_transform(&mut self, handle: NodeHandle, local: DMat4) {
        let Some(node) = self.nodes.get_mut(handle) else {
            log::warn!("Transform set on a stale node handle");
            return;
        };
        node.transform = local;
        node.dirty_transform = true;
        self.update_transforms(handle);
        self.mark_bounds_dirty(handle);
    }

    /// Places the node so that its world transform equals `world`.
    ///
    /// The local transform becomes `parent.inverse_world_transform * world`
    /// (or `world` itself for a detached node). Used by physics write-back.
    pub fn set_world_transform(&mut self, handle: NodeHandle, world: DMat4) {
        let Some(node) = self.nodes.get(handle) else {
            log::warn!("World transform set on a stale node handle");
            return;
        };
        let parent_inverse = node
            .parent
            .and_then(|p| self.nodes.get(p))
            .map(|p| p.inverse_world_transform);

        let Some(node) = self.nodes.get_mut(handle) else {
            return;
        };
        node.transform = match parent_inverse {
            Some(inv) => inv * world,
            None => world,
        };
        node.world_transform = world;
        node.inverse_world_transform = world.inverse();
        node.dirty_transform = true;
        self.mark_bounds_dirty(handle);
    }

    // ========================================================================
    // Bounds
    // ========================================================================

    /// Flags `dirty_bounds` on `handle` and on every ancestor up to the root.
    pub fn mark_bounds_dirty(&mut self, handle: NodeHandle) {
        let mut cursor = Some(handle);
        while let Some(h) = cursor {
            let Some(node) = self.nodes.get_mut(h) else {
                break;
            };
            node.dirty_bounds = true;
            cursor = node.parent;
        }
    }

    /// Recomputes the node's object-space bounds from its mesh and its
    /// children's current bounds, then its world bounds. Children are not
    /// refreshed; see [`resolve_bounds`](Self::resolve_bounds).
    pub fn update_bounds(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };

        let mut bounds = Aabb::EMPTY;
        if let Some(mesh) = &node.mesh {
            bounds.extend_with_box(mesh.bounds());
        }
        for &c in &node.children {
            if let Some(child) = self.nodes.get(c) {
                bounds.extend_with_box(&child.bounds.transformed(&child.transform));
            }
        }

        if let Some(node) = self.nodes.get_mut(handle) {
            node.world_bounds = bounds.transformed(&node.world_transform);
            node.bounds = bounds;
            node.dirty_bounds = false;
        }
    }

    fn refresh_world_bounds(&mut self, handle: NodeHandle) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.world_bounds = node.bounds.transformed(&node.world_transform);
        }
    }

    /// Brings the bounds of every dirty node in the subtree up to date and
    /// returns the world bounds of `handle`.
    pub fn resolve_bounds(&mut self, handle: NodeHandle) -> Aabb {
        let dirty = self.nodes.get(handle).is_some_and(|n| n.dirty_bounds);
        if dirty {
            for child in self.children_of(handle) {
                self.resolve_bounds(child);
            }
            self.update_bounds(handle);
        }
        self.nodes
            .get(handle)
            .map_or(Aabb::EMPTY, |n| n.world_bounds)
    }

    // ========================================================================
    // Geometry & Light
    // ========================================================================

    /// Binds or clears the node's mesh; bounds are flagged up to the root.
    pub fn set_mesh(&mut self, handle: NodeHandle, mesh: Option<Arc<Mesh>>) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.mesh = mesh;
            self.mark_bounds_dirty(handle);
        }
    }

    pub fn set_light(&mut self, handle: NodeHandle, light: Option<Light>) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.light = light;
        }
    }

    // ========================================================================
    // Per-frame Update
    // ========================================================================

    /// Runs input handlers, then refreshes transforms (pre-order) and bounds
    /// (post-order) across the whole tree.
    ///
    /// Calling it again with no intervening mutation changes nothing.
    pub fn update(&mut self, dt: f64, input: &InputState) {
        self.update_node(self.root, dt, input, false);
    }

    fn update_node(
        &mut self,
        handle: NodeHandle,
        dt: f64,
        input: &InputState,
        parent_changed: bool,
    ) {
        let handler = self
            .nodes
            .get(handle)
            .and_then(|n| n.input_handler.clone());
        if let Some(handler) = handler {
            let commands = match self.nodes.get(handle) {
                Some(node) => handler.run(node, input, dt),
                None => Vec::new(),
            };
            for command in commands {
                command.run(self, handle);
            }
        }

        let Some(node) = self.nodes.get_mut(handle) else {
            return;
        };
        let changed = node.dirty_transform || parent_changed;
        node.dirty_transform = false;
        if changed {
            self.update_transforms(handle);
        }

        for child in self.children_of(handle) {
            self.update_node(child, dt, input, changed);
        }

        let dirty_bounds = self.nodes.get(handle).is_some_and(|n| n.dirty_bounds);
        if dirty_bounds {
            self.update_bounds(handle);
        } else if changed {
            self.refresh_world_bounds(handle);
        }
    }

    // ========================================================================
    // Utilities
    // ========================================================================

    /// Sets the active flag on the direct children of `handle`.
    pub fn set_children_active(&mut self, handle: NodeHandle, active: bool) {
        for child in self.children_of(handle) {
            if let Some(node) = self.nodes.get_mut(child) {
                node.active = active;
            }
        }
    }

    #[must_use]
    pub fn world_position(&self, handle: NodeHandle) -> Option<DVec3> {
        self.nodes.get(handle).map(Node::world_position)
    }

    #[must_use]
    pub fn world_distance(&self, a: NodeHandle, b: NodeHandle) -> Option<f64> {
        Some(self.nodes.get(a)?.world_distance(self.nodes.get(b)?))
    }

    /// Depth-first search from the root.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeHandle> {
        let mut stack: ChildList = SmallVec::new();
        stack.push(self.root);
        while let Some(h) = stack.pop() {
            let node = self.nodes.get(h)?;
            if node.name == name {
                return Some(h);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Visits `handle` and its subtree in pre-order.
    pub fn walk(&self, handle: NodeHandle, mut visit: impl FnMut(NodeHandle, &Node)) {
        let mut stack: ChildList = SmallVec::new();
        stack.push(handle);
        while let Some(h) = stack.pop() {
            if let Some(node) = self.nodes.get(h) {
                visit(h, node);
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    /// Deep-copies the subtree rooted at `handle`. The copy is detached and
    /// shares meshes, materials and behaviours with the source.
    pub fn copy_subtree(&mut self, handle: NodeHandle) -> Result<NodeHandle> {
        let mut copy = self.node(handle)?.clone();
        let children = std::mem::take(&mut copy.children);
        copy.parent = None;
        copy.dirty_transform = true;
        copy.dirty_bounds = true;

        let new_handle = self.nodes.insert(copy);
        self.update_transforms(new_handle);
        for child in children {
            let child_copy = self.copy_subtree(child)?;
            self.add_child(new_handle, child_copy)?;
        }
        Ok(new_handle)
    }

    /// Sorts `handles` by node name. Stale handles sort last.
    pub fn sort_by_name(&self, handles: &mut [NodeHandle]) {
        handles.sort_by(|a, b| {
            let a = self.nodes.get(*a).map(|n| n.name.as_str());
            let b = self.nodes.get(*b).map(|n| n.name.as_str());
            match (a, b) {
                (Some(a), Some(b)) => a.cmp(b),
                (a, b) => b.is_some().cmp(&a.is_some()),
            }
        });
    }

    /// Sorts `handles` near-to-far from `eye` by world position.
    pub fn sort_by_camera_distance(&self, handles: &mut [NodeHandle], eye: DVec3) {
        handles.sort_by(|a, b| {
            let da = self.distance_sq_to(*a, eye);
            let db = self.distance_sq_to(*b, eye);
            da.total_cmp(&db)
        });
    }

    fn distance_sq_to(&self, handle: NodeHandle, eye: DVec3) -> f64 {
        self.nodes
            .get(handle)
            .map_or(f64::INFINITY, |n| n.world_position().distance_squared(eye))
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new("Root")
    }
}

impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
