use std::rc::Rc;
use std::sync::Arc;

use glam::{DMat4, DVec3};

use crate::resources::material::{Material, MaterialData};
use crate::resources::mesh::Mesh;
use crate::scene::bounds::Aabb;
use crate::scene::cull::{Culler, DefaultCuller};
use crate::scene::input::InputHandler;
use crate::scene::light::{DefaultLightExtractor, Light, LightExtractor};
use crate::scene::physics::{DefaultPhysicsExtractor, PhysicsExtractor};
use crate::scene::{NodeHandle, RigidBodyHandle};

/// A scene graph node.
///
/// Nodes live in a [`SceneGraph`](crate::scene::SceneGraph) arena. The parent
/// exclusively owns its children; `parent` is a non-owning back-reference used
/// only for transform and bounds propagation.
///
/// Everything that touches the hierarchy, the transforms or the bounds goes
/// through the graph so the dirty flags stay consistent. The setters here only
/// cover data that does not feed into bounds.
///
/// # Behaviours
///
/// Culling, light extraction, input handling and physics extraction are
/// strategy objects held per node. Every node starts with the default
/// implementation; swapping one changes the policy for that subtree.
#[derive(Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) active: bool,

    // === Hierarchy ===
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    // === Object space ===
    pub(crate) transform: DMat4,
    pub(crate) bounds: Aabb,

    pub(crate) dirty_transform: bool,
    pub(crate) dirty_bounds: bool,

    // === World space (cached) ===
    pub(crate) world_transform: DMat4,
    pub(crate) inverse_world_transform: DMat4,
    pub(crate) world_bounds: Aabb,

    // === Geometry, shading, lighting & physics ===
    pub(crate) mesh: Option<Arc<Mesh>>,
    pub(crate) material: Option<Arc<Material>>,
    pub(crate) material_data: MaterialData,
    pub(crate) light: Option<Light>,
    pub(crate) rigid_body: Option<RigidBodyHandle>,

    // === Behaviours ===
    pub(crate) culler: Option<Rc<dyn Culler>>,
    pub(crate) light_extractor: Option<Rc<dyn LightExtractor>>,
    pub(crate) input_handler: Option<Rc<dyn InputHandler>>,
    pub(crate) physics_extractor: Option<Rc<dyn PhysicsExtractor>>,
}

impl Node {
    /// Identity transform, empty bounds, default behaviours, no input handler.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            parent: None,
            children: Vec::new(),
            transform: DMat4::IDENTITY,
            bounds: Aabb::EMPTY,
            dirty_transform: true,
            dirty_bounds: true,
            world_transform: DMat4::IDENTITY,
            inverse_world_transform: DMat4::IDENTITY,
            world_bounds: Aabb::EMPTY,
            mesh: None,
            material: None,
            material_data: MaterialData::new(),
            light: None,
            rigid_body: None,
            culler: Some(Rc::new(DefaultCuller)),
            light_extractor: Some(Rc::new(DefaultLightExtractor)),
            input_handler: None,
            physics_extractor: Some(Rc::new(DefaultPhysicsExtractor)),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Inactive nodes are pruned with their whole subtree by the stock
    /// culler, light extractor and physics extractor. The flag itself is
    /// not propagated.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Local transform.
    #[inline]
    #[must_use]
    pub fn transform(&self) -> &DMat4 {
        &self.transform
    }

    #[inline]
    #[must_use]
    pub fn world_transform(&self) -> &DMat4 {
        &self.world_transform
    }

    #[inline]
    #[must_use]
    pub fn inverse_world_transform(&self) -> &DMat4 {
        &self.inverse_world_transform
    }

    /// Object-space bounds: own mesh plus children, in this node's frame.
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// World-space bounds. Stale while [`is_bounds_dirty`](Self::is_bounds_dirty).
    #[inline]
    #[must_use]
    pub fn world_bounds(&self) -> &Aabb {
        &self.world_bounds
    }

    #[inline]
    #[must_use]
    pub fn is_bounds_dirty(&self) -> bool {
        self.dirty_bounds
    }

    #[inline]
    #[must_use]
    pub fn is_transform_dirty(&self) -> bool {
        self.dirty_transform
    }

    #[inline]
    #[must_use]
    pub fn world_position(&self) -> DVec3 {
        self.world_transform.w_axis.truncate()
    }

    /// Distance between the world positions of two nodes.
    #[must_use]
    pub fn world_distance(&self, other: &Node) -> f64 {
        self.world_position().distance(other.world_position())
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        self.mesh.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn material(&self) -> Option<&Arc<Material>> {
        self.material.as_ref()
    }

    pub fn set_material(&mut self, material: Option<Arc<Material>>) {
        self.material = material;
    }

    #[inline]
    #[must_use]
    pub fn material_data(&self) -> &MaterialData {
        &self.material_data
    }

    #[inline]
    pub fn material_data_mut(&mut self) -> &mut MaterialData {
        &mut self.material_data
    }

    #[inline]
    #[must_use]
    pub fn light(&self) -> Option<&Light> {
        self.light.as_ref()
    }

    /// Mutable access to the light block. Attaching or removing a light goes
    /// through [`SceneGraph::set_light`](crate::scene::SceneGraph::set_light).
    #[inline]
    pub fn light_mut(&mut self) -> Option<&mut Light> {
        self.light.as_mut()
    }

    #[inline]
    #[must_use]
    pub fn rigid_body(&self) -> Option<RigidBodyHandle> {
        self.rigid_body
    }

    pub fn set_rigid_body(&mut self, body: Option<RigidBodyHandle>) {
        self.rigid_body = body;
    }

    // ========================================================================
    // Behaviours
    // ========================================================================

    #[must_use]
    pub fn culler(&self) -> Option<&Rc<dyn Culler>> {
        self.culler.as_ref()
    }

    pub fn set_culler(&mut self, culler: Option<Rc<dyn Culler>>) {
        self.culler = culler;
    }

    #[must_use]
    pub fn light_extractor(&self) -> Option<&Rc<dyn LightExtractor>> {
        self.light_extractor.as_ref()
    }

    pub fn set_light_extractor(&mut self, extractor: Option<Rc<dyn LightExtractor>>) {
        self.light_extractor = extractor;
    }

    #[must_use]
    pub fn input_handler(&self) -> Option<&Rc<dyn InputHandler>> {
        self.input_handler.as_ref()
    }

    pub fn set_input_handler(&mut self, handler: Option<Rc<dyn InputHandler>>) {
        self.input_handler = handler;
    }

    #[must_use]
    pub fn physics_extractor(&self) -> Option<&Rc<dyn PhysicsExtractor>> {
        self.physics_extractor.as_ref()
    }

    pub fn set_physics_extractor(&mut self, extractor: Option<Rc<dyn PhysicsExtractor>>) {
        self.physics_extractor = extractor;
    }

    /// Drops mesh and behaviour references ahead of removal.
    pub(crate) fn clear_references(&mut self) {
        self.mesh = None;
        self.material = None;
        self.culler = None;
        self.light_extractor = None;
        self.input_handler = None;
        self.physics_extractor = None;
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("dirty_transform", &self.dirty_transform)
            .field("dirty_bounds", &self.dirty_bounds)
            .field("world_bounds", &self.world_bounds)
            .field("mesh", &self.mesh.as_ref().map(|m| m.name.as_str()))
            .field("material", &self.material.as_ref().map(|m| m.name.as_str()))
            .finish_non_exhaustive()
    }
}
