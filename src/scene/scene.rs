//! Scene
//!
//! A scene owns a [`SceneGraph`], its cameras, its shadow casters and the
//! per-frame drawable and light buckets. Each frame runs three phases:
//!
//! 1. [`update`](Scene::update): physics, input handlers, transforms, bounds
//! 2. [`cull`](Scene::cull): camera matrices, light extraction, per-camera
//!    drawable buckets and cascade bounds
//! 3. [`draw`](Scene::draw): build the [`RenderPlan`] (shadow stages first,
//!    then one stage per camera) and hand it to the backend
//!
//! Buckets are transient: they are rebuilt from scratch by every cull.

use std::rc::Rc;

use glam::UVec2;
use slotmap::{SecondaryMap, SlotMap};

use crate::errors::{CanopyError, Result};
use crate::renderer::backend::RenderBackend;
use crate::renderer::plan::RenderPlan;
use crate::renderer::shadow::ShadowCaster;
use crate::renderer::technique::{DefaultRenderTechnique, MaterialBuckets, RenderTechnique};
use crate::resources::material::MaterialLibrary;
use crate::scene::camera::{Camera, CameraTechnique, ProjectionType};
use crate::scene::graph::SceneGraph;
use crate::scene::input::InputState;
use crate::scene::light::LightBlock;
use crate::scene::physics::{NullPhysics, PhysicsSystem};
use crate::scene::{CameraKey, NodeHandle, ShadowCasterKey};
use crate::settings::SceneSettings;

pub struct Scene {
    pub name: String,
    pub active: bool,
    /// Whether the cursor is visible while this scene is in front.
    pub displays_cursor: bool,

    graph: SceneGraph,
    settings: SceneSettings,

    cameras: SlotMap<CameraKey, Camera>,
    /// Cameras sorted by `render_order`; ties keep insertion order.
    camera_order: Vec<CameraKey>,
    shadow_casters: SlotMap<ShadowCasterKey, Box<dyn ShadowCaster>>,
    technique: Rc<dyn RenderTechnique>,
    physics: Box<dyn PhysicsSystem>,

    // Rebuilt by every cull.
    drawables: SecondaryMap<CameraKey, Vec<NodeHandle>>,
    lights: Vec<NodeHandle>,
}

impl Scene {
    /// Creates an empty scene using the [`DefaultRenderTechnique`].
    pub fn new(
        name: impl Into<String>,
        settings: SceneSettings,
        materials: &dyn MaterialLibrary,
    ) -> Result<Self> {
        let technique = DefaultRenderTechnique::new(materials, &settings)?;
        let name = name.into();
        Ok(Self {
            graph: SceneGraph::new(format!("{name}-Root")),
            name,
            active: true,
            displays_cursor: true,
            settings,
            cameras: SlotMap::with_key(),
            camera_order: Vec::new(),
            shadow_casters: SlotMap::with_key(),
            technique: Rc::new(technique),
            physics: Box::new(NullPhysics),
            drawables: SecondaryMap::new(),
            lights: Vec::new(),
        })
    }

    #[inline]
    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    #[inline]
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.graph.root()
    }

    #[must_use]
    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn set_technique(&mut self, technique: Rc<dyn RenderTechnique>) {
        self.technique = technique;
    }

    /// Replaces the physics system. The new one is started, the old one
    /// stopped.
    pub fn set_physics(&mut self, mut physics: Box<dyn PhysicsSystem>) {
        physics.start();
        let mut old = std::mem::replace(&mut self.physics, physics);
        old.stop();
    }

    // ========================================================================
    // Cameras
    // ========================================================================

    /// Attaches `camera` under `parent` on a dedicated node named after it.
    pub fn add_camera(&mut self, parent: NodeHandle, mut camera: Camera) -> Result<CameraKey> {
        let node = self.graph.create_child(parent, camera.name.clone())?;
        camera.node = Some(node);
        if camera.scene_root.is_none() {
            camera.scene_root = Some(self.graph.root());
        }

        let key = self.cameras.insert(camera);
        self.camera_order.push(key);
        self.sort_cameras();
        Ok(key)
    }

    /// Detaches a camera and destroys its node.
    pub fn remove_camera(&mut self, key: CameraKey) -> Result<Camera> {
        let mut camera = self.cameras.remove(key).ok_or(CanopyError::CameraNotFound)?;
        self.camera_order.retain(|k| *k != key);
        self.drawables.remove(key);
        if let Some(node) = camera.node.take() {
            self.graph.destroy(node)?;
        }
        Ok(camera)
    }

    #[must_use]
    pub fn camera(&self, key: CameraKey) -> Option<&Camera> {
        self.cameras.get(key)
    }

    pub fn camera_mut(&mut self, key: CameraKey) -> Option<&mut Camera> {
        self.cameras.get_mut(key)
    }

    /// Cameras in render order.
    pub fn cameras(&self) -> impl Iterator<Item = (CameraKey, &Camera)> {
        self.camera_order
            .iter()
            .filter_map(|&k| self.cameras.get(k).map(|c| (k, c)))
    }

    /// Re-sorts cameras after `render_order` was changed in place.
    pub fn sort_cameras(&mut self) {
        let cameras = &self.cameras;
        self.camera_order
            .sort_by_key(|k| cameras.get(*k).map_or(i32::MAX, |c| c.render_order));
    }

    /// Nodes that passed the last cull of `key`, in traversal order.
    #[must_use]
    pub fn drawables(&self, key: CameraKey) -> &[NodeHandle] {
        self.drawables.get(key).map_or(&[][..], Vec::as_slice)
    }

    /// Lit nodes found by the last cull.
    #[must_use]
    pub fn lights(&self) -> &[NodeHandle] {
        &self.lights
    }

    // ========================================================================
    // Shadows
    // ========================================================================

    pub fn add_shadow_caster(&mut self, caster: Box<dyn ShadowCaster>) -> ShadowCasterKey {
        self.shadow_casters.insert(caster)
    }

    pub fn remove_shadow_caster(&mut self, key: ShadowCasterKey) -> Option<Box<dyn ShadowCaster>> {
        self.shadow_casters.remove(key)
    }

    #[must_use]
    pub fn shadow_caster(&self, key: ShadowCasterKey) -> Option<&dyn ShadowCaster> {
        self.shadow_casters.get(key).map(|caster| &**caster)
    }

    // ========================================================================
    // Frame Phases
    // ========================================================================

    pub fn update(&mut self, dt: f64, input: &InputState) {
        let mut bodies = Vec::new();
        let root = self.graph.root();
        if let Some(extractor) = self.graph.get(root).and_then(|n| n.physics_extractor().cloned()) {
            extractor.run(&self.graph, root, &mut bodies);
        }
        self.physics.step(dt, &mut self.graph, &bodies);
        self.graph.update(dt, input);
    }

    pub fn cull(&mut self, window_size: UVec2) {
        for &key in &self.camera_order {
            let Some(camera) = self.cameras.get_mut(key) else {
                continue;
            };
            camera.reshape(window_size);
            let eye = camera
                .node
                .and_then(|n| self.graph.get(n))
                .map(|n| *n.world_transform());
            if let Some(eye) = eye {
                camera.update_view(&eye);
            }
        }

        self.lights.clear();
        let root = self.graph.root();
        if let Some(extractor) = self.graph.get(root).and_then(|n| n.light_extractor().cloned()) {
            extractor.run(&mut self.graph, root, &mut self.lights);
        }
        let light_blocks = self.light_blocks();

        self.drawables.clear();
        let cascade_count = self.settings.effective_cascade_count();
        for &key in &self.camera_order {
            let Some(camera) = self.cameras.get_mut(key) else {
                continue;
            };
            camera
                .constants
                .set_lights(light_blocks.iter().copied(), self.settings.max_lights);

            let mut bucket = Vec::new();
            let cull_root = camera.scene_root.unwrap_or(root);
            if let Some(culler) = self.graph.get(cull_root).and_then(|n| n.culler().cloned()) {
                culler.run(&self.graph, camera, cull_root, &mut bucket);
            }
            if camera.projection_type == ProjectionType::Perspective {
                camera.compute_cascades(
                    &self.graph,
                    &bucket,
                    cascade_count,
                    self.settings.cascade_split_lambda,
                );
            }
            self.drawables.insert(key, bucket);
        }
    }

    /// Builds and executes this frame's plan.
    pub fn draw(&mut self, backend: &mut dyn RenderBackend) -> Result<()> {
        let plan = self.build_plan()?;
        backend.execute_plan(&plan, &self.graph)
    }

    /// Assembles the frame's stages from the buckets of the last cull.
    ///
    /// For every perspective camera, each shadowed light contributes its
    /// cascade stages ahead of the camera's main stage.
    pub fn build_plan(&mut self) -> Result<RenderPlan> {
        let mut plan = RenderPlan::new();

        for &key in &self.camera_order {
            let Some(camera) = self.cameras.get(key) else {
                continue;
            };
            let nodes = self.drawables.get(key).map_or(&[][..], Vec::as_slice);
            let buckets = MaterialBuckets::build(&self.graph, nodes)?;

            if camera.projection_type == ProjectionType::Perspective {
                for &light_node in &self.lights {
                    let Some(light) = self.graph.get(light_node).and_then(|n| n.light()) else {
                        continue;
                    };
                    let Some(caster_key) = light.shadow else {
                        continue;
                    };
                    let mut block = light.block;
                    let Some(caster) = self.shadow_casters.get_mut(caster_key) else {
                        log::warn!("Light references a removed shadow caster");
                        continue;
                    };
                    let stages =
                        caster.render_stages(&mut block, camera, &buckets, &mut self.graph);
                    let light = self.graph.get_mut(light_node).and_then(|n| n.light_mut());
                    if let Some(light) = light {
                        light.block = block;
                    }
                    plan.stages.extend(stages);
                }
            }

            // Shadow matrices changed; the main stage must see them.
            let light_blocks = self.light_blocks();
            let Some(camera) = self.cameras.get_mut(key) else {
                continue;
            };
            camera
                .constants
                .set_lights(light_blocks, self.settings.max_lights);

            let technique = match &camera.technique {
                CameraTechnique::SceneDefault => Rc::clone(&self.technique),
                CameraTechnique::Custom(technique) => Rc::clone(technique),
                CameraTechnique::Disabled => continue,
            };
            plan.push_stage(technique.assemble(camera, &self.graph, &buckets)?);
        }

        Ok(plan)
    }

    fn light_blocks(&self) -> Vec<LightBlock> {
        self.lights
            .iter()
            .filter_map(|&h| self.graph.get(h).and_then(|n| n.light()))
            .map(|l| l.block)
            .collect()
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.physics.stop();
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("graph", &self.graph)
            .field("cameras", &self.camera_order.len())
            .field("lights", &self.lights.len())
            .finish_non_exhaustive()
    }
}
