//! Cameras and frustums.
//!
//! Projections follow the OpenGL clip convention (right-handed view space,
//! clip-space z in `[-w, w]`).

use std::rc::Rc;

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::{DMat4, DVec3, DVec4, Mat4, UVec2, Vec4};

use crate::renderer::shadow_utils::{MAX_CASCADES, compute_cascade_splits};
use crate::renderer::technique::RenderTechnique;
use crate::resources::RenderTarget;
use crate::scene::NodeHandle;
use crate::scene::bounds::Aabb;
use crate::scene::graph::SceneGraph;
use crate::scene::light::LightBlock;

// ============================================================================
// Frustum
// ============================================================================

/// Six clip planes `(a, b, c, d)` with inward-facing normals:
/// left, right, bottom, top, near, far.
///
/// The default frustum has all-zero planes and accepts everything.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frustum {
    pub planes: [DVec4; 6],
}

impl Frustum {
    /// Gribb-Hartmann extraction from a view-projection matrix.
    #[must_use]
    pub fn from_matrix(vp: &DMat4) -> Self {
        let m = *vp;
        let mut planes = [
            m.row(3) + m.row(0), // Left
            m.row(3) - m.row(0), // Right
            m.row(3) + m.row(1), // Bottom
            m.row(3) - m.row(1), // Top
            m.row(3) + m.row(2), // Near
            m.row(3) - m.row(2), // Far
        ];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > f64::EPSILON {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Positive-vertex test. Conservative: boxes straddling a corner may pass.
    #[must_use]
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        if aabb.is_empty() {
            return false;
        }
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            let p = DVec3::select(normal.cmpge(DVec3::ZERO), aabb.max, aabb.min);
            normal.dot(p) + plane.w >= 0.0
        })
    }

    #[must_use]
    pub fn contains_point(&self, p: DVec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(p) + plane.w >= 0.0)
    }
}

// ============================================================================
// Camera Parameters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionType {
    #[default]
    Perspective,
    Orthographic,
}

/// Viewport rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Width over height; a degenerate viewport yields `1.0`.
    #[must_use]
    pub fn aspect(&self) -> f64 {
        if self.width > 0.0 && self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicExtents {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl OrthographicExtents {
    /// Box centred on the view axis.
    #[must_use]
    pub fn symmetric(half_width: f64, half_height: f64) -> Self {
        Self {
            left: -half_width,
            right: half_width,
            bottom: -half_height,
            top: half_height,
        }
    }
}

impl Default for OrthographicExtents {
    fn default() -> Self {
        Self::symmetric(1.0, 1.0)
    }
}

bitflags! {
    /// Buffers cleared before a stage renders.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearMode: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
    }
}

impl Default for ClearMode {
    fn default() -> Self {
        Self::COLOR | Self::DEPTH
    }
}

// ============================================================================
// Camera Constants
// ============================================================================

/// Matrix block uploaded once per camera.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CameraBlock {
    pub projection: Mat4,
    pub view: Mat4,
    pub view_projection: Mat4,
    pub position: Vec4,
}

impl Default for CameraBlock {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            position: Vec4::W,
        }
    }
}

/// Everything a stage needs from its camera: matrices and the light list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraConstants {
    pub block: CameraBlock,
    pub lights: Vec<LightBlock>,
}

impl CameraConstants {
    /// Replaces the light list, keeping at most `max` entries.
    pub fn set_lights(&mut self, lights: impl IntoIterator<Item = LightBlock>, max: usize) {
        self.lights.clear();
        let mut dropped = 0_usize;
        for light in lights {
            if self.lights.len() < max {
                self.lights.push(light);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            log::trace!("Light list capped at {max}, dropped {dropped}");
        }
    }

    #[must_use]
    pub fn light_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.lights)
    }
}

// ============================================================================
// Cascades
// ============================================================================

/// Per-cascade view-space split distances and world-space caster bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cascades {
    pub count: usize,
    pub splits: [f64; MAX_CASCADES],
    pub bounds: [Aabb; MAX_CASCADES],
}

impl Default for Cascades {
    fn default() -> Self {
        Self {
            count: 0,
            splits: [0.0; MAX_CASCADES],
            bounds: [Aabb::EMPTY; MAX_CASCADES],
        }
    }
}

impl Cascades {
    /// Caster bounds of cascade `index`, empty when out of range.
    #[must_use]
    pub fn bounds(&self, index: usize) -> Aabb {
        if index < self.count {
            self.bounds[index]
        } else {
            Aabb::EMPTY
        }
    }

    #[must_use]
    pub fn split(&self, index: usize) -> f64 {
        if index < self.count {
            self.splits[index]
        } else {
            0.0
        }
    }
}

// ============================================================================
// Camera
// ============================================================================

/// Which technique assembles a camera's main stage.
#[derive(Clone, Default)]
pub enum CameraTechnique {
    /// Use the scene's technique.
    #[default]
    SceneDefault,
    Custom(Rc<dyn RenderTechnique>),
    /// No main stage. Shadow stages are still emitted.
    Disabled,
}

impl std::fmt::Debug for CameraTechnique {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SceneDefault => f.write_str("SceneDefault"),
            Self::Custom(_) => f.write_str("Custom"),
            Self::Disabled => f.write_str("Disabled"),
        }
    }
}

pub struct Camera {
    pub name: String,
    pub projection_type: ProjectionType,
    /// Vertical field of view in degrees.
    pub fov: f64,
    pub ortho: OrthographicExtents,
    pub near: f64,
    pub far: f64,
    pub viewport: Viewport,
    pub clear_mode: ClearMode,
    pub clear_color: Vec4,
    /// Track the window size on every cull.
    pub auto_reshape: bool,
    pub render_target: Option<RenderTarget>,
    /// Cameras render in ascending order.
    pub render_order: i32,
    /// Subtree culled by this camera. Defaults to the scene root.
    pub scene_root: Option<NodeHandle>,
    pub technique: CameraTechnique,

    pub(crate) node: Option<NodeHandle>,
    projection: DMat4,
    view: DMat4,
    frustum: Frustum,
    pub(crate) constants: CameraConstants,
    pub(crate) cascades: Cascades,
}

impl Camera {
    #[must_use]
    pub fn perspective(name: impl Into<String>, fov: f64, near: f64, far: f64) -> Self {
        Self {
            name: name.into(),
            projection_type: ProjectionType::Perspective,
            fov,
            near,
            far,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn orthographic(
        name: impl Into<String>,
        extents: OrthographicExtents,
        near: f64,
        far: f64,
    ) -> Self {
        Self {
            name: name.into(),
            projection_type: ProjectionType::Orthographic,
            ortho: extents,
            near,
            far,
            ..Self::default()
        }
    }

    /// Node carrying this camera's transform, once attached to a scene.
    #[inline]
    #[must_use]
    pub fn node(&self) -> Option<NodeHandle> {
        self.node
    }

    #[inline]
    #[must_use]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> &DMat4 {
        &self.projection
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> &DMat4 {
        &self.view
    }

    #[must_use]
    pub fn view_projection(&self) -> DMat4 {
        self.projection * self.view
    }

    /// World-space eye position.
    #[must_use]
    pub fn position(&self) -> DVec3 {
        self.view.inverse().w_axis.truncate()
    }

    #[inline]
    #[must_use]
    pub fn constants(&self) -> &CameraConstants {
        &self.constants
    }

    #[inline]
    #[must_use]
    pub fn cascades(&self) -> &Cascades {
        &self.cascades
    }

    /// Adopts the window size when `auto_reshape` is set, then rebuilds
    /// the projection from the viewport.
    pub fn reshape(&mut self, window_size: UVec2) {
        if self.auto_reshape {
            self.viewport = Viewport::new(
                0.0,
                0.0,
                f64::from(window_size.x),
                f64::from(window_size.y),
            );
        }
        self.update_projection();
    }

    pub fn update_projection(&mut self) {
        self.projection = match self.projection_type {
            ProjectionType::Perspective => DMat4::perspective_rh_gl(
                self.fov.to_radians(),
                self.viewport.aspect(),
                self.near,
                self.far,
            ),
            ProjectionType::Orthographic => DMat4::orthographic_rh_gl(
                self.ortho.left,
                self.ortho.right,
                self.ortho.bottom,
                self.ortho.top,
                self.near,
                self.far,
            ),
        };
        self.refresh_derived();
    }

    /// Places the eye at `world_transform`; the view matrix is its inverse.
    pub fn update_view(&mut self, world_transform: &DMat4) {
        self.view = world_transform.inverse();
        self.refresh_derived();
    }

    /// Sets both matrices directly, bypassing the projection parameters.
    pub fn set_matrices(&mut self, projection: DMat4, view: DMat4) {
        self.projection = projection;
        self.view = view;
        self.refresh_derived();
    }

    fn refresh_derived(&mut self) {
        let vp = self.projection * self.view;
        self.frustum = Frustum::from_matrix(&vp);
        self.constants.block = CameraBlock {
            projection: self.projection.as_mat4(),
            view: self.view.as_mat4(),
            view_projection: vp.as_mat4(),
            position: self.position().as_vec3().extend(1.0),
        };
    }

    /// Splits `[near, far]` into `count` slices and gathers, per slice, the
    /// world bounds of the opaque nodes in `visible` whose view-depth range
    /// overlaps it.
    pub fn compute_cascades(
        &mut self,
        graph: &SceneGraph,
        visible: &[NodeHandle],
        count: usize,
        lambda: f64,
    ) {
        let count = count.min(MAX_CASCADES);
        let splits = compute_cascade_splits(count, self.near, self.far, lambda);
        let mut bounds = [Aabb::EMPTY; MAX_CASCADES];

        for node in visible.iter().filter_map(|&h| graph.get(h)) {
            if node.material.as_ref().is_some_and(|m| m.is_transparent()) {
                continue;
            }
            let view_bounds = node.world_bounds.transformed(&self.view);
            if view_bounds.is_empty() {
                continue;
            }
            // View space looks down -Z.
            let (depth_min, depth_max) = (-view_bounds.max.z, -view_bounds.min.z);

            let mut slice_near = self.near;
            for (i, &slice_far) in splits.iter().enumerate().take(count) {
                if depth_max >= slice_near && depth_min <= slice_far {
                    bounds[i].extend_with_box(&node.world_bounds);
                }
                slice_near = slice_far;
            }
        }

        self.cascades = Cascades {
            count,
            splits,
            bounds,
        };
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            name: "Camera".to_string(),
            projection_type: ProjectionType::Perspective,
            fov: 45.0,
            ortho: OrthographicExtents::default(),
            near: 0.1,
            far: 100.0,
            viewport: Viewport::default(),
            clear_mode: ClearMode::default(),
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            auto_reshape: true,
            render_target: None,
            render_order: 0,
            scene_root: None,
            technique: CameraTechnique::SceneDefault,
            node: None,
            projection: DMat4::IDENTITY,
            view: DMat4::IDENTITY,
            frustum: Frustum::default(),
            constants: CameraConstants::default(),
            cascades: Cascades::default(),
        }
    }
}

impl std::fmt::Debug for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Camera")
            .field("name", &self.name)
            .field("projection_type", &self.projection_type)
            .field("viewport", &self.viewport)
            .field("render_order", &self.render_order)
            .field("technique", &self.technique)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}
