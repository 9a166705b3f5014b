//! Render Plan
//!
//! The per-frame output of a scene: an ordered list of [`RenderStage`]s,
//! each bound to one view (camera constants, viewport, target, clear) and
//! holding an ordered list of [`RenderPass`]es. A pass draws a node list
//! with one material. The backend executes the plan verbatim.

use std::sync::Arc;

use glam::Vec4;

use crate::resources::RenderTargetHandle;
use crate::resources::material::Material;
use crate::scene::NodeHandle;
use crate::scene::camera::{Camera, CameraConstants, ClearMode, Viewport};

#[derive(Debug, Clone)]
pub struct RenderPass {
    pub name: String,
    pub material: Arc<Material>,
    pub nodes: Vec<NodeHandle>,
}

impl RenderPass {
    #[must_use]
    pub fn new(name: impl Into<String>, material: Arc<Material>, nodes: Vec<NodeHandle>) -> Self {
        Self {
            name: name.into(),
            material,
            nodes,
        }
    }
}

/// Snapshot of the camera state a stage renders with.
#[derive(Debug, Clone, PartialEq)]
pub struct StageView {
    pub camera: String,
    pub constants: CameraConstants,
    pub viewport: Viewport,
    pub render_target: Option<RenderTargetHandle>,
    pub clear_mode: ClearMode,
    pub clear_color: Vec4,
}

impl StageView {
    #[must_use]
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            camera: camera.name.clone(),
            constants: camera.constants().clone(),
            viewport: camera.viewport,
            render_target: camera.render_target.as_ref().map(|t| t.handle),
            clear_mode: camera.clear_mode,
            clear_color: camera.clear_color,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderStage {
    pub name: String,
    pub view: StageView,
    pub passes: Vec<RenderPass>,
}

impl RenderStage {
    #[must_use]
    pub fn new(name: impl Into<String>, view: StageView) -> Self {
        Self {
            name: name.into(),
            view,
            passes: Vec::new(),
        }
    }

    pub fn push_pass(&mut self, pass: RenderPass) {
        self.passes.push(pass);
    }

    #[must_use]
    pub fn pass(&self, name: &str) -> Option<&RenderPass> {
        self.passes.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderPlan {
    pub stages: Vec<RenderStage>,
}

impl RenderPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_stage(&mut self, stage: RenderStage) {
        self.stages.push(stage);
    }

    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&RenderStage> {
        self.stages.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    #[must_use]
    pub fn pass_count(&self) -> usize {
        self.stages.iter().map(|s| s.passes.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
