//! Headless backend.
//!
//! Allocates handles without a GPU and records a summary of every executed
//! plan. Drives the demos and the integration tests.

use std::sync::Arc;

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::errors::{CanopyError, Result};
use crate::renderer::backend::RenderBackend;
use crate::renderer::plan::RenderPlan;
use crate::resources::mesh::{Mesh, MeshData};
use crate::resources::{
    MeshHandle, ProgramHandle, RenderTarget, RenderTargetHandle, TextureDescriptor, TextureHandle,
};
use crate::scene::graph::SceneGraph;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub name: String,
    pub material: String,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    pub name: String,
    pub camera: String,
    pub passes: Vec<PassSummary>,
}

/// What one frame drew, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub stages: Vec<StageSummary>,
}

impl PlanSummary {
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.stages
            .iter()
            .flat_map(|s| &s.passes)
            .map(|p| p.nodes.len())
            .sum()
    }
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    started: bool,
    meshes: SlotMap<MeshHandle, String>,
    textures: SlotMap<TextureHandle, (u32, u32)>,
    programs: SlotMap<ProgramHandle, String>,
    render_targets: SlotMap<RenderTargetHandle, (u32, u32)>,
    frames: u64,
    last_plan: Option<PlanSummary>,
}

impl HeadlessBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn frames_executed(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn last_plan(&self) -> Option<&PlanSummary> {
        self.last_plan.as_ref()
    }

    #[must_use]
    pub fn program_name(&self, program: ProgramHandle) -> Option<&str> {
        self.programs.get(program).map(String::as_str)
    }
}

impl RenderBackend for HeadlessBackend {
    fn start(&mut self) -> Result<()> {
        log::info!("Headless backend started");
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        log::info!("Headless backend stopped after {} frames", self.frames);
        self.started = false;
    }

    fn create_mesh(&mut self, data: &MeshData) -> Result<Arc<Mesh>> {
        let handle = self.meshes.insert(data.name.clone());
        Ok(Arc::new(Mesh::new(handle, data)))
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor<'_>) -> Result<TextureHandle> {
        let expected = descriptor.width as usize * descriptor.height as usize * 4;
        if !descriptor.payload.is_empty() && descriptor.payload.len() != expected {
            return Err(CanopyError::Backend(format!(
                "texture payload of {} bytes does not match {}x{} RGBA8",
                descriptor.payload.len(),
                descriptor.width,
                descriptor.height
            )));
        }
        Ok(self
            .textures
            .insert((descriptor.width, descriptor.height)))
    }

    fn create_program(&mut self, name: &str, sources: &[(&str, &str)]) -> Result<ProgramHandle> {
        log::debug!("Program '{name}' registered with {} stages", sources.len());
        Ok(self.programs.insert(name.to_string()))
    }

    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        color_attachments: usize,
        with_depth: bool,
    ) -> Result<RenderTarget> {
        let handle = self.render_targets.insert((width, height));
        let color_textures: SmallVec<[TextureHandle; 2]> = (0..color_attachments)
            .map(|_| self.textures.insert((width, height)))
            .collect();
        let depth_texture = with_depth.then(|| self.textures.insert((width, height)));
        Ok(RenderTarget {
            handle,
            width,
            height,
            color_textures,
            depth_texture,
        })
    }

    fn execute_plan(&mut self, plan: &RenderPlan, graph: &SceneGraph) -> Result<()> {
        let mut summary = PlanSummary::default();

        for stage in &plan.stages {
            if let Some(target) = stage.view.render_target
                && !self.render_targets.contains_key(target)
            {
                return Err(CanopyError::Backend(format!(
                    "stage '{}' renders into an unknown target",
                    stage.name
                )));
            }

            let mut passes = Vec::with_capacity(stage.passes.len());
            for pass in &stage.passes {
                if !self.programs.contains_key(pass.material.program) {
                    return Err(CanopyError::ProgramNotFound(pass.material.name.clone()));
                }
                let mut nodes = Vec::with_capacity(pass.nodes.len());
                for &handle in &pass.nodes {
                    let node = graph.node(handle)?;
                    if node.mesh().is_none() {
                        return Err(CanopyError::MissingMesh {
                            node: node.name().to_string(),
                        });
                    }
                    nodes.push(node.name().to_string());
                }
                passes.push(PassSummary {
                    name: pass.name.clone(),
                    material: pass.material.name.clone(),
                    nodes,
                });
            }

            summary.stages.push(StageSummary {
                name: stage.name.clone(),
                camera: stage.view.camera.clone(),
                passes,
            });
        }

        log::trace!(
            "Executed plan: {} stages, {} draws",
            summary.stages.len(),
            summary.draw_count()
        );
        self.frames += 1;
        self.last_plan = Some(summary);
        Ok(())
    }
}
