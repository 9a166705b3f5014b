//! Graphics backend boundary.
//!
//! The core hands a finished [`RenderPlan`] to a [`RenderBackend`] and never
//! issues draw calls itself. Resource creation also goes through the backend;
//! the core only keeps the returned handles.

use std::sync::Arc;

use crate::errors::Result;
use crate::renderer::plan::RenderPlan;
use crate::resources::mesh::{Mesh, MeshData};
use crate::resources::{ProgramHandle, RenderTarget, TextureDescriptor, TextureHandle};
use crate::scene::graph::SceneGraph;

pub trait RenderBackend {
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);

    fn create_mesh(&mut self, data: &MeshData) -> Result<Arc<Mesh>>;

    fn create_texture(&mut self, descriptor: &TextureDescriptor<'_>) -> Result<TextureHandle>;

    /// Compiles a program from named shader sources.
    fn create_program(&mut self, name: &str, sources: &[(&str, &str)]) -> Result<ProgramHandle>;

    /// Offscreen target with `color_attachments` color textures and,
    /// if requested, a depth texture.
    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        color_attachments: usize,
        with_depth: bool,
    ) -> Result<RenderTarget>;

    /// Executes every stage and pass of `plan` in order. Node data (mesh,
    /// world transform, material inputs) is read from `graph`.
    fn execute_plan(&mut self, plan: &RenderPlan, graph: &SceneGraph) -> Result<()>;
}
