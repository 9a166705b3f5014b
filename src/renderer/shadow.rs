//! Cascaded Shadow Maps
//!
//! A [`ShadowCaster`] is owned by the scene and referenced from a light by
//! key. During plan building it receives the light's block, the main
//! camera and that camera's material buckets, and returns one stage per
//! cascade. Those stages must be executed before the main stage.

use std::sync::Arc;

use crate::errors::{CanopyError, Result};
use crate::renderer::backend::RenderBackend;
use crate::renderer::plan::{RenderPass, RenderStage, StageView};
use crate::renderer::shadow_utils::{
    MAX_CASCADES, SHADOW_BIAS, cascade_projection, light_view_matrix,
};
use crate::renderer::technique::MaterialBuckets;
use crate::resources::material::{Material, MaterialLibrary};
use crate::resources::{RenderTarget, TextureHandle};
use crate::scene::camera::{Camera, ClearMode, OrthographicExtents, Viewport};
use crate::scene::graph::SceneGraph;
use crate::scene::light::LightBlock;
use crate::settings::SceneSettings;

pub const SHADOW_PASS: &str = "ShadowPass";

/// Name of the stage rendering cascade `index`.
#[must_use]
pub fn cascade_stage_name(index: usize) -> String {
    format!("ShadowStageCascade{index}")
}

/// Sampler name under which shaded nodes find the texture of cascade `index`.
#[must_use]
pub fn cascade_texture_name(index: usize) -> String {
    format!("shadowTex{index}")
}

pub trait ShadowCaster {
    /// Shadow textures, one per cascade.
    fn textures(&self) -> Vec<TextureHandle>;

    /// Fills `light.vp_matrices` / `light.z_cuts` for `camera`'s cascades and
    /// returns the stages rendering them. Nodes of `buckets` get the cascade
    /// textures bound in their material data.
    fn render_stages(
        &mut self,
        light: &mut LightBlock,
        camera: &Camera,
        buckets: &MaterialBuckets,
        graph: &mut SceneGraph,
    ) -> Vec<RenderStage>;
}

struct ShadowCascade {
    camera: Camera,
    target: RenderTarget,
    texture: TextureHandle,
}

/// Orthographic cascaded shadow map for one light.
pub struct ShadowMap {
    size: u32,
    material: Arc<Material>,
    cascades: Vec<ShadowCascade>,
}

impl ShadowMap {
    /// Creates `cascade_count` square render targets of `size` texels and
    /// resolves the shadow material.
    pub fn new(
        size: u32,
        cascade_count: usize,
        material_name: &str,
        backend: &mut dyn RenderBackend,
        materials: &dyn MaterialLibrary,
    ) -> Result<Self> {
        let material = materials.resolve_material(material_name)?;
        let count = cascade_count.clamp(1, MAX_CASCADES);

        let mut cascades = Vec::with_capacity(count);
        for i in 0..count {
            let target = backend.create_render_target(size, size, 1, true)?;
            let texture = target.color_texture(0).ok_or_else(|| {
                CanopyError::Backend("shadow render target has no color texture".to_string())
            })?;

            let mut camera = Camera::orthographic(
                format!("ShadowCamera{i}"),
                OrthographicExtents::default(),
                -1.0,
                1.0,
            );
            camera.auto_reshape = false;
            camera.viewport = Viewport::new(0.0, 0.0, f64::from(size), f64::from(size));
            camera.clear_mode = ClearMode::COLOR | ClearMode::DEPTH;
            camera.render_target = Some(target.clone());

            cascades.push(ShadowCascade {
                camera,
                target,
                texture,
            });
        }

        log::debug!("Shadow map created: {count} cascades of {size}x{size}");
        Ok(Self {
            size,
            material,
            cascades,
        })
    }

    pub fn from_settings(
        settings: &SceneSettings,
        backend: &mut dyn RenderBackend,
        materials: &dyn MaterialLibrary,
    ) -> Result<Self> {
        Self::new(
            settings.shadow_map_size,
            settings.effective_cascade_count(),
            &settings.shadow_material,
            backend,
            materials,
        )
    }

    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub fn cascade_count(&self) -> usize {
        self.cascades.len()
    }

    #[must_use]
    pub fn render_target(&self, index: usize) -> Option<&RenderTarget> {
        self.cascades.get(index).map(|c| &c.target)
    }
}

impl ShadowCaster for ShadowMap {
    fn textures(&self) -> Vec<TextureHandle> {
        self.cascades.iter().map(|c| c.texture).collect()
    }

    fn render_stages(
        &mut self,
        light: &mut LightBlock,
        camera: &Camera,
        buckets: &MaterialBuckets,
        graph: &mut SceneGraph,
    ) -> Vec<RenderStage> {
        let view = light_view_matrix(light.position.truncate().as_dvec3());
        let mut stages = Vec::with_capacity(self.cascades.len());

        for (i, cascade) in self.cascades.iter_mut().enumerate() {
            let light_space = camera.cascades().bounds(i).transformed(&view);
            let projection = cascade_projection(&light_space, self.size);
            cascade.camera.set_matrices(projection, view);

            light.vp_matrices[i] = (SHADOW_BIAS * projection * view).as_mat4();
            light.z_cuts[i].x = camera.cascades().split(i) as f32;

            let mut stage =
                RenderStage::new(cascade_stage_name(i), StageView::from_camera(&cascade.camera));
            let texture_name = cascade_texture_name(i);
            for bucket in buckets.opaque() {
                for &handle in &bucket.nodes {
                    if let Some(node) = graph.get_mut(handle) {
                        node.material_data_mut()
                            .set_texture(texture_name.clone(), cascade.texture);
                    }
                }
                stage.push_pass(RenderPass::new(
                    SHADOW_PASS,
                    Arc::clone(&self.material),
                    bucket.nodes.clone(),
                ));
            }
            stages.push(stage);
        }

        stages
    }
}

impl std::fmt::Debug for ShadowMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowMap")
            .field("size", &self.size)
            .field("material", &self.material.name)
            .field("cascades", &self.cascades.len())
            .finish()
    }
}
