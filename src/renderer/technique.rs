//! Render Techniques
//!
//! A technique turns one camera's drawable bucket into a [`RenderStage`].
//! [`MaterialBuckets`] groups the bucket by material identity first, so
//! every technique and shadow caster sees the same grouping.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::{CanopyError, Result};
use crate::renderer::plan::{RenderPass, RenderStage, StageView};
use crate::resources::material::{Material, MaterialLibrary};
use crate::scene::NodeHandle;
use crate::scene::camera::Camera;
use crate::scene::graph::SceneGraph;
use crate::settings::SceneSettings;

pub const DEPTH_PREPASS: &str = "DepthPrePass";
pub const DIFFUSE_PASS: &str = "Diffuse";

// ============================================================================
// Material Buckets
// ============================================================================

#[derive(Debug, Clone)]
pub struct MaterialBucket {
    pub material: Arc<Material>,
    pub nodes: Vec<NodeHandle>,
}

/// Nodes grouped by material, compared by `Arc` identity. Buckets keep the
/// order in which their material first appears; nodes keep bucket order.
#[derive(Debug, Clone, Default)]
pub struct MaterialBuckets {
    buckets: Vec<MaterialBucket>,
}

impl MaterialBuckets {
    /// Groups `nodes` by material. A node without a material is a contract
    /// violation.
    pub fn build(graph: &SceneGraph, nodes: &[NodeHandle]) -> Result<Self> {
        let mut buckets: Vec<MaterialBucket> = Vec::new();
        let mut index: FxHashMap<*const Material, usize> = FxHashMap::default();

        for &handle in nodes {
            let node = graph.node(handle)?;
            let Some(material) = node.material() else {
                log::error!("Node '{}' has a mesh but no material", node.name());
                return Err(CanopyError::MissingMaterial {
                    node: node.name().to_string(),
                });
            };

            let slot = *index.entry(Arc::as_ptr(material)).or_insert_with(|| {
                buckets.push(MaterialBucket {
                    material: Arc::clone(material),
                    nodes: Vec::new(),
                });
                buckets.len() - 1
            });
            buckets[slot].nodes.push(handle);
        }

        Ok(Self { buckets })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaterialBucket> {
        self.buckets.iter()
    }

    pub fn opaque(&self) -> impl Iterator<Item = &MaterialBucket> {
        self.buckets.iter().filter(|b| !b.material.is_transparent())
    }

    pub fn transparent(&self) -> impl Iterator<Item = &MaterialBucket> {
        self.buckets.iter().filter(|b| b.material.is_transparent())
    }
}

// ============================================================================
// Techniques
// ============================================================================

pub trait RenderTechnique {
    fn assemble(
        &self,
        camera: &Camera,
        graph: &SceneGraph,
        buckets: &MaterialBuckets,
    ) -> Result<RenderStage>;
}

/// Depth pre-pass over all opaque nodes, then one pass per opaque bucket,
/// then one pass per transparent bucket.
///
/// The pre-pass is emitted even when empty so stage layouts stay stable.
#[derive(Debug, Clone)]
pub struct DefaultRenderTechnique {
    depth_prepass: Arc<Material>,
    sort_transparent: bool,
}

impl DefaultRenderTechnique {
    pub fn new(materials: &dyn MaterialLibrary, settings: &SceneSettings) -> Result<Self> {
        Ok(Self {
            depth_prepass: materials.resolve_material(&settings.depth_prepass_material)?,
            sort_transparent: settings.sort_transparent_back_to_front,
        })
    }

    #[must_use]
    pub fn depth_prepass_material(&self) -> &Arc<Material> {
        &self.depth_prepass
    }
}

impl RenderTechnique for DefaultRenderTechnique {
    fn assemble(
        &self,
        camera: &Camera,
        graph: &SceneGraph,
        buckets: &MaterialBuckets,
    ) -> Result<RenderStage> {
        let mut stage = RenderStage::new(
            format!("{}-DefaultRenderTechnique", camera.name),
            StageView::from_camera(camera),
        );

        let opaque_nodes: Vec<NodeHandle> = buckets
            .opaque()
            .flat_map(|b| b.nodes.iter().copied())
            .collect();
        stage.push_pass(RenderPass::new(
            DEPTH_PREPASS,
            Arc::clone(&self.depth_prepass),
            opaque_nodes,
        ));

        for bucket in buckets.opaque() {
            stage.push_pass(RenderPass::new(
                DIFFUSE_PASS,
                Arc::clone(&bucket.material),
                bucket.nodes.clone(),
            ));
        }

        let eye = camera.position();
        for bucket in buckets.transparent() {
            let mut nodes = bucket.nodes.clone();
            if self.sort_transparent {
                graph.sort_by_camera_distance(&mut nodes, eye);
                nodes.reverse();
            }
            stage.push_pass(RenderPass::new(
                DIFFUSE_PASS,
                Arc::clone(&bucket.material),
                nodes,
            ));
        }

        Ok(stage)
    }
}

/// One pass per bucket in bucket order, no pre-pass. Used for overlays.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForwardRenderTechnique;

impl RenderTechnique for ForwardRenderTechnique {
    fn assemble(
        &self,
        camera: &Camera,
        _graph: &SceneGraph,
        buckets: &MaterialBuckets,
    ) -> Result<RenderStage> {
        let mut stage = RenderStage::new(
            format!("{}-ForwardRenderTechnique", camera.name),
            StageView::from_camera(camera),
        );
        for bucket in buckets.iter() {
            stage.push_pass(RenderPass::new(
                DIFFUSE_PASS,
                Arc::clone(&bucket.material),
                bucket.nodes.clone(),
            ));
        }
        Ok(stage)
    }
}
