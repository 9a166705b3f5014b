//! Render planning.
//!
//! - `plan`: the stage / pass description handed to the backend
//! - `technique`: material bucketing and per-camera stage assembly
//! - `shadow`, `shadow_utils`: cascaded shadow map stages and their math
//! - `backend`, `headless`: the backend boundary and a GPU-less backend

pub mod backend;
pub mod headless;
pub mod plan;
pub mod shadow;
pub mod shadow_utils;
pub mod technique;

pub use backend::RenderBackend;
pub use headless::{HeadlessBackend, PlanSummary};
pub use plan::{RenderPass, RenderPlan, RenderStage, StageView};
pub use shadow::{ShadowCaster, ShadowMap};
pub use technique::{
    DefaultRenderTechnique, ForwardRenderTechnique, MaterialBucket, MaterialBuckets,
    RenderTechnique,
};
