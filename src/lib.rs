#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::float_cmp)]

pub mod app;
pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod settings;

pub use app::window::{HeadlessWindow, WindowSystem};
pub use app::{Application, ClientApplication};
pub use errors::{CanopyError, Result};
pub use renderer::{
    DefaultRenderTechnique, HeadlessBackend, RenderBackend, RenderPlan, RenderTechnique,
    ShadowCaster, ShadowMap,
};
pub use resources::{Material, MaterialLibrary, MaterialRegistry, Mesh, MeshData, State};
pub use scene::{
    Aabb, Camera, CameraKey, CameraTechnique, Light, Node, NodeHandle, Scene, SceneGraph,
    SceneManager,
};
pub use settings::{AppSettings, EngineSettings, SceneSettings};
