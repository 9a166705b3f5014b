//! Scene graph system.
//!
//! - `bounds`: axis-aligned boxes
//! - `node` / `graph`: the node arena, hierarchy, transform and bounds propagation
//! - `cull`, `light`, `input`, `physics`: per-node pluggable behaviours
//! - `camera`: projection, frustum and cascade data
//! - `scene`: per-frame update / cull / draw orchestration
//! - `manager`: the scene stack

pub mod bounds;
pub mod camera;
pub mod cull;
pub mod graph;
pub mod input;
pub mod light;
pub mod manager;
pub mod node;
pub mod physics;
pub mod scene;

pub use bounds::Aabb;
pub use camera::{Camera, CameraTechnique, ClearMode, Frustum, OrthographicExtents, ProjectionType, Viewport};
pub use cull::{AlwaysPassCuller, Culler, DefaultCuller};
pub use graph::SceneGraph;
pub use input::{InputHandler, InputState, KeyCode, NodeCommand};
pub use light::{DefaultLightExtractor, Light, LightBlock, LightExtractor};
pub use manager::SceneManager;
pub use node::Node;
pub use physics::{DefaultPhysicsExtractor, NullPhysics, PhysicsExtractor, PhysicsSystem};
pub use scene::Scene;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct CameraKey;
    pub struct ShadowCasterKey;
    pub struct RigidBodyHandle;
}
