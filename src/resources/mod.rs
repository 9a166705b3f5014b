//! Resource vocabulary shared by the core and the graphics backend.
//!
//! The core never creates GPU objects itself. It refers to backend-owned
//! resources through opaque slot-map keys and describes meshes and
//! materials only as far as bucketing and bounds need.

pub mod material;
pub mod mesh;

pub use material::{
    BlendEquation, BlendFactor, BlendState, ColorState, CullFace, CullState, DepthFunc,
    DepthState, Material, MaterialData, MaterialLibrary, MaterialRegistry, ScissorState, State,
};
pub use mesh::{Mesh, MeshData, PrimitiveType};

use slotmap::new_key_type;
use smallvec::SmallVec;

new_key_type! {
    pub struct MeshHandle;
    pub struct TextureHandle;
    pub struct ProgramHandle;
    pub struct RenderTargetHandle;
}

/// Raw image payload handed to the backend.
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    pub width: u32,
    pub height: u32,
    pub payload: &'a [u8],
}

/// An offscreen framebuffer created by the backend.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    pub handle: RenderTargetHandle,
    pub width: u32,
    pub height: u32,
    pub color_textures: SmallVec<[TextureHandle; 2]>,
    pub depth_texture: Option<TextureHandle>,
}

impl RenderTarget {
    #[inline]
    #[must_use]
    pub fn color_texture(&self, index: usize) -> Option<TextureHandle> {
        self.color_textures.get(index).copied()
    }
}
