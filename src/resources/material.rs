//! Materials and Render State
//!
//! A [`Material`] is an opaque state descriptor from the core's point of
//! view: a name, fixed-function [`State`] and a backend program. The core
//! only inspects [`BlendState::enabled`] (to split opaque from transparent
//! work) and compares materials by identity when bucketing.
//!
//! Names are resolved through a [`MaterialLibrary`], the resource system
//! collaborator. [`MaterialRegistry`] is a simple in-memory implementation.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::{CanopyError, Result};
use crate::resources::{ProgramHandle, TextureHandle};

// ============================================================================
// Fixed-function State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullFace {
    Back,
    Front,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CullState {
    pub enabled: bool,
    pub mode: CullFace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    SrcAlpha,
    OneMinusSrcAlpha,
    One,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    Add,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub enabled: bool,
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub equation: BlendEquation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthFunc {
    LessEqual,
    Less,
    Equal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub enabled: bool,
    pub mask: bool,
    pub func: DepthFunc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorState {
    pub mask: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScissorState {
    pub enabled: bool,
}

/// Fixed-function pipeline state of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct State {
    pub cull: CullState,
    pub blend: BlendState,
    pub depth: DepthState,
    pub color: ColorState,
    pub scissor: ScissorState,
}

impl Default for State {
    fn default() -> Self {
        Self::opaque()
    }
}

impl State {
    /// Back-face culled, depth tested and written, no blending.
    #[must_use]
    pub const fn opaque() -> Self {
        Self {
            cull: CullState {
                enabled: true,
                mode: CullFace::Back,
            },
            blend: BlendState {
                enabled: false,
                src: BlendFactor::SrcAlpha,
                dst: BlendFactor::OneMinusSrcAlpha,
                equation: BlendEquation::Add,
            },
            depth: DepthState {
                enabled: true,
                mask: true,
                func: DepthFunc::LessEqual,
            },
            color: ColorState { mask: true },
            scissor: ScissorState { enabled: false },
        }
    }

    /// Depth-only: color writes off, depth written with `LessEqual`.
    #[must_use]
    pub const fn zpass() -> Self {
        let mut st = Self::opaque();
        st.color.mask = false;
        st
    }

    /// Alpha blended, depth tested but not written.
    #[must_use]
    pub const fn transparent() -> Self {
        let mut st = Self::opaque();
        st.blend.enabled = true;
        st.depth.mask = false;
        st
    }
}

// ============================================================================
// Material
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub state: State,
    pub program: ProgramHandle,
}

impl Material {
    #[must_use]
    pub fn new(name: impl Into<String>, state: State, program: ProgramHandle) -> Self {
        Self {
            name: name.into(),
            state,
            program,
        }
    }

    /// Blended materials render after all opaque work and never cast shadows.
    #[inline]
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.state.blend.enabled
    }
}

/// Per-node material inputs (texture slots by sampler name).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialData {
    textures: FxHashMap<String, TextureHandle>,
}

impl MaterialData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_texture(&mut self, name: impl Into<String>, texture: TextureHandle) {
        self.textures.insert(name.into(), texture);
    }

    #[must_use]
    pub fn texture(&self, name: &str) -> Option<TextureHandle> {
        self.textures.get(name).copied()
    }

    #[must_use]
    pub fn textures(&self) -> &FxHashMap<String, TextureHandle> {
        &self.textures
    }
}

// ============================================================================
// Material Library
// ============================================================================

/// The resource system as consumed by the core.
pub trait MaterialLibrary {
    fn material(&self, name: &str) -> Option<Arc<Material>>;

    fn program(&self, name: &str) -> Option<ProgramHandle>;

    /// Like [`material`](Self::material) but a miss is a contract violation.
    fn resolve_material(&self, name: &str) -> Result<Arc<Material>> {
        self.material(name)
            .ok_or_else(|| CanopyError::MaterialNotFound(name.to_string()))
    }

    fn resolve_program(&self, name: &str) -> Result<ProgramHandle> {
        self.program(name)
            .ok_or_else(|| CanopyError::ProgramNotFound(name.to_string()))
    }
}

/// In-memory [`MaterialLibrary`].
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    programs: FxHashMap<String, ProgramHandle>,
    materials: FxHashMap<String, Arc<Material>>,
}

impl MaterialRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_program(&mut self, name: impl Into<String>, program: ProgramHandle) {
        self.programs.insert(name.into(), program);
    }

    /// Registers a material whose program is looked up by name.
    ///
    /// Re-registering a name replaces the material; nodes holding the old
    /// `Arc` keep rendering with it and land in a separate bucket.
    pub fn register_material(
        &mut self,
        name: &str,
        state: State,
        program: &str,
    ) -> Result<Arc<Material>> {
        let program = self.resolve_program(program)?;
        let material = Arc::new(Material::new(name, state, program));
        self.materials.insert(name.to_string(), Arc::clone(&material));
        Ok(material)
    }

    pub fn insert(&mut self, material: Material) -> Arc<Material> {
        let material = Arc::new(material);
        self.materials
            .insert(material.name.clone(), Arc::clone(&material));
        material
    }
}

impl MaterialLibrary for MaterialRegistry {
    fn material(&self, name: &str) -> Option<Arc<Material>> {
        self.materials.get(name).cloned()
    }

    fn program(&self, name: &str) -> Option<ProgramHandle> {
        self.programs.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_material_requires_program() {
        let mut registry = MaterialRegistry::new();
        let err = registry
            .register_material("lit", State::opaque(), "uber")
            .unwrap_err();
        assert!(matches!(err, CanopyError::ProgramNotFound(name) if name == "uber"));
    }

    #[test]
    fn resolve_returns_same_arc() {
        let mut registry = MaterialRegistry::new();
        registry.register_program("uber", ProgramHandle::default());
        let lit = registry
            .register_material("lit", State::opaque(), "uber")
            .unwrap();
        let again = registry.resolve_material("lit").unwrap();
        assert!(Arc::ptr_eq(&lit, &again));
    }

    #[test]
    fn transparent_state_is_blended() {
        assert!(State::transparent().blend.enabled);
        assert!(!State::zpass().color.mask);
    }
}
