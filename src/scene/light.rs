//! Lights and light extraction.
//!
//! A [`Light`] is data attached to a node. Its GPU-facing part is the
//! [`LightBlock`], laid out for direct upload as a uniform block. Shadow
//! casting is delegated to a scene-owned [`ShadowCaster`](crate::renderer::shadow::ShadowCaster)
//! referenced by key.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use smallvec::SmallVec;

use crate::renderer::shadow_utils::MAX_CASCADES;
use crate::scene::graph::SceneGraph;
use crate::scene::{NodeHandle, ShadowCasterKey};

/// Uniform block of one light.
///
/// `position.w` is `0` for directional lights and `1` for positional ones;
/// extraction rewrites `xyz` from the node's world position and keeps `w`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LightBlock {
    /// Bias * projection * view per cascade.
    pub vp_matrices: [Mat4; MAX_CASCADES],
    /// View-space far distance of each cascade in `x`.
    pub z_cuts: [Vec4; MAX_CASCADES],
    pub position: Vec4,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
}

impl Default for LightBlock {
    fn default() -> Self {
        Self {
            vp_matrices: [Mat4::IDENTITY; MAX_CASCADES],
            z_cuts: [Vec4::ZERO; MAX_CASCADES],
            position: Vec4::new(0.0, 0.0, 0.0, 1.0),
            ambient: Vec4::new(0.1, 0.1, 0.1, 1.0),
            diffuse: Vec4::ONE,
            specular: Vec4::ONE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Light {
    pub block: LightBlock,
    pub shadow: Option<ShadowCasterKey>,
}

impl Light {
    /// Light at infinity in the direction of the node's position.
    #[must_use]
    pub fn directional() -> Self {
        let mut light = Self::default();
        light.block.position.w = 0.0;
        light
    }

    #[must_use]
    pub fn positional() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_colors(mut self, ambient: Vec4, diffuse: Vec4, specular: Vec4) -> Self {
        self.block.ambient = ambient;
        self.block.diffuse = diffuse;
        self.block.specular = specular;
        self
    }

    #[must_use]
    pub fn with_shadow(mut self, caster: ShadowCasterKey) -> Self {
        self.shadow = Some(caster);
        self
    }

    #[inline]
    #[must_use]
    pub fn is_directional(&self) -> bool {
        self.block.position.w == 0.0
    }
}

pub trait LightExtractor {
    /// Collects lit nodes of the subtree rooted at `handle` into `lights`,
    /// updating each light's position from its node's world transform.
    fn run(&self, graph: &mut SceneGraph, handle: NodeHandle, lights: &mut Vec<NodeHandle>);
}

/// Pre-order extraction that prunes inactive subtrees.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLightExtractor;

impl LightExtractor for DefaultLightExtractor {
    fn run(&self, graph: &mut SceneGraph, handle: NodeHandle, lights: &mut Vec<NodeHandle>) {
        let Some(node) = graph.get_mut(handle) else {
            return;
        };
        if !node.active {
            return;
        }

        let world_position = node.world_position().as_vec3();
        if let Some(light) = node.light.as_mut() {
            let w = light.block.position.w;
            light.block.position = world_position.extend(w);
            lights.push(handle);
        }

        let children: SmallVec<[NodeHandle; 8]> = node.children.iter().copied().collect();
        for child in children {
            let extractor = graph.get(child).and_then(|c| c.light_extractor.clone());
            if let Some(extractor) = extractor {
                extractor.run(graph, child, lights);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::scene::input::InputState;

    #[test]
    fn extraction_keeps_w_and_follows_world_position() {
        let mut graph = SceneGraph::default();
        let root = graph.root();
        let arm = graph.create_child(root, "arm").unwrap();
        let sun = graph.create_child(arm, "sun").unwrap();
        graph.set_light(sun, Some(Light::directional()));
        graph.translate(arm, DVec3::new(1.0, 0.0, 0.0));
        graph.translate(sun, DVec3::new(0.0, 5.0, 0.0));
        graph.update(0.0, &InputState::default());

        let mut lights = Vec::new();
        DefaultLightExtractor.run(&mut graph, root, &mut lights);

        assert_eq!(lights, vec![sun]);
        let block = graph.get(sun).unwrap().light().unwrap().block;
        assert_eq!(block.position, Vec4::new(1.0, 5.0, 0.0, 0.0));
    }

    #[test]
    fn inactive_subtree_contributes_no_lights() {
        let mut graph = SceneGraph::default();
        let root = graph.root();
        let group = graph.create_child(root, "group").unwrap();
        let lamp = graph.create_child(group, "lamp").unwrap();
        graph.set_light(lamp, Some(Light::positional()));
        graph.get_mut(group).unwrap().set_active(false);

        let mut lights = Vec::new();
        DefaultLightExtractor.run(&mut graph, root, &mut lights);
        assert!(lights.is_empty());
    }

    #[test]
    fn light_block_is_plain_data() {
        let block = LightBlock::default();
        let bytes = bytemuck::bytes_of(&block);
        assert_eq!(bytes.len(), std::mem::size_of::<LightBlock>());
    }
}
