use glam::DVec3;

use crate::resources::MeshHandle;
use crate::scene::bounds::Aabb;

/// Raster primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveType {
    #[default]
    Triangles,
    Points,
    Lines,
}

/// CPU-side geometry handed to [`RenderBackend::create_mesh`](crate::renderer::backend::RenderBackend::create_mesh).
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub name: String,
    pub primitive: PrimitiveType,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 3]>,
    pub indices: Vec<u16>,
}

impl MeshData {
    /// Object-space bounds of the vertex positions.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(
            self.positions
                .iter()
                .map(|p| DVec3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2]))),
        )
    }

    /// A `width` x `height` quad in the XY plane with its corner at the
    /// origin, for orthographic full-screen draws.
    #[must_use]
    pub fn screen_quad(width: f32, height: f32) -> Self {
        Self {
            name: format!("ScreenQuad-{width}x{height}"),
            primitive: PrimitiveType::Triangles,
            positions: vec![
                [0.0, 0.0, 0.0],
                [0.0, height, 0.0],
                [width, height, 0.0],
                [width, 0.0, 0.0],
            ],
            normals: Vec::new(),
            tex_coords: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    /// Line-list cube of edge 1 centered at the origin. Scaled and translated
    /// per node to visualise bounds.
    #[must_use]
    pub fn unit_cube() -> Self {
        Self {
            name: "AABB".to_string(),
            primitive: PrimitiveType::Lines,
            positions: vec![
                [-0.5, -0.5, -0.5],
                [0.5, -0.5, -0.5],
                [0.5, 0.5, -0.5],
                [-0.5, 0.5, -0.5],
                [-0.5, -0.5, 0.5],
                [0.5, -0.5, 0.5],
                [0.5, 0.5, 0.5],
                [-0.5, 0.5, 0.5],
            ],
            normals: Vec::new(),
            tex_coords: Vec::new(),
            indices: vec![
                0, 1, 1, 2, 2, 3, 3, 0, // back face
                4, 5, 5, 6, 6, 7, 7, 4, // front face
                0, 4, 1, 5, 2, 6, 3, 7,
            ],
        }
    }
}

/// A backend mesh as seen by the core: identity, primitive and bounds.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub handle: MeshHandle,
    pub name: String,
    pub primitive: PrimitiveType,
    pub index_count: u32,
    bounds: Aabb,
}

impl Mesh {
    #[must_use]
    pub fn new(handle: MeshHandle, data: &MeshData) -> Self {
        Self {
            handle,
            name: data.name.clone(),
            primitive: data.primitive,
            index_count: data.indices.len() as u32,
            bounds: data.bounds(),
        }
    }

    /// Mesh with explicit bounds and no vertex data, for procedural or
    /// externally-loaded geometry.
    #[must_use]
    pub fn with_bounds(handle: MeshHandle, name: impl Into<String>, bounds: Aabb) -> Self {
        Self {
            handle,
            name: name.into(),
            primitive: PrimitiveType::Triangles,
            index_count: 0,
            bounds,
        }
    }

    /// Object-space bounds.
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }
}
