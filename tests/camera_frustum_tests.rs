//! Camera and frustum tests
//!
//! Tests for:
//! - Frustum plane extraction from perspective and orthographic matrices
//! - AABB-frustum intersection (inside, outside, straddling, empty)
//! - Camera reshape and view placement
//! - Cascade bound collection per depth slice

use std::sync::Arc;

use canopy::renderer::shadow_utils::MAX_CASCADES;
use canopy::resources::{MeshHandle, ProgramHandle};
use canopy::scene::camera::{Frustum, OrthographicExtents};
use canopy::scene::input::InputState;
use canopy::{Aabb, Camera, Material, Mesh, SceneGraph, State};
use glam::{DMat4, DVec3, UVec2};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f64 = 1e-9;

fn box_at(center: DVec3, half: f64) -> Aabb {
    Aabb::from_center_half_extents(center, DVec3::splat(half))
}

fn perspective_frustum() -> Frustum {
    let proj = DMat4::perspective_rh_gl(60f64.to_radians(), 1.0, 0.1, 100.0);
    Frustum::from_matrix(&proj)
}

// ============================================================================
// Frustum
// ============================================================================

#[test]
fn frustum_planes_are_normalized() {
    let frustum = perspective_frustum();
    for plane in &frustum.planes {
        assert!((plane.truncate().length() - 1.0).abs() < EPSILON);
    }
}

#[test]
fn box_in_front_of_camera_is_visible() {
    let frustum = perspective_frustum();
    assert!(frustum.intersects_aabb(&box_at(DVec3::new(0.0, 0.0, -10.0), 1.0)));
}

#[test]
fn box_behind_camera_is_culled() {
    let frustum = perspective_frustum();
    assert!(!frustum.intersects_aabb(&box_at(DVec3::new(0.0, 0.0, 10.0), 1.0)));
}

#[test]
fn box_beyond_far_plane_is_culled() {
    let frustum = perspective_frustum();
    assert!(!frustum.intersects_aabb(&box_at(DVec3::new(0.0, 0.0, -150.0), 1.0)));
}

#[test]
fn box_straddling_side_plane_is_visible() {
    let frustum = perspective_frustum();
    // At depth 10 the half-width is 10 * tan(30deg) ~= 5.77.
    assert!(frustum.intersects_aabb(&box_at(DVec3::new(5.77, 0.0, -10.0), 0.5)));
    assert!(!frustum.intersects_aabb(&box_at(DVec3::new(8.0, 0.0, -10.0), 0.5)));
}

#[test]
fn empty_box_never_intersects() {
    let frustum = perspective_frustum();
    assert!(!frustum.intersects_aabb(&Aabb::EMPTY));
}

#[test]
fn orthographic_frustum_is_a_box() {
    let proj = DMat4::orthographic_rh_gl(-4.0, 4.0, -4.0, 4.0, -10.0, 10.0);
    let frustum = Frustum::from_matrix(&proj);
    assert!(frustum.contains_point(DVec3::new(3.9, -3.9, 9.0)));
    assert!(!frustum.contains_point(DVec3::new(4.1, 0.0, 0.0)));
    assert!(!frustum.contains_point(DVec3::new(0.0, 0.0, -10.5)));
}

// ============================================================================
// Camera
// ============================================================================

#[test]
fn reshape_tracks_window_size() {
    let mut camera = Camera::perspective("main", 60.0, 0.1, 100.0);
    camera.reshape(UVec2::new(1280, 720));
    assert_eq!(camera.viewport.width, 1280.0);
    assert_eq!(camera.viewport.height, 720.0);
    let expected = DMat4::perspective_rh_gl(60f64.to_radians(), 1280.0 / 720.0, 0.1, 100.0);
    assert!(camera.projection_matrix().abs_diff_eq(expected, EPSILON));
}

#[test]
fn view_is_inverse_of_placement() {
    let mut camera = Camera::perspective("main", 60.0, 0.1, 100.0);
    camera.reshape(UVec2::new(100, 100));
    let placement = DMat4::from_translation(DVec3::new(0.0, 0.0, 20.0));
    camera.update_view(&placement);

    assert!((camera.position() - DVec3::new(0.0, 0.0, 20.0)).length() < EPSILON);
    // The box at the origin is now 20 units in front of the eye.
    assert!(camera.frustum().intersects_aabb(&box_at(DVec3::ZERO, 1.0)));
    assert!(!camera.frustum().intersects_aabb(&box_at(DVec3::new(0.0, 0.0, 30.0), 1.0)));
}

#[test]
fn constants_mirror_matrices() {
    let mut camera = Camera::orthographic(
        "ortho",
        OrthographicExtents::symmetric(2.0, 2.0),
        -1.0,
        1.0,
    );
    camera.reshape(UVec2::new(64, 64));
    let block = camera.constants().block;
    assert_eq!(block.projection, camera.projection_matrix().as_mat4());
    assert_eq!(block.view_projection, camera.view_projection().as_mat4());
}

// ============================================================================
// Cascades
// ============================================================================

#[test]
fn cascades_collect_bounds_per_slice() {
    let program = ProgramHandle::default();
    let opaque = Arc::new(Material::new("lit", State::opaque(), program));
    let glass = Arc::new(Material::new("glass", State::transparent(), program));
    let mesh = Arc::new(Mesh::with_bounds(
        MeshHandle::default(),
        "cube",
        box_at(DVec3::ZERO, 0.5),
    ));

    let mut graph = SceneGraph::default();
    let root = graph.root();
    let near = graph.create_child(root, "near").unwrap();
    let far = graph.create_child(root, "far").unwrap();
    let window = graph.create_child(root, "window").unwrap();
    for (h, material, z) in [(near, &opaque, -2.0), (far, &opaque, -80.0), (window, &glass, -2.0)] {
        graph.set_mesh(h, Some(Arc::clone(&mesh)));
        graph.get_mut(h).unwrap().set_material(Some(Arc::clone(material)));
        graph.translate(h, DVec3::new(0.0, 0.0, z));
    }
    graph.update(0.0, &InputState::default());

    let mut camera = Camera::perspective("main", 60.0, 1.0, 100.0);
    camera.reshape(UVec2::new(100, 100));
    camera.compute_cascades(&graph, &[near, far, window], 2, 0.0);

    let cascades = camera.cascades();
    assert_eq!(cascades.count, 2);
    assert_eq!(cascades.splits[1], 100.0);
    // Uniform split at 50.5: `near` falls in cascade 0, `far` in cascade 1.
    assert!((cascades.bounds(0).center() - DVec3::new(0.0, 0.0, -2.0)).length() < EPSILON);
    assert!((cascades.bounds(1).center() - DVec3::new(0.0, 0.0, -80.0)).length() < EPSILON);
    // Transparent nodes never cast.
    assert_eq!(cascades.bounds(0).size(), DVec3::ONE);
    assert!(cascades.bounds(MAX_CASCADES).is_empty());
}
