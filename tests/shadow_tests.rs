//! Shadow mapping tests
//!
//! Tests for:
//! - Cascade split computation
//! - Texel snapping of light-space bounds
//! - Light view orientation and the vertical fallback
//! - ShadowMap stage generation against a headless backend

use std::sync::Arc;

use canopy::renderer::RenderBackend;
use canopy::renderer::shadow::{ShadowCaster, cascade_stage_name, cascade_texture_name};
use canopy::renderer::shadow_utils::{
    MAX_CASCADES, SHADOW_BIAS, cascade_projection, compute_cascade_splits, light_view_matrix,
    snap_to_texels,
};
use canopy::renderer::technique::MaterialBuckets;
use canopy::scene::input::InputState;
use canopy::scene::light::LightBlock;
use canopy::{
    Aabb, Camera, HeadlessBackend, MaterialLibrary, MaterialRegistry, MeshData, SceneGraph,
    ShadowMap, State,
};
use glam::{DVec3, UVec2, Vec4};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f64 = 1e-9;

fn is_multiple_of(value: f64, step: f64) -> bool {
    let q = value / step;
    (q - q.round()).abs() < 1e-6
}

// ============================================================================
// Cascade Splits
// ============================================================================

#[test]
fn splits_are_monotonic_and_end_at_far() {
    for lambda in [0.0, 0.3, 0.75, 1.0] {
        let splits = compute_cascade_splits(4, 0.5, 200.0, lambda);
        assert!(splits.windows(2).all(|w| w[0] < w[1]), "lambda {lambda}");
        assert_eq!(splits[3], 200.0);
    }
}

#[test]
fn logarithmic_splits_match_closed_form() {
    let splits = compute_cascade_splits(2, 1.0, 100.0, 1.0);
    assert!((splits[0] - 10.0).abs() < EPSILON);
}

#[test]
fn cascade_count_is_capped() {
    let splits = compute_cascade_splits(MAX_CASCADES + 3, 1.0, 10.0, 0.5);
    assert_eq!(splits[MAX_CASCADES - 1], 10.0);
}

// ============================================================================
// Texel Snapping
// ============================================================================

#[test]
fn snapped_bounds_are_texel_multiples_and_enclose_input() {
    let bounds = Aabb::new(DVec3::new(-3.3, 1.7, -9.0), DVec3::new(5.1, 6.2, -1.0));
    let size = 512;
    let snapped = snap_to_texels(&bounds, size);
    let texel = bounds.size() / f64::from(size);

    assert!(is_multiple_of(snapped.min.x, texel.x));
    assert!(is_multiple_of(snapped.max.x, texel.x));
    assert!(is_multiple_of(snapped.min.y, texel.y));
    assert!(is_multiple_of(snapped.max.y, texel.y));

    assert!(snapped.min.x <= bounds.min.x && snapped.max.x >= bounds.max.x);
    assert!(snapped.min.y <= bounds.min.y && snapped.max.y >= bounds.max.y);
    assert_eq!(snapped.min.z, bounds.min.z);
    assert_eq!(snapped.max.z, bounds.max.z);
}

#[test]
fn zero_extent_axis_is_left_alone() {
    let bounds = Aabb::new(DVec3::new(1.25, 0.0, 0.0), DVec3::new(1.25, 2.0, 1.0));
    let snapped = snap_to_texels(&bounds, 1024);
    assert_eq!(snapped.min.x, 1.25);
    assert_eq!(snapped.max.x, 1.25);
}

#[test]
fn cascade_projection_maps_snapped_box_to_clip_cube() {
    let bounds = Aabb::new(DVec3::new(-2.0, -2.0, -8.0), DVec3::new(2.0, 2.0, -1.0));
    let proj = cascade_projection(&bounds, 256);
    let near_corner = proj.project_point3(DVec3::new(-2.0, -2.0, -1.0));
    let far_corner = proj.project_point3(DVec3::new(2.0, 2.0, -8.0));
    assert!((near_corner - DVec3::new(-1.0, -1.0, -1.0)).length() < EPSILON);
    assert!((far_corner - DVec3::new(1.0, 1.0, 1.0)).length() < EPSILON);
}

// ============================================================================
// Light View
// ============================================================================

#[test]
fn light_view_looks_at_origin() {
    let view = light_view_matrix(DVec3::new(10.0, 10.0, 0.0));
    let origin = view.transform_point3(DVec3::ZERO);
    // The origin lies straight ahead, down -Z.
    assert!(origin.x.abs() < EPSILON && origin.y.abs() < EPSILON);
    assert!(origin.z < 0.0);
}

#[test]
fn vertical_light_uses_fallback_up() {
    let view = light_view_matrix(DVec3::new(0.0, 50.0, 0.0));
    assert!(view.is_finite());
    let origin = view.transform_point3(DVec3::ZERO);
    assert!((origin.z + 50.0).abs() < EPSILON);
}

#[test]
fn light_at_origin_yields_finite_view() {
    let view = light_view_matrix(DVec3::ZERO);
    assert!(view.is_finite());
    let origin = view.transform_point3(DVec3::ZERO);
    assert!((origin.z + 1.0).abs() < EPSILON);
}

// ============================================================================
// ShadowMap
// ============================================================================

struct ShadowFixture {
    backend: HeadlessBackend,
    materials: MaterialRegistry,
    graph: SceneGraph,
    camera: Camera,
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn shadow_fixture() -> ShadowFixture {
    init_logging();
    let mut backend = HeadlessBackend::new();
    let program = backend.create_program("uber", &[]).unwrap();
    let mut materials = MaterialRegistry::new();
    materials.register_program("uber", program);
    materials
        .register_material("shadow", State::zpass(), "uber")
        .unwrap();
    let lit = materials
        .register_material("lit", State::opaque(), "uber")
        .unwrap();
    let glass = materials
        .register_material("glass", State::transparent(), "uber")
        .unwrap();

    let cube = backend.create_mesh(&MeshData::unit_cube()).unwrap();
    let mut graph = SceneGraph::default();
    let root = graph.root();
    for (name, material, z) in [("box", &lit, -5.0), ("pane", &glass, -6.0)] {
        let node = graph.create_child(root, name).unwrap();
        graph.set_mesh(node, Some(Arc::clone(&cube)));
        graph.get_mut(node).unwrap().set_material(Some(Arc::clone(material)));
        graph.translate(node, DVec3::new(0.0, 0.0, z));
    }
    graph.update(0.0, &InputState::default());

    let mut camera = Camera::perspective("main", 60.0, 0.5, 50.0);
    camera.reshape(UVec2::new(128, 128));

    ShadowFixture {
        backend,
        materials,
        graph,
        camera,
    }
}

#[test]
fn shadow_map_emits_one_stage_per_cascade() {
    let mut fx = shadow_fixture();
    let visible: Vec<_> = fx
        .graph
        .iter()
        .filter(|(_, n)| n.mesh().is_some())
        .map(|(h, _)| h)
        .collect();
    fx.camera.compute_cascades(&fx.graph, &visible, 3, 0.5);
    let buckets = MaterialBuckets::build(&fx.graph, &visible).unwrap();

    let mut shadow = ShadowMap::new(256, 3, "shadow", &mut fx.backend, &fx.materials).unwrap();
    let mut light = LightBlock {
        position: Vec4::new(10.0, 20.0, 5.0, 0.0),
        ..LightBlock::default()
    };
    let stages = shadow.render_stages(&mut light, &fx.camera, &buckets, &mut fx.graph);

    assert_eq!(stages.len(), 3);
    for (i, stage) in stages.iter().enumerate() {
        assert_eq!(stage.name, cascade_stage_name(i));
        assert!(stage.view.render_target.is_some());
        // Only the opaque bucket casts.
        assert_eq!(stage.passes.len(), 1);
        assert_eq!(stage.passes[0].name, "ShadowPass");
        assert_eq!(stage.passes[0].material.name, "shadow");
        assert_ne!(light.vp_matrices[i], glam::Mat4::IDENTITY);
        assert_eq!(light.z_cuts[i].x, fx.camera.cascades().split(i) as f32);
    }

    let textures = shadow.textures();
    let box_node = fx.graph.find_by_name("box").unwrap();
    let data = fx.graph.get(box_node).unwrap().material_data();
    for (i, texture) in textures.iter().enumerate() {
        assert_eq!(data.texture(&cascade_texture_name(i)), Some(*texture));
    }
}

#[test]
fn empty_cascades_still_emit_stages() {
    let mut fx = shadow_fixture();
    fx.camera.compute_cascades(&fx.graph, &[], 2, 0.5);
    let buckets = MaterialBuckets::default();

    let mut shadow = ShadowMap::new(128, 2, "shadow", &mut fx.backend, &fx.materials).unwrap();
    let mut light = LightBlock::default();
    let stages = shadow.render_stages(&mut light, &fx.camera, &buckets, &mut fx.graph);

    assert_eq!(stages.len(), 2);
    assert!(stages.iter().all(|s| s.passes.is_empty()));
    assert!(light.vp_matrices[0].is_finite());
}

#[test]
fn shadow_matrix_lands_in_texture_space() {
    let mut fx = shadow_fixture();
    let box_node = fx.graph.find_by_name("box").unwrap();
    fx.camera.compute_cascades(&fx.graph, &[box_node], 1, 0.5);
    let buckets = MaterialBuckets::build(&fx.graph, &[box_node]).unwrap();

    let mut shadow = ShadowMap::new(64, 1, "shadow", &mut fx.backend, &fx.materials).unwrap();
    let mut light = LightBlock {
        position: Vec4::new(0.0, 10.0, 10.0, 0.0),
        ..LightBlock::default()
    };
    let _ = shadow.render_stages(&mut light, &fx.camera, &buckets, &mut fx.graph);

    let center = fx.graph.get(box_node).unwrap().world_bounds().center();
    let uvz = light.vp_matrices[0].project_point3(center.as_vec3());
    for c in uvz.to_array() {
        assert!((-1e-4..=1.0 + 1e-4).contains(&c), "{uvz:?} outside [0, 1]");
    }
    // Sanity: the bias is the documented column layout.
    assert_eq!(SHADOW_BIAS.w_axis.truncate(), DVec3::splat(0.5));
}

#[test]
fn unknown_shadow_material_is_rejected() {
    let mut fx = shadow_fixture();
    let err = ShadowMap::new(64, 1, "missing", &mut fx.backend, &fx.materials).unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn render_targets_match_map_size() {
    let mut fx = shadow_fixture();
    let shadow = ShadowMap::new(512, 2, "shadow", &mut fx.backend, &fx.materials).unwrap();
    assert_eq!(shadow.cascade_count(), 2);
    let target = shadow.render_target(1).unwrap();
    assert_eq!((target.width, target.height), (512, 512));
    assert!(fx.materials.material("shadow").is_some());
}
