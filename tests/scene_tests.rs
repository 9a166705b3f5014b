//! Scene, SceneManager and Application tests
//!
//! Tests for:
//! - Hierarchy editing (attach, detach, destroy, copy, cycles)
//! - Graph utilities (find, sort, distance, children activation)
//! - Frame phases: shadow stages ahead of the main stage, camera order
//! - Physics write-back through set_world_transform
//! - Scene stack and cursor preference
//! - Application loop termination and fatal errors

use std::cell::Cell;
use std::rc::Rc;

use canopy::renderer::shadow::cascade_stage_name;
use canopy::scene::input::{InputState, KeyCode, SetActiveCommand};
use canopy::scene::{NodeCommand, PhysicsSystem, RigidBodyHandle};
use canopy::{
    AppSettings, Application, Camera, CanopyError, ClientApplication, HeadlessBackend,
    HeadlessWindow, Light, MaterialLibrary, MaterialRegistry, MeshData, NodeHandle,
    RenderBackend, Scene, SceneGraph, SceneManager, SceneSettings, ShadowMap, State,
    WindowSystem,
};
use glam::{DMat4, DVec3, UVec2};

// ============================================================================
// Fixture
// ============================================================================

const WINDOW: UVec2 = UVec2::new(200, 100);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn materials(backend: &mut HeadlessBackend) -> MaterialRegistry {
    init_logging();
    let program = backend.create_program("uber", &[]).unwrap();
    let mut materials = MaterialRegistry::new();
    materials.register_program("uber", program);
    for (name, state) in [
        ("zpass", State::zpass()),
        ("shadow", State::zpass()),
        ("lit", State::opaque()),
    ] {
        materials.register_material(name, state, "uber").unwrap();
    }
    materials
}

fn add_cube(
    scene: &mut Scene,
    backend: &mut HeadlessBackend,
    materials: &MaterialRegistry,
    name: &str,
    at: DVec3,
) -> NodeHandle {
    let mesh = backend.create_mesh(&MeshData::unit_cube()).unwrap();
    let lit = materials.resolve_material("lit").unwrap();
    let root = scene.root();
    let graph = scene.graph_mut();
    let node = graph.create_child(root, name).unwrap();
    graph.set_mesh(node, Some(mesh));
    graph.get_mut(node).unwrap().set_material(Some(lit));
    graph.translate(node, at);
    node
}

fn frame(scene: &mut Scene, backend: &mut HeadlessBackend) {
    scene.update(1.0 / 60.0, &InputState::new(WINDOW));
    scene.cull(WINDOW);
    scene.draw(backend).unwrap();
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn attaching_an_attached_node_fails() {
    let mut graph = SceneGraph::default();
    let root = graph.root();
    let a = graph.create_child(root, "a").unwrap();
    let b = graph.create_child(root, "b").unwrap();

    let err = graph.add_child(a, b).unwrap_err();
    let root_name = graph.get(root).unwrap().name();
    assert!(matches!(
        err,
        CanopyError::NodeAlreadyAttached { ref parent, .. } if parent == root_name
    ));
}

#[test]
fn attaching_an_ancestor_is_a_cycle() {
    let mut graph = SceneGraph::default();
    let root = graph.root();
    let a = graph.create_child(root, "a").unwrap();
    let b = graph.create_child(a, "b").unwrap();
    graph.remove_child(root, a).unwrap();

    assert!(matches!(graph.add_child(b, a), Err(CanopyError::CyclicAttach { .. })));
    assert!(matches!(graph.add_child(a, a), Err(CanopyError::CyclicAttach { .. })));
}

#[test]
fn detach_and_reattach_moves_subtree() {
    let mut graph = SceneGraph::default();
    let root = graph.root();
    let a = graph.create_child(root, "a").unwrap();
    let b = graph.create_child(root, "b").unwrap();
    let leaf = graph.create_child(a, "leaf").unwrap();
    graph.translate(b, DVec3::new(0.0, 7.0, 0.0));

    assert!(graph.remove_child(root, a).unwrap());
    assert!(!graph.remove_child(root, a).unwrap());
    graph.add_child(b, a).unwrap();
    graph.update(0.0, &InputState::default());

    assert_eq!(graph.get(a).unwrap().parent(), Some(b));
    assert_eq!(graph.world_position(leaf), Some(DVec3::new(0.0, 7.0, 0.0)));
}

#[test]
fn remove_children_frees_whole_subtree() {
    let mut graph = SceneGraph::default();
    let root = graph.root();
    let a = graph.create_child(root, "a").unwrap();
    let b = graph.create_child(a, "b").unwrap();
    let c = graph.create_child(b, "c").unwrap();

    assert_eq!(graph.remove_children(a).unwrap(), 2);
    assert!(graph.get(a).unwrap().children().is_empty());
    assert!(!graph.contains(b));
    assert!(!graph.contains(c));
    assert!(graph.get(a).unwrap().is_bounds_dirty());
}

#[test]
fn destroy_unlinks_from_parent() {
    let mut graph = SceneGraph::default();
    let root = graph.root();
    let a = graph.create_child(root, "a").unwrap();
    graph.create_child(a, "b").unwrap();

    assert_eq!(graph.destroy(a).unwrap(), 2);
    assert!(graph.get(root).unwrap().children().is_empty());
    assert_eq!(graph.len(), 1);
}

#[test]
fn copy_subtree_is_deep_and_detached() {
    let mut graph = SceneGraph::default();
    let root = graph.root();
    let a = graph.create_child(root, "a").unwrap();
    graph.create_child(a, "b").unwrap();
    graph.translate(a, DVec3::X);

    let copy = graph.copy_subtree(a).unwrap();
    let node = graph.get(copy).unwrap();
    assert_eq!(node.parent(), None);
    assert_eq!(node.name(), "a");
    assert_eq!(node.children().len(), 1);
    assert_ne!(node.children()[0], graph.get(a).unwrap().children()[0]);
    assert_eq!(*node.transform(), *graph.get(a).unwrap().transform());
}

// ============================================================================
// Utilities
// ============================================================================

#[test]
fn find_sort_and_distance() {
    let mut graph = SceneGraph::default();
    let root = graph.root();
    let c = graph.create_child(root, "charlie").unwrap();
    let a = graph.create_child(root, "alpha").unwrap();
    let b = graph.create_child(a, "bravo").unwrap();
    graph.translate(c, DVec3::new(0.0, 0.0, 9.0));
    graph.translate(a, DVec3::new(0.0, 0.0, 1.0));
    graph.translate(b, DVec3::new(0.0, 0.0, 3.0));
    graph.update(0.0, &InputState::default());

    assert_eq!(graph.find_by_name("bravo"), Some(b));
    assert_eq!(graph.find_by_name("delta"), None);

    let mut by_name = vec![c, b, a];
    graph.sort_by_name(&mut by_name);
    assert_eq!(by_name, vec![a, b, c]);

    let mut by_distance = vec![c, a, b];
    graph.sort_by_camera_distance(&mut by_distance, DVec3::ZERO);
    assert_eq!(by_distance, vec![a, b, c]);

    assert_eq!(graph.world_distance(a, c), Some(8.0));
}

#[test]
fn set_children_active_touches_direct_children_only() {
    let mut graph = SceneGraph::default();
    let root = graph.root();
    let a = graph.create_child(root, "a").unwrap();
    let b = graph.create_child(a, "b").unwrap();

    graph.set_children_active(root, false);
    assert!(!graph.get(a).unwrap().is_active());
    assert!(graph.get(b).unwrap().is_active());
}

#[test]
fn commands_apply_to_target_node() {
    let mut graph = SceneGraph::default();
    let root = graph.root();
    let a = graph.create_child(root, "a").unwrap();
    SetActiveCommand(false).run(&mut graph, a);
    assert!(!graph.get(a).unwrap().is_active());
}

// ============================================================================
// Frame Phases
// ============================================================================

#[test]
fn update_is_idempotent_through_scene() {
    let mut backend = HeadlessBackend::new();
    let materials = materials(&mut backend);
    let mut scene = Scene::new("s", SceneSettings::default(), &materials).unwrap();
    let cube = add_cube(&mut scene, &mut backend, &materials, "cube", DVec3::new(1.0, 2.0, 3.0));

    scene.update(0.1, &InputState::default());
    let before = *scene.graph().get(cube).unwrap().world_transform();
    scene.update(0.0, &InputState::default());
    assert_eq!(*scene.graph().get(cube).unwrap().world_transform(), before);
}

#[test]
fn shadow_stages_precede_main_stage() {
    let mut backend = HeadlessBackend::new();
    let materials = materials(&mut backend);
    let settings = SceneSettings {
        cascade_count: 2,
        shadow_map_size: 256,
        ..SceneSettings::default()
    };
    let mut scene = Scene::new("shadows", settings.clone(), &materials).unwrap();
    let root = scene.root();
    let camera = scene
        .add_camera(root, Camera::perspective("main", 60.0, 0.5, 50.0))
        .unwrap();
    let eye = scene.camera(camera).unwrap().node().unwrap();
    scene.graph_mut().translate(eye, DVec3::new(0.0, 1.0, 8.0));
    add_cube(&mut scene, &mut backend, &materials, "cube", DVec3::ZERO);

    let shadow = ShadowMap::from_settings(&settings, &mut backend, &materials).unwrap();
    let caster = scene.add_shadow_caster(Box::new(shadow));
    let graph = scene.graph_mut();
    let sun = graph.create_child(root, "sun").unwrap();
    graph.set_light(sun, Some(Light::directional().with_shadow(caster)));
    graph.translate(sun, DVec3::new(5.0, 10.0, 5.0));

    frame(&mut scene, &mut backend);

    let plan = backend.last_plan().unwrap();
    assert_eq!(
        plan.stage_names(),
        vec![
            cascade_stage_name(0).as_str(),
            cascade_stage_name(1).as_str(),
            "main-DefaultRenderTechnique",
        ]
    );
    assert_eq!(plan.stages[0].passes[0].nodes, vec!["cube"]);

    // The main stage sees the light with its fresh shadow matrices.
    let light = scene.graph().get(sun).unwrap().light().unwrap().block;
    let camera_lights = &scene.camera(camera).unwrap().constants().lights;
    assert_eq!(camera_lights.len(), 1);
    assert_eq!(camera_lights[0].vp_matrices, light.vp_matrices);
    assert_ne!(light.vp_matrices[0], glam::Mat4::IDENTITY);
}

#[test]
fn orthographic_cameras_get_no_shadow_stages() {
    let mut backend = HeadlessBackend::new();
    let materials = materials(&mut backend);
    let settings = SceneSettings::default();
    let mut scene = Scene::new("hud", settings.clone(), &materials).unwrap();
    let root = scene.root();
    scene
        .add_camera(
            root,
            Camera::orthographic("ui", Default::default(), -1.0, 1.0),
        )
        .unwrap();
    let shadow = ShadowMap::from_settings(&settings, &mut backend, &materials).unwrap();
    let caster = scene.add_shadow_caster(Box::new(shadow));
    let sun = scene.graph_mut().create_child(root, "sun").unwrap();
    scene
        .graph_mut()
        .set_light(sun, Some(Light::directional().with_shadow(caster)));

    frame(&mut scene, &mut backend);
    assert_eq!(backend.last_plan().unwrap().stage_names(), vec!["ui-DefaultRenderTechnique"]);
}

#[test]
fn cameras_render_in_order() {
    let mut backend = HeadlessBackend::new();
    let materials = materials(&mut backend);
    let mut scene = Scene::new("multi", SceneSettings::default(), &materials).unwrap();
    let root = scene.root();

    let mut overlay = Camera::default();
    overlay.name = "overlay".to_string();
    overlay.render_order = 10;
    let mut main = Camera::default();
    main.name = "main".to_string();
    let mut sky = Camera::default();
    sky.name = "sky".to_string();
    sky.render_order = -5;

    scene.add_camera(root, overlay).unwrap();
    let main_key = scene.add_camera(root, main).unwrap();
    scene.add_camera(root, sky).unwrap();

    frame(&mut scene, &mut backend);
    let cameras: Vec<_> = backend
        .last_plan()
        .unwrap()
        .stages
        .iter()
        .map(|s| s.camera.clone())
        .collect();
    assert_eq!(cameras, vec!["sky", "main", "overlay"]);

    let removed = scene.remove_camera(main_key).unwrap();
    assert_eq!(removed.name, "main");
    assert!(scene.graph().find_by_name("main").is_none());
    frame(&mut scene, &mut backend);
    assert_eq!(backend.last_plan().unwrap().stages.len(), 2);
}

struct Gravity {
    steps: Rc<Cell<u32>>,
}

impl PhysicsSystem for Gravity {
    fn step(&mut self, dt: f64, graph: &mut SceneGraph, bodies: &[NodeHandle]) {
        self.steps.set(self.steps.get() + 1);
        for &body in bodies {
            let world = *graph.get(body).unwrap().world_transform();
            let fallen = DMat4::from_translation(DVec3::new(0.0, -10.0 * dt, 0.0)) * world;
            graph.set_world_transform(body, fallen);
        }
    }
}

#[test]
fn physics_writes_back_world_transforms() {
    let mut backend = HeadlessBackend::new();
    let materials = materials(&mut backend);
    let mut scene = Scene::new("physics", SceneSettings::default(), &materials).unwrap();
    let steps = Rc::new(Cell::new(0));
    scene.set_physics(Box::new(Gravity {
        steps: Rc::clone(&steps),
    }));

    let root = scene.root();
    let graph = scene.graph_mut();
    let holder = graph.create_child(root, "holder").unwrap();
    graph.translate(holder, DVec3::new(3.0, 0.0, 0.0));
    let ball = graph.create_child(holder, "ball").unwrap();
    let rock = graph.create_child(holder, "rock").unwrap();
    graph
        .get_mut(ball)
        .unwrap()
        .set_rigid_body(Some(RigidBodyHandle::default()));

    scene.update(0.0, &InputState::default());
    scene.update(0.5, &InputState::default());

    assert_eq!(steps.get(), 2);
    let ball_pos = scene.graph().world_position(ball).unwrap();
    assert!((ball_pos - DVec3::new(3.0, -5.0, 0.0)).length() < 1e-9);
    assert_eq!(scene.graph().world_position(rock), Some(DVec3::new(3.0, 0.0, 0.0)));
}

// ============================================================================
// Scene Manager & Application
// ============================================================================

#[test]
fn scene_stack_applies_cursor_preference() {
    let mut backend = HeadlessBackend::new();
    let materials = materials(&mut backend);
    let mut window = HeadlessWindow::new(WINDOW.x, WINDOW.y);
    let mut manager = SceneManager::new();

    let mut game = Scene::new("game", SceneSettings::default(), &materials).unwrap();
    let mut menu = Scene::new("menu", SceneSettings::default(), &materials).unwrap();
    game.displays_cursor = false;
    menu.displays_cursor = true;

    manager.push_scene(game, &mut window);
    assert!(!window.is_cursor_visible());
    manager.push_scene(menu, &mut window);
    assert!(window.is_cursor_visible());
    assert_eq!(manager.front_scene().unwrap().name, "menu");

    let popped = manager.pop_scene(&mut window).unwrap();
    assert_eq!(popped.name, "menu");
    assert!(!window.is_cursor_visible());
    assert_eq!(manager.len(), 1);
}

struct QuitOnKey {
    quit_key: KeyCode,
    frames_seen: u32,
    quit: bool,
}

impl ClientApplication for QuitOnKey {
    fn handle_input(
        &mut self,
        input: &InputState,
        _scenes: &mut SceneManager,
        _window: &mut dyn WindowSystem,
    ) {
        self.frames_seen += 1;
        if input.is_key_pressed(self.quit_key) {
            self.quit = true;
        }
    }

    fn done(&self) -> bool {
        self.quit
    }
}

#[test]
fn application_runs_until_window_closes() {
    let mut backend = HeadlessBackend::new();
    let materials = materials(&mut backend);
    let window = HeadlessWindow::new(WINDOW.x, WINDOW.y).with_frame_limit(4);
    let mut app = Application::new(AppSettings::default(), Box::new(window), Box::new(backend));

    let mut scene = Scene::new("main", SceneSettings::default(), &materials).unwrap();
    let root = scene.root();
    scene.add_camera(root, Camera::default()).unwrap();
    let mut window_for_push = HeadlessWindow::new(1, 1);
    app.scenes_mut().push_scene(scene, &mut window_for_push);

    let mut client = QuitOnKey {
        quit_key: KeyCode(27),
        frames_seen: 0,
        quit: false,
    };
    app.run(&mut client).unwrap();

    // One present happens before the loop starts.
    assert_eq!(app.frame_count(), 3);
    assert_eq!(client.frames_seen, 3);
}

#[test]
fn application_stops_on_contract_violation() {
    let mut backend = HeadlessBackend::new();
    let materials = materials(&mut backend);
    let mut scene = Scene::new("broken", SceneSettings::default(), &materials).unwrap();
    let root = scene.root();
    scene.add_camera(root, Camera::default()).unwrap();
    let cube = add_cube(&mut scene, &mut backend, &materials, "cube", DVec3::new(0.0, 0.0, -5.0));
    scene.graph_mut().get_mut(cube).unwrap().set_material(None);

    let window = HeadlessWindow::new(WINDOW.x, WINDOW.y).with_frame_limit(100);
    let mut app = Application::new(AppSettings::default(), Box::new(window), Box::new(backend));
    let mut window_for_push = HeadlessWindow::new(1, 1);
    app.scenes_mut().push_scene(scene, &mut window_for_push);

    let mut client = QuitOnKey {
        quit_key: KeyCode(27),
        frames_seen: 0,
        quit: false,
    };
    let err = app.run(&mut client).unwrap_err();
    assert!(matches!(err, CanopyError::MissingMaterial { .. }));
    assert_eq!(app.frame_count(), 1);
}

#[test]
fn extreme_deltas_fall_back() {
    let settings = AppSettings::default();
    assert_eq!(settings.clamp_dt(0.5), settings.fallback_dt);
    assert_eq!(settings.clamp_dt(0.02), 0.02);
}
