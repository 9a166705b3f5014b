//! Headless Demo
//!
//! Builds a small shadowed scene (a ground slab, a spinning crate, a glass
//! pane and a sun) and runs it through the application loop against the
//! headless backend for a fixed number of frames.
//!
//! Run with `RUST_LOG=trace` to see every executed plan.

use std::rc::Rc;

use canopy::scene::input::{InputHandler, InputState, KeyCode, KeyMoveHandler, RotateCommand};
use canopy::scene::{Node, NodeCommand};
use canopy::{
    Application, Camera, ClientApplication, EngineSettings, HeadlessBackend, HeadlessWindow,
    Light, MaterialRegistry, MeshData, RenderBackend, Scene, SceneManager, ShadowMap, State,
    WindowSystem,
};
use glam::DVec3;

const SETTINGS: &str = r#"{
    "scene": { "cascade_count": 3, "shadow_map_size": 1024 },
    "app": { "max_dt": 0.25 }
}"#;

const KEY_ESCAPE: KeyCode = KeyCode(27);

/// Spins its node around Y at a fixed rate.
struct Spin {
    degrees_per_second: f64,
}

impl InputHandler for Spin {
    fn run(&self, _node: &Node, _input: &InputState, dt: f64) -> Vec<Box<dyn NodeCommand>> {
        vec![Box::new(RotateCommand {
            angle_degrees: self.degrees_per_second * dt,
            axis: DVec3::Y,
        })]
    }
}

struct Demo {
    quit: bool,
}

impl ClientApplication for Demo {
    fn handle_input(
        &mut self,
        input: &InputState,
        scenes: &mut SceneManager,
        _window: &mut dyn WindowSystem,
    ) {
        if input.is_key_pressed(KEY_ESCAPE) {
            self.quit = true;
        }
        if let Some(scene) = scenes.front_scene() {
            log::debug!("Scene '{}' has {} nodes", scene.name, scene.graph().len());
        }
    }

    fn done(&self) -> bool {
        self.quit
    }

    fn stop(&mut self) {
        log::info!("Demo finished");
    }
}

fn build_scene(
    settings: &EngineSettings,
    backend: &mut HeadlessBackend,
) -> anyhow::Result<Scene> {
    let program = backend.create_program("uber", &[("vertex", ""), ("fragment", "")])?;
    let mut materials = MaterialRegistry::new();
    materials.register_program("uber", program);
    materials.register_material("zpass", State::zpass(), "uber")?;
    materials.register_material("shadow", State::zpass(), "uber")?;
    let stone = materials.register_material("stone", State::opaque(), "uber")?;
    let wood = materials.register_material("wood", State::opaque(), "uber")?;
    let glass = materials.register_material("glass", State::transparent(), "uber")?;

    let mut scene = Scene::new("demo", settings.scene.clone(), &materials)?;
    scene.displays_cursor = false;
    let root = scene.root();
    let cube = backend.create_mesh(&MeshData::unit_cube())?;

    let camera = Camera::perspective("main", 60.0, 0.1, 80.0);
    let camera = scene.add_camera(root, camera)?;
    let shadow = ShadowMap::from_settings(&settings.scene, backend, &materials)?;
    let caster = scene.add_shadow_caster(Box::new(shadow));

    let graph = scene.graph_mut();
    if let Some(eye) = graph.find_by_name("main") {
        graph.translate(eye, DVec3::new(0.0, 3.0, 12.0));
        let pan = KeyMoveHandler::new(4.0)
            .bind(KeyCode(65), DVec3::NEG_X)
            .bind(KeyCode(68), DVec3::X);
        if let Some(node) = graph.get_mut(eye) {
            node.set_input_handler(Some(Rc::new(pan)));
        }
    }

    let ground = graph.create_child(root, "ground")?;
    graph.set_mesh(ground, Some(cube.clone()));
    graph.scale(ground, DVec3::new(20.0, 0.2, 20.0));
    graph.translate(ground, DVec3::new(0.0, -1.0, 0.0));

    let crate_node = graph.create_child(root, "crate")?;
    graph.set_mesh(crate_node, Some(cube.clone()));

    let pane = graph.create_child(root, "pane")?;
    graph.set_mesh(pane, Some(cube));
    graph.scale(pane, DVec3::new(2.0, 2.0, 0.05));
    graph.translate(pane, DVec3::new(0.0, 0.5, 3.0));

    for (node, material) in [(ground, stone), (crate_node, wood), (pane, glass)] {
        if let Some(node) = graph.get_mut(node) {
            node.set_material(Some(material));
        }
    }
    if let Some(node) = graph.get_mut(crate_node) {
        node.set_input_handler(Some(Rc::new(Spin {
            degrees_per_second: 90.0,
        })));
    }

    let sun = graph.create_child(root, "sun")?;
    graph.set_light(sun, Some(Light::directional().with_shadow(caster)));
    graph.translate(sun, DVec3::new(10.0, 20.0, 5.0));

    log::info!(
        "Built scene '{}' with camera {:?} and {} nodes",
        scene.name,
        camera,
        scene.graph().len()
    );
    Ok(scene)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = EngineSettings::from_json_str(SETTINGS)?;
    let mut backend = HeadlessBackend::new();
    let scene = build_scene(&settings, &mut backend)?;

    let mut window = HeadlessWindow::new(1280, 720).with_frame_limit(120);
    window.input_mut().press_key(KeyCode(68));

    let mut app = Application::new(settings.app, Box::new(window), Box::new(backend));
    let mut scenes = SceneManager::new();
    scenes.push_scene(scene, app.window_mut());
    *app.scenes_mut() = scenes;

    app.run(&mut Demo { quit: false })?;
    log::info!("Ran {} frames", app.frame_count());
    Ok(())
}
