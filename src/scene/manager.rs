use glam::UVec2;

use crate::app::window::WindowSystem;
use crate::errors::Result;
use crate::renderer::backend::RenderBackend;
use crate::scene::input::InputState;
use crate::scene::scene::Scene;

/// Stack of scenes. The last pushed scene is the front one; every active
/// scene is updated, culled and drawn each frame, back to front.
#[derive(Debug, Default)]
pub struct SceneManager {
    scenes: Vec<Scene>,
}

impl SceneManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `scene` to the front and applies its cursor preference.
    pub fn push_scene(&mut self, scene: Scene, window: &mut dyn WindowSystem) {
        log::info!("Scene '{}' pushed", scene.name);
        window.set_cursor_visible(scene.displays_cursor);
        self.scenes.push(scene);
    }

    /// Pops the front scene; the scene below (if any) becomes front and its
    /// cursor preference is applied.
    pub fn pop_scene(&mut self, window: &mut dyn WindowSystem) -> Option<Scene> {
        let popped = self.scenes.pop()?;
        log::info!("Scene '{}' popped", popped.name);
        if let Some(front) = self.scenes.last() {
            window.set_cursor_visible(front.displays_cursor);
        }
        Some(popped)
    }

    #[must_use]
    pub fn front_scene(&self) -> Option<&Scene> {
        self.scenes.last()
    }

    pub fn front_scene_mut(&mut self) -> Option<&mut Scene> {
        self.scenes.last_mut()
    }

    #[must_use]
    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.name == name)
    }

    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| s.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn update(&mut self, dt: f64, input: &InputState) {
        for scene in self.scenes.iter_mut().filter(|s| s.active) {
            scene.update(dt, input);
        }
    }

    pub fn cull(&mut self, window_size: UVec2) {
        for scene in self.scenes.iter_mut().filter(|s| s.active) {
            scene.cull(window_size);
        }
    }

    /// Draws every active scene. The first failing scene aborts the frame.
    pub fn draw(&mut self, backend: &mut dyn RenderBackend) -> Result<()> {
        for scene in self.scenes.iter_mut().filter(|s| s.active) {
            scene.draw(backend)?;
        }
        Ok(())
    }
}
