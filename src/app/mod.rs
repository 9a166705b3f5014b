//! Application loop.
//!
//! [`Application`] owns the window, the backend and the scene stack and
//! drives the per-frame phases until the client or the window asks to stop.

pub mod window;

use std::time::Instant;

use crate::errors::Result;
use crate::renderer::backend::RenderBackend;
use crate::scene::input::InputState;
use crate::scene::manager::SceneManager;
use crate::settings::AppSettings;

use self::window::WindowSystem;

/// The program being run. Receives input before the scenes do and may
/// push or pop scenes in response.
pub trait ClientApplication {
    fn start(&mut self, _scenes: &mut SceneManager, _window: &mut dyn WindowSystem) -> Result<()> {
        Ok(())
    }

    fn handle_input(
        &mut self,
        input: &InputState,
        scenes: &mut SceneManager,
        window: &mut dyn WindowSystem,
    );

    fn done(&self) -> bool;

    fn stop(&mut self) {}
}

pub struct Application {
    pub settings: AppSettings,
    window: Box<dyn WindowSystem>,
    backend: Box<dyn RenderBackend>,
    scenes: SceneManager,
    frame_count: u64,
}

impl Application {
    #[must_use]
    pub fn new(
        settings: AppSettings,
        window: Box<dyn WindowSystem>,
        backend: Box<dyn RenderBackend>,
    ) -> Self {
        Self {
            settings,
            window,
            backend,
            scenes: SceneManager::new(),
            frame_count: 0,
        }
    }

    #[must_use]
    pub fn scenes(&self) -> &SceneManager {
        &self.scenes
    }

    pub fn scenes_mut(&mut self) -> &mut SceneManager {
        &mut self.scenes
    }

    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    pub fn window_mut(&mut self) -> &mut dyn WindowSystem {
        self.window.as_mut()
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Runs frames until `client.done()` or the window closes.
    ///
    /// A frame whose draw fails with a contract violation ends the loop with
    /// that error. Other backend failures drop the frame and the next one
    /// starts from fresh state.
    pub fn run(&mut self, client: &mut dyn ClientApplication) -> Result<()> {
        log::info!("Starting application");
        self.backend.start()?;
        client.start(&mut self.scenes, self.window.as_mut())?;

        self.window.step();
        let mut dt = self.settings.fallback_dt;
        let mut frame_start = Instant::now();

        let result = loop {
            if client.done() || self.window.should_close() {
                break Ok(());
            }

            if let Err(e) = self.frame(client, dt) {
                if e.is_contract_violation() {
                    log::error!("Fatal error in frame {}: {e}", self.frame_count);
                    break Err(e);
                }
                log::warn!("Frame {} dropped: {e}", self.frame_count);
            }

            let now = Instant::now();
            dt = self
                .settings
                .clamp_dt(now.duration_since(frame_start).as_secs_f64());
            frame_start = now;
        };

        client.stop();
        self.backend.stop();
        log::info!("Application stopped after {} frames", self.frame_count);
        result
    }

    /// One iteration: client input, update, cull, draw, present.
    pub fn frame(&mut self, client: &mut dyn ClientApplication, dt: f64) -> Result<()> {
        let input = self.window.input().clone();
        client.handle_input(&input, &mut self.scenes, self.window.as_mut());

        self.scenes.update(dt, &input);
        self.window.poll_events();

        self.scenes.cull(self.window.window_size());
        self.window.poll_events();

        let drawn = self.scenes.draw(self.backend.as_mut());
        self.window.step();
        self.window.poll_events();
        self.frame_count += 1;
        drawn
    }
}
