use glam::UVec2;

use crate::scene::input::InputState;

/// Window system boundary: surface size, input and buffer swaps.
pub trait WindowSystem {
    fn window_size(&self) -> UVec2;

    fn input(&self) -> &InputState;

    /// Pumps platform events into the input state.
    fn poll_events(&mut self);

    /// Presents the frame and resets per-frame input deltas.
    fn step(&mut self);

    fn should_close(&self) -> bool;

    fn set_cursor_visible(&mut self, visible: bool);
}

/// A window without a surface. Input is scripted through
/// [`input_mut`](Self::input_mut); it requests close after a fixed number
/// of presented frames.
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    size: UVec2,
    input: InputState,
    cursor_visible: bool,
    frames: u64,
    max_frames: Option<u64>,
}

impl HeadlessWindow {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let size = UVec2::new(width, height);
        Self {
            size,
            input: InputState::new(size),
            cursor_visible: true,
            frames: 0,
            max_frames: None,
        }
    }

    #[must_use]
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = UVec2::new(width, height);
        self.input.window_size = self.size;
    }

    #[must_use]
    pub fn is_cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    #[must_use]
    pub fn frames_presented(&self) -> u64 {
        self.frames
    }
}

impl WindowSystem for HeadlessWindow {
    fn window_size(&self) -> UVec2 {
        self.size
    }

    fn input(&self) -> &InputState {
        &self.input
    }

    fn poll_events(&mut self) {}

    fn step(&mut self) {
        self.frames += 1;
        self.input.end_frame();
    }

    fn should_close(&self) -> bool {
        self.max_frames.is_some_and(|max| self.frames >= max)
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }
}
