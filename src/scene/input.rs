//! Input state and per-node input handling.
//!
//! An [`InputHandler`] inspects the frame's [`InputState`] and returns
//! [`NodeCommand`]s. The graph applies them to the node right after the
//! handler returns, before the node's transforms are refreshed.

use glam::{DVec2, DVec3, UVec2};
use rustc_hash::FxHashSet;

use crate::scene::NodeHandle;
use crate::scene::graph::SceneGraph;
use crate::scene::node::Node;

/// Platform-independent key identifier. The window system decides the
/// numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Snapshot of the input devices for one frame.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: FxHashSet<KeyCode>,
    buttons: FxHashSet<MouseButton>,
    pub cursor_position: DVec2,
    pub cursor_delta: DVec2,
    pub scroll_delta: DVec2,
    pub window_size: UVec2,
}

impl InputState {
    #[must_use]
    pub fn new(window_size: UVec2) -> Self {
        Self {
            window_size,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    #[inline]
    #[must_use]
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    pub fn press_key(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn press_button(&mut self, button: MouseButton) {
        self.buttons.insert(button);
    }

    pub fn release_button(&mut self, button: MouseButton) {
        self.buttons.remove(&button);
    }

    /// Records a new cursor position and the delta from the previous one.
    pub fn move_cursor(&mut self, position: DVec2) {
        self.cursor_delta = position - self.cursor_position;
        self.cursor_position = position;
    }

    /// Clears per-frame deltas. Held keys and buttons persist.
    pub fn end_frame(&mut self) {
        self.cursor_delta = DVec2::ZERO;
        self.scroll_delta = DVec2::ZERO;
    }
}

// ============================================================================
// Commands
// ============================================================================

/// A deferred mutation of one node.
pub trait NodeCommand {
    fn run(&self, graph: &mut SceneGraph, node: NodeHandle);
}

impl<F> NodeCommand for F
where
    F: Fn(&mut SceneGraph, NodeHandle),
{
    fn run(&self, graph: &mut SceneGraph, node: NodeHandle) {
        self(graph, node);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TranslateCommand(pub DVec3);

impl NodeCommand for TranslateCommand {
    fn run(&self, graph: &mut SceneGraph, node: NodeHandle) {
        graph.translate(node, self.0);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RotateCommand {
    pub angle_degrees: f64,
    pub axis: DVec3,
}

impl NodeCommand for RotateCommand {
    fn run(&self, graph: &mut SceneGraph, node: NodeHandle) {
        graph.rotate(node, self.angle_degrees, self.axis);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScaleCommand(pub DVec3);

impl NodeCommand for ScaleCommand {
    fn run(&self, graph: &mut SceneGraph, node: NodeHandle) {
        graph.scale(node, self.0);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SetActiveCommand(pub bool);

impl NodeCommand for SetActiveCommand {
    fn run(&self, graph: &mut SceneGraph, node: NodeHandle) {
        if let Some(n) = graph.get_mut(node) {
            n.set_active(self.0);
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub trait InputHandler {
    fn run(&self, node: &Node, input: &InputState, dt: f64) -> Vec<Box<dyn NodeCommand>>;
}

/// Translates the node while bound keys are held, at `speed` units per second.
#[derive(Debug, Clone, Default)]
pub struct KeyMoveHandler {
    bindings: Vec<(KeyCode, DVec3)>,
    speed: f64,
}

impl KeyMoveHandler {
    #[must_use]
    pub fn new(speed: f64) -> Self {
        Self {
            bindings: Vec::new(),
            speed,
        }
    }

    #[must_use]
    pub fn bind(mut self, key: KeyCode, direction: DVec3) -> Self {
        self.bindings.push((key, direction));
        self
    }
}

impl InputHandler for KeyMoveHandler {
    fn run(&self, _node: &Node, input: &InputState, dt: f64) -> Vec<Box<dyn NodeCommand>> {
        let offset: DVec3 = self
            .bindings
            .iter()
            .filter(|(key, _)| input.is_key_pressed(*key))
            .map(|(_, dir)| *dir)
            .sum();

        if offset == DVec3::ZERO {
            return Vec::new();
        }
        vec![Box::new(TranslateCommand(offset * self.speed * dt))]
    }
}
