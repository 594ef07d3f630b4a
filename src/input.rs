//! Pointer input, normalised away from winit.
//!
//! The viewer only cares about four things: a button went down, a button went
//! up, the cursor moved, the wheel turned. [`InputEvent`] captures exactly that
//! so the session can be driven without a window.

use winit::{
    dpi::PhysicalSize,
    event::{ElementState, MouseScrollDelta, WindowEvent},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    Pressed,
    Released,
    /// Logical pixels, origin top-left.
    CursorMoved { x: f32, y: f32 },
    /// Logical pixels, positive when scrolling away from the user.
    Wheel { delta_y: f32 },
}

impl InputEvent {
    /// `line_height` converts line-based wheel deltas into pixels.
    /// `scale_factor` is the window's, used to undo winit's physical pixels.
    pub fn from_window_event(
        event: &WindowEvent,
        scale_factor: f64,
        line_height: f32,
    ) -> Option<Self> {
        match event {
            WindowEvent::MouseInput { state, .. } => Some(match state {
                ElementState::Pressed => InputEvent::Pressed,
                ElementState::Released => InputEvent::Released,
            }),
            WindowEvent::CursorMoved { position, .. } => {
                let position = position.to_logical::<f32>(scale_factor);
                Some(InputEvent::CursorMoved {
                    x: position.x,
                    y: position.y,
                })
            }
            // winit reports scrolling towards the user as positive y; browsers the opposite.
            WindowEvent::MouseWheel { delta, .. } => Some(InputEvent::Wheel {
                delta_y: match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * line_height,
                    MouseScrollDelta::PixelDelta(position) => {
                        -position.to_logical::<f32>(scale_factor).y
                    }
                },
            }),
            _ => None,
        }
    }
}

/// Converts a physical surface size into the logical viewport the session
/// maps cursor positions against.
pub fn logical_viewport(width: u32, height: u32, scale_factor: f64) -> (u32, u32) {
    let size = PhysicalSize::new(width, height).to_logical::<u32>(scale_factor);
    (size.width, size.height)
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging,
}

/// Tracks the drag gesture and turns cursor motion into pixel deltas.
#[derive(Clone, Debug, Default)]
pub struct DragRotateController {
    state: DragState,
    /// Last cursor position seen, dragging or not.
    cursor: Option<(f32, f32)>,
}

impl DragRotateController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn cursor(&self) -> Option<(f32, f32)> {
        self.cursor
    }

    pub fn press(&mut self) {
        self.state = DragState::Dragging;
    }

    pub fn release(&mut self) {
        self.state = DragState::Idle;
    }

    /// Records the cursor and returns the `(dx, dy)` since the previous
    /// position while a drag is active. The first motion ever seen yields no
    /// delta because there is nothing to compare against.
    pub fn cursor_moved(&mut self, x: f32, y: f32) -> Option<(f32, f32)> {
        let previous = self.cursor.replace((x, y));
        match (self.state, previous) {
            (DragState::Dragging, Some((px, py))) => Some((x - px, y - py)),
            _ => None,
        }
    }
}
