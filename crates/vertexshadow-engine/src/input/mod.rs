//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types; the
//! runtime translates window events through [`platform`].

pub(crate) mod platform;
mod state;
mod types;

pub use state::InputState;
pub use types::{ButtonState, InputEvent, Key, KeyState, MouseButton};
