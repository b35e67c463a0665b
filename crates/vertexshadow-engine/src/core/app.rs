use crate::input::{InputEvent, InputState};

use super::ctx::{FrameCtx, StartCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by the runtime.
///
/// The runtime never redraws on its own initiative after the first frame:
/// it asks [`App::take_redraw_request`] whenever the loop goes idle and
/// only schedules a frame when that returns `true`.
pub trait App {
    /// Called once, after the window and GPU are ready.
    fn on_start(&mut self, ctx: &mut StartCtx<'_, '_>) -> anyhow::Result<()>;

    /// Called for every translated input event. `input` already reflects
    /// the event.
    fn on_input(&mut self, event: &InputEvent, input: &InputState) -> AppControl {
        let _ = (event, input);
        AppControl::Continue
    }

    /// Called on the loop thread after a [`LoopWaker`](crate::window::LoopWaker)
    /// fired.
    fn on_wake(&mut self) {}

    /// Returns and clears the pending redraw request.
    fn take_redraw_request(&mut self) -> bool;

    /// Called once per rendered frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
