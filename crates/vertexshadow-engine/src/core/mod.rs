//! Core engine-facing contracts.
//!
//! Defines the interface between the runtime (platform loop) and the
//! application, so that user code never touches winit directly.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, RenderTarget, StartCtx, WindowCtx};
