//! VertexShadow engine crate.
//!
//! Owns the window runtime, the GPU device, a GL-style drawing seam with a
//! wgpu backend, and the shadow-demo renderer built on top of it.

pub mod core;
pub mod device;
pub mod gl;
pub mod input;
pub mod logging;
pub mod render;
pub mod window;
