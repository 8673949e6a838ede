//! Raytrace rendering
//!
//! The multi-threaded raytrace renderer, the flat shading model with its
//! shadow computation, and the depth-blur post-process.

#[macro_use]
extern crate log;

mod depth_blur;
mod renderer;
mod shading;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export.
pub use depth_blur::*;
pub use renderer::*;
pub use shading::*;
