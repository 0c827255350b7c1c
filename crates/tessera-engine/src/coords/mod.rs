//! Coordinate and geometry types shared by the batch builder and the demo scenes.
//!
//! Canonical CPU space:
//! - World units (the demo projection maps them 1:1 to pixels)
//! - Origin bottom-left
//! - +X right, +Y up
//!
//! The model-view-projection matrix converts to clip space on the GPU.

mod color;
mod mat4;
mod rect;
mod vec2;

pub use color::ColorRgba;
pub use mat4::Mat4;
pub use rect::Rect;
pub use vec2::Vec2;
