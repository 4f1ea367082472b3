//! Pure pixel operations. Each takes a baseline [`PixelBuffer`](crate::buffer::PixelBuffer)
//! and returns a new one.

pub mod adjustments;
pub mod filters;
pub mod mask;
pub mod transform;
