//! Coarse spatial blend weights.
//!
//! The mask is a blurred luminance proxy: the image's luma is shrunk to a
//! small square grid and stretched back to full size with a smooth filter.
//! It bleeds across hard edges; it is a weight map, not a segmentation.

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::buffer::PixelBuffer;
use crate::error::{Error, Result};

/// Per-pixel weight in `0..=255`; 0 selects the shadows variant of an edit,
/// 255 the highlights variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Mask {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(Error::UnsupportedImage(format!(
                "mask {width}x{height} needs {} samples, got {}",
                width as usize * height as usize,
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    pub fn uniform(width: u32, height: u32, value: u8) -> Self {
        Self { width, height, data: vec![value; width as usize * height as usize] }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Weight of pixel `i` (row-major) in `0.0..=1.0`.
    #[inline]
    pub fn weight(&self, i: usize) -> f32 {
        self.data[i] as f32 / 255.0
    }

    /// Fails with `DimensionMismatch` unless the mask covers `buf` exactly.
    pub fn check_matches(&self, buf: &PixelBuffer) -> Result<()> {
        if self.dimensions() != buf.dimensions() {
            return Err(Error::DimensionMismatch { expected: buf.dimensions(), found: self.dimensions() });
        }
        Ok(())
    }
}

/// Build the blend mask of `buf` through a `grid`×`grid` luminance thumbnail.
pub fn luminance_mask(buf: &PixelBuffer, grid: u32) -> Mask {
    let (w, h) = buf.dimensions();
    let grid = grid.max(1);
    let luma = GrayImage::from_raw(w, h, buf.luminance()).unwrap_or_else(|| GrayImage::new(w, h));
    let small = imageops::resize(&luma, grid, grid, FilterType::Triangle);
    let full = imageops::resize(&small, w, h, FilterType::Triangle);
    Mask { width: w, height: h, data: full.into_raw() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ChannelLayout;

    #[test]
    fn same_size_as_source() {
        let buf = PixelBuffer::from_fn(300, 200, ChannelLayout::Rgb, |x, _| [(x % 256) as u8, 0, 0, 255]);
        let m = luminance_mask(&buf, 64);
        assert_eq!(m.dimensions(), (300, 200));
        assert!(m.check_matches(&buf).is_ok());
    }

    #[test]
    fn flat_image_gives_flat_mask() {
        let buf = PixelBuffer::filled(120, 90, ChannelLayout::Rgb, &[200, 200, 200]);
        let m = luminance_mask(&buf, 16);
        assert!(m.as_raw().iter().all(|&v| (199..=201).contains(&v)));
    }

    #[test]
    fn bright_half_weighs_more() {
        let buf = PixelBuffer::from_fn(128, 64, ChannelLayout::Rgb, |x, _| {
            if x < 64 { [0, 0, 0, 255] } else { [255, 255, 255, 255] }
        });
        let m = luminance_mask(&buf, 16);
        let left = m.as_raw()[32 * 128 + 5];
        let right = m.as_raw()[32 * 128 + 122];
        assert!(left < 40, "left {left}");
        assert!(right > 215, "right {right}");
    }

    #[test]
    fn mismatch_is_reported() {
        let buf = PixelBuffer::filled(4, 4, ChannelLayout::Rgb, &[0, 0, 0]);
        let m = Mask::uniform(4, 3, 0);
        assert!(matches!(m.check_matches(&buf), Err(Error::DimensionMismatch { .. })));
        assert!(Mask::new(2, 2, vec![0; 3]).is_err());
    }
}
