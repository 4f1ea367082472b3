use std::path::PathBuf;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::error::{Error, Result};

/// Interleaving of a [`PixelBuffer`]'s samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelLayout {
    Rgb,
    Rgba,
}

impl ChannelLayout {
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Rgb => 3,
            ChannelLayout::Rgba => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        self == ChannelLayout::Rgba
    }
}

/// Immutable row-major 8-bit image.
///
/// Samples sit behind an `Arc`, so cloning a buffer (into history, into a
/// canvas slot) never copies pixels. Every transform builds a new buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    layout: ChannelLayout,
    data: Arc<[u8]>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, layout: ChannelLayout, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * layout.channels();
        if width == 0 || height == 0 {
            return Err(Error::UnsupportedImage(format!("empty image {width}x{height}")));
        }
        if data.len() != expected {
            return Err(Error::UnsupportedImage(format!(
                "{width}x{height} {layout:?} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self { width, height, layout, data: data.into() })
    }

    /// Build from data whose length is known to match (internal transforms).
    pub(crate) fn from_parts(width: u32, height: u32, layout: ChannelLayout, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * layout.channels());
        Self { width, height, layout, data: data.into() }
    }

    /// Solid-colour buffer. `color` must have `layout.channels()` entries.
    pub fn filled(width: u32, height: u32, layout: ChannelLayout, color: &[u8]) -> Self {
        let n = layout.channels();
        let mut data = Vec::with_capacity(width as usize * height as usize * n);
        for _ in 0..width as usize * height as usize {
            data.extend((0..n).map(|c| color.get(c).copied().unwrap_or(255)));
        }
        Self::from_parts(width, height, layout, data)
    }

    pub fn from_fn(width: u32, height: u32, layout: ChannelLayout, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let n = layout.channels();
        let mut data = Vec::with_capacity(width as usize * height as usize * n);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y)[..n]);
            }
        }
        Self::from_parts(width, height, layout, data)
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

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Samples of pixel (x, y); `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let n = self.channels();
        let i = (y as usize * self.width as usize + x as usize) * n;
        Some(&self.data[i..i + n])
    }

    pub fn memory_size(&self) -> usize {
        self.data.len()
    }

    /// Darkest and brightest colour sample (alpha excluded).
    pub fn color_range(&self) -> (u8, u8) {
        let mut lo = u8::MAX;
        let mut hi = u8::MIN;
        for px in self.data.chunks_exact(self.channels()) {
            for &v in &px[..3] {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        (lo, hi)
    }

    /// Rec.601 luma per pixel, row-major.
    pub fn luminance(&self) -> Vec<u8> {
        self.data
            .chunks_exact(self.channels())
            .map(|px| luma(px[0], px[1], px[2]))
            .collect()
    }

    /// Same samples with a new set of pixels of identical shape.
    pub(crate) fn with_data(&self, data: Vec<u8>) -> Self {
        Self::from_parts(self.width, self.height, self.layout, data)
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        let raw = self.data.to_vec();
        let img = match self.layout {
            ChannelLayout::Rgb => RgbImage::from_raw(self.width, self.height, raw).map(DynamicImage::ImageRgb8),
            ChannelLayout::Rgba => RgbaImage::from_raw(self.width, self.height, raw).map(DynamicImage::ImageRgba8),
        };
        // Length is validated on construction.
        img.unwrap_or_else(|| DynamicImage::new_rgb8(self.width, self.height))
    }

    /// Keeps alpha when the source carries it, otherwise converts to RGB.
    pub fn from_dynamic(img: &DynamicImage) -> Result<Self> {
        if img.color().has_alpha() {
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            Self::new(w, h, ChannelLayout::Rgba, rgba.into_raw())
        } else {
            let rgb = img.to_rgb8();
            let (w, h) = rgb.dimensions();
            Self::new(w, h, ChannelLayout::Rgb, rgb.into_raw())
        }
    }
}

#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000) as u8
}

/// Anything the canvas can be asked to display, resolved once at the boundary.
#[derive(Debug, Clone)]
pub enum ImageInput {
    Raw(PixelBuffer),
    /// Single-channel samples, expanded to RGB.
    Gray { width: u32, height: u32, data: Vec<u8> },
    Encoded(DynamicImage),
    Path(PathBuf),
}

impl ImageInput {
    pub fn resolve(self) -> Result<PixelBuffer> {
        match self {
            ImageInput::Raw(buf) => Ok(buf),
            ImageInput::Gray { width, height, data } => {
                let gray = GrayImage::from_raw(width, height, data).ok_or_else(|| {
                    Error::UnsupportedImage(format!("grayscale data does not fill {width}x{height}"))
                })?;
                PixelBuffer::from_dynamic(&DynamicImage::ImageLuma8(gray))
            }
            ImageInput::Encoded(img) => PixelBuffer::from_dynamic(&img),
            ImageInput::Path(path) => crate::io::load_image(&path),
        }
    }
}

impl From<PixelBuffer> for ImageInput {
    fn from(buf: PixelBuffer) -> Self {
        ImageInput::Raw(buf)
    }
}

impl From<DynamicImage> for ImageInput {
    fn from(img: DynamicImage) -> Self {
        ImageInput::Encoded(img)
    }
}
