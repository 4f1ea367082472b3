// ============================================================================
// GEOMETRY - flip, rotate, crop and resize of whole buffers
// ============================================================================

use image::imageops;

use crate::buffer::PixelBuffer;

/// A geometric edit that can be queued in a crop session and replayed at
/// full resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryOp {
    FlipHorizontal,
    FlipVertical,
    RotateLeft,
    RotateRight,
}

impl GeometryOp {
    pub fn apply(self, buf: &PixelBuffer) -> PixelBuffer {
        match self {
            GeometryOp::FlipHorizontal => flip_horizontal(buf),
            GeometryOp::FlipVertical => flip_vertical(buf),
            GeometryOp::RotateLeft => rotate_left(buf),
            GeometryOp::RotateRight => rotate_right(buf),
        }
    }
}

// ---------------------------------------------------------------------------
//  Flips and quarter turns
// ---------------------------------------------------------------------------

/// Mirror left↔right.
pub fn flip_horizontal(buf: &PixelBuffer) -> PixelBuffer {
    let n = buf.channels();
    let row = buf.width() as usize * n;
    let mut out = Vec::with_capacity(buf.memory_size());
    for line in buf.as_raw().chunks_exact(row) {
        for px in line.chunks_exact(n).rev() {
            out.extend_from_slice(px);
        }
    }
    buf.with_data(out)
}

/// Mirror top↔bottom.
pub fn flip_vertical(buf: &PixelBuffer) -> PixelBuffer {
    let row = buf.width() as usize * buf.channels();
    let mut out = Vec::with_capacity(buf.memory_size());
    for line in buf.as_raw().chunks_exact(row).rev() {
        out.extend_from_slice(line);
    }
    buf.with_data(out)
}

/// 90° counter-clockwise.
pub fn rotate_left(buf: &PixelBuffer) -> PixelBuffer {
    let (w, h) = buf.dimensions();
    // Output pixel (x, y) comes from source (w-1-y, x).
    rotate_with(buf, h, w, |x, y| (w - 1 - y, x))
}

/// 90° clockwise.
pub fn rotate_right(buf: &PixelBuffer) -> PixelBuffer {
    let (w, h) = buf.dimensions();
    // Output pixel (x, y) comes from source (y, h-1-x).
    rotate_with(buf, h, w, |x, y| (y, h - 1 - x))
}

fn rotate_with(buf: &PixelBuffer, out_w: u32, out_h: u32, src: impl Fn(u32, u32) -> (u32, u32)) -> PixelBuffer {
    let n = buf.channels();
    let stride = buf.width() as usize * n;
    let raw = buf.as_raw();
    let mut out = Vec::with_capacity(raw.len());
    for y in 0..out_h {
        for x in 0..out_w {
            let (sx, sy) = src(x, y);
            let i = sy as usize * stride + sx as usize * n;
            out.extend_from_slice(&raw[i..i + n]);
        }
    }
    PixelBuffer::from_parts(out_w, out_h, buf.layout(), out)
}

// ---------------------------------------------------------------------------
//  Crop / resize
// ---------------------------------------------------------------------------

/// Copy out the rectangle `(x, y, w, h)`, clipped to the image.
/// Returns `None` when nothing of the rectangle lies inside the image.
pub fn crop(buf: &PixelBuffer, x: u32, y: u32, w: u32, h: u32) -> Option<PixelBuffer> {
    let x1 = x.saturating_add(w).min(buf.width());
    let y1 = y.saturating_add(h).min(buf.height());
    if x >= x1 || y >= y1 {
        return None;
    }
    let n = buf.channels();
    let stride = buf.width() as usize * n;
    let raw = buf.as_raw();
    let mut out = Vec::with_capacity((x1 - x) as usize * (y1 - y) as usize * n);
    for row in y..y1 {
        let start = row as usize * stride + x as usize * n;
        let end = row as usize * stride + x1 as usize * n;
        out.extend_from_slice(&raw[start..end]);
    }
    Some(PixelBuffer::from_parts(x1 - x, y1 - y, buf.layout(), out))
}

/// Bilinear resize to exactly `w`×`h` (each at least 1).
pub fn resize(buf: &PixelBuffer, w: u32, h: u32) -> PixelBuffer {
    let (w, h) = (w.max(1), h.max(1));
    if (w, h) == buf.dimensions() {
        return buf.clone();
    }
    let img = buf.to_dynamic().resize_exact(w, h, imageops::FilterType::Triangle);
    PixelBuffer::from_dynamic(&img).unwrap_or_else(|_| buf.clone())
}

/// Downscale so the longest side is at most `max_side`, keeping aspect
/// ratio. Never upscales.
pub fn resize_to_fit(buf: &PixelBuffer, max_side: u32) -> PixelBuffer {
    let (w, h) = buf.dimensions();
    let longest = w.max(h);
    if max_side == 0 || longest <= max_side {
        return buf.clone();
    }
    let ratio = max_side as f64 / longest as f64;
    let nw = ((w as f64 * ratio).round() as u32).max(1);
    let nh = ((h as f64 * ratio).round() as u32).max(1);
    resize(buf, nw, nh)
}
