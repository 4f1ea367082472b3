// ============================================================================
// IMAGE FILTERS - Gaussian blur, unsharp mask, median denoise
// ============================================================================

use crate::buffer::PixelBuffer;

/// Sigma of the blur the unsharp mask subtracts.
pub const SHARPEN_SIGMA: f32 = 3.0;

// ---------------------------------------------------------------------------
//  Separable Gaussian blur
// ---------------------------------------------------------------------------

/// Build a 1-D Gaussian kernel truncated at ceil(3*sigma).
fn build_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil().max(0.0) as usize;
    if radius == 0 {
        return vec![1.0];
    }
    let s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..radius * 2 + 1)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / s2).exp()
        })
        .collect();
    let inv = 1.0 / kernel.iter().sum::<f32>();
    for v in &mut kernel {
        *v *= inv;
    }
    kernel
}

/// Blur all interleaved samples (alpha included) with clamped edges.
/// Output stays in f32 so callers can combine it before rounding.
fn gaussian_blur_f32(buf: &PixelBuffer, sigma: f32) -> Vec<f32> {
    let (w, h) = (buf.width() as usize, buf.height() as usize);
    let n = buf.channels();
    let src: Vec<f32> = buf.as_raw().iter().map(|&b| b as f32).collect();
    let kernel = build_gaussian_kernel(sigma);
    let radius = kernel.len() as isize / 2;

    // Horizontal pass
    let mut tmp = vec![0.0f32; src.len()];
    for y in 0..h {
        for x in 0..w {
            for c in 0..n {
                let mut acc = 0.0;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sx = (x as isize + ki as isize - radius).clamp(0, w as isize - 1) as usize;
                    acc += src[(y * w + sx) * n + c] * kv;
                }
                tmp[(y * w + x) * n + c] = acc;
            }
        }
    }

    // Vertical pass
    let mut out = vec![0.0f32; src.len()];
    for y in 0..h {
        for x in 0..w {
            for c in 0..n {
                let mut acc = 0.0;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sy = (y as isize + ki as isize - radius).clamp(0, h as isize - 1) as usize;
                    acc += tmp[(sy * w + x) * n + c] * kv;
                }
                out[(y * w + x) * n + c] = acc;
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
//  Unsharp mask
// ---------------------------------------------------------------------------

/// `(1 + amount)·c − amount·blur(c)` on the colour samples. Negative amounts
/// soften. Alpha is copied through.
pub fn sharpen(buf: &PixelBuffer, amount: f32) -> PixelBuffer {
    if amount == 0.0 {
        return buf.clone();
    }
    let n = buf.channels();
    let blurred = gaussian_blur_f32(buf, SHARPEN_SIGMA);
    let out = buf
        .as_raw()
        .iter()
        .zip(&blurred)
        .enumerate()
        .map(|(i, (&c, &b))| {
            if i % n == 3 {
                return c;
            }
            ((1.0 + amount) * c as f32 - amount * b).round().clamp(0.0, 255.0) as u8
        })
        .collect();
    buf.with_data(out)
}

// ---------------------------------------------------------------------------
//  Median denoise
// ---------------------------------------------------------------------------

/// Per-channel median over a `kernel`×`kernel` window with clamped edges.
/// Even sizes are bumped to the next odd size; 1 (or 0) is a no-op.
pub fn denoise_median(buf: &PixelBuffer, kernel: u32) -> PixelBuffer {
    let k = if kernel % 2 == 0 { kernel + 1 } else { kernel };
    if k <= 1 {
        return buf.clone();
    }
    let (w, h) = (buf.width() as isize, buf.height() as isize);
    let n = buf.channels();
    let r = (k / 2) as isize;
    let src = buf.as_raw();
    let mut out = src.to_vec();
    let mut window = Vec::with_capacity((k * k) as usize);

    for y in 0..h {
        for x in 0..w {
            for c in 0..3 {
                window.clear();
                for dy in -r..=r {
                    let sy = (y + dy).clamp(0, h - 1);
                    for dx in -r..=r {
                        let sx = (x + dx).clamp(0, w - 1);
                        window.push(src[(sy * w + sx) as usize * n + c]);
                    }
                }
                let mid = window.len() / 2;
                let (_, median, _) = window.select_nth_unstable(mid);
                out[(y * w + x) as usize * n + c] = *median;
            }
        }
    }
    buf.with_data(out)
}
