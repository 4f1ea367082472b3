// ============================================================================
// ADJUSTMENT OPERATIONS - tone and colour transforms over a whole buffer
// ============================================================================
//
// Every function takes the baseline buffer by reference and returns a new
// one; nothing here mutates its input. Alpha is carried through untouched.
// ============================================================================

use std::str::FromStr;

use crate::buffer::PixelBuffer;
use crate::error::{Error, Result};
use crate::ops::mask::Mask;

/// 256-entry tone lookup table.
pub type Lut = [u8; 256];

pub fn identity_lut() -> Lut {
    std::array::from_fn(|i| i as u8)
}

/// Which samples a curve / LUT edit targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Channel {
    /// HSV value; hue and saturation are left alone.
    #[default]
    Luminance,
    Red,
    Green,
    Blue,
}

impl Channel {
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Luminance => "Luminance",
            Channel::Red => "Red",
            Channel::Green => "Green",
            Channel::Blue => "Blue",
        }
    }

    pub fn all() -> &'static [Channel] {
        &[Channel::Luminance, Channel::Red, Channel::Green, Channel::Blue]
    }

    /// Sample offset inside a pixel, `None` for luminance.
    fn index(self) -> Option<usize> {
        match self {
            Channel::Luminance => None,
            Channel::Red => Some(0),
            Channel::Green => Some(1),
            Channel::Blue => Some(2),
        }
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "luminance" | "lum" | "l" => Ok(Channel::Luminance),
            "red" | "r" => Ok(Channel::Red),
            "green" | "g" => Ok(Channel::Green),
            "blue" | "b" => Ok(Channel::Blue),
            other => Err(Error::InvalidArgument(format!(
                "unknown channel '{other}' (expected luminance, red, green or blue)"
            ))),
        }
    }
}

// ============================================================================
// HELPER: per-sample transforms
// ============================================================================

/// Run `f` over the colour samples of every pixel, keeping alpha.
fn map_pixels<F>(buf: &PixelBuffer, mut f: F) -> PixelBuffer
where
    F: FnMut(usize, [u8; 3]) -> [u8; 3],
{
    let n = buf.channels();
    let mut out = buf.as_raw().to_vec();
    for (i, px) in out.chunks_exact_mut(n).enumerate() {
        let [r, g, b] = f(i, [px[0], px[1], px[2]]);
        px[0] = r;
        px[1] = g;
        px[2] = b;
    }
    buf.with_data(out)
}

/// One LUT per colour channel.
fn apply_channel_luts(buf: &PixelBuffer, luts: &[Lut; 3]) -> PixelBuffer {
    map_pixels(buf, |_, [r, g, b]| [luts[0][r as usize], luts[1][g as usize], luts[2][b as usize]])
}

#[inline]
fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Tone levels truncate like an integer cast. The small bias keeps f32 noise
/// such as 63.99998 from dropping a whole level.
#[inline]
fn trunc_u8(v: f32) -> u8 {
    (v + 1e-3).clamp(0.0, 255.0) as u8
}

// ============================================================================
// CONTRAST / BRIGHTNESS / GAMMA WITH SHADOW-HIGHLIGHT BLEND
// ============================================================================

/// Parameters of the lighting adjustment. Amounts are unitless; brightness,
/// shadows and highlights are fractions of the full 0..255 range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightingParams {
    /// -1 ..= 1; 1 squeezes the tonal range into [0.25, 0.75].
    pub contrast: f32,
    pub brightness: f32,
    /// Exponent applied to normalised levels (≥ 0.01).
    pub gamma: f32,
    pub shadows: f32,
    pub highlights: f32,
}

impl Default for LightingParams {
    fn default() -> Self {
        Self { contrast: 0.0, brightness: 0.0, gamma: 1.0, shadows: 0.0, highlights: 0.0 }
    }
}

impl LightingParams {
    /// Only gamma differs from neutral. The range remap then cancels out and
    /// the result equals [`adjust_gamma`].
    pub fn is_gamma_only(&self) -> bool {
        self.contrast == 0.0 && self.brightness == 0.0 && self.shadows == 0.0 && self.highlights == 0.0
    }
}

/// The contrast/brightness/gamma table for an image whose colour samples
/// span `lo..=hi`.
pub fn build_lighting_lut(contrast: f32, brightness: f32, gamma: f32, lo: u8, hi: u8) -> Lut {
    let c = contrast.clamp(-1.0, 1.0);
    let gamma = gamma.max(0.01);
    let (lo, hi) = (lo as f32, hi as f32);
    let target_min = (1.0 - c) * lo + c * (255.0 * 0.25);
    let target_max = (1.0 - c) * hi + c * (255.0 * 0.75);
    let lift = brightness * 255.0;

    std::array::from_fn(|i| {
        let g = (i as f32 / 255.0).powf(gamma);
        let v = if hi > lo {
            (g - lo / 255.0) / ((hi - lo) / 255.0) * (target_max - target_min) + target_min
        } else {
            // Flat source: no range to remap, gamma and brightness only.
            g * 255.0
        };
        trunc_u8(v + lift)
    })
}

/// Global tone table followed by a shadows/highlights lift blended by `mask`
/// (0 → shadows variant, 255 → highlights variant).
pub fn adjust_contrast_brightness_gamma(buf: &PixelBuffer, params: &LightingParams, mask: &Mask) -> Result<PixelBuffer> {
    mask.check_matches(buf)?;
    let (lo, hi) = buf.color_range();
    let lut = build_lighting_lut(params.contrast, params.brightness, params.gamma, lo, hi);
    let shadow_lift = params.shadows * 255.0;
    let highlight_lift = params.highlights * 255.0;

    Ok(map_pixels(buf, |i, px| {
        let m = mask.weight(i);
        px.map(|v| {
            let global = lut[v as usize] as f32;
            let s = (global + shadow_lift).clamp(0.0, 255.0);
            let h = (global + highlight_lift).clamp(0.0, 255.0);
            trunc_u8(m * h + (1.0 - m) * s)
        })
    }))
}

/// Plain power-law gamma: `255 · (i/255)^gamma`.
pub fn adjust_gamma(buf: &PixelBuffer, gamma: f32) -> PixelBuffer {
    let gamma = gamma.max(0.01);
    let lut: Lut = std::array::from_fn(|i| trunc_u8((i as f32 / 255.0).powf(gamma) * 255.0));
    apply_channel_luts(buf, &[lut; 3])
}

// ============================================================================
// COLOUR TEMPERATURE
// ============================================================================

/// Black-body tint per temperature, every 100 K plus the neutral 6550 K anchor.
const KELVIN_TABLE: &[(u32, [u8; 3])] = &[
    (1000, [255, 56, 0]),
    (1100, [255, 71, 0]),
    (1200, [255, 83, 0]),
    (1300, [255, 93, 0]),
    (1400, [255, 101, 0]),
    (1500, [255, 109, 0]),
    (1600, [255, 115, 0]),
    (1700, [255, 121, 0]),
    (1800, [255, 126, 0]),
    (1900, [255, 131, 0]),
    (2000, [255, 138, 18]),
    (2100, [255, 142, 33]),
    (2200, [255, 147, 44]),
    (2300, [255, 152, 54]),
    (2400, [255, 157, 63]),
    (2500, [255, 161, 72]),
    (2600, [255, 165, 79]),
    (2700, [255, 169, 87]),
    (2800, [255, 173, 94]),
    (2900, [255, 177, 101]),
    (3000, [255, 180, 107]),
    (3100, [255, 184, 114]),
    (3200, [255, 187, 120]),
    (3300, [255, 190, 126]),
    (3400, [255, 193, 132]),
    (3500, [255, 196, 137]),
    (3600, [255, 199, 143]),
    (3700, [255, 201, 148]),
    (3800, [255, 204, 153]),
    (3900, [255, 206, 159]),
    (4000, [255, 209, 163]),
    (4100, [255, 211, 168]),
    (4200, [255, 213, 173]),
    (4300, [255, 215, 177]),
    (4400, [255, 217, 182]),
    (4500, [255, 219, 186]),
    (4600, [255, 221, 190]),
    (4700, [255, 223, 194]),
    (4800, [255, 225, 198]),
    (4900, [255, 227, 202]),
    (5000, [255, 228, 206]),
    (5100, [255, 230, 210]),
    (5200, [255, 232, 213]),
    (5300, [255, 233, 217]),
    (5400, [255, 235, 220]),
    (5500, [255, 236, 224]),
    (5600, [255, 238, 227]),
    (5700, [255, 239, 230]),
    (5800, [255, 240, 233]),
    (5900, [255, 242, 236]),
    (6000, [255, 243, 239]),
    (6100, [255, 244, 242]),
    (6200, [255, 245, 245]),
    (6300, [255, 246, 247]),
    (6400, [255, 248, 251]),
    (6500, [255, 249, 253]),
    (6550, [255, 255, 255]),
    (6600, [254, 249, 255]),
    (6700, [252, 247, 255]),
    (6800, [249, 246, 255]),
    (6900, [247, 245, 255]),
    (7000, [245, 243, 255]),
    (7100, [243, 242, 255]),
    (7200, [240, 241, 255]),
    (7300, [239, 240, 255]),
    (7400, [237, 239, 255]),
    (7500, [235, 238, 255]),
    (7600, [233, 237, 255]),
    (7700, [231, 236, 255]),
    (7800, [230, 235, 255]),
    (7900, [228, 234, 255]),
    (8000, [227, 233, 255]),
    (8100, [225, 232, 255]),
    (8200, [224, 231, 255]),
    (8300, [222, 230, 255]),
    (8400, [221, 230, 255]),
    (8500, [220, 229, 255]),
    (8600, [218, 229, 255]),
    (8700, [217, 227, 255]),
    (8800, [216, 227, 255]),
    (8900, [215, 226, 255]),
    (9000, [214, 225, 255]),
    (9100, [212, 225, 255]),
    (9200, [211, 224, 255]),
    (9300, [210, 223, 255]),
    (9400, [209, 223, 255]),
    (9500, [208, 222, 255]),
    (9600, [207, 221, 255]),
    (9700, [207, 221, 255]),
    (9800, [206, 220, 255]),
    (9900, [205, 220, 255]),
    (10000, [207, 218, 255]),
    (10100, [207, 218, 255]),
    (10200, [206, 217, 255]),
    (10300, [205, 217, 255]),
    (10400, [204, 216, 255]),
    (10500, [204, 216, 255]),
    (10600, [203, 215, 255]),
    (10700, [202, 215, 255]),
    (10800, [202, 214, 255]),
    (10900, [201, 214, 255]),
    (11000, [200, 213, 255]),
    (11100, [200, 213, 255]),
    (11200, [199, 212, 255]),
    (11300, [198, 212, 255]),
    (11400, [198, 212, 255]),
    (11500, [197, 211, 255]),
    (11600, [197, 211, 255]),
    (11700, [197, 210, 255]),
    (11800, [196, 210, 255]),
    (11900, [195, 210, 255]),
    (12000, [195, 209, 255]),
];

pub const KELVIN_MIN: f32 = 1000.0;
pub const KELVIN_MAX: f32 = 12000.0;

/// RGB tint of a colour temperature. Exact table entries are returned as-is,
/// anything between two entries is interpolated linearly and rounded.
pub fn kelvin_to_rgb(kelvin: f32) -> Result<[u8; 3]> {
    if !(KELVIN_MIN..=KELVIN_MAX).contains(&kelvin) {
        return Err(Error::TemperatureOutOfRange(kelvin));
    }
    // First entry at or above the requested temperature.
    let hi = KELVIN_TABLE.partition_point(|&(k, _)| (k as f32) < kelvin);
    let (hk, hrgb) = KELVIN_TABLE[hi];
    if hk as f32 == kelvin || hi == 0 {
        return Ok(hrgb);
    }
    let (lk, lrgb) = KELVIN_TABLE[hi - 1];
    let t = (kelvin - lk as f32) / (hk - lk) as f32;
    Ok(std::array::from_fn(|c| {
        let (a, b) = (lrgb[c] as f32, hrgb[c] as f32);
        clamp_u8(a + (b - a) * t)
    }))
}

/// Multiply each channel by its temperature tint (scaled by the matching
/// gain) over 255. Fails when `kelvin` is outside 1000..=12000 K.
pub fn change_color_temperature(buf: &PixelBuffer, kelvin: f32, gains: [f32; 3]) -> Result<PixelBuffer> {
    let tint = kelvin_to_rgb(kelvin)?;
    log_debug!("temperature {kelvin} K -> tint {tint:?}, gains {gains:?}");
    let luts: [Lut; 3] = std::array::from_fn(|c| {
        let factor = tint[c] as f32 * gains[c] / 255.0;
        std::array::from_fn(|i| clamp_u8(i as f32 * factor))
    });
    Ok(apply_channel_luts(buf, &luts))
}

// ============================================================================
// SATURATION / HUE
// ============================================================================

/// Scale saturation by `saturation` and rotate hue by `hue_shift` degrees.
pub fn adjust_saturation_hue(buf: &PixelBuffer, saturation: f32, hue_shift: f32) -> PixelBuffer {
    let saturation = saturation.max(0.0);
    if saturation == 1.0 && hue_shift.rem_euclid(360.0) == 0.0 {
        return buf.clone();
    }
    map_pixels(buf, |_, [r, g, b]| {
        let (h, s, v) = rgb_to_hsv(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        let h = (h + hue_shift).rem_euclid(360.0);
        let s = (s * saturation).clamp(0.0, 1.0);
        let (r, g, b) = hsv_to_rgb(h, s, v);
        [clamp_u8(r * 255.0), clamp_u8(g * 255.0), clamp_u8(b * 255.0)]
    })
}

// ============================================================================
// LUT APPLICATION (curves)
// ============================================================================

/// Remap one channel through `lut`. For [`Channel::Luminance`] the HSV value
/// (the largest of R, G, B) is remapped and all three samples are rescaled
/// to it, which keeps hue and saturation.
pub fn apply_lut_global(buf: &PixelBuffer, lut: &Lut, channel: Channel) -> PixelBuffer {
    match channel.index() {
        Some(c) => map_pixels(buf, |_, mut px| {
            px[c] = lut[px[c] as usize];
            px
        }),
        None => map_pixels(buf, |_, px| with_value(px, lut[value_of(px) as usize])),
    }
}

/// Masked two-curve remap. Each pixel is bucketed by its current level `i`
/// in the target channel; its new level is `lut_a[i]` blended toward
/// `lut_b[i]` by the pixel's mask weight.
pub fn apply_lut_local(buf: &PixelBuffer, lut_a: &Lut, lut_b: &Lut, channel: Channel, mask: &Mask) -> Result<PixelBuffer> {
    mask.check_matches(buf)?;
    let blend = |i: usize, level: u8| -> u8 {
        let (a, b) = (lut_a[level as usize], lut_b[level as usize]);
        if a == b {
            return a;
        }
        let m = mask.weight(i);
        trunc_u8(a as f32 * (1.0 - m) + b as f32 * m)
    };
    Ok(match channel.index() {
        Some(c) => map_pixels(buf, |i, mut px| {
            px[c] = blend(i, px[c]);
            px
        }),
        None => map_pixels(buf, |i, px| with_value(px, blend(i, value_of(px)))),
    })
}

#[inline]
fn value_of(px: [u8; 3]) -> u8 {
    px[0].max(px[1]).max(px[2])
}

/// Rescale a pixel so its HSV value becomes `nv`.
#[inline]
fn with_value(px: [u8; 3], nv: u8) -> [u8; 3] {
    let v = value_of(px);
    if v == nv {
        return px;
    }
    if v == 0 {
        return [nv; 3];
    }
    let k = nv as f32 / v as f32;
    px.map(|s| clamp_u8(s as f32 * k))
}

// ============================================================================
// CURVE TABLES
// ============================================================================

/// Build a 256-entry lookup table from control points (sorted by x) using
/// monotone cubic (Fritsch-Carlson) interpolation. Inputs beyond the first
/// or last point continue along the end tangent.
pub fn build_curve_lut(points: &[(f32, f32)]) -> Lut {
    if points.len() < 2 {
        return identity_lut();
    }

    let n = points.len();
    let delta: Vec<f32> = points
        .windows(2)
        .map(|w| {
            let dx = w[1].0 - w[0].0;
            if dx.abs() < 1e-6 { 0.0 } else { (w[1].1 - w[0].1) / dx }
        })
        .collect();

    // Tangents
    let mut m = vec![0.0f32; n];
    m[0] = delta[0];
    m[n - 1] = delta[n - 2];
    for i in 1..n - 1 {
        m[i] = if delta[i - 1] * delta[i] <= 0.0 { 0.0 } else { (delta[i - 1] + delta[i]) / 2.0 };
    }

    // Monotonicity constraint
    for i in 0..n - 1 {
        if delta[i].abs() < 1e-6 {
            m[i] = 0.0;
            m[i + 1] = 0.0;
        } else {
            let alpha = m[i] / delta[i];
            let beta = m[i + 1] / delta[i];
            let s = alpha * alpha + beta * beta;
            if s > 9.0 {
                let tau = 3.0 / s.sqrt();
                m[i] = tau * alpha * delta[i];
                m[i + 1] = tau * beta * delta[i];
            }
        }
    }

    let (x_first, y_first) = points[0];
    let (x_last, y_last) = points[n - 1];
    std::array::from_fn(|i| {
        let x = i as f32;
        let y = if x <= x_first {
            y_first + m[0] * (x - x_first)
        } else if x >= x_last {
            y_last + m[n - 1] * (x - x_last)
        } else {
            let seg = points.partition_point(|p| p.0 <= x).saturating_sub(1).min(n - 2);
            let (x0, y0) = points[seg];
            let (x1, y1) = points[seg + 1];
            let h = x1 - x0;
            if h.abs() < 1e-6 {
                y0
            } else {
                let t = (x - x0) / h;
                let t2 = t * t;
                let t3 = t2 * t;
                let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
                let h10 = t3 - 2.0 * t2 + t;
                let h01 = -2.0 * t3 + 3.0 * t2;
                let h11 = t3 - t2;
                h00 * y0 + h10 * h * m[seg] + h01 * y1 + h11 * h * m[seg + 1]
            }
        };
        clamp_u8(y)
    })
}

// ============================================================================
// HISTOGRAM
// ============================================================================

/// 256-bin histogram of one channel, or of Rec.601 luma for
/// [`Channel::Luminance`].
pub fn compute_histogram(buf: &PixelBuffer, channel: Channel) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for px in buf.as_raw().chunks_exact(buf.channels()) {
        let level = match channel.index() {
            Some(c) => px[c],
            None => crate::buffer::luma(px[0], px[1], px[2]),
        };
        hist[level as usize] += 1;
    }
    hist
}

// ============================================================================
// COLOR SPACE HELPERS
// ============================================================================

/// RGB (0..1) → HSV (H: degrees 0..360, S: 0..1, V: 0..1)
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let d = max - min;
    if max <= 0.0 || d < 1e-6 {
        return (0.0, 0.0, max);
    }
    let s = d / max;
    let h = if max == r {
        60.0 * ((g - b) / d).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / d + 2.0)
    } else {
        60.0 * ((r - g) / d + 4.0)
    };
    (h, s, max)
}

/// HSV (H: degrees, S: 0..1, V: 0..1) → RGB (0..1)
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    if s <= 0.0 {
        return (v, v, v);
    }
    let h = h.rem_euclid(360.0) / 60.0;
    let c = v * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    (r + m, g + m, b + m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ChannelLayout;

    fn gradient() -> PixelBuffer {
        PixelBuffer::from_fn(16, 16, ChannelLayout::Rgba, |x, y| {
            [(x * 16) as u8, (y * 16) as u8, ((x + y) * 8) as u8, (x * y) as u8]
        })
    }

    fn alphas(buf: &PixelBuffer) -> Vec<u8> {
        buf.as_raw().chunks_exact(4).map(|p| p[3]).collect()
    }

    #[test]
    fn identity_lut_leaves_every_channel_alone() {
        let buf = gradient();
        let lut = identity_lut();
        for &ch in Channel::all() {
            assert_eq!(apply_lut_global(&buf, &lut, ch), buf, "channel {ch:?}");
        }
    }

    #[test]
    fn two_by_two_neutral_lighting_is_identity() {
        let buf = PixelBuffer::from_fn(2, 2, ChannelLayout::Rgb, |x, y| {
            let v = if x == y { 0 } else { 255 };
            [v, v, v, 255]
        });
        let out = adjust_contrast_brightness_gamma(&buf, &LightingParams::default(), &Mask::uniform(2, 2, 128)).unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn mask_extremes_select_variants() {
        let buf = gradient();
        let params = LightingParams { contrast: 0.3, brightness: 0.05, gamma: 0.8, shadows: 0.4, highlights: -0.3 };
        let (lo, hi) = buf.color_range();
        let lut = build_lighting_lut(params.contrast, params.brightness, params.gamma, lo, hi);
        let shift = |d: f32| map_pixels(&buf, |_, px| px.map(|v| trunc_u8(lut[v as usize] as f32 + d * 255.0)));

        let dark = adjust_contrast_brightness_gamma(&buf, &params, &Mask::uniform(16, 16, 0)).unwrap();
        assert_eq!(dark, shift(params.shadows));
        let bright = adjust_contrast_brightness_gamma(&buf, &params, &Mask::uniform(16, 16, 255)).unwrap();
        assert_eq!(bright, shift(params.highlights));
    }

    #[test]
    fn extreme_lighting_stays_in_range() {
        // u8 output cannot overflow; check the table itself saturates cleanly.
        for gamma in [0.01, 0.5, 1.0, 3.0] {
            let lut = build_lighting_lut(1.0, 1.0, gamma, 0, 255);
            assert!(lut.iter().all(|&v| v == 255));
        }
        let lut = build_lighting_lut(1.0, 0.0, 1.0, 0, 255);
        // 63.75 and 191.25 truncate.
        assert_eq!(lut[0], 63);
        assert_eq!(lut[255], 191);
    }

    #[test]
    fn full_lift_saturates_every_sample() {
        let buf = gradient();
        let mask = Mask::uniform(16, 16, 100);
        for gamma in [0.2, 1.0, 2.5] {
            let params = LightingParams { contrast: 1.0, brightness: 1.0, gamma, ..LightingParams::default() };
            let out = adjust_contrast_brightness_gamma(&buf, &params, &mask).unwrap();
            assert!(out.as_raw().chunks_exact(4).all(|p| p[..3] == [255, 255, 255]), "gamma {gamma}");
            assert_eq!(alphas(&out), alphas(&buf));
        }
    }

    #[test]
    fn tone_levels_truncate() {
        assert_eq!(trunc_u8(63.75), 63);
        assert_eq!(trunc_u8(63.99999), 64);
        assert_eq!(trunc_u8(-4.0), 0);
        assert_eq!(trunc_u8(300.0), 255);
        let lut = build_lighting_lut(0.0, 0.1, 1.0, 0, 255);
        // 10 + 25.5
        assert_eq!(lut[10], 35);
    }

    #[test]
    fn flat_image_skips_contrast_remap() {
        let lut = build_lighting_lut(0.8, 0.2, 1.0, 90, 90);
        assert_eq!(lut[90], 141);
        assert_eq!(lut[0], 51);
        assert_eq!(lut[255], 255);
    }

    #[test]
    fn lighting_rejects_wrong_mask() {
        let err = adjust_contrast_brightness_gamma(&gradient(), &LightingParams::default(), &Mask::uniform(4, 4, 0));
        assert!(matches!(err, Err(Error::DimensionMismatch { expected: (16, 16), found: (4, 4) })));
    }

    #[test]
    fn kelvin_lookup() {
        assert_eq!(kelvin_to_rgb(6550.0).unwrap(), [255, 255, 255]);
        assert_eq!(kelvin_to_rgb(1000.0).unwrap(), [255, 56, 0]);
        assert_eq!(kelvin_to_rgb(12000.0).unwrap(), [195, 209, 255]);
        // Halfway between 2000 (255,138,18) and 2100 (255,142,33).
        assert_eq!(kelvin_to_rgb(2050.0).unwrap(), [255, 140, 26]);
        assert!(matches!(kelvin_to_rgb(999.0), Err(Error::TemperatureOutOfRange(_))));
        assert!(kelvin_to_rgb(12000.5).is_err());
    }

    #[test]
    fn neutral_temperature_is_identity() {
        let buf = gradient();
        assert_eq!(change_color_temperature(&buf, 6550.0, [1.0; 3]).unwrap(), buf);
        let warm = change_color_temperature(&buf, 2000.0, [1.0; 3]).unwrap();
        assert_eq!(alphas(&warm), alphas(&buf));
        assert!(warm.as_raw()[2 + 4 * 200] < buf.as_raw()[2 + 4 * 200]);
    }

    #[test]
    fn saturation_and_hue() {
        let red = PixelBuffer::filled(1, 1, ChannelLayout::Rgb, &[200, 50, 50]);
        let gray = adjust_saturation_hue(&red, 0.0, 0.0);
        assert_eq!(gray.pixel(0, 0), Some(&[200, 200, 200][..]));

        let green = adjust_saturation_hue(&PixelBuffer::filled(1, 1, ChannelLayout::Rgb, &[255, 0, 0]), 1.0, 120.0);
        assert_eq!(green.pixel(0, 0), Some(&[0, 255, 0][..]));

        let same = adjust_saturation_hue(&red, 1.0, 360.0);
        assert_eq!(same, red);
    }

    #[test]
    fn luminance_lut_keeps_hue() {
        let buf = PixelBuffer::filled(1, 1, ChannelLayout::Rgb, &[200, 100, 50]);
        let half: Lut = std::array::from_fn(|i| (i / 2) as u8);
        let out = apply_lut_global(&buf, &half, Channel::Luminance);
        assert_eq!(out.pixel(0, 0), Some(&[100, 50, 25][..]));

        let red_only = apply_lut_global(&buf, &half, Channel::Red);
        assert_eq!(red_only.pixel(0, 0), Some(&[100, 100, 50][..]));
    }

    #[test]
    fn local_lut_with_equal_curves_ignores_mask() {
        let buf = gradient();
        let lut: Lut = std::array::from_fn(|i| 255 - i as u8);
        let weights: Vec<u8> = (0..256).map(|i| (i * 7 % 256) as u8).collect();
        let mask = Mask::new(16, 16, weights).unwrap();
        for &ch in Channel::all() {
            let local = apply_lut_local(&buf, &lut, &lut, ch, &mask).unwrap();
            let flat = apply_lut_local(&buf, &lut, &lut, ch, &Mask::uniform(16, 16, 0)).unwrap();
            assert_eq!(local, flat);
            assert_eq!(local, apply_lut_global(&buf, &lut, ch));
        }
    }

    #[test]
    fn local_lut_blends_by_weight() {
        let buf = PixelBuffer::filled(2, 1, ChannelLayout::Rgb, &[100, 10, 10]);
        let zero = [0u8; 256];
        let full = [200u8; 256];
        let mask = Mask::new(2, 1, vec![0, 255]).unwrap();
        let out = apply_lut_local(&buf, &zero, &full, Channel::Red, &mask).unwrap();
        assert_eq!(out.as_raw(), &[0, 10, 10, 200, 10, 10]);
    }

    #[test]
    fn curve_lut_identity_and_shape() {
        let pts: Vec<(f32, f32)> = (0..7).map(|i| (i as f32 * 42.5, i as f32 * 42.5)).collect();
        assert_eq!(build_curve_lut(&pts), identity_lut());

        let s = [(0.0, 0.0), (64.0, 40.0), (192.0, 220.0), (255.0, 255.0)];
        let lut = build_curve_lut(&s);
        assert_eq!(lut[64], 40);
        assert_eq!(lut[192], 220);
        assert!(lut.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn curve_lut_extrapolates_past_end_points() {
        let lut = build_curve_lut(&[(50.0, 50.0), (200.0, 200.0)]);
        assert_eq!(lut[10], 10);
        assert_eq!(lut[250], 250);
        assert_eq!(build_curve_lut(&[(10.0, 10.0)]), identity_lut());
    }

    #[test]
    fn histogram_counts_pixels() {
        let buf = PixelBuffer::from_fn(4, 1, ChannelLayout::Rgb, |x, _| [x as u8, 9, 9, 255]);
        let h = compute_histogram(&buf, Channel::Red);
        assert_eq!(&h[0..4], &[1, 1, 1, 1]);
        assert_eq!(compute_histogram(&buf, Channel::Green)[9], 4);
        assert_eq!(compute_histogram(&buf, Channel::Luminance).iter().sum::<u32>(), 4);
    }

    #[test]
    fn gamma_one_is_identity() {
        let buf = gradient();
        assert_eq!(adjust_gamma(&buf, 1.0), buf);
    }
}
