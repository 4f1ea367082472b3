use crate::buffer::PixelBuffer;
use crate::canvas::{Canvas, CropRect};
use crate::components::curve::CurveEditor;
use crate::error::Result;
use crate::io;
use crate::ops::adjustments::{self, Channel, LightingParams};
use crate::ops::filters;
use crate::ops::mask::luminance_mask;
use crate::ops::transform::{self, GeometryOp};
use crate::settings::EditorSettings;

// ============================================================================
// SLIDERS
// ============================================================================

pub const SLIDER_MAX: u8 = 100;
pub const SLIDER_DEFAULT: u8 = 50;

/// Integer slider, 0..=100, resting at 50.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slider(u8);

impl Default for Slider {
    fn default() -> Self {
        Slider(SLIDER_DEFAULT)
    }
}

impl Slider {
    pub fn new(value: u8) -> Self {
        Slider(value.min(SLIDER_MAX))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Position relative to the rest position: 0.0 ..= 2.0, 1.0 at rest.
    pub fn ratio(self) -> f32 {
        self.0 as f32 / SLIDER_DEFAULT as f32
    }
}

// ============================================================================
// TOOL TRAIT
// ============================================================================

/// An editing tool: a parameter set plus a pure render from a baseline.
pub trait Tool {
    fn label(&self) -> &'static str;

    /// Render the tool's edit of `baseline` into a new buffer.
    fn render(&self, baseline: &PixelBuffer) -> Result<PixelBuffer>;

    /// Back to neutral parameters.
    fn reset(&mut self);

    /// Preview at full resolution instead of the working resolution
    /// (tools whose parameters are pixel coordinates).
    fn full_resolution(&self) -> bool {
        false
    }

    /// Whether the session canvas should start in crop mode.
    fn crop_mode(&self) -> bool {
        false
    }

    /// Pick up state held by the session canvas before the final render.
    fn sync_from_canvas(&mut self, _canvas: &Canvas) {}
}

// ============================================================================
// LIGHTING
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightingSlider {
    Contrast,
    Brightness,
    Gamma,
    Shadows,
    Highlights,
}

/// Contrast / brightness / gamma with a mask-blended shadows and highlights lift.
#[derive(Clone, Debug)]
pub struct LightingTool {
    sliders: [Slider; 5],
    params: LightingParams,
    mask_grid: u32,
}

impl LightingTool {
    pub fn new(settings: &EditorSettings) -> Self {
        Self { sliders: [Slider::default(); 5], params: LightingParams::default(), mask_grid: settings.mask_grid }
    }

    /// Start from explicit parameters instead of slider positions.
    pub fn with_params(settings: &EditorSettings, params: LightingParams) -> Self {
        Self { params, ..Self::new(settings) }
    }

    pub fn params(&self) -> LightingParams {
        self.params
    }

    pub fn slider(&self, which: LightingSlider) -> Slider {
        self.sliders[which as usize]
    }

    pub fn set_slider(&mut self, which: LightingSlider, value: u8) {
        let s = Slider::new(value);
        self.sliders[which as usize] = s;
        let r = s.ratio();
        match which {
            LightingSlider::Contrast => self.params.contrast = 1.0 - r,
            LightingSlider::Brightness => self.params.brightness = r - 1.0,
            LightingSlider::Gamma => self.params.gamma = 2.0 - r,
            LightingSlider::Shadows => self.params.shadows = r - 1.0,
            LightingSlider::Highlights => self.params.highlights = r - 1.0,
        }
    }
}

impl Tool for LightingTool {
    fn label(&self) -> &'static str {
        "Lighting Adjustment"
    }

    fn render(&self, baseline: &PixelBuffer) -> Result<PixelBuffer> {
        if self.params.is_gamma_only() {
            return Ok(adjustments::adjust_gamma(baseline, self.params.gamma));
        }
        let mask = luminance_mask(baseline, self.mask_grid);
        adjustments::adjust_contrast_brightness_gamma(baseline, &self.params, &mask)
    }

    fn reset(&mut self) {
        self.sliders = [Slider::default(); 5];
        self.params = LightingParams::default();
    }
}

// ============================================================================
// COLORS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSlider {
    Temperature,
    Saturation,
    Hue,
    RedGain,
    GreenGain,
    BlueGain,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorParams {
    /// Kelvin, 1000 ..= 12000; 6550 is neutral.
    pub temperature: f32,
    pub saturation: f32,
    /// Degrees.
    pub hue: f32,
    pub gains: [f32; 3],
}

impl Default for ColorParams {
    fn default() -> Self {
        Self { temperature: 6550.0, saturation: 1.0, hue: 0.0, gains: [1.0; 3] }
    }
}

/// Slider position → Kelvin, clamped to the lookup table's range.
pub fn slider_to_kelvin(s: Slider) -> f32 {
    (s.ratio() * 5500.0 + 1050.0).clamp(adjustments::KELVIN_MIN, adjustments::KELVIN_MAX)
}

/// Colour temperature with per-channel gains, then saturation and hue.
#[derive(Clone, Debug, Default)]
pub struct ColorsTool {
    sliders: [Slider; 6],
    params: ColorParams,
}

impl ColorsTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: ColorParams) -> Self {
        Self { params, ..Self::default() }
    }

    pub fn params(&self) -> ColorParams {
        self.params
    }

    pub fn slider(&self, which: ColorSlider) -> Slider {
        self.sliders[which as usize]
    }

    pub fn set_slider(&mut self, which: ColorSlider, value: u8) {
        let s = Slider::new(value);
        self.sliders[which as usize] = s;
        let r = s.ratio();
        match which {
            ColorSlider::Temperature => self.params.temperature = slider_to_kelvin(s),
            ColorSlider::Saturation => self.params.saturation = r,
            ColorSlider::Hue => self.params.hue = (1.0 - r) * 180.0,
            ColorSlider::RedGain => self.params.gains[0] = r,
            ColorSlider::GreenGain => self.params.gains[1] = r,
            ColorSlider::BlueGain => self.params.gains[2] = r,
        }
    }
}

impl Tool for ColorsTool {
    fn label(&self) -> &'static str {
        "Color Adjustment"
    }

    fn render(&self, baseline: &PixelBuffer) -> Result<PixelBuffer> {
        let p = &self.params;
        let warmed = adjustments::change_color_temperature(baseline, p.temperature, p.gains)?;
        Ok(adjustments::adjust_saturation_hue(&warmed, p.saturation, p.hue))
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// CURVES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveKind {
    Global,
    Shadows,
    Highlights,
}

/// Global curve plus a mask-blended pair of local curves, all on one channel.
pub struct CurvesTool {
    channel: Channel,
    global: CurveEditor,
    shadows: CurveEditor,
    highlights: CurveEditor,
    mask_grid: u32,
}

impl CurvesTool {
    pub fn new(settings: &EditorSettings) -> Self {
        Self {
            channel: Channel::Luminance,
            global: CurveEditor::from_settings(settings),
            shadows: CurveEditor::from_settings(settings),
            highlights: CurveEditor::from_settings(settings),
            mask_grid: settings.mask_grid,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Switching channel starts all three curves over.
    pub fn set_channel(&mut self, channel: Channel) {
        if channel != self.channel {
            self.channel = channel;
            self.reset();
        }
    }

    pub fn curve(&self, kind: CurveKind) -> &CurveEditor {
        match kind {
            CurveKind::Global => &self.global,
            CurveKind::Shadows => &self.shadows,
            CurveKind::Highlights => &self.highlights,
        }
    }

    pub fn curve_mut(&mut self, kind: CurveKind) -> &mut CurveEditor {
        match kind {
            CurveKind::Global => &mut self.global,
            CurveKind::Shadows => &mut self.shadows,
            CurveKind::Highlights => &mut self.highlights,
        }
    }
}

impl Tool for CurvesTool {
    fn label(&self) -> &'static str {
        "Curve Adjustment"
    }

    fn render(&self, baseline: &PixelBuffer) -> Result<PixelBuffer> {
        let global = adjustments::apply_lut_global(baseline, &self.global.lut(), self.channel);
        if self.shadows.is_identity() && self.highlights.is_identity() {
            return Ok(global);
        }
        let mask = luminance_mask(baseline, self.mask_grid);
        adjustments::apply_lut_local(&global, &self.shadows.lut(), &self.highlights.lut(), self.channel, &mask)
    }

    fn reset(&mut self) {
        self.global.reset();
        self.shadows.reset();
        self.highlights.reset();
    }
}

// ============================================================================
// CROP AND ROTATE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CropStep {
    Geometry(GeometryOp),
    Crop(CropRect),
}

/// Replays flips, quarter turns and crops in the order they were made.
#[derive(Clone, Debug, Default)]
pub struct CropTool {
    steps: Vec<CropStep>,
    /// Rectangle drawn on the canvas but not applied yet.
    pending: Option<CropRect>,
}

impl CropTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[CropStep] {
        &self.steps
    }

    pub fn push_geometry(&mut self, op: GeometryOp) {
        self.steps.push(CropStep::Geometry(op));
    }

    pub fn push_crop(&mut self, rect: CropRect) {
        self.steps.push(CropStep::Crop(rect));
    }
}

impl Tool for CropTool {
    fn label(&self) -> &'static str {
        "Crop and Rotate"
    }

    fn render(&self, baseline: &PixelBuffer) -> Result<PixelBuffer> {
        let mut out = baseline.clone();
        for step in self.steps.iter().copied().chain(self.pending.map(CropStep::Crop)) {
            out = match step {
                CropStep::Geometry(op) => op.apply(&out),
                CropStep::Crop(mut rect) => {
                    rect.clamp_to(out.width(), out.height());
                    let (x, y, w, h) = rect.to_pixels();
                    // An empty rectangle leaves the image alone.
                    transform::crop(&out, x, y, w, h).unwrap_or(out)
                }
            };
        }
        Ok(out)
    }

    fn reset(&mut self) {
        self.steps.clear();
        self.pending = None;
    }

    fn full_resolution(&self) -> bool {
        true
    }

    fn crop_mode(&self) -> bool {
        true
    }

    fn sync_from_canvas(&mut self, canvas: &Canvas) {
        let full = canvas.current_image().map(|b| CropRect::full(b.width(), b.height()));
        self.pending = canvas.crop_rect().filter(|r| Some(*r) != full && !r.is_empty());
    }
}

// ============================================================================
// SHARPNESS / DE-NOISE
// ============================================================================

/// Unsharp mask; the slider maps to an amount in -1.0 ..= 1.0.
#[derive(Clone, Debug, Default)]
pub struct SharpnessTool {
    slider: Slider,
    amount: f32,
}

impl SharpnessTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_amount(amount: f32) -> Self {
        Self { amount, ..Self::default() }
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn set_slider(&mut self, value: u8) {
        self.slider = Slider::new(value);
        self.amount = self.slider.ratio() - 1.0;
    }
}

impl Tool for SharpnessTool {
    fn label(&self) -> &'static str {
        "Sharpness Adjustment"
    }

    fn render(&self, baseline: &PixelBuffer) -> Result<PixelBuffer> {
        Ok(filters::sharpen(baseline, self.amount))
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Median filter; the upper half of the slider selects kernel 1, 3, ... 11.
#[derive(Clone, Debug)]
pub struct DenoiseTool {
    slider: Slider,
    kernel: u32,
}

impl Default for DenoiseTool {
    fn default() -> Self {
        Self { slider: Slider::default(), kernel: 1 }
    }
}

impl DenoiseTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kernel(kernel: u32) -> Self {
        Self { kernel: kernel.max(1), ..Self::default() }
    }

    pub fn kernel(&self) -> u32 {
        self.kernel
    }

    pub fn set_slider(&mut self, value: u8) {
        self.slider = Slider::new(value);
        let steps = self.slider.value().saturating_sub(SLIDER_DEFAULT) as u32 / 10;
        self.kernel = 2 * steps + 1;
    }
}

impl Tool for DenoiseTool {
    fn label(&self) -> &'static str {
        "De-noise Adjustment"
    }

    fn render(&self, baseline: &PixelBuffer) -> Result<PixelBuffer> {
        Ok(filters::denoise_median(baseline, self.kernel))
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// TOOL SESSION
// ============================================================================

/// An open tool window: its own canvas showing a preview rendered from a
/// fixed baseline. Every change re-renders from that baseline, never from the
/// image currently displayed, so edits do not compound inside a session.
pub struct ToolSession<T: Tool> {
    tool: T,
    full: PixelBuffer,
    canvas: Canvas,
}

impl<T: Tool> ToolSession<T> {
    pub fn open(tool: T, baseline: PixelBuffer, settings: &EditorSettings) -> Self {
        let preview = if tool.full_resolution() {
            baseline.clone()
        } else {
            io::scale_to_working_resolution(&baseline, settings.working_resolution)
        };
        let mut canvas = Canvas::new(settings);
        canvas.show_new_image(preview);
        if tool.crop_mode() {
            canvas.set_crop_mode(true);
        }
        log_debug!("{} opened on {}x{}", tool.label(), baseline.width(), baseline.height());
        Self { tool, full: baseline, canvas }
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// The buffer every preview is rendered from.
    pub fn preview_baseline(&self) -> Option<&PixelBuffer> {
        self.canvas.original_image()
    }

    /// Change parameters through `f`, then re-render the preview.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let r = f(&mut self.tool);
        self.refresh()?;
        Ok(r)
    }

    /// Re-render the preview from the baseline. Zoom and pan survive unless
    /// the result changed size.
    pub fn refresh(&mut self) -> Result<()> {
        let Some(base) = self.canvas.original_image() else { return Ok(()) };
        let out = self.tool.render(base)?;
        self.canvas.replace_current(out);
        Ok(())
    }

    pub fn reset(&mut self) -> Result<()> {
        self.tool.reset();
        self.refresh()
    }

    /// Render once more at full resolution. Returns the result and the
    /// label to record it under.
    pub fn confirm(mut self) -> Result<(PixelBuffer, String)> {
        self.tool.sync_from_canvas(&self.canvas);
        let out = self.tool.render(&self.full)?;
        Ok((out, self.tool.label().to_string()))
    }

    pub fn cancel(self) {
        log_debug!("{} cancelled", self.tool.label());
    }
}

impl ToolSession<CropTool> {
    /// Queue a flip or turn and show it. The crop selection starts over.
    pub fn geometry(&mut self, op: GeometryOp) -> Result<()> {
        self.update(|t| t.push_geometry(op))?;
        self.canvas.reset_crop_rect();
        Ok(())
    }

    /// Apply the rectangle currently drawn on the canvas. Returns `false`
    /// when there is nothing (or nothing smaller than the image) to crop.
    pub fn apply_crop(&mut self) -> Result<bool> {
        let full = self.canvas.current_image().map(|b| CropRect::full(b.width(), b.height()));
        let Some(rect) = self.canvas.crop_rect().filter(|r| Some(*r) != full && !r.is_empty()) else {
            return Ok(false);
        };
        self.update(|t| t.push_crop(rect))?;
        Ok(true)
    }
}
