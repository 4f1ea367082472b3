// ============================================================================
// Visualysium CLI - headless batch editing via command-line arguments
// ============================================================================
//
// Usage examples:
//   visualysium -i photo.jpg --contrast 0.3 --gamma 0.9 -o out.png
//   visualysium -i "shots/*.jpg" --temperature 5200 --output-dir warm/ --format png
//   visualysium -i scan.tif --crop 10,10,800,600 --rotate-right --sharpen 0.4 -o page.jpg
//   visualysium -i a.png --curve 0:0,64:40,192:215,255:255 --curve-channel red -o b.png
//   visualysium -i "shots/*.jpg" --info
//
// Every requested operation runs as a confirmed tool session on an Editor,
// so the output carries the same history the interactive editor would.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::app::Editor;
use crate::canvas::CropRect;
use crate::components::curve::parse_curve_points;
use crate::components::tools::{
    ColorParams, ColorsTool, CropTool, CurveKind, CurvesTool, DenoiseTool, LightingTool, SharpnessTool, Tool,
};
use crate::error::{Error, Result};
use crate::io::{self, SaveFormat};
use crate::ops::adjustments::{Channel, LightingParams};
use crate::ops::transform::GeometryOp;
use crate::settings::EditorSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Visualysium headless image editor.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "visualysium",
    about = "Visualysium headless photo adjustment",
    long_about = "Apply lighting, colour, curve, crop and filter edits to image files\n\
                  without opening a window. Operations run in a fixed order: crop and\n\
                  geometry, lighting, colour, curves, sharpen, de-noise."
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, webp, bmp, tga, ico, tiff.
    /// When omitted, inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    // --- lighting ---
    #[arg(long, allow_hyphen_values = true, value_name = "-1..1")]
    pub contrast: Option<f32>,
    #[arg(long, allow_hyphen_values = true, value_name = "-1..1")]
    pub brightness: Option<f32>,
    #[arg(long, value_name = "EXP")]
    pub gamma: Option<f32>,
    #[arg(long, allow_hyphen_values = true, value_name = "-1..1")]
    pub shadows: Option<f32>,
    #[arg(long, allow_hyphen_values = true, value_name = "-1..1")]
    pub highlights: Option<f32>,

    // --- colour ---
    /// Colour temperature in Kelvin (1000-12000, 6550 is neutral).
    #[arg(long, value_name = "K")]
    pub temperature: Option<f32>,
    #[arg(long, value_name = "FACTOR")]
    pub saturation: Option<f32>,
    /// Hue rotation in degrees.
    #[arg(long, allow_hyphen_values = true, value_name = "DEG")]
    pub hue: Option<f32>,
    #[arg(long, value_name = "FACTOR")]
    pub red_gain: Option<f32>,
    #[arg(long, value_name = "FACTOR")]
    pub green_gain: Option<f32>,
    #[arg(long, value_name = "FACTOR")]
    pub blue_gain: Option<f32>,

    // --- curves ---
    /// Global tone curve as x:y pairs, e.g. 0:0,128:150,255:255.
    #[arg(long, value_name = "POINTS")]
    pub curve: Option<String>,
    /// Curve blended in through the shadows of the luminance mask.
    #[arg(long, value_name = "POINTS")]
    pub curve_shadows: Option<String>,
    /// Curve blended in through the highlights of the luminance mask.
    #[arg(long, value_name = "POINTS")]
    pub curve_highlights: Option<String>,
    /// Channel the curves act on: luminance, red, green, blue.
    #[arg(long, default_value = "luminance", value_name = "CHANNEL")]
    pub curve_channel: String,

    // --- crop and geometry ---
    /// Crop rectangle x,y,w,h in pixels (applied after flips and turns).
    #[arg(long, value_name = "X,Y,W,H")]
    pub crop: Option<String>,
    #[arg(long)]
    pub flip_h: bool,
    #[arg(long)]
    pub flip_v: bool,
    #[arg(long)]
    pub rotate_left: bool,
    #[arg(long)]
    pub rotate_right: bool,

    // --- filters ---
    /// Unsharp-mask amount (-1..1).
    #[arg(long, allow_hyphen_values = true, value_name = "AMOUNT")]
    pub sharpen: Option<f32>,
    /// Median de-noise kernel size (odd; even sizes are rounded up).
    #[arg(long, value_name = "KERNEL")]
    pub denoise: Option<u32>,

    /// Settings file to use instead of the per-user one.
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Print file facts and a per-channel level summary of each result.
    /// With no edit requested, nothing is written.
    #[arg(long)]
    pub info: bool,

    /// Echo the log to stderr and print per-file history and timing.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    fn lighting(&self) -> Option<LightingParams> {
        if [self.contrast, self.brightness, self.gamma, self.shadows, self.highlights].iter().all(Option::is_none) {
            return None;
        }
        let d = LightingParams::default();
        Some(LightingParams {
            contrast: self.contrast.unwrap_or(d.contrast),
            brightness: self.brightness.unwrap_or(d.brightness),
            gamma: self.gamma.unwrap_or(d.gamma),
            shadows: self.shadows.unwrap_or(d.shadows),
            highlights: self.highlights.unwrap_or(d.highlights),
        })
    }

    fn colors(&self) -> Option<ColorParams> {
        let all = [self.temperature, self.saturation, self.hue, self.red_gain, self.green_gain, self.blue_gain];
        if all.iter().all(Option::is_none) {
            return None;
        }
        let d = ColorParams::default();
        Some(ColorParams {
            temperature: self.temperature.unwrap_or(d.temperature),
            saturation: self.saturation.unwrap_or(d.saturation),
            hue: self.hue.unwrap_or(d.hue),
            gains: [
                self.red_gain.unwrap_or(d.gains[0]),
                self.green_gain.unwrap_or(d.gains[1]),
                self.blue_gain.unwrap_or(d.gains[2]),
            ],
        })
    }

    fn geometry(&self) -> Vec<GeometryOp> {
        [
            (self.flip_h, GeometryOp::FlipHorizontal),
            (self.flip_v, GeometryOp::FlipVertical),
            (self.rotate_left, GeometryOp::RotateLeft),
            (self.rotate_right, GeometryOp::RotateRight),
        ]
        .into_iter()
        .filter_map(|(on, op)| on.then_some(op))
        .collect()
    }
}

/// Everything parsed from the string-valued flags, validated once up front.
#[derive(Debug)]
struct Plan {
    crop: Option<CropRect>,
    geometry: Vec<GeometryOp>,
    lighting: Option<LightingParams>,
    colors: Option<ColorParams>,
    channel: Channel,
    curve: Option<Vec<(f32, f32)>>,
    curve_shadows: Option<Vec<(f32, f32)>>,
    curve_highlights: Option<Vec<(f32, f32)>>,
    sharpen: Option<f32>,
    denoise: Option<u32>,
}

impl Plan {
    fn from_args(args: &CliArgs) -> Result<Self> {
        let points = |s: &Option<String>| s.as_deref().map(parse_curve_points).transpose();
        Ok(Self {
            crop: args.crop.as_deref().map(parse_crop).transpose()?,
            geometry: args.geometry(),
            lighting: args.lighting(),
            colors: args.colors(),
            channel: args.curve_channel.parse()?,
            curve: points(&args.curve)?,
            curve_shadows: points(&args.curve_shadows)?,
            curve_highlights: points(&args.curve_highlights)?,
            sharpen: args.sharpen,
            denoise: args.denoise,
        })
    }

    fn has_curves(&self) -> bool {
        self.curve.is_some() || self.curve_shadows.is_some() || self.curve_highlights.is_some()
    }

    /// No edit of any kind requested.
    fn is_empty(&self) -> bool {
        self.crop.is_none()
            && self.geometry.is_empty()
            && self.lighting.is_none()
            && self.colors.is_none()
            && !self.has_curves()
            && self.sharpen.is_none()
            && self.denoise.is_none()
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let plan = match Plan::from_args(&args) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    if args.verbose
        && let Some(path) = crate::logger::log_path()
    {
        println!("log: {}", path.display());
    }

    let settings = match &args.settings {
        Some(path) => EditorSettings::load_from(path),
        None => EditorSettings::load(),
    };
    let report_only = args.info && plan.is_empty();
    let save_format = parse_format(args.format.as_deref(), args.output.as_deref());

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref(), save_format)
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &plan, &settings) {
            Ok(editor) => {
                if args.verbose
                    && let Some(history) = editor.history()
                {
                    for (i, label) in history.labels().iter().enumerate() {
                        println!("  #{i} {label}");
                    }
                }
                if args.info {
                    print_info(&editor);
                }
                if report_only {
                    continue;
                }
                let saved = editor
                    .current_image()
                    .map(|buf| io::save_image_as(buf, &output_path, save_format, args.quality));
                match saved {
                    Some(Ok(())) => {
                        if args.verbose || multi {
                            println!(
                                "  -> {} ({:.0}ms)",
                                output_path.display(),
                                file_start.elapsed().as_secs_f64() * 1000.0
                            );
                        }
                    }
                    Some(Err(e)) => {
                        log_err!("{e}");
                        eprintln!("  error: {e}");
                        any_failure = true;
                    }
                    None => {
                        eprintln!("  error: nothing to save for '{}'.", input_path.display());
                        any_failure = true;
                    }
                }
            }
            Err(e) => {
                log_err!("{}: {e}", input_path.display());
                eprintln!("  error: {e}");
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(input: &Path, plan: &Plan, settings: &EditorSettings) -> Result<Editor> {
    let mut editor = Editor::new(settings.clone());
    editor.open_image(input)?;

    // -- Crop and geometry -------------------------------------------------
    if !plan.geometry.is_empty() || plan.crop.is_some() {
        let mut tool = CropTool::new();
        for &op in &plan.geometry {
            tool.push_geometry(op);
        }
        if let Some(rect) = plan.crop {
            tool.push_crop(rect);
        }
        commit(&mut editor, tool)?;
    }

    // -- Lighting / colour ---------------------------------------------------
    if let Some(params) = plan.lighting {
        commit(&mut editor, LightingTool::with_params(settings, params))?;
    }
    if let Some(params) = plan.colors {
        commit(&mut editor, ColorsTool::with_params(params))?;
    }

    // -- Curves --------------------------------------------------------------
    if plan.has_curves() {
        let mut tool = CurvesTool::new(settings);
        tool.set_channel(plan.channel);
        for (kind, points) in [
            (CurveKind::Global, &plan.curve),
            (CurveKind::Shadows, &plan.curve_shadows),
            (CurveKind::Highlights, &plan.curve_highlights),
        ] {
            if let Some(points) = points {
                tool.curve_mut(kind).set_points(points)?;
            }
        }
        commit(&mut editor, tool)?;
    }

    // -- Filters -------------------------------------------------------------
    if let Some(amount) = plan.sharpen {
        commit(&mut editor, SharpnessTool::with_amount(amount))?;
    }
    if let Some(kernel) = plan.denoise {
        commit(&mut editor, DenoiseTool::with_kernel(kernel))?;
    }

    Ok(editor)
}

fn print_info(editor: &Editor) {
    if let Some(info) = editor.info() {
        println!("  {info}");
    }
    for &channel in Channel::all() {
        if let Some((lo, hi, mean)) = editor.histogram(channel).as_ref().and_then(level_summary) {
            println!("  {:<10} min {lo:>3}  max {hi:>3}  mean {mean:>6.1}", channel.label());
        }
    }
}

/// Lowest and highest occupied level plus the mean level of a histogram.
fn level_summary(hist: &[u32; 256]) -> Option<(u8, u8, f64)> {
    let lo = hist.iter().position(|&n| n > 0)?;
    let hi = hist.iter().rposition(|&n| n > 0)?;
    let count: u64 = hist.iter().map(|&n| n as u64).sum();
    let weighted: u64 = hist.iter().enumerate().map(|(level, &n)| level as u64 * n as u64).sum();
    Some((lo as u8, hi as u8, weighted as f64 / count as f64))
}

/// Run `tool` as a session on the editor's current image and confirm it.
fn commit<T: Tool>(editor: &mut Editor, tool: T) -> Result<()> {
    if let Some(session) = editor.begin(tool) {
        editor.finish(session)?;
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Every image named by `patterns`, in first-seen order without repeats.
/// A pattern is taken literally when such a file exists, as a glob otherwise.
pub fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        let matches = expand_pattern(pattern);
        if matches.is_empty() {
            log_warn!("'{pattern}' matched no images");
            eprintln!("warning: '{pattern}' matched no image files.");
        }
        for path in matches {
            if !found.contains(&path) {
                found.push(path);
            }
        }
    }
    found
}

fn expand_pattern(pattern: &str) -> Vec<PathBuf> {
    let literal = PathBuf::from(pattern);
    if literal.is_file() {
        return vec![literal];
    }
    match glob::glob(pattern) {
        Ok(paths) => paths.flatten().filter(|p| p.is_file() && io::is_supported(p)).collect(),
        Err(e) => {
            log_warn!("bad glob '{pattern}': {e}");
            Vec::new()
        }
    }
}

/// Choose the [`SaveFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to PNG when neither is known.
pub fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> SaveFormat {
    let named = format_arg.and_then(|f| {
        let format = SaveFormat::from_extension(f);
        if format.is_none() {
            let known: Vec<&str> = SaveFormat::all().iter().map(SaveFormat::extension).collect();
            log_warn!("unknown format '{f}'");
            eprintln!("warning: unknown format '{f}' (expected one of {}), ignoring it.", known.join(", "));
        }
        format
    });
    named.or_else(|| output.and_then(SaveFormat::from_path)).unwrap_or_default()
}

/// Parse `x,y,w,h` into a crop rectangle.
pub fn parse_crop(s: &str) -> Result<CropRect> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::InvalidArgument(format!("crop '{s}' must be four numbers x,y,w,h")))?;
    let [x, y, w, h] = parts[..] else {
        return Err(Error::InvalidArgument(format!("crop '{s}' must be four numbers x,y,w,h")));
    };
    if w <= 0.0 || h <= 0.0 {
        return Err(Error::InvalidArgument(format!("crop '{s}' has an empty size")));
    }
    Ok(CropRect::new(x, y, w, h))
}

/// Where the result for `input` goes: `output` as given, otherwise
/// `<stem>.<ext>` in `output_dir` or beside the input. A target equal to the
/// input itself gets an `_out` suffix so the source is never overwritten.
pub fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }
    let stem = input.file_stem()?.to_string_lossy();
    let ext = format.extension();
    let dir = output_dir.or_else(|| input.parent()).unwrap_or(Path::new("."));
    let target = dir.join(format!("{stem}.{ext}"));
    Some(if target == input { dir.join(format!("{stem}_out.{ext}")) } else { target })
}
