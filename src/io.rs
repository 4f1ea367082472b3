use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::{ColorType, ImageEncoder, ImageError, ImageFormat};

use crate::buffer::{ChannelLayout, PixelBuffer};
use crate::error::{Error, Result};
use crate::ops::transform;

/// File extensions the loader accepts (lower case, no dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "bmp", "tga", "ico", "tif", "tiff",
];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Output formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    Bmp,
    Tga,
    Ico,
    Tiff,
}

impl SaveFormat {
    pub fn all() -> &'static [SaveFormat] {
        &[
            SaveFormat::Png,
            SaveFormat::Jpeg,
            SaveFormat::Webp,
            SaveFormat::Bmp,
            SaveFormat::Tga,
            SaveFormat::Ico,
            SaveFormat::Tiff,
        ]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Webp => "webp",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
            SaveFormat::Ico => "ico",
            SaveFormat::Tiff => "tiff",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "webp" => Some(SaveFormat::Webp),
            "bmp" => Some(SaveFormat::Bmp),
            "tga" => Some(SaveFormat::Tga),
            "ico" => Some(SaveFormat::Ico),
            "tif" | "tiff" => Some(SaveFormat::Tiff),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_extension)
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// File facts shown next to an opened image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub file_name: String,
    pub directory: PathBuf,
    /// Size on disk in bytes.
    pub file_size: u64,
    /// Last modification, seconds since the Unix epoch.
    pub modified: Option<u64>,
    pub width: u32,
    pub height: u32,
    /// Bits per pixel of the file as decoded, before conversion to 8-bit.
    pub bits_per_pixel: u16,
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {}x{}, {} bpp, {} bytes",
            self.file_name,
            self.directory.display(),
            self.width,
            self.height,
            self.bits_per_pixel,
            self.file_size
        )?;
        if let Some(secs) = self.modified {
            write!(f, ", modified {secs}")?;
        }
        Ok(())
    }
}

/// Decode any supported raster file. RGBA sources keep their alpha channel;
/// everything else is converted to 8-bit RGB.
pub fn load_image(path: &Path) -> Result<PixelBuffer> {
    load_with_info(path).map(|(buf, _)| buf)
}

/// [`load_image`] plus the file facts of [`ImageInfo`].
pub fn load_with_info(path: &Path) -> Result<(PixelBuffer, ImageInfo)> {
    let img = image::open(path).map_err(|e| Error::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let buf = PixelBuffer::from_dynamic(&img)?;
    let meta = std::fs::metadata(path)?;
    let info = ImageInfo {
        file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
        directory: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        file_size: meta.len(),
        modified: meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs()),
        width: buf.width(),
        height: buf.height(),
        bits_per_pixel: img.color().bits_per_pixel(),
    };
    log_info!(
        "Loaded {} ({}x{}, {:?}, {} bpp)",
        path.display(),
        buf.width(),
        buf.height(),
        buf.layout(),
        info.bits_per_pixel
    );
    Ok((buf, info))
}

/// Downscale so neither side exceeds `max_side` (aspect kept, never upscaled).
pub fn scale_to_working_resolution(buf: &PixelBuffer, max_side: u32) -> PixelBuffer {
    let scaled = transform::resize_to_fit(buf, max_side);
    if scaled.dimensions() != buf.dimensions() {
        log_debug!(
            "Working copy {}x{} -> {}x{}",
            buf.width(),
            buf.height(),
            scaled.width(),
            scaled.height()
        );
    }
    scaled
}

// ============================================================================
// SAVING
// ============================================================================

/// Save with the format implied by the extension (PNG when there is none or
/// it is unknown). `quality` only affects JPEG.
pub fn save_image(buf: &PixelBuffer, path: &Path, quality: u8) -> Result<()> {
    save_image_as(buf, path, SaveFormat::from_path(path).unwrap_or_default(), quality)
}

/// Save in an explicit format regardless of the extension.
pub fn save_image_as(buf: &PixelBuffer, path: &Path, format: SaveFormat, quality: u8) -> Result<()> {
    encode_and_write(buf, path, format, quality).map_err(|e| Error::Encode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    log_info!("Saved {} as {:?}", path.display(), format);
    Ok(())
}

/// Encode and write `buf` to `path` in an explicit format.
pub fn encode_and_write(buf: &PixelBuffer, path: &Path, format: SaveFormat, quality: u8) -> std::result::Result<(), ImageError> {
    let color = match buf.layout() {
        ChannelLayout::Rgb => ColorType::Rgb8,
        ChannelLayout::Rgba => ColorType::Rgba8,
    };
    let (w, h) = buf.dimensions();

    match format {
        SaveFormat::Png => {
            let mut writer = BufWriter::new(File::create(path)?);
            PngEncoder::new(&mut writer).write_image(buf.as_raw(), w, h, color)?;
        }
        SaveFormat::Jpeg => {
            let mut writer = BufWriter::new(File::create(path)?);
            // JPEG has no alpha channel.
            let rgb = buf.to_dynamic().to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder.encode(rgb.as_raw(), w, h, ColorType::Rgb8)?;
        }
        SaveFormat::Bmp => {
            let mut writer = BufWriter::new(File::create(path)?);
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(buf.as_raw(), w, h, color)?;
        }
        SaveFormat::Tga => {
            let mut writer = BufWriter::new(File::create(path)?);
            TgaEncoder::new(&mut writer).encode(buf.as_raw(), w, h, color)?;
        }
        SaveFormat::Ico => {
            // ICO entries are limited to 256×256.
            let img = transform::resize_to_fit(buf, 256).to_dynamic();
            let mut writer = BufWriter::new(File::create(path)?);
            img.write_to(&mut writer, image::ImageOutputFormat::Ico)?;
        }
        SaveFormat::Webp => buf.to_dynamic().save_with_format(path, ImageFormat::WebP)?,
        SaveFormat::Tiff => buf.to_dynamic().save_with_format(path, ImageFormat::Tiff)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PixelBuffer {
        PixelBuffer::from_fn(6, 4, ChannelLayout::Rgb, |x, y| [x as u8 * 40, y as u8 * 60, 128, 255])
    }

    #[test]
    fn extension_filter() {
        assert!(is_supported(Path::new("holiday.JPG")));
        assert!(is_supported(Path::new("/tmp/a.tiff")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("no_extension")));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(SaveFormat::from_extension("JPEG"), Some(SaveFormat::Jpeg));
        assert_eq!(SaveFormat::from_extension("tif"), Some(SaveFormat::Tiff));
        assert_eq!(SaveFormat::from_extension("gif"), None);
        for f in SaveFormat::all() {
            assert_eq!(SaveFormat::from_extension(f.extension()), Some(*f));
        }
    }

    #[test]
    fn png_save_then_load_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        save_image(&sample(), &path, 90).unwrap();
        assert_eq!(load_image(&path).unwrap(), sample());
    }

    #[test]
    fn rgba_survives_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha.png");
        let buf = PixelBuffer::filled(3, 3, ChannelLayout::Rgba, &[10, 20, 30, 40]);
        save_image(&buf, &path, 90).unwrap();
        let back = load_image(&path).unwrap();
        assert_eq!(back.layout(), ChannelLayout::Rgba);
        assert_eq!(back, buf);
    }

    #[test]
    fn info_describes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.png");
        let buf = PixelBuffer::filled(5, 3, ChannelLayout::Rgba, &[1, 2, 3, 4]);
        save_image(&buf, &path, 90).unwrap();

        let (loaded, info) = load_with_info(&path).unwrap();
        assert_eq!(loaded, buf);
        assert_eq!(info.file_name, "facts.png");
        assert_eq!(info.directory, dir.path());
        assert_eq!(info.file_size, std::fs::metadata(&path).unwrap().len());
        assert_eq!((info.width, info.height, info.bits_per_pixel), (5, 3, 32));
        assert!(info.modified.is_some());
        assert!(info.to_string().starts_with("facts.png ("));

        save_image(&sample(), &dir.path().join("rgb.bmp"), 90).unwrap();
        let (_, info) = load_with_info(&dir.path().join("rgb.bmp")).unwrap();
        assert_eq!(info.bits_per_pixel, 24);
    }

    #[test]
    fn jpeg_keeps_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        save_image(&sample(), &path, 95).unwrap();
        let back = load_image(&path).unwrap();
        assert_eq!(back.dimensions(), (6, 4));
        assert_eq!(back.layout(), ChannelLayout::Rgb);
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(load_image(&path), Err(Error::Decode { .. })));
        assert!(matches!(load_image(&dir.path().join("missing.png")), Err(Error::Decode { .. })));
    }

    #[test]
    fn save_into_missing_directory_is_an_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no").join("such").join("dir.png");
        assert!(matches!(save_image(&sample(), &path, 90), Err(Error::Encode { .. })));
    }

    #[test]
    fn working_resolution_bounds_longest_side() {
        let big = PixelBuffer::filled(2048, 1024, ChannelLayout::Rgb, &[1, 1, 1]);
        assert_eq!(scale_to_working_resolution(&big, 1024).dimensions(), (1024, 512));
        assert_eq!(scale_to_working_resolution(&sample(), 1024), sample());
    }
}
