//! Error types shared by the whole editor core.
//!
//! Only genuine failures live here. "Nothing to do" situations (no image
//! loaded, an empty crop rectangle) are modelled as `Option` or silent no-ops
//! by the callers instead.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The decoder could not read the file (unsupported or corrupt input).
    #[error("could not decode '{}': {message}", path.display())]
    Decode { path: PathBuf, message: String },

    /// Writing an image to disk failed.
    #[error("could not encode '{}': {message}", path.display())]
    Encode { path: PathBuf, message: String },

    /// The pixel data has a shape or channel layout the editor does not handle.
    #[error("unsupported image: {0}")]
    UnsupportedImage(String),

    /// Colour temperature lookups only cover 1000 K ..= 12000 K.
    /// Callers clamp before calling; the lookup never clamps silently.
    #[error("colour temperature {0} K is outside 1000..=12000 K")]
    TemperatureOutOfRange(f32),

    /// A mask (or other per-pixel companion buffer) does not match the image.
    #[error("dimension mismatch: expected {}x{}, found {}x{}", expected.0, expected.1, found.0, found.1)]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    /// A user supplied value could not be parsed or is out of its domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = Error::TemperatureOutOfRange(900.0);
        assert!(err.to_string().contains("900"));

        let err = Error::DimensionMismatch { expected: (4, 2), found: (2, 2) };
        assert_eq!(err.to_string(), "dimension mismatch: expected 4x2, found 2x2");

        let err = Error::Decode { path: PathBuf::from("a.png"), message: "bad header".into() };
        assert!(err.to_string().contains("a.png"));
        assert!(err.to_string().contains("bad header"));
    }
}
