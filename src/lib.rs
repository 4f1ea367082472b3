//! Visualysium: a photo adjustment core with an interactive viewport model,
//! slider-driven tool sessions and a linear edit history.

#[macro_use]
pub mod logger;

pub mod app;
pub mod buffer;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod error;
pub mod io;
pub mod ops;
pub mod settings;
pub mod signal;

pub use app::{EditEvent, Editor};
pub use buffer::{ChannelLayout, ImageInput, PixelBuffer};
pub use error::{Error, Result};
