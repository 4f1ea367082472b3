use std::path::{Path, PathBuf};

use crate::error::Result;

/// Tunable constants of the editor core.
///
/// Stored as a flat `key=value` file. Unknown keys and unparsable values are
/// ignored so a hand-edited file can never prevent startup.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSettings {
    /// Longest side (px) images are scaled to before entering a tool.
    pub working_resolution: u32,
    /// Side length of the luminance grid the blend mask is built from.
    pub mask_grid: u32,
    pub pan_sensitivity: f32,
    pub zoom_in_factor: f32,
    pub zoom_out_factor: f32,
    /// A ctrl-drag smaller than this (in screen px, both axes) is a click.
    pub region_zoom_min_drag: f32,
    pub curve_points: usize,
    pub curve_hit_radius: f32,
    pub curve_min_gap: f32,
    pub button_size: f32,
    pub button_margin: f32,
    pub button_spacing: f32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            working_resolution: 1024,
            mask_grid: 64,
            pan_sensitivity: 1.0,
            zoom_in_factor: 1.1,
            zoom_out_factor: 0.9,
            region_zoom_min_drag: 3.0,
            curve_points: 7,
            curve_hit_radius: 10.0,
            curve_min_gap: 10.0,
            button_size: 60.0,
            button_margin: 15.0,
            button_spacing: 1.0,
        }
    }
}

impl EditorSettings {
    /// Default settings file location.
    /// On Linux:   ~/.config/visualysium/visualysium_settings.cfg (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\Visualysium\visualysium_settings.cfg
    /// On macOS:   ~/Library/Application Support/Visualysium/visualysium_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("Visualysium").join("visualysium_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("Visualysium")
                    .join("visualysium_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("visualysium").join("visualysium_settings.cfg"))
        }
    }

    /// Load from the default location; defaults if the file is missing.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        match Self::settings_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config())?;
        Ok(())
    }

    fn to_config(&self) -> String {
        format!(
            "working_resolution={}\n\
             mask_grid={}\n\
             pan_sensitivity={}\n\
             zoom_in_factor={}\n\
             zoom_out_factor={}\n\
             region_zoom_min_drag={}\n\
             curve_points={}\n\
             curve_hit_radius={}\n\
             curve_min_gap={}\n\
             button_size={}\n\
             button_margin={}\n\
             button_spacing={}\n",
            self.working_resolution,
            self.mask_grid,
            self.pan_sensitivity,
            self.zoom_in_factor,
            self.zoom_out_factor,
            self.region_zoom_min_drag,
            self.curve_points,
            self.curve_hit_radius,
            self.curve_min_gap,
            self.button_size,
            self.button_margin,
            self.button_spacing,
        )
    }

    fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "working_resolution" => set_parsed(&mut s.working_resolution, val, |v| *v >= 16),
                "mask_grid" => set_parsed(&mut s.mask_grid, val, |v| *v >= 1),
                "pan_sensitivity" => set_parsed(&mut s.pan_sensitivity, val, |v| v.is_finite()),
                "zoom_in_factor" => set_parsed(&mut s.zoom_in_factor, val, |v| *v > 1.0),
                "zoom_out_factor" => set_parsed(&mut s.zoom_out_factor, val, |v| *v > 0.0 && *v < 1.0),
                "region_zoom_min_drag" => set_parsed(&mut s.region_zoom_min_drag, val, |v| *v >= 0.0),
                "curve_points" => set_parsed(&mut s.curve_points, val, |v| *v >= 2),
                "curve_hit_radius" => set_parsed(&mut s.curve_hit_radius, val, |v| *v > 0.0),
                "curve_min_gap" => set_parsed(&mut s.curve_min_gap, val, |v| *v >= 0.0),
                "button_size" => set_parsed(&mut s.button_size, val, |v| *v > 0.0),
                "button_margin" => set_parsed(&mut s.button_margin, val, |v| *v >= 0.0),
                "button_spacing" => set_parsed(&mut s.button_spacing, val, |v| *v >= 0.0),
                _ => {}
            }
        }
        s
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, val: &str, valid: impl Fn(&T) -> bool) {
    if let Ok(v) = val.parse::<T>()
        && valid(&v)
    {
        *slot = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.cfg");

        let s = EditorSettings {
            working_resolution: 2048,
            curve_points: 8,
            pan_sensitivity: 0.5,
            ..EditorSettings::default()
        };
        s.save_to(&path).unwrap();
        assert_eq!(EditorSettings::load_from(&path), s);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = EditorSettings::load_from(&dir.path().join("nope.cfg"));
        assert_eq!(s, EditorSettings::default());
    }

    #[test]
    fn bad_values_are_ignored() {
        let s = EditorSettings::parse(
            "# comment\nmask_grid=abc\ncurve_points=1\nzoom_in_factor=0.5\nbutton_size = 40\nunknown=1\nnot a pair\n",
        );
        let d = EditorSettings::default();
        assert_eq!(s.mask_grid, d.mask_grid);
        assert_eq!(s.curve_points, d.curve_points);
        assert_eq!(s.zoom_in_factor, d.zoom_in_factor);
        assert_eq!(s.button_size, 40.0);
    }
}
