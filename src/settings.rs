use std::path::PathBuf;

use crate::canvas::{BASE_CELL_SIZE, DEFAULT_SIZE, MAX_SIZE, Viewport};
use crate::components::colors::COLOR_HISTORY_LEN;
use crate::components::history::DEFAULT_HISTORY_SIZE;
use crate::io::{DEFAULT_EXPORT_SCALE, clamp_export_scale};

/// Engine settings that persist across sessions
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// Size of a freshly created project
    pub default_width: u32,
    pub default_height: u32,
    /// Cell size in pixels at zoom 1.0
    pub base_cell_size: f32,
    /// Maximum number of undo steps
    pub max_undo_steps: usize,
    /// PNG export block size
    pub export_scale: u32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
    /// Number of recent colours remembered
    pub color_history_len: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_width: DEFAULT_SIZE,
            default_height: DEFAULT_SIZE,
            base_cell_size: BASE_CELL_SIZE,
            max_undo_steps: DEFAULT_HISTORY_SIZE,
            export_scale: DEFAULT_EXPORT_SCALE,
            min_zoom: 0.5,
            max_zoom: 3.0,
            zoom_step: 0.25,
            color_history_len: COLOR_HISTORY_LEN,
        }
    }
}

impl EngineSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/pixelpattern/pixelpattern_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PixelPattern\pixelpattern_settings.cfg
    /// On macOS:   ~/Library/Application Support/PixelPattern/pixelpattern_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("PixelPattern").join("pixelpattern_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("PixelPattern")
                    .join("pixelpattern_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("pixelpattern").join("pixelpattern_settings.cfg"))
        }
    }

    /// Serialize to `key=value` lines.
    pub fn to_config_string(&self) -> String {
        format!(
            "default_width={}\n\
             default_height={}\n\
             base_cell_size={}\n\
             max_undo_steps={}\n\
             export_scale={}\n\
             min_zoom={}\n\
             max_zoom={}\n\
             zoom_step={}\n\
             color_history_len={}\n",
            self.default_width,
            self.default_height,
            self.base_cell_size,
            self.max_undo_steps,
            self.export_scale,
            self.min_zoom,
            self.max_zoom,
            self.zoom_step,
            self.color_history_len,
        )
    }

    /// Parse `key=value` lines over the defaults. Unknown keys and bad values
    /// are skipped.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "default_width" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.default_width = v.clamp(1, MAX_SIZE);
                    }
                }
                "default_height" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.default_height = v.clamp(1, MAX_SIZE);
                    }
                }
                "base_cell_size" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v.is_finite()
                        && v > 0.0
                    {
                        s.base_cell_size = v;
                    }
                }
                "max_undo_steps" => {
                    if let Ok(v) = val.parse::<usize>() {
                        s.max_undo_steps = v.max(1);
                    }
                }
                "export_scale" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.export_scale = clamp_export_scale(v);
                    }
                }
                "min_zoom" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v.is_finite()
                        && v > 0.0
                    {
                        s.min_zoom = v;
                    }
                }
                "max_zoom" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v.is_finite()
                        && v > 0.0
                    {
                        s.max_zoom = v;
                    }
                }
                "zoom_step" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v.is_finite()
                        && v > 0.0
                    {
                        s.zoom_step = v;
                    }
                }
                "color_history_len" => {
                    if let Ok(v) = val.parse::<usize>() {
                        s.color_history_len = v.max(1);
                    }
                }
                _ => {}
            }
        }
        if s.min_zoom > s.max_zoom {
            std::mem::swap(&mut s.min_zoom, &mut s.max_zoom);
        }
        s
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&path, self.to_config_string()) {
            crate::log_warn!("could not write settings {}: {}", path.display(), e);
        }
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        Self::from_config_str(&content)
    }

    /// A viewport configured from these settings at zoom 1.0.
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.base_cell_size, self.min_zoom, self.max_zoom, self.zoom_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_config_text() {
        let s = EngineSettings {
            default_width: 64,
            default_height: 16,
            max_undo_steps: 20,
            export_scale: 4,
            ..EngineSettings::default()
        };
        assert_eq!(EngineSettings::from_config_str(&s.to_config_string()), s);
    }

    #[test]
    fn bad_values_fall_back_or_clamp() {
        let s = EngineSettings::from_config_str(
            "default_width=9999\n\
             default_height=abc\n\
             export_scale=0\n\
             max_undo_steps=0\n\
             base_cell_size=-3\n\
             no equals sign\n\
             mystery=1\n",
        );
        assert_eq!(s.default_width, MAX_SIZE);
        assert_eq!(s.default_height, DEFAULT_SIZE);
        assert_eq!(s.export_scale, 1);
        assert_eq!(s.max_undo_steps, 1);
        assert_eq!(s.base_cell_size, BASE_CELL_SIZE);
    }

    #[test]
    fn viewport_uses_configured_limits() {
        let s = EngineSettings::from_config_str("base_cell_size=10\nmax_zoom=2\n");
        let mut vp = s.viewport();
        assert_eq!(vp.cell_size(), 10.0);
        for _ in 0..10 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom(), 2.0);
    }
}
