use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, info, warn, error};

use crate::config::*;
use crate::dataset::Split;
use crate::render::ScaleMode;

/// User-specific settings that persist across sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Width of the display surface rendered frames are fitted into
    #[serde(default = "default_display_width")]
    pub display_width: u32,

    /// Height of the display surface rendered frames are fitted into
    #[serde(default = "default_display_height")]
    pub display_height: u32,

    /// Stroke width of bounding boxes in pixels
    #[serde(default = "default_box_thickness")]
    pub box_thickness: u32,

    /// Label text height in pixels
    #[serde(default = "default_label_scale")]
    pub label_scale: f32,

    /// Opacity of polygon mask fills, 0.0 to 1.0
    #[serde(default = "default_mask_opacity")]
    pub mask_opacity: f32,

    /// Seed of the per-class color table
    #[serde(default = "default_color_seed")]
    pub color_seed: u64,

    /// Downscaling mode: "stretch" or "fit"
    #[serde(default = "default_scale_mode")]
    pub scale_mode: String,

    /// TrueType font used for class labels
    #[serde(default)]
    pub font_path: Option<PathBuf>,

    /// Split opened when a dataset is selected: "train" or "val"
    #[serde(default = "default_split")]
    pub default_split: String,
}

fn default_display_width() -> u32 {
    DEFAULT_DISPLAY_WIDTH
}

fn default_display_height() -> u32 {
    DEFAULT_DISPLAY_HEIGHT
}

fn default_box_thickness() -> u32 {
    DEFAULT_BOX_THICKNESS
}

fn default_label_scale() -> f32 {
    DEFAULT_LABEL_SCALE
}

fn default_mask_opacity() -> f32 {
    DEFAULT_MASK_OPACITY
}

fn default_color_seed() -> u64 {
    DEFAULT_COLOR_SEED
}

fn default_scale_mode() -> String {
    "stretch".to_string()
}

fn default_split() -> String {
    "train".to_string()
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            display_width: DEFAULT_DISPLAY_WIDTH,
            display_height: DEFAULT_DISPLAY_HEIGHT,
            box_thickness: DEFAULT_BOX_THICKNESS,
            label_scale: DEFAULT_LABEL_SCALE,
            mask_opacity: DEFAULT_MASK_OPACITY,
            color_seed: DEFAULT_COLOR_SEED,
            scale_mode: default_scale_mode(),
            font_path: None,
            default_split: default_split(),
        }
    }
}

impl UserSettings {
    /// Get the path to the settings file
    /// On macOS: ~/Library/Application Support/yoloview/settings.yaml
    /// On Linux: ~/.config/yoloview/settings.yaml
    /// On Windows: C:\Users\<user>\AppData\Roaming\yoloview\settings.yaml
    pub fn settings_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."));

        config_dir.join(APP_NAME).join("settings.yaml")
    }

    /// Load settings from the YAML file
    /// If custom_path is provided, uses that path; otherwise uses the default settings path
    pub fn load(custom_path: Option<&Path>) -> Self {
        let path = match custom_path {
            Some(p) => {
                info!("Using custom settings path: {}", p.display());
                p.to_path_buf()
            }
            None => Self::settings_path(),
        };

        if !path.exists() {
            info!("Settings file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_yaml(&contents) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    debug!("Settings: display={}x{}, scale_mode={}, seed={}",
                        settings.display_width, settings.display_height, settings.scale_mode, settings.color_seed);
                    settings
                }
                Err(e) => {
                    error!("Failed to parse settings file at {:?}: {}", path, e);
                    warn!("Using default settings");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read settings file at {:?}: {}", path, e);
                warn!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes to unit, not to a map
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str::<UserSettings>(contents)
    }

    /// Save settings to `path`, or to the default settings path
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, String> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::settings_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create settings directory: {}", e))?;
            }
        }

        fs::write(&path, self.to_yaml_with_comments())
            .map_err(|e| format!("Failed to write settings file: {}", e))?;

        info!("Saved settings to {:?}", path);
        Ok(path)
    }

    /// Generate YAML content with comments
    fn to_yaml_with_comments(&self) -> String {
        let font_line = match &self.font_path {
            Some(p) => format!("font_path: {:?}", p.display().to_string()),
            None => "# font_path: \"/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf\"".to_string(),
        };

        format!(
            r#"# yoloview User Settings
# This file is loaded automatically when the application starts.
# Settings specified here will override the default values.

# Size of the display surface annotated frames are fitted into
display_width: {}
display_height: {}

# Bounding box stroke width in pixels
box_thickness: {}

# Class label text height in pixels
label_scale: {}

# Opacity of segmentation mask fills (0.0 - 1.0)
mask_opacity: {}

# Seed of the per-class color table. Changing it reshuffles class colors.
color_seed: {}

# How frames larger than the display are shrunk
# - "stretch": scale each axis independently to exactly fill the display
# - "fit": keep the aspect ratio and fit inside the display
scale_mode: "{}"

# TrueType font for class labels. When unset, the bundled DejaVu Sans is used.
{}

# Split opened when a dataset is selected: "train" or "val"
default_split: "{}"
"#,
            self.display_width,
            self.display_height,
            self.box_thickness,
            self.label_scale,
            self.mask_opacity,
            self.color_seed,
            self.scale_mode,
            font_line,
            self.default_split,
        )
    }

    /// Convert scale_mode string to ScaleMode enum
    pub fn get_scale_mode(&self) -> ScaleMode {
        match self.scale_mode.to_lowercase().as_str() {
            "stretch" => ScaleMode::Stretch,
            "fit" => ScaleMode::Fit,
            _ => {
                warn!("Unknown scale mode '{}', defaulting to stretch", self.scale_mode);
                ScaleMode::Stretch
            }
        }
    }

    /// Convert default_split string to Split enum
    pub fn get_default_split(&self) -> Split {
        self.default_split.parse().unwrap_or_else(|_| {
            warn!("Unknown split '{}', defaulting to train", self.default_split);
            Split::Train
        })
    }

    pub fn display_size(&self) -> (u32, u32) {
        (self.display_width, self.display_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let settings = UserSettings::from_yaml("display_width: 800\nscale_mode: fit\n").unwrap();
        assert_eq!(settings.display_width, 800);
        assert_eq!(settings.display_height, DEFAULT_DISPLAY_HEIGHT);
        assert_eq!(settings.color_seed, DEFAULT_COLOR_SEED);
        assert_eq!(settings.get_scale_mode(), ScaleMode::Fit);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(UserSettings::from_yaml("").unwrap(), UserSettings::default());
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let settings = UserSettings {
            scale_mode: "zoom".to_string(),
            default_split: "test".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.get_scale_mode(), ScaleMode::Stretch);
        assert_eq!(settings.get_default_split(), Split::Train);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.yaml");
        let settings = UserSettings {
            display_width: 640,
            mask_opacity: 0.25,
            font_path: Some(PathBuf::from("/tmp/font.ttf")),
            default_split: "val".to_string(),
            ..Default::default()
        };

        settings.save(Some(&path)).unwrap();
        let loaded = UserSettings::load(Some(&path));
        assert_eq!(loaded, settings);
        assert_eq!(loaded.get_default_split(), Split::Val);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = UserSettings::load(Some(&dir.path().join("nope.yaml")));
        assert_eq!(loaded, UserSettings::default());
    }
}
