// Default values for configuration
// These serve as fallback values and can be used for "reset to defaults" functionality
pub const APP_NAME: &str = "yoloview";
pub const DATASET_CONFIG_FILE: &str = "data.yaml";
pub const LABEL_EXTENSION: &str = "txt";

pub const DEFAULT_DISPLAY_WIDTH: u32 = 1600;       // Size of the display surface images are fitted into
pub const DEFAULT_DISPLAY_HEIGHT: u32 = 900;
pub const DEFAULT_BOX_THICKNESS: u32 = 3;
pub const DEFAULT_LABEL_SCALE: f32 = 24.0;          // Label glyph height in pixels
pub const DEFAULT_MASK_OPACITY: f32 = 0.4;
pub const DEFAULT_COLOR_SEED: u64 = 42;

// Frame shown when an image cannot be decoded
pub const PLACEHOLDER_WIDTH: u32 = 480;
pub const PLACEHOLDER_HEIGHT: u32 = 640;
