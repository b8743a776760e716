//! Browse YOLO object-detection datasets with box and mask overlays.
//!
//! [`DatasetIndex`] resolves a dataset split into ordered image/label pairs,
//! [`AnnotationRenderer`] paints decoded annotations onto a frame, and
//! [`ViewerSession`] ties them together behind the operations a front end
//! calls: select a dataset, toggle the split, step, render.

pub mod annotation;
pub mod build_info;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod render;
pub mod session;
pub mod settings;

pub use annotation::{decode_row, parse_line, read_annotations, AnnotationRow, RenderableBox};
pub use dataset::{DatasetConfig, DatasetIndex, DatasetItem, Split};
pub use error::{AnnotationError, ConfigError, ItemError};
pub use render::{AnnotationRenderer, ColorTable, RenderOptions, ScaleMode};
pub use session::{Frame, ViewerSession};
pub use settings::UserSettings;
