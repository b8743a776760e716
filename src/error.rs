/// Error types for dataset loading and item access
///
/// Config errors are fatal to opening a dataset. Item errors are local to a
/// single fetch and never invalidate the open dataset.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read dataset config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("dataset config {path} is missing required key '{key}'")]
    MissingKey { path: PathBuf, key: &'static str },

    #[error("dataset config {path} has invalid class names: {message}")]
    InvalidNames { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("failed to read label file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{location}: expected at least 5 values, found {found}")]
    TooFewFields { location: LineLocation, found: usize },

    #[error("{location}: '{value}' is not a number")]
    InvalidNumber { location: LineLocation, value: String },

    #[error("{location}: '{value}' is not a valid class id")]
    InvalidClassId { location: LineLocation, value: String },

    #[error("{location}: polygon has an odd number of coordinates ({count})")]
    OddPolygon { location: LineLocation, count: usize },
}

impl AnnotationError {
    /// Attach the label file path to an error produced by the line parser.
    pub(crate) fn in_file(mut self, path: &std::path::Path) -> Self {
        match &mut self {
            AnnotationError::TooFewFields { location, .. }
            | AnnotationError::InvalidNumber { location, .. }
            | AnnotationError::InvalidClassId { location, .. }
            | AnnotationError::OddPolygon { location, .. } => {
                location.path = Some(path.to_path_buf());
            }
            AnnotationError::Io { .. } => {}
        }
        self
    }
}

/// Where a malformed annotation line came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineLocation {
    pub path: Option<PathBuf>,
    /// 1-based
    pub line: usize,
}

impl std::fmt::Display for LineLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}:{}", path.display(), self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

#[derive(Debug, Error)]
pub enum ItemError {
    #[error("index {index} is out of range for {len} item(s)")]
    OutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Annotation(#[from] AnnotationError),
}
