/// YOLO dataset indexing
///
/// A dataset root holds a `data.yaml` descriptor naming the classes and the
/// train/val image directories. Each split directory contains `images/`,
/// and the matching `labels/` tree lives under the same path with "images"
/// replaced by "labels".
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::RgbImage;
use serde::Deserialize;

#[allow(unused_imports)]
use log::{debug, info, warn, error};

use crate::annotation::{read_annotations, AnnotationRow};
use crate::config::{DATASET_CONFIG_FILE, LABEL_EXTENSION};
use crate::error::{ConfigError, ItemError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Split {
    #[default]
    Train,
    Val,
}

impl Split {
    pub fn toggled(self) -> Self {
        match self {
            Split::Train => Split::Val,
            Split::Val => Split::Train,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "val" => Ok(Split::Val),
            other => Err(format!("unknown split '{}', expected 'train' or 'val'", other)),
        }
    }
}

/// Class names are either a plain list or an `id: name` mapping
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNames {
    List(Vec<String>),
    Map(BTreeMap<usize, String>),
}

#[derive(Debug, Deserialize)]
struct RawDatasetConfig {
    names: Option<RawNames>,
    train: Option<String>,
    val: Option<String>,
    nc: Option<usize>,
}

/// Parsed `data.yaml` with split directories resolved against the dataset root
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub class_names: Vec<String>,
    pub train_images_dir: PathBuf,
    pub val_images_dir: PathBuf,
    pub train_labels_dir: PathBuf,
    pub val_labels_dir: PathBuf,
}

impl DatasetConfig {
    /// Read `data.yaml` from a dataset root
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(DATASET_CONFIG_FILE);
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content, root, &path)
    }

    /// Parse descriptor text. `config_path` is only used in error messages.
    pub fn parse(content: &str, root: &Path, config_path: &Path) -> Result<Self, ConfigError> {
        let raw: RawDatasetConfig = serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
            path: config_path.to_path_buf(),
            source,
        })?;

        let missing = |key| ConfigError::MissingKey {
            path: config_path.to_path_buf(),
            key,
        };
        let names = raw.names.ok_or_else(|| missing("names"))?;
        let train = raw.train.ok_or_else(|| missing("train"))?;
        let val = raw.val.ok_or_else(|| missing("val"))?;

        let class_names = match names {
            RawNames::List(list) => list,
            RawNames::Map(map) => {
                // Mapping keys must be exactly 0..n for ids to index the list
                if let Some((pos, (id, _))) = map.iter().enumerate().find(|(pos, (id, _))| *pos != **id) {
                    return Err(ConfigError::InvalidNames {
                        path: config_path.to_path_buf(),
                        message: format!("class ids must be contiguous from 0, expected {} but found {}", pos, id),
                    });
                }
                map.into_values().collect()
            }
        };

        if let Some(nc) = raw.nc {
            if nc != class_names.len() {
                warn!("{}: nc is {} but {} class names are listed", config_path.display(), nc, class_names.len());
            }
        }

        Ok(Self {
            class_names,
            train_images_dir: root.join(&train),
            val_images_dir: root.join(&val),
            train_labels_dir: root.join(train.replace("images", "labels")),
            val_labels_dir: root.join(val.replace("images", "labels")),
        })
    }

    /// Image and label directories of a split
    pub fn split_dirs(&self, split: Split) -> (PathBuf, PathBuf) {
        let (images, labels) = match split {
            Split::Train => (&self.train_images_dir, &self.train_labels_dir),
            Split::Val => (&self.val_images_dir, &self.val_labels_dir),
        };
        (images.join("images"), labels.join("labels"))
    }
}

/// One loaded dataset entry
#[derive(Debug, Clone)]
pub struct DatasetItem {
    pub image_path: PathBuf,
    pub label_path: PathBuf,
    /// `None` when the image could not be decoded
    pub image: Option<RgbImage>,
    pub annotations: Vec<AnnotationRow>,
}

/// Ordered view over one split of a dataset
#[derive(Debug, Clone)]
pub struct DatasetIndex {
    root: PathBuf,
    config: DatasetConfig,
    split: Split,
    images_dir: PathBuf,
    labels_dir: PathBuf,
    entries: Vec<PathBuf>,
}

impl DatasetIndex {
    /// Open a dataset. `root_path` is the dataset directory or its `data.yaml`.
    pub fn open(root_path: &Path, split: Split) -> Result<Self, ConfigError> {
        let root = if root_path.is_file() {
            root_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        } else {
            root_path.to_path_buf()
        };

        let config = DatasetConfig::load(&root)?;
        info!("Opened dataset {} with {} classes", root.display(), config.class_names.len());

        let (images_dir, labels_dir) = config.split_dirs(split);
        let mut index = Self {
            root,
            config,
            split,
            images_dir,
            labels_dir,
            entries: Vec::new(),
        };
        index.refresh();
        Ok(index)
    }

    /// Change the active split without re-reading the descriptor
    pub fn switch_split(&mut self, split: Split) {
        let (images_dir, labels_dir) = self.config.split_dirs(split);
        self.split = split;
        self.images_dir = images_dir;
        self.labels_dir = labels_dir;
        self.refresh();
    }

    /// Re-list the active images directory
    pub fn refresh(&mut self) {
        self.entries = list_entries(&self.images_dir);
        debug!("{} split: {} entries in {}", self.split, self.entries.len(), self.images_dir.display());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.config.class_names
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn labels_dir(&self) -> &Path {
        &self.labels_dir
    }

    pub fn image_path(&self, index: usize) -> Option<&Path> {
        self.entries.get(index).map(PathBuf::as_path)
    }

    /// Label file belonging to an image: same name with a `.txt` extension
    pub fn label_path_for(&self, image_path: &Path) -> PathBuf {
        let file_name = image_path.file_name().map(PathBuf::from).unwrap_or_default();
        self.labels_dir.join(file_name.with_extension(LABEL_EXTENSION))
    }

    /// Load the image and annotations at `index`.
    ///
    /// An undecodable image is reported as `image: None` so the caller can
    /// show a placeholder and keep navigating.
    pub fn get(&self, index: usize) -> Result<DatasetItem, ItemError> {
        let image_path = self
            .entries
            .get(index)
            .ok_or(ItemError::OutOfRange { index, len: self.entries.len() })?
            .clone();
        let label_path = self.label_path_for(&image_path);

        let image = match image::open(&image_path) {
            Ok(img) => Some(img.into_rgb8()),
            Err(e) => {
                warn!("Failed to decode image {}: {}", image_path.display(), e);
                None
            }
        };

        let annotations = read_annotations(&label_path)?;
        debug!("Loaded {} with {} annotation(s)", image_path.display(), annotations.len());

        Ok(DatasetItem {
            image_path,
            label_path,
            image,
            annotations,
        })
    }
}

/// Every entry of a directory, in natural filename order
fn list_entries(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries.flatten().map(|entry| entry.path()).collect(),
        Err(e) => {
            warn!("Cannot list images directory {}: {}", dir.display(), e);
            Vec::new()
        }
    };

    // Sort paths like Nautilus file viewer. `paths.sort()` does not work as expected
    alphanumeric_sort::sort_path_slice(&mut paths);
    paths
}
