/// Viewer session state
///
/// Holds everything a front end needs between events: the open dataset,
/// the renderer with its class colors, and the cursor position. Front ends
/// own one session and pass it to their event handlers.
use std::path::{Path, PathBuf};

use image::RgbImage;

#[allow(unused_imports)]
use log::{debug, info, warn, error};

use crate::dataset::{DatasetIndex, Split};
use crate::error::{ConfigError, ItemError};
use crate::render::{placeholder, AnnotationRenderer};
use crate::settings::UserSettings;

/// A rendered display frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub image_path: PathBuf,
    pub index: usize,
    pub annotation_count: usize,
    /// The source image failed to decode and a blank frame is shown
    pub is_placeholder: bool,
}

pub struct ViewerSession {
    dataset: Option<DatasetIndex>,
    renderer: AnnotationRenderer,
    index: usize,
    default_split: Split,
}

impl ViewerSession {
    pub fn new(settings: &UserSettings) -> Self {
        Self::with_renderer(AnnotationRenderer::from_settings(settings), settings.get_default_split())
    }

    pub fn with_renderer(renderer: AnnotationRenderer, default_split: Split) -> Self {
        Self {
            dataset: None,
            renderer,
            index: 0,
            default_split,
        }
    }

    /// Open a dataset, replacing the current one.
    ///
    /// On failure the session keeps whatever it had before.
    pub fn select_dataset(&mut self, root: &Path, split: Option<Split>) -> Result<(), ConfigError> {
        let split = split.unwrap_or(self.default_split);
        let dataset = DatasetIndex::open(root, split)?;
        self.renderer.set_classes(dataset.names());
        self.dataset = Some(dataset);
        self.index = 0;
        info!("Dataset selected: {}", self.status());
        Ok(())
    }

    pub fn set_split(&mut self, split: Split) {
        if let Some(dataset) = self.dataset.as_mut() {
            dataset.switch_split(split);
            self.index = 0;
            info!("Switched to {} split ({} items)", split, dataset.len());
        }
    }

    pub fn toggle_split(&mut self) {
        if let Some(split) = self.split() {
            self.set_split(split.toggled());
        }
    }

    /// Step forward. Returns false at the last item or with no dataset.
    pub fn next(&mut self) -> bool {
        if self.index + 1 < self.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Step backward. Returns false at the first item or with no dataset.
    pub fn prev(&mut self) -> bool {
        if self.index > 0 && !self.is_empty() {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to `index`, clamped to the last item
    pub fn seek(&mut self, index: usize) -> usize {
        self.index = index.min(self.len().saturating_sub(1));
        self.index
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.dataset.as_ref().map_or(0, DatasetIndex::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn split(&self) -> Option<Split> {
        self.dataset.as_ref().map(DatasetIndex::split)
    }

    pub fn dataset(&self) -> Option<&DatasetIndex> {
        self.dataset.as_ref()
    }

    pub fn renderer(&self) -> &AnnotationRenderer {
        &self.renderer
    }

    /// Render the item under the cursor into a `target` sized surface.
    ///
    /// Returns `Ok(None)` when there is nothing to show.
    pub fn render_current(&self, target: (u32, u32)) -> Result<Option<Frame>, ItemError> {
        let Some(dataset) = self.dataset.as_ref() else {
            return Ok(None);
        };
        if dataset.is_empty() {
            return Ok(None);
        }

        let item = dataset.get(self.index)?;
        let annotation_count = item.annotations.len();
        let (source, is_placeholder) = match item.image {
            Some(image) => (image, false),
            None => (placeholder(), true),
        };
        let image = self.renderer.render(source, &item.annotations, target);

        Ok(Some(Frame {
            image,
            image_path: item.image_path,
            index: self.index,
            annotation_count,
            is_placeholder,
        }))
    }

    /// One-line description of the current position
    pub fn status(&self) -> String {
        match self.dataset.as_ref() {
            None => "No dataset".to_string(),
            Some(dataset) if dataset.is_empty() => format!("{} 0/0", dataset.split()),
            Some(dataset) => {
                let name = dataset
                    .image_path(self.index)
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                format!("{} {}/{} {}", dataset.split(), self.index + 1, dataset.len(), name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::write_dataset;
    use crate::render::RenderOptions;
    use std::fs;

    fn session() -> ViewerSession {
        ViewerSession::with_renderer(AnnotationRenderer::new(RenderOptions::default(), None), Split::Train)
    }

    #[test]
    fn test_no_dataset_is_inert() {
        let mut s = session();
        assert!(!s.next());
        assert!(!s.prev());
        s.toggle_split();
        assert_eq!(s.split(), None);
        assert!(s.render_current((100, 100)).unwrap().is_none());
        assert_eq!(s.status(), "No dataset");
    }

    #[test]
    fn test_navigation_bounds() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path(), &["cat"], &[("a.png", None), ("b.png", None), ("c.png", None)], &[]);
        let mut s = session();
        s.select_dataset(dir.path(), None).unwrap();

        assert!(!s.prev());
        assert_eq!(s.index(), 0);
        assert!(s.next());
        assert!(s.next());
        assert_eq!(s.index(), 2);
        assert!(!s.next());
        assert_eq!(s.index(), 2);
        assert!(s.prev());
        assert_eq!(s.index(), 1);
        assert_eq!(s.seek(10), 2);
        assert_eq!(s.status(), "train 3/3 c.png");
    }

    #[test]
    fn test_toggle_split_resets_cursor() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(
            dir.path(),
            &["cat"],
            &[("a.png", None), ("b.png", None)],
            &[("c.png", None), ("d.png", None), ("e.png", None)],
        );
        let mut s = session();
        s.select_dataset(dir.path(), Some(Split::Train)).unwrap();
        s.next();
        assert_eq!(s.index(), 1);

        s.toggle_split();
        assert_eq!(s.split(), Some(Split::Val));
        assert_eq!(s.index(), 0);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_failed_selection_keeps_previous_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path(), &["cat"], &[("a.png", None)], &[]);
        let mut s = session();
        s.select_dataset(dir.path(), None).unwrap();

        let empty = tempfile::tempdir().unwrap();
        assert!(s.select_dataset(empty.path(), None).is_err());
        assert_eq!(s.len(), 1);
        assert_eq!(s.dataset().unwrap().root(), dir.path());
    }

    #[test]
    fn test_render_every_item() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(
            dir.path(),
            &["cat", "dog"],
            &[
                ("img1.jpg", Some("0 0.5 0.5 0.4 0.6\n")),
                ("img2.png", Some("1 0.2 0.2 0.1 0.1 0.1 0.1 0.3 0.1 0.2 0.3\n")),
                ("img3.png", None),
            ],
            &[],
        );
        let mut s = session();
        s.select_dataset(dir.path(), None).unwrap();

        // Source images are 100x200
        let mut seen = 0;
        loop {
            let frame = s.render_current((50, 50)).unwrap().unwrap();
            assert_eq!(frame.image.dimensions(), (50, 50));
            assert!(!frame.is_placeholder);
            seen += 1;
            if !s.next() {
                break;
            }
        }
        assert_eq!(seen, 3);

        s.seek(0);
        let frame = s.render_current((1600, 900)).unwrap().unwrap();
        assert_eq!(frame.image.dimensions(), (100, 200));
        assert_eq!(frame.annotation_count, 1);
        let cat = s.renderer().color_for(0);
        assert_eq!(*frame.image.get_pixel(30, 100), cat);
    }

    #[test]
    fn test_broken_image_renders_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path(), &["cat"], &[], &[]);
        fs::write(dir.path().join("train/images/broken.png"), b"garbage").unwrap();
        fs::write(dir.path().join("train/labels/broken.txt"), "0 0.5 0.5 0.5 0.5\n").unwrap();

        let mut s = session();
        s.select_dataset(dir.path(), None).unwrap();
        let frame = s.render_current((1600, 900)).unwrap().unwrap();
        assert!(frame.is_placeholder);
        assert_eq!(frame.image.dimensions(), placeholder().dimensions());
        assert_eq!(frame.annotation_count, 1);
        // Box on the 480x640 blank is (120, 160) - (360, 480)
        assert_eq!(*frame.image.get_pixel(120, 320), s.renderer().color_for(0));

        let frame = s.render_current((200, 200)).unwrap().unwrap();
        assert!(frame.is_placeholder);
        assert_eq!(frame.image.dimensions(), (200, 200));
    }

    #[test]
    fn test_malformed_label_surfaces_error_and_navigation_continues() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(
            dir.path(),
            &["cat"],
            &[("a.png", Some("0 0.5\n")), ("b.png", Some("0 0.5 0.5 0.2 0.2\n"))],
            &[],
        );
        let mut s = session();
        s.select_dataset(dir.path(), None).unwrap();

        assert!(matches!(s.render_current((100, 100)), Err(ItemError::Annotation(_))));
        assert!(s.next());
        assert!(s.render_current((100, 100)).unwrap().is_some());
    }

    #[test]
    fn test_colors_identical_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path(), &["cat", "dog", "bird"], &[("a.png", None)], &[]);
        let mut first = session();
        let mut second = session();
        first.select_dataset(dir.path(), None).unwrap();
        second.select_dataset(dir.path(), None).unwrap();
        assert_eq!(first.renderer().colors(), second.renderer().colors());
    }
}
