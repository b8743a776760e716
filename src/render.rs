/// Annotation overlay rendering
///
/// Paints decoded YOLO annotations onto an RGB frame: segmentation masks
/// first, then the box outline and its class label on top. The finished
/// frame is shrunk to the display region when it does not fit.
use std::fs;
use std::path::Path;

use ab_glyph::FontVec;
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_polygon_mut, draw_text_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[allow(unused_imports)]
use log::{debug, info, warn, error};

use crate::annotation::{decode_row, AnnotationRow, RenderableBox};
use crate::config::{PLACEHOLDER_HEIGHT, PLACEHOLDER_WIDTH};
use crate::settings::UserSettings;

/// Color used for class ids missing from the class list
pub const FALLBACK_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

static BUNDLED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// How a frame larger than the display region is shrunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// Independent x/y factors, the frame exactly fills the display
    #[default]
    Stretch,
    /// One factor for both axes, the frame fits inside the display
    Fit,
}

/// Per-class colors drawn from a seeded generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    seed: u64,
    colors: Vec<Rgb<u8>>,
}

impl ColorTable {
    pub fn new(class_count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let colors = (0..class_count)
            .map(|_| {
                Rgb([
                    rng.gen_range(0..=255u8),
                    rng.gen_range(0..=255u8),
                    rng.gen_range(0..=255u8),
                ])
            })
            .collect();
        Self { seed, colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn get(&self, class_id: usize) -> Option<Rgb<u8>> {
        self.colors.get(class_id).copied()
    }

    /// Whether this table was built for `(class_count, seed)`
    pub fn matches(&self, class_count: usize, seed: u64) -> bool {
        self.colors.len() == class_count && self.seed == seed
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub box_thickness: u32,
    pub label_scale: f32,
    pub mask_opacity: f32,
    pub color_seed: u64,
    pub scale_mode: ScaleMode,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&UserSettings::default())
    }
}

impl From<&UserSettings> for RenderOptions {
    fn from(settings: &UserSettings) -> Self {
        Self {
            box_thickness: settings.box_thickness.max(1),
            label_scale: settings.label_scale,
            mask_opacity: settings.mask_opacity.clamp(0.0, 1.0),
            color_seed: settings.color_seed,
            scale_mode: settings.get_scale_mode(),
        }
    }
}

pub struct AnnotationRenderer {
    options: RenderOptions,
    names: Vec<String>,
    colors: ColorTable,
    font: Option<FontVec>,
}

impl AnnotationRenderer {
    pub fn new(options: RenderOptions, font: Option<FontVec>) -> Self {
        Self {
            colors: ColorTable::new(0, options.color_seed),
            options,
            names: Vec::new(),
            font,
        }
    }

    /// Build a renderer from user settings, loading the label font
    pub fn from_settings(settings: &UserSettings) -> Self {
        let font = load_font(settings.font_path.as_deref());
        Self::new(RenderOptions::from(settings), font)
    }

    /// Install the class list of a newly opened dataset.
    ///
    /// The color table is only regenerated when the class count changes.
    pub fn set_classes(&mut self, names: &[String]) {
        self.names = names.to_vec();
        if !self.colors.matches(names.len(), self.options.color_seed) {
            self.colors = ColorTable::new(names.len(), self.options.color_seed);
            debug!("Built color table for {} classes (seed {})", names.len(), self.options.color_seed);
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn colors(&self) -> &ColorTable {
        &self.colors
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn color_for(&self, class_id: usize) -> Rgb<u8> {
        self.colors.get(class_id).unwrap_or(FALLBACK_COLOR)
    }

    pub fn label_for(&self, class_id: usize) -> String {
        self.names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class {}", class_id))
    }

    /// Draw every annotation onto `image` and fit the result into `target_size`.
    pub fn render(&self, mut image: RgbImage, annotations: &[AnnotationRow], target_size: (u32, u32)) -> RgbImage {
        let dimensions = image.dimensions();

        for row in annotations {
            let decoded = clamp_to_canvas(decode_row(dimensions, row), dimensions, self.options.box_thickness);
            if decoded.class_id >= self.names.len() {
                warn!("Annotation references class {} but only {} classes are defined",
                    decoded.class_id, self.names.len());
            }
            self.draw_annotation(&mut image, &decoded);
        }

        fit_to_display(image, target_size, self.options.scale_mode)
    }

    fn draw_annotation(&self, image: &mut RgbImage, decoded: &RenderableBox) {
        let color = self.color_for(decoded.class_id);

        if !decoded.mask.is_empty() {
            fill_polygon(image, &decoded.mask, color, self.options.mask_opacity);
        }

        draw_box(image, decoded, color, self.options.box_thickness);

        if let Some(font) = &self.font {
            let label = self.label_for(decoded.class_id);
            let scale = self.options.label_scale;
            let mut y = decoded.y1.saturating_sub(scale.ceil() as i32).saturating_sub(5);
            if y < 0 {
                // No room above the box, draw inside it
                y = decoded.y1.saturating_add(self.options.box_thickness as i32);
            }
            draw_text_mut(image, color, decoded.x1, y, scale, font, &label);
        }
    }
}

/// Pull corners and mask points that lie far off the image back to a band
/// just outside it, so stroke and fill arithmetic stays within `i32`.
/// Anything in the band is clipped by the drawing routines.
pub fn clamp_to_canvas(mut decoded: RenderableBox, dimensions: (u32, u32), thickness: u32) -> RenderableBox {
    let margin = thickness.max(1) as i64 + 1;
    let clamp_x = |x: i32| (x as i64).clamp(-margin, dimensions.0 as i64 + margin) as i32;
    let clamp_y = |y: i32| (y as i64).clamp(-margin, dimensions.1 as i64 + margin) as i32;

    decoded.x1 = clamp_x(decoded.x1);
    decoded.x2 = clamp_x(decoded.x2);
    decoded.y1 = clamp_y(decoded.y1);
    decoded.y2 = clamp_y(decoded.y2);
    for point in decoded.mask.iter_mut() {
        *point = (clamp_x(point.0), clamp_y(point.1));
    }
    decoded
}

/// Outline a box with a stroke of `thickness` pixels centered on its edges
pub fn draw_box(image: &mut RgbImage, decoded: &RenderableBox, color: Rgb<u8>, thickness: u32) {
    let (x1, x2) = (decoded.x1.min(decoded.x2), decoded.x1.max(decoded.x2));
    let (y1, y2) = (decoded.y1.min(decoded.y2), decoded.y1.max(decoded.y2));
    let thickness = thickness.max(1) as i32;
    let inner = (thickness - 1) / 2;

    for offset in -inner..(thickness - inner) {
        let width = x2 - x1 + 1 + 2 * offset;
        let height = y2 - y1 + 1 + 2 * offset;
        if width <= 0 || height <= 0 {
            continue;
        }
        let rect = Rect::at(x1 - offset, y1 - offset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, rect, color);
    }
}

/// Reduce a polygon to its exterior ring: drop repeated consecutive
/// vertices and the closing vertex. Fewer than three vertices is no area.
pub fn exterior_ring(points: &[(i32, i32)]) -> Option<Vec<Point<i32>>> {
    let mut ring: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for &(x, y) in points {
        let point = Point::new(x, y);
        if ring.last() != Some(&point) {
            ring.push(point);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    (ring.len() >= 3).then_some(ring)
}

/// Fill a polygon with `color` blended over the image at `opacity`
pub fn fill_polygon(image: &mut RgbImage, points: &[(i32, i32)], color: Rgb<u8>, opacity: f32) {
    let Some(ring) = exterior_ring(points) else {
        debug!("Skipping degenerate mask with {} point(s)", points.len());
        return;
    };

    let (width, height) = image.dimensions();
    let mut mask = GrayImage::new(width, height);
    draw_polygon_mut(&mut mask, &ring, Luma([255u8]));

    for (x, y, coverage) in mask.enumerate_pixels() {
        if coverage[0] == 0 {
            continue;
        }
        let pixel = image.get_pixel_mut(x, y);
        for c in 0..3 {
            let blended = color[c] as f32 * opacity + pixel[c] as f32 * (1.0 - opacity);
            pixel[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Shrink `image` when it exceeds `target` in either axis
pub fn fit_to_display(image: RgbImage, target: (u32, u32), mode: ScaleMode) -> RgbImage {
    let (width, height) = image.dimensions();
    let (target_width, target_height) = target;

    if width <= target_width && height <= target_height {
        return image;
    }
    if target_width == 0 || target_height == 0 {
        warn!("Display size {}x{} is empty, frame left unscaled", target_width, target_height);
        return image;
    }

    let (new_width, new_height) = match mode {
        ScaleMode::Stretch => (target_width, target_height),
        ScaleMode::Fit => {
            let scale = (target_width as f64 / width as f64).min(target_height as f64 / height as f64);
            (
                ((width as f64 * scale).round() as u32).clamp(1, target_width),
                ((height as f64 * scale).round() as u32).clamp(1, target_height),
            )
        }
    };

    debug!("Scaling frame {}x{} -> {}x{}", width, height, new_width, new_height);
    imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}

/// Blank frame shown in place of an image that failed to decode
pub fn placeholder() -> RgbImage {
    RgbImage::new(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT)
}

/// Load the label font from `custom_path`, falling back to the bundled
/// DejaVu Sans
pub fn load_font(custom_path: Option<&Path>) -> Option<FontVec> {
    if let Some(path) = custom_path {
        match fs::read(path).map(FontVec::try_from_vec) {
            Ok(Ok(font)) => {
                info!("Using label font {}", path.display());
                return Some(font);
            }
            Ok(Err(e)) => warn!("Invalid font file {}: {}", path.display(), e),
            Err(e) => warn!("Failed to read font {}: {}", path.display(), e),
        }
    }

    match FontVec::try_from_vec(BUNDLED_FONT.to_vec()) {
        Ok(font) => Some(font),
        Err(e) => {
            error!("Bundled font is unreadable, class labels will not be drawn: {}", e);
            None
        }
    }
}
