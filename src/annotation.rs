/// YOLO annotation parsing and denormalization
///
/// Each label file holds one object per line:
/// `class_id x_center y_center width height [x1 y1 x2 y2 ...]`
/// with every coordinate normalized to [0, 1] relative to the image size.
/// Values past the first five are a flattened segmentation polygon.
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

#[allow(unused_imports)]
use log::{debug, warn};

use crate::error::{AnnotationError, LineLocation};

/// One annotated object, in normalized coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRow {
    pub class_id: usize,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    /// Empty when the row is a plain bounding box
    pub polygon: Vec<(f64, f64)>,
}

/// An annotation converted to pixel space, ready to be painted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderableBox {
    pub class_id: usize,
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub mask: Vec<(i32, i32)>,
}

impl AnnotationRow {
    pub fn has_polygon(&self) -> bool {
        !self.polygon.is_empty()
    }
}

/// Parse a single annotation line.
///
/// Returns `Ok(None)` for blank lines. `line_number` is 1-based and only
/// used for error reporting.
pub fn parse_line(line: &str, line_number: usize) -> Result<Option<AnnotationRow>, AnnotationError> {
    let location = || LineLocation { path: None, line: line_number };

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.is_empty() {
        return Ok(None);
    }
    if fields.len() < 5 {
        return Err(AnnotationError::TooFewFields {
            location: location(),
            found: fields.len(),
        });
    }

    let mut values = Vec::with_capacity(fields.len());
    for field in &fields {
        let value = field
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| AnnotationError::InvalidNumber {
                location: location(),
                value: field.to_string(),
            })?;
        values.push(value);
    }

    // Class ids are written as integers but tools often emit "0.0"
    let raw_class = values[0];
    if raw_class < 0.0 || raw_class.fract() != 0.0 {
        return Err(AnnotationError::InvalidClassId {
            location: location(),
            value: fields[0].to_string(),
        });
    }

    let extra = &values[5..];
    if extra.len() % 2 != 0 {
        return Err(AnnotationError::OddPolygon {
            location: location(),
            count: extra.len(),
        });
    }

    Ok(Some(AnnotationRow {
        class_id: raw_class as usize,
        x_center: values[1],
        y_center: values[2],
        width: values[3],
        height: values[4],
        polygon: extra.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect(),
    }))
}

/// Parse every line of an annotation document.
pub fn parse_annotations<R: BufRead>(reader: R) -> Result<Vec<AnnotationRow>, AnnotationError> {
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| AnnotationError::Io {
            path: Default::default(),
            source,
        })?;
        if let Some(row) = parse_line(&line, idx + 1)? {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Read the label file for one image.
///
/// A missing file is an unlabeled image and yields no rows.
pub fn read_annotations(path: &Path) -> Result<Vec<AnnotationRow>, AnnotationError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No label file at {}, treating image as unlabeled", path.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(AnnotationError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    parse_annotations(BufReader::new(file)).map_err(|e| match e {
        AnnotationError::Io { source, .. } => AnnotationError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => other.in_file(path),
    })
}

/// Convert a normalized row into pixel coordinates for an image of
/// `(width, height)`.
///
/// Corners are `center ± size / 2`, truncated toward zero.
pub fn decode_row(image_dimensions: (u32, u32), row: &AnnotationRow) -> RenderableBox {
    let (width, height) = (image_dimensions.0 as f64, image_dimensions.1 as f64);

    let x_center = row.x_center * width;
    let y_center = row.y_center * height;
    let box_width = row.width * width;
    let box_height = row.height * height;

    let mask = row
        .polygon
        .iter()
        .map(|&(x, y)| ((x * width) as i32, (y * height) as i32))
        .collect();

    RenderableBox {
        class_id: row.class_id,
        x1: (x_center - box_width / 2.0) as i32,
        y1: (y_center - box_height / 2.0) as i32,
        x2: (x_center + box_width / 2.0) as i32,
        y2: (y_center + box_height / 2.0) as i32,
        mask,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn row(class_id: usize, xc: f64, yc: f64, w: f64, h: f64) -> AnnotationRow {
        AnnotationRow {
            class_id,
            x_center: xc,
            y_center: yc,
            width: w,
            height: h,
            polygon: vec![],
        }
    }

    #[test]
    fn test_decode_centered_box() {
        let decoded = decode_row((100, 200), &row(0, 0.5, 0.5, 0.5, 0.5));
        assert_eq!(
            (decoded.x1, decoded.y1, decoded.x2, decoded.y2),
            (25, 50, 75, 150)
        );
        assert!(decoded.mask.is_empty());
    }

    #[test]
    fn test_decode_truncates_toward_zero() {
        // 0.5 * 33 = 16.5, half width 0.1 * 33 / 2 = 1.65
        let decoded = decode_row((33, 33), &row(2, 0.5, 0.5, 0.1, 0.1));
        assert_eq!(decoded.class_id, 2);
        assert_eq!((decoded.x1, decoded.x2), (14, 18));
        // Negative values truncate toward zero as well
        let decoded = decode_row((10, 10), &row(0, 0.0, 0.0, 0.25, 0.25));
        assert_eq!((decoded.x1, decoded.y1), (-1, -1));
    }

    #[test]
    fn test_decode_polygon() {
        let parsed = parse_line("0 0.5 0.5 0.2 0.2 0.4 0.4 0.6 0.4 0.5 0.6", 1)
            .unwrap()
            .unwrap();
        assert!(parsed.has_polygon());
        let decoded = decode_row((10, 10), &parsed);
        assert_eq!(decoded.mask, vec![(4, 4), (6, 4), (5, 6)]);
    }

    #[test]
    fn test_parse_plain_box() {
        let parsed = parse_line("1 0.5 0.25 0.4 0.6", 1).unwrap().unwrap();
        assert_eq!(parsed, row(1, 0.5, 0.25, 0.4, 0.6));
    }

    #[test]
    fn test_parse_accepts_float_class_id_and_extra_whitespace() {
        let parsed = parse_line("  3.0\t0.1  0.2 0.3 0.4  ", 1).unwrap().unwrap();
        assert_eq!(parsed.class_id, 3);
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse_line("   ", 4).unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_short_line() {
        let err = parse_line("0 0.5 0.5 0.1", 7).unwrap_err();
        match err {
            AnnotationError::TooFewFields { location, found } => {
                assert_eq!(location.line, 7);
                assert_eq!(found, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(matches!(
            parse_line("0 0.5 abc 0.1 0.1", 1),
            Err(AnnotationError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_line("-1 0.5 0.5 0.1 0.1", 1),
            Err(AnnotationError::InvalidClassId { .. })
        ));
        assert!(matches!(
            parse_line("1.5 0.5 0.5 0.1 0.1", 1),
            Err(AnnotationError::InvalidClassId { .. })
        ));
        assert!(matches!(
            parse_line("0 0.5 0.5 0.1 0.1 0.2 0.3 0.4", 1),
            Err(AnnotationError::OddPolygon { count: 3, .. })
        ));
    }

    #[test]
    fn test_parse_rejects_non_finite_values() {
        for line in ["0 0.5 0.5 inf 0.1", "0 NaN 0.5 0.1 0.1", "0 0.5 0.5 0.1 0.1 -inf 0.2", "inf 0.5 0.5 0.1 0.1"] {
            assert!(
                matches!(parse_line(line, 3), Err(AnnotationError::InvalidNumber { .. })),
                "accepted {line:?}"
            );
        }
        // Large but finite values are kept and clamped at draw time
        assert!(parse_line("0 0.5 0.5 0.1 1e12", 1).unwrap().is_some());
    }

    #[test]
    fn test_parse_annotations_skips_blank_lines() {
        let text = "0 0.5 0.5 0.4 0.6\n\n1 0.1 0.1 0.1 0.1\n";
        let rows = parse_annotations(Cursor::new(text)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].class_id, 1);
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let rows = read_annotations(&dir.path().join("missing.txt")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_read_malformed_file_reports_path_and_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img1.txt");
        std::fs::write(&path, "0 0.5 0.5 0.4 0.6\n0 0.5\n").unwrap();

        let err = read_annotations(&path).unwrap_err();
        match err {
            AnnotationError::TooFewFields { location, .. } => {
                assert_eq!(location.path.as_deref(), Some(path.as_path()));
                assert_eq!(location.line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
