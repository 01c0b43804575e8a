//! Line reconstruction from word-level OCR detections.
//!
//! The OCR engine reports one [`Detection`] per recognized fragment, in the
//! order its own scan produced them. [`group_lines`] walks that sequence once
//! and starts a new line whenever a fragment's left-edge vertical midpoint
//! moves more than a threshold away from the current line's anchor.
//!
//! Lines come out in the order their first fragment appeared. Two-column or
//! otherwise out-of-order engine output therefore interleaves; callers that
//! prefer geometric order can ask for [`LineOrder::Anchor`].

use serde::{Deserialize, Serialize};

/// Vertical distance, in page-image pixels, beyond which a fragment starts a
/// new line.
pub const LINE_THRESHOLD: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// Quadrilateral around a fragment, clockwise from the top-left corner:
/// top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox([Point; 4]);

impl BoundingBox {
    pub fn new(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> Self {
        BoundingBox([top_left, top_right, bottom_right, bottom_left])
    }

    /// Axis-aligned box from a `left, top, width, height` rectangle.
    pub fn from_rect(left: f64, top: f64, width: f64, height: f64) -> Self {
        let right = left + width;
        let bottom = top + height;
        BoundingBox::new(
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        )
    }

    pub fn top_left(&self) -> Point {
        self.0[0]
    }

    pub fn top_right(&self) -> Point {
        self.0[1]
    }

    pub fn bottom_right(&self) -> Point {
        self.0[2]
    }

    pub fn bottom_left(&self) -> Point {
        self.0[3]
    }

    /// Vertical midpoint of the left edge.
    pub fn left_mid_y(&self) -> f64 {
        (self.top_left().y + self.bottom_left().y) / 2.0
    }
}

/// One recognized text fragment on a page image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    pub text: String,
    /// Engine confidence. Carried through, never consulted when grouping.
    pub confidence: f64,
}

impl Detection {
    pub fn new(bounding_box: BoundingBox, text: impl Into<String>, confidence: f64) -> Self {
        Detection {
            bounding_box,
            text: text.into(),
            confidence,
        }
    }
}

/// Order in which grouped lines are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineOrder {
    /// Order in which each line's first fragment appeared in the input.
    #[default]
    FirstAppearance,
    /// Top to bottom by anchor. Lines with equal anchors keep input order.
    Anchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineOptions {
    pub threshold: f64,
    pub order: LineOrder,
}

impl Default for LineOptions {
    fn default() -> Self {
        LineOptions {
            threshold: LINE_THRESHOLD,
            order: LineOrder::FirstAppearance,
        }
    }
}

/// A reconstructed line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    /// Y-coordinate of the fragment that opened the line.
    pub anchor: f64,
}

impl Line {
    fn finish(buffer: &str, anchor: f64) -> Self {
        Line {
            text: buffer.trim().to_string(),
            anchor,
        }
    }
}

/// Group detections into lines.
///
/// Every detection lands in exactly one line. An empty input yields no lines.
/// Non-finite coordinates never compare as "far", so such a fragment joins
/// whatever line is open.
pub fn group_lines(detections: &[Detection], options: &LineOptions) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut anchor: Option<f64> = None;

    for detection in detections {
        let y = detection.bounding_box.left_mid_y();

        match anchor {
            None => anchor = Some(y),
            Some(open) if (y - open).abs() > options.threshold => {
                lines.push(Line::finish(&current, open));
                current.clear();
                anchor = Some(y);
            }
            Some(_) => {}
        }

        current.push_str(&detection.text);
        current.push(' ');
    }

    if let Some(open) = anchor {
        lines.push(Line::finish(&current, open));
    }

    if options.order == LineOrder::Anchor {
        lines.sort_by(|a, b| a.anchor.total_cmp(&b.anchor));
    }

    lines
}

/// Rebuild the text lines of one page with the default threshold and
/// first-appearance ordering.
pub fn reconstruct_lines(detections: &[Detection]) -> Vec<String> {
    group_lines(detections, &LineOptions::default())
        .into_iter()
        .map(|line| line.text)
        .collect()
}
