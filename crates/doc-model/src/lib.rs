//! Page annotation data model.
//!
//! All geometry is stored in page-bitmap space: pixel coordinates of one
//! rendered page, origin at the top-left, y growing downward.

mod annotation;
mod settings;
mod store;

pub use annotation::{Annotation, HighlightAnnotation, StrokeAnnotation};
pub use settings::{HighlightStyle, MarkerStyle, Settings, MAX_RENDER_SCALE};
pub use store::AnnotationStore;

use serde::{Deserialize, Serialize};

/// Zero-based page index within the loaded document.
pub type PageIndex = u32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMode {
    #[default]
    None,
    Marker,
    Highlight,
}

/// Point in page-bitmap space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Shortest distance to the segment `start..end`.
    pub fn distance_to_segment(&self, start: &Point, end: &Point) -> f32 {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let length_sq = dx * dx + dy * dy;

        if length_sq < 1e-6 {
            return self.distance_to(start);
        }

        let t = (((self.x - start.x) * dx + (self.y - start.y) * dy) / length_sq).clamp(0.0, 1.0);
        self.distance_to(&Point::new(start.x + t * dx, start.y + t * dy))
    }

    /// Clamp into `[0, width] x [0, height]`.
    pub fn clamped(self, width: f32, height: f32) -> Self {
        Self { x: self.x.clamp(0.0, width.max(0.0)), y: self.y.clamp(0.0, height.max(0.0)) }
    }
}

/// RGBA color, straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const HIGHLIGHT_YELLOW: Color = Color::new(255, 255, 0, 100);
}

/// Axis-aligned rectangle with `min <= max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    /// Box spanning two arbitrary corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self { min_x: a.x.min(b.x), min_y: a.y.min(b.y), max_x: a.x.max(b.x), max_y: a.y.max(b.y) }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn inflate(&self, amount: f32) -> Self {
        Self {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
        }
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }
}
