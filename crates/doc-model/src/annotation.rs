//! Committed annotation primitives.
//!
//! Geometry is immutable once an annotation is committed to the store. A stroke
//! only grows while its gesture is still in progress, and always holds at least
//! one point.

use crate::{Color, Point, Rect};
use serde::Serialize;

/// Freehand mark: an ordered polyline with a color and a pen width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrokeAnnotation {
    points: Vec<Point>,
    pub color: Color,
    pub width: f32,
}

impl StrokeAnnotation {
    /// Start a stroke seeded with its first point.
    pub fn new(first: Point, color: Color, width: f32) -> Self {
        Self { points: vec![first], color, width }
    }

    /// Build a stroke from a point list, `None` if the list is empty.
    pub fn from_points(points: Vec<Point>, color: Color, width: f32) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        Some(Self { points, color, width })
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Single-point strokes come from a press with no drag.
    pub fn is_dot(&self) -> bool {
        self.points.len() == 1
    }
}

/// Axis-aligned highlight box given by the two corners of the drag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightAnnotation {
    pub anchor: Point,
    pub corner: Point,
    pub fill: Color,
}

impl HighlightAnnotation {
    pub fn new(anchor: Point, corner: Point, fill: Color) -> Self {
        Self { anchor, corner, fill }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.anchor, self.corner)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    Stroke(StrokeAnnotation),
    Highlight(HighlightAnnotation),
}

impl Annotation {
    /// Bounds in page space. Strokes are widened by half their pen width.
    pub fn bounding_box(&self) -> Rect {
        match self {
            Annotation::Stroke(stroke) => {
                let first = stroke.points[0];
                let mut bounds = Rect::from_corners(first, first);
                for point in stroke.points.iter().skip(1) {
                    bounds.min_x = bounds.min_x.min(point.x);
                    bounds.min_y = bounds.min_y.min(point.y);
                    bounds.max_x = bounds.max_x.max(point.x);
                    bounds.max_y = bounds.max_y.max(point.y);
                }
                bounds.inflate(stroke.width / 2.0)
            }
            Annotation::Highlight(highlight) => highlight.rect(),
        }
    }

    /// Whether `point` touches the annotation, within `tolerance` pixels.
    pub fn contains_point(&self, point: &Point, tolerance: f32) -> bool {
        match self {
            Annotation::Stroke(stroke) => {
                let reach = tolerance + stroke.width / 2.0;
                if stroke.is_dot() {
                    return point.distance_to(&stroke.points[0]) <= reach;
                }
                stroke
                    .points
                    .windows(2)
                    .any(|segment| point.distance_to_segment(&segment[0], &segment[1]) <= reach)
            }
            Annotation::Highlight(highlight) => highlight.rect().inflate(tolerance).contains(point),
        }
    }

    /// Copy with every point clamped into `[0, width] x [0, height]`.
    pub fn clipped(&self, width: f32, height: f32) -> Self {
        match self {
            Annotation::Stroke(stroke) => Annotation::Stroke(StrokeAnnotation {
                points: stroke.points.iter().map(|point| point.clamped(width, height)).collect(),
                color: stroke.color,
                width: stroke.width,
            }),
            Annotation::Highlight(highlight) => Annotation::Highlight(HighlightAnnotation {
                anchor: highlight.anchor.clamped(width, height),
                corner: highlight.corner.clamped(width, height),
                fill: highlight.fill,
            }),
        }
    }

    pub fn as_stroke(&self) -> Option<&StrokeAnnotation> {
        match self {
            Annotation::Stroke(stroke) => Some(stroke),
            Annotation::Highlight(_) => None,
        }
    }

    pub fn as_highlight(&self) -> Option<&HighlightAnnotation> {
        match self {
            Annotation::Highlight(highlight) => Some(highlight),
            Annotation::Stroke(_) => None,
        }
    }
}

impl From<StrokeAnnotation> for Annotation {
    fn from(value: StrokeAnnotation) -> Self {
        Self::Stroke(value)
    }
}

impl From<HighlightAnnotation> for Annotation {
    fn from(value: HighlightAnnotation) -> Self {
        Self::Highlight(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(points: &[(f32, f32)]) -> StrokeAnnotation {
        let points = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
        StrokeAnnotation::from_points(points, Color::YELLOW, 2.0).expect("non-empty stroke")
    }

    #[test]
    fn empty_point_list_is_not_a_stroke() {
        assert!(StrokeAnnotation::from_points(Vec::new(), Color::YELLOW, 3.0).is_none());
    }

    #[test]
    fn stroke_bounds_include_pen_width() {
        let annotation = Annotation::from(stroke(&[(10.0, 10.0), (20.0, 30.0)]));

        assert_eq!(
            annotation.bounding_box(),
            Rect { min_x: 9.0, min_y: 9.0, max_x: 21.0, max_y: 31.0 }
        );
    }

    #[test]
    fn stroke_hit_test_follows_segments() {
        let annotation = Annotation::from(stroke(&[(0.0, 0.0), (100.0, 0.0)]));

        assert!(annotation.contains_point(&Point::new(50.0, 2.0), 1.5));
        assert!(!annotation.contains_point(&Point::new(50.0, 10.0), 1.5));
        assert!(!annotation.contains_point(&Point::new(110.0, 0.0), 1.5));
    }

    #[test]
    fn dot_stroke_hit_test_uses_radius() {
        let annotation = Annotation::from(stroke(&[(5.0, 5.0)]));

        assert!(annotation.contains_point(&Point::new(6.0, 5.0), 0.5));
        assert!(!annotation.contains_point(&Point::new(9.0, 5.0), 0.5));
    }

    #[test]
    fn highlight_rect_ignores_drag_direction() {
        let highlight =
            HighlightAnnotation::new(Point::new(50.0, 40.0), Point::new(10.0, 10.0), Color::YELLOW);

        assert_eq!(highlight.rect(), Rect { min_x: 10.0, min_y: 10.0, max_x: 50.0, max_y: 40.0 });
    }

    #[test]
    fn clipping_clamps_every_point() {
        let annotation = Annotation::from(stroke(&[(-5.0, 5.0), (50.0, 500.0)]));
        let clipped = annotation.clipped(100.0, 200.0);

        let points = clipped.as_stroke().expect("stroke").points().to_vec();
        assert_eq!(points, vec![Point::new(0.0, 5.0), Point::new(50.0, 200.0)]);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let annotation = Annotation::from(HighlightAnnotation::new(
            Point::new(1.0, 2.0),
            Point::new(3.0, 4.0),
            Color::HIGHLIGHT_YELLOW,
        ));

        let value = serde_json::to_value(&annotation).expect("serialize");
        assert_eq!(value["kind"], "highlight");
        assert_eq!(value["anchor"]["x"], 1.0);
        assert_eq!(value["fill"]["a"], 100);
    }
}
