//! Painting annotation geometry onto a copy of the page bitmap.
//!
//! A pixel is covered when its center lies inside the shape. Every covered
//! pixel is blended exactly once per primitive, so translucent strokes do not
//! darken where their segments meet.

use crate::interaction::Preview;
use doc_model::{Annotation, Color, HighlightStyle, Point, Rect, StrokeAnnotation};
use image::{Pixel, Rgba};
use pdf_engine::RgbaImage;
use std::ops::Range;

pub fn paint_annotation(image: &mut RgbaImage, annotation: &Annotation) {
    match annotation {
        Annotation::Stroke(stroke) => paint_stroke(image, stroke),
        Annotation::Highlight(highlight) => fill_rect(image, highlight.rect(), highlight.fill),
    }
}

pub fn paint_preview(image: &mut RgbaImage, preview: Preview<'_>, highlight: &HighlightStyle) {
    match preview {
        Preview::Stroke(stroke) => paint_stroke(image, stroke),
        Preview::Rect(rect) => {
            outline_rect(image, rect, highlight.preview_outline, highlight.preview_outline_width)
        }
    }
}

/// Round-capped polyline. A single point paints a dot of the pen width.
pub fn paint_stroke(image: &mut RgbaImage, stroke: &StrokeAnnotation) {
    let (width, height) = image.dimensions();
    stroke_coverage(stroke, width, height).blend_onto(image, stroke.color);
}

pub fn fill_rect(image: &mut RgbaImage, rect: Rect, color: Color) {
    if rect.is_empty() {
        return;
    }

    for_each_pixel(image, rect, color, |center| {
        center.x >= rect.min_x
            && center.x < rect.max_x
            && center.y >= rect.min_y
            && center.y < rect.max_y
    });
}

/// Border of `width` pixels centered on the rectangle edges.
pub fn outline_rect(image: &mut RgbaImage, rect: Rect, color: Color, width: f32) {
    if width <= 0.0 {
        return;
    }

    let half = width / 2.0;
    let outer = rect.inflate(half);
    let inner = rect.inflate(-half);

    for_each_pixel(image, outer, color, |center| {
        let inside_inner = inner.min_x < inner.max_x
            && inner.min_y < inner.max_y
            && center.x > inner.min_x
            && center.x < inner.max_x
            && center.y > inner.min_y
            && center.y < inner.max_y;
        outer.contains(&center) && !inside_inner
    });
}

/// Pixels covered by one stroke. Each segment only tests the pixels near it.
fn stroke_coverage(stroke: &StrokeAnnotation, width: u32, height: u32) -> CoverageMask {
    let radius = (stroke.width / 2.0).max(0.5);
    let points = stroke.points();
    let Some(&first) = points.first() else {
        return CoverageMask::new(Rect::from_corners(Point::default(), Point::default()), 0, 0);
    };

    let bounds = points.iter().fold(Rect::from_corners(first, first), |mut bounds, point| {
        bounds.min_x = bounds.min_x.min(point.x);
        bounds.min_y = bounds.min_y.min(point.y);
        bounds.max_x = bounds.max_x.max(point.x);
        bounds.max_y = bounds.max_y.max(point.y);
        bounds
    });
    let mut mask = CoverageMask::new(bounds.inflate(radius), width, height);

    if points.len() == 1 {
        mask.cover(bounds.inflate(radius), |center| center.distance_to(&first) <= radius);
        return mask;
    }

    for segment in points.windows(2) {
        let (start, end) = (segment[0], segment[1]);
        mask.cover(Rect::from_corners(start, end).inflate(radius), |center| {
            center.distance_to_segment(&start, &end) <= radius
        });
    }
    mask
}

/// Per-primitive coverage so overlapping parts are blended once.
struct CoverageMask {
    xs: Range<u32>,
    ys: Range<u32>,
    covered: Vec<bool>,
    evaluations: usize,
}

impl CoverageMask {
    fn new(bounds: Rect, width: u32, height: u32) -> Self {
        let (xs, ys) = pixel_span(bounds, width, height);
        let len = span_len(&xs) * span_len(&ys);
        Self { xs, ys, covered: vec![false; len], evaluations: 0 }
    }

    fn cover(&mut self, bounds: Rect, mut covers: impl FnMut(Point) -> bool) {
        let x0 = self.xs.start.max(bounds.min_x.floor().max(0.0) as u32);
        let x1 = self.xs.end.min(bounds.max_x.ceil().max(0.0) as u32);
        let y0 = self.ys.start.max(bounds.min_y.floor().max(0.0) as u32);
        let y1 = self.ys.end.min(bounds.max_y.ceil().max(0.0) as u32);
        let stride = span_len(&self.xs);

        for y in y0..y1 {
            for x in x0..x1 {
                let index = (y - self.ys.start) as usize * stride + (x - self.xs.start) as usize;
                if self.covered[index] {
                    continue;
                }
                self.evaluations += 1;
                self.covered[index] = covers(Point::new(x as f32 + 0.5, y as f32 + 0.5));
            }
        }
    }

    fn blend_onto(&self, image: &mut RgbaImage, color: Color) {
        let paint = Rgba(color.to_rgba());
        let stride = span_len(&self.xs);
        if stride == 0 {
            return;
        }

        for (index, _) in self.covered.iter().enumerate().filter(|(_, covered)| **covered) {
            let x = self.xs.start + (index % stride) as u32;
            let y = self.ys.start + (index / stride) as u32;
            image.get_pixel_mut(x, y).blend(&paint);
        }
    }
}

fn span_len(span: &Range<u32>) -> usize {
    span.end.saturating_sub(span.start) as usize
}

/// Pixel rows and columns of `bounds` that lie on a `width` x `height` image.
fn pixel_span(bounds: Rect, width: u32, height: u32) -> (Range<u32>, Range<u32>) {
    let x0 = bounds.min_x.floor().max(0.0) as u32;
    let y0 = bounds.min_y.floor().max(0.0) as u32;
    let x1 = bounds.max_x.ceil().clamp(0.0, width as f32) as u32;
    let y1 = bounds.max_y.ceil().clamp(0.0, height as f32) as u32;
    (x0..x1.max(x0), y0..y1.max(y0))
}

fn for_each_pixel(
    image: &mut RgbaImage,
    bounds: Rect,
    color: Color,
    mut covers: impl FnMut(Point) -> bool,
) {
    let (width, height) = image.dimensions();
    let (xs, ys) = pixel_span(bounds, width, height);
    let paint = Rgba(color.to_rgba());

    for y in ys {
        for x in xs.clone() {
            if covers(Point::new(x as f32 + 0.5, y as f32 + 0.5)) {
                image.get_pixel_mut(x, y).blend(&paint);
            }
        }
    }
}
