//! Viewport <-> page-bitmap coordinate mapping.
//!
//! Viewport space is the visible scroll area in screen pixels. Page space is
//! the pixel grid of the rendered page bitmap. The page is drawn at
//! `page_origin` (viewport pixels, before scrolling) and magnified by `scale`.
//! Nothing here clamps: points outside the bitmap map to points outside it.

use doc_model::Point;

/// Map a viewport point into page-bitmap space.
pub fn to_page_space(viewport_point: Point, scroll_offset: Point, scale: f32) -> Point {
    debug_assert!(scale > 0.0, "display scale must be positive");

    Point::new(
        (viewport_point.x + scroll_offset.x) / scale,
        (viewport_point.y + scroll_offset.y) / scale,
    )
}

/// Inverse of [`to_page_space`].
pub fn to_viewport_space(page_point: Point, scroll_offset: Point, scale: f32) -> Point {
    Point::new(page_point.x * scale - scroll_offset.x, page_point.y * scale - scroll_offset.y)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_offset: Point,
    pub page_origin: Point,
    scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { scroll_offset: Point::default(), page_origin: Point::default(), scale: 1.0 }
    }
}

impl Viewport {
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Non-positive or non-finite scales are ignored.
    pub fn set_scale(&mut self, scale: f32) -> bool {
        if !(scale.is_finite() && scale > 0.0) {
            log::warn!("ignoring invalid display scale {scale}");
            return false;
        }
        self.scale = scale;
        true
    }

    pub fn to_page(&self, viewport_point: Point) -> Point {
        let shifted = Point::new(
            viewport_point.x - self.page_origin.x,
            viewport_point.y - self.page_origin.y,
        );
        to_page_space(shifted, self.scroll_offset, self.scale)
    }

    pub fn to_viewport(&self, page_point: Point) -> Point {
        let point = to_viewport_space(page_point, self.scroll_offset, self.scale);
        Point::new(point.x + self.page_origin.x, point.y + self.page_origin.y)
    }

    /// Origin that centers a page of `page_width` bitmap pixels horizontally.
    pub fn center_horizontally(&mut self, viewport_width: f32, page_width: f32) {
        self.page_origin.x = ((viewport_width - page_width * self.scale) / 2.0).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_mapping_without_scroll_or_zoom() {
        let point = to_page_space(Point::new(12.0, 34.0), Point::default(), 1.0);
        assert_eq!(point, Point::new(12.0, 34.0));
    }

    #[test]
    fn scroll_and_scale_are_applied() {
        let point = to_page_space(Point::new(10.0, 20.0), Point::new(30.0, 80.0), 2.0);
        assert_eq!(point, Point::new(20.0, 50.0));

        let back = to_viewport_space(point, Point::new(30.0, 80.0), 2.0);
        assert_eq!(back, Point::new(10.0, 20.0));
    }

    #[test]
    fn points_outside_the_page_are_not_clamped() {
        let point = to_page_space(Point::new(-15.0, 5000.0), Point::default(), 1.0);
        assert_eq!(point, Point::new(-15.0, 5000.0));
    }

    #[test]
    fn viewport_accounts_for_page_origin() {
        let mut viewport = Viewport::default();
        viewport.page_origin = Point::new(100.0, 0.0);
        viewport.scroll_offset = Point::new(0.0, 50.0);

        assert_eq!(viewport.to_page(Point::new(110.0, 10.0)), Point::new(10.0, 60.0));
        assert_eq!(viewport.to_viewport(Point::new(10.0, 60.0)), Point::new(110.0, 10.0));
    }

    #[test]
    fn invalid_scale_is_rejected() {
        let mut viewport = Viewport::default();

        assert!(!viewport.set_scale(0.0));
        assert!(!viewport.set_scale(f32::NAN));
        assert!(viewport.set_scale(1.5));
        assert_eq!(viewport.scale(), 1.5);
    }

    #[test]
    fn centering_uses_scaled_page_width() {
        let mut viewport = Viewport::default();
        viewport.set_scale(2.0);
        viewport.center_horizontally(800.0, 300.0);
        assert_eq!(viewport.page_origin.x, 100.0);

        viewport.center_horizontally(400.0, 300.0);
        assert_eq!(viewport.page_origin.x, 0.0);
    }
}
