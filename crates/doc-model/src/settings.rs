use crate::Color;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub color: Color,
    pub width: f32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self { color: Color::YELLOW, width: 3.0 }
    }
}

/// Fill of committed highlights and the outline of the live drag box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightStyle {
    pub fill: Color,
    pub preview_outline: Color,
    pub preview_outline_width: f32,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            fill: Color::HIGHLIGHT_YELLOW,
            preview_outline: Color::YELLOW,
            preview_outline_width: 2.0,
        }
    }
}

/// Largest accepted `render_scale`.
pub const MAX_RENDER_SCALE: f32 = 8.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub marker: MarkerStyle,
    pub highlight: HighlightStyle,
    /// Pixels per PDF point when rasterizing pages.
    pub render_scale: f32,
    pub bitmap_cache_pages: usize,
    /// Clamp committed annotations to the page bitmap.
    pub clip_to_page: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            marker: MarkerStyle::default(),
            highlight: HighlightStyle::default(),
            render_scale: 1.0,
            bitmap_cache_pages: 8,
            clip_to_page: true,
        }
    }
}

impl Settings {
    /// Replace invalid values with their defaults. A render scale above
    /// [`MAX_RENDER_SCALE`] is clamped to it.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.render_scale.is_finite() && self.render_scale > 0.0) {
            self.render_scale = defaults.render_scale;
        }
        self.render_scale = self.render_scale.min(MAX_RENDER_SCALE);
        if self.bitmap_cache_pages == 0 {
            self.bitmap_cache_pages = defaults.bitmap_cache_pages;
        }
        if !(self.marker.width.is_finite() && self.marker.width > 0.0) {
            self.marker.width = defaults.marker.width;
        }
        if !(self.highlight.preview_outline_width.is_finite()
            && self.highlight.preview_outline_width >= 0.0)
        {
            self.highlight.preview_outline_width = defaults.highlight.preview_outline_width;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "marker": { "width": 5.0 } }"#).expect("valid json");

        assert_eq!(settings.marker.width, 5.0);
        assert_eq!(settings.marker.color, Color::YELLOW);
        assert_eq!(settings.highlight, HighlightStyle::default());
        assert_eq!(settings.bitmap_cache_pages, 8);
    }

    #[test]
    fn sanitized_repairs_invalid_values() {
        let settings = Settings {
            render_scale: 0.0,
            bitmap_cache_pages: 0,
            marker: MarkerStyle { color: Color::BLACK, width: -1.0 },
            ..Settings::default()
        }
        .sanitized();

        assert_eq!(settings.render_scale, 1.0);
        assert_eq!(settings.bitmap_cache_pages, 8);
        assert_eq!(settings.marker, MarkerStyle { color: Color::BLACK, width: 3.0 });
    }

    #[test]
    fn sanitized_caps_render_scale() {
        let huge = Settings { render_scale: 1.0e7, ..Settings::default() }.sanitized();
        let fine = Settings { render_scale: 2.5, ..Settings::default() }.sanitized();
        let infinite = Settings { render_scale: f32::INFINITY, ..Settings::default() }.sanitized();

        assert_eq!(huge.render_scale, MAX_RENDER_SCALE);
        assert_eq!(fine.render_scale, 2.5);
        assert_eq!(infinite.render_scale, 1.0);
    }
}
