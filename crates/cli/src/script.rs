//! Recorded input replayed against a [`PageView`].

use anyhow::{Context, Result};
use doc_model::{PageIndex, ToolMode};
use pdf_engine::PdfEngine;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use viewer_core::{PageView, PointerEvent, ViewerResult};

/// One host event. Pointer positions are viewport coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Tool { mode: ToolMode },
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    Cancel,
    Wheel { delta_y: f32 },
    Next,
    Prev,
    /// Zero-based page index.
    Goto { page: PageIndex },
    Undo,
    Clear,
    Scroll { x: f32, y: f32 },
    Zoom { scale: f32 },
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptEvent>> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read script {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse script {}", path.display()))
}

pub fn replay<E: PdfEngine>(view: &mut PageView<E>, events: &[ScriptEvent]) {
    for (index, event) in events.iter().enumerate() {
        log::trace!("event {index}: {event:?}");

        match *event {
            ScriptEvent::Tool { mode } => view.set_tool_mode(mode),
            ScriptEvent::Down { x, y } => {
                view.handle_pointer(PointerEvent::down(x, y));
            }
            ScriptEvent::Move { x, y } => {
                view.handle_pointer(PointerEvent::moved(x, y));
            }
            ScriptEvent::Up { x, y } => {
                view.handle_pointer(PointerEvent::up(x, y));
            }
            ScriptEvent::Cancel => {
                view.cancel_gesture();
            }
            ScriptEvent::Wheel { delta_y } => report(index, view.on_wheel(delta_y)),
            ScriptEvent::Next => report(index, view.next_page()),
            ScriptEvent::Prev => report(index, view.prev_page()),
            ScriptEvent::Goto { page } => report(index, view.go_to_page(page)),
            ScriptEvent::Undo => {
                view.undo();
            }
            ScriptEvent::Clear => view.clear_page(),
            ScriptEvent::Scroll { x, y } => view.set_scroll_offset(x, y),
            ScriptEvent::Zoom { scale } => {
                if !view.set_display_scale(scale) {
                    log::warn!("event {index}: ignoring display scale {scale}");
                }
            }
        }
    }
}

fn report(index: usize, outcome: ViewerResult<bool>) {
    match outcome {
        Ok(true) => {}
        Ok(false) => log::debug!("event {index}: page unchanged"),
        Err(err) => log::warn!("event {index}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_event_kind() {
        let events: Vec<ScriptEvent> = serde_json::from_str(
            r#"[
                { "event": "tool", "mode": "highlight" },
                { "event": "down", "x": 1.0, "y": 2.0 },
                { "event": "move", "x": 3.0, "y": 4.0 },
                { "event": "up", "x": 5.0, "y": 6.0 },
                { "event": "cancel" },
                { "event": "wheel", "delta_y": -1.0 },
                { "event": "next" },
                { "event": "prev" },
                { "event": "goto", "page": 2 },
                { "event": "undo" },
                { "event": "clear" },
                { "event": "scroll", "x": 0.0, "y": 10.0 },
                { "event": "zoom", "scale": 2.0 }
            ]"#,
        )
        .expect("script should parse");

        assert_eq!(events.len(), 13);
        assert_eq!(events[0], ScriptEvent::Tool { mode: ToolMode::Highlight });
        assert_eq!(events[8], ScriptEvent::Goto { page: 2 });
    }

    #[test]
    fn unknown_event_is_rejected() {
        let parsed = serde_json::from_str::<Vec<ScriptEvent>>(r#"[{ "event": "erase" }]"#);
        assert!(parsed.is_err());
    }
}
