//! Pointer gesture state machine.
//!
//! A gesture is one pointer-down .. pointer-up sequence. While the active tool
//! is [`ToolMode::Marker`] it grows a freehand stroke, under
//! [`ToolMode::Highlight`] it drags out a rectangle. Only pointer-up commits;
//! a tool change or [`InteractionController::cancel`] throws the partial
//! primitive away. All points handed in are already in page space.

use doc_model::{
    Annotation, HighlightAnnotation, HighlightStyle, MarkerStyle, Point, Rect, StrokeAnnotation,
    ToolMode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

/// One pointer sample in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub position: Point,
}

impl PointerEvent {
    pub fn down(x: f32, y: f32) -> Self {
        Self { kind: PointerKind::Down, position: Point::new(x, y) }
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self { kind: PointerKind::Move, position: Point::new(x, y) }
    }

    pub fn up(x: f32, y: f32) -> Self {
        Self { kind: PointerKind::Up, position: Point::new(x, y) }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum InteractionState {
    #[default]
    Idle,
    DrawingStroke(StrokeAnnotation),
    DrawingRect {
        anchor: Point,
        current: Point,
    },
}

/// Live geometry of the gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preview<'a> {
    Stroke(&'a StrokeAnnotation),
    Rect(Rect),
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    mode: ToolMode,
    state: InteractionState,
    marker: MarkerStyle,
    highlight: HighlightStyle,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(MarkerStyle::default(), HighlightStyle::default())
    }
}

impl InteractionController {
    pub fn new(marker: MarkerStyle, highlight: HighlightStyle) -> Self {
        Self { mode: ToolMode::None, state: InteractionState::Idle, marker, highlight }
    }

    pub fn tool_mode(&self) -> ToolMode {
        self.mode
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, InteractionState::Idle)
    }

    pub fn marker_style(&self) -> MarkerStyle {
        self.marker
    }

    pub fn highlight_style(&self) -> HighlightStyle {
        self.highlight
    }

    /// Switch tools. A different mode drops any gesture in progress.
    pub fn set_tool_mode(&mut self, mode: ToolMode) {
        if mode == self.mode {
            return;
        }

        if self.cancel() {
            log::debug!("tool switched from {:?} to {mode:?} mid-gesture", self.mode);
        }
        self.mode = mode;
    }

    /// Drop the gesture in progress. Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        let was_active = !self.is_idle();
        if was_active {
            log::debug!("discarding in-progress {:?} gesture", self.mode);
        }
        self.state = InteractionState::Idle;
        was_active
    }

    pub fn pointer_down(&mut self, point: Point) {
        if !self.is_idle() {
            log::trace!("pointer-down during an active gesture ignored");
            return;
        }

        self.state = match self.mode {
            ToolMode::None => return,
            ToolMode::Marker => InteractionState::DrawingStroke(StrokeAnnotation::new(
                point,
                self.marker.color,
                self.marker.width,
            )),
            ToolMode::Highlight => InteractionState::DrawingRect { anchor: point, current: point },
        };
    }

    pub fn pointer_move(&mut self, point: Point) {
        match &mut self.state {
            InteractionState::Idle => {}
            InteractionState::DrawingStroke(stroke) => stroke.push(point),
            InteractionState::DrawingRect { current, .. } => *current = point,
        }
    }

    /// Finish the gesture. Strokes keep the points seen so far; rectangles
    /// take `point` as their final corner.
    pub fn pointer_up(&mut self, point: Point) -> Option<Annotation> {
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => None,
            InteractionState::DrawingStroke(stroke) => Some(Annotation::Stroke(stroke)),
            InteractionState::DrawingRect { anchor, .. } => Some(Annotation::Highlight(
                HighlightAnnotation::new(anchor, point, self.highlight.fill),
            )),
        }
    }

    pub fn preview(&self) -> Option<Preview<'_>> {
        match &self.state {
            InteractionState::Idle => None,
            InteractionState::DrawingStroke(stroke) => Some(Preview::Stroke(stroke)),
            InteractionState::DrawingRect { anchor, current } => {
                Some(Preview::Rect(Rect::from_corners(*anchor, *current)))
            }
        }
    }
}
