//! Single-page annotation view.
//!
//! [`PageView`] owns everything with state: the loaded document, the current
//! page, the bitmap cache, the viewport used to map pointer input, the
//! annotation store and the gesture state machine. The host feeds it pointer,
//! wheel and navigation events in arrival order and calls [`PageView::compose`]
//! to get the image to display.
//!
//! Gestures never span pages: navigating or reloading drops the gesture in
//! progress before anything else happens.

use crate::cache::BitmapCache;
use crate::compose::{paint_annotation, paint_preview};
use crate::error::{ViewerError, ViewerResult};
use crate::interaction::{InteractionController, PointerEvent, PointerKind};
use crate::mapper::Viewport;
use doc_model::{Annotation, AnnotationStore, PageIndex, Point, Settings, ToolMode};
use pdf_engine::{DocumentHandle, OpenSource, PdfEngine, PdfEngineError, RenderRequest, RgbaImage};
use std::sync::Arc;

/// Hit-test slack for [`PageView::annotation_at`], in page pixels.
pub const HIT_TOLERANCE: f32 = 2.0;

#[derive(Debug, Clone, Copy)]
struct LoadedDocument {
    handle: DocumentHandle,
    page_count: u32,
}

#[derive(Debug, Clone)]
struct DisplayedPage {
    page: PageIndex,
    bitmap: Arc<RgbaImage>,
}

/// Composed output for the host to draw.
#[derive(Debug, Clone)]
pub struct Surface {
    /// Page the bitmap belongs to.
    pub page: PageIndex,
    pub image: RgbaImage,
    /// The current page failed to render and an older page is shown instead.
    pub stale: bool,
}

pub struct PageView<E: PdfEngine> {
    engine: E,
    document: Option<LoadedDocument>,
    current_page: PageIndex,
    displayed: Option<DisplayedPage>,
    cache: BitmapCache,
    render_request: RenderRequest,
    viewport: Viewport,
    store: AnnotationStore,
    controller: InteractionController,
    clip_to_page: bool,
}

impl<E: PdfEngine> PageView<E> {
    pub fn new(engine: E, settings: &Settings) -> Self {
        let settings = settings.clone().sanitized();

        Self {
            engine,
            document: None,
            current_page: 0,
            displayed: None,
            cache: BitmapCache::new(settings.bitmap_cache_pages),
            render_request: RenderRequest::default().with_scale(settings.render_scale),
            viewport: Viewport::default(),
            store: AnnotationStore::new(),
            controller: InteractionController::new(settings.marker, settings.highlight),
            clip_to_page: settings.clip_to_page,
        }
    }

    /// Open a document and show its first page.
    ///
    /// Whatever was loaded before is dropped together with its annotations,
    /// also when the new document fails to open. A document that opens but
    /// whose first page fails to render stays loaded and the render error is
    /// returned.
    pub fn load(&mut self, source: impl Into<OpenSource>) -> ViewerResult<u32> {
        self.unload();

        let handle = self.engine.open(source.into()).map_err(ViewerError::Load)?;
        let page_count = match self.engine.page_count(handle) {
            Ok(0) => Err(PdfEngineError::Backend("document has no pages".to_owned())),
            other => other,
        };
        let page_count = match page_count {
            Ok(page_count) => page_count,
            Err(err) => {
                if let Err(close_err) = self.engine.close(handle) {
                    log::warn!("failed to close rejected document: {close_err}");
                }
                return Err(ViewerError::Load(err));
            }
        };

        log::info!("loaded document with {page_count} page(s)");
        self.document = Some(LoadedDocument { handle, page_count });
        self.show_current_page()?;

        Ok(page_count)
    }

    /// Close the document and forget all per-document state.
    pub fn unload(&mut self) {
        self.controller.cancel();

        if let Some(document) = self.document.take() {
            if let Err(err) = self.engine.close(document.handle) {
                log::warn!("failed to close document: {err}");
            }
        }

        self.current_page = 0;
        self.displayed = None;
        self.cache.clear();
        self.store.clear_all();
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    /// Zero when no document is loaded.
    pub fn page_count(&self) -> u32 {
        self.document.map(|document| document.page_count).unwrap_or(0)
    }

    pub fn current_page(&self) -> PageIndex {
        self.current_page
    }

    /// Advance one page. `Ok(false)` on the last page.
    pub fn next_page(&mut self) -> ViewerResult<bool> {
        match self.current_page.checked_add(1) {
            Some(page) => self.go_to_page(page),
            None => Ok(false),
        }
    }

    /// Go back one page. `Ok(false)` on the first page.
    pub fn prev_page(&mut self) -> ViewerResult<bool> {
        match self.current_page.checked_sub(1) {
            Some(page) => self.go_to_page(page),
            None => Ok(false),
        }
    }

    /// Wheel scrolling flips pages: positive `delta_y` (scrolling up) goes
    /// back, negative goes forward.
    pub fn on_wheel(&mut self, delta_y: f32) -> ViewerResult<bool> {
        if delta_y > 0.0 {
            self.prev_page()
        } else if delta_y < 0.0 {
            self.next_page()
        } else {
            Ok(false)
        }
    }

    /// Jump to `page`. Out-of-range targets and the current page are no-ops.
    ///
    /// On a render failure the page index still moves, the previous bitmap
    /// stays on screen and the error is returned.
    pub fn go_to_page(&mut self, page: PageIndex) -> ViewerResult<bool> {
        let Some(document) = self.document else {
            return Ok(false);
        };

        if page >= document.page_count || page == self.current_page {
            log::trace!("navigation to page {page} ignored");
            return Ok(false);
        }

        self.controller.cancel();
        log::debug!("page {} -> {page}", self.current_page);
        self.current_page = page;
        self.show_current_page()?;

        Ok(true)
    }

    /// Re-fetch the current page bitmap, from the cache when possible.
    pub fn refresh(&mut self) -> ViewerResult<()> {
        if self.document.is_none() {
            return Err(ViewerError::NoDocument);
        }
        self.show_current_page()
    }

    /// Change the rasterization resolution. Drops every cached bitmap and
    /// re-renders the current page. If that render fails the previous
    /// resolution is restored and the old bitmap stays on screen.
    pub fn set_render_target(
        &mut self,
        scale: f32,
        target_width: Option<u32>,
        target_height: Option<u32>,
    ) -> ViewerResult<()> {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            log::warn!("ignoring invalid render scale {scale}");
            self.render_request.scale
        };

        let previous = self.render_request;
        self.render_request = previous.with_scale(scale).with_target(target_width, target_height);
        self.cache.clear();

        if self.document.is_none() {
            return Ok(());
        }

        let shown = self.show_current_page();
        if shown.is_err() {
            self.render_request = previous;
        }
        shown
    }

    pub fn tool_mode(&self) -> ToolMode {
        self.controller.tool_mode()
    }

    pub fn set_tool_mode(&mut self, mode: ToolMode) {
        self.controller.set_tool_mode(mode);
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_scroll_offset(&mut self, x: f32, y: f32) {
        self.viewport.scroll_offset = Point::new(x, y);
    }

    pub fn set_display_scale(&mut self, scale: f32) -> bool {
        self.viewport.set_scale(scale)
    }

    /// Center the current page inside a viewport of `viewport_width` pixels.
    pub fn center_in_viewport(&mut self, viewport_width: f32) {
        if let Some((width, _)) = self.bitmap_size() {
            self.viewport.center_horizontally(viewport_width, width as f32);
        }
    }

    /// Route one pointer sample. Returns the annotation committed by this
    /// event, if any.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<&Annotation> {
        match event.kind {
            PointerKind::Down => {
                self.pointer_down(event.position);
                None
            }
            PointerKind::Move => {
                self.pointer_move(event.position);
                None
            }
            PointerKind::Up => self.pointer_up(event.position),
        }
    }

    /// Start a gesture. Ignored while the current page has no bitmap, so
    /// nothing is drawn onto a page that is not on screen.
    pub fn pointer_down(&mut self, viewport_point: Point) {
        if self.bitmap_size().is_none() {
            log::debug!("pointer-down ignored, page {} is not displayed", self.current_page);
            return;
        }
        let point = self.viewport.to_page(viewport_point);
        self.controller.pointer_down(point);
    }

    pub fn pointer_move(&mut self, viewport_point: Point) {
        if self.document.is_none() {
            return;
        }
        let point = self.viewport.to_page(viewport_point);
        self.controller.pointer_move(point);
    }

    pub fn pointer_up(&mut self, viewport_point: Point) -> Option<&Annotation> {
        if self.document.is_none() {
            return None;
        }
        let point = self.viewport.to_page(viewport_point);
        let annotation = self.controller.pointer_up(point)?;
        self.commit(annotation)
    }

    /// Drop the gesture in progress, if any.
    pub fn cancel_gesture(&mut self) -> bool {
        self.controller.cancel()
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.store.get(self.current_page)
    }

    /// Remove the newest annotation on the current page.
    pub fn undo(&mut self) -> Option<Annotation> {
        let removed = self.store.undo(self.current_page);
        if removed.is_some() {
            log::debug!("undid last annotation on page {}", self.current_page);
        }
        removed
    }

    pub fn clear_page(&mut self) {
        self.store.clear(self.current_page);
    }

    /// Topmost annotation of the current page under a viewport point.
    pub fn annotation_at(&self, viewport_point: Point) -> Option<&Annotation> {
        let point = self.viewport.to_page(viewport_point);
        self.annotations()
            .iter()
            .rev()
            .find(|annotation| annotation.contains_point(&point, HIT_TOLERANCE))
    }

    /// Pixel size of the current page bitmap, if it rendered.
    pub fn bitmap_size(&self) -> Option<(u32, u32)> {
        self.displayed
            .as_ref()
            .filter(|displayed| displayed.page == self.current_page)
            .map(|displayed| displayed.bitmap.dimensions())
    }

    pub fn cache(&self) -> &BitmapCache {
        &self.cache
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Base bitmap, then the page's annotations in insertion order, then the
    /// live gesture. `None` until some page has rendered.
    pub fn compose(&self) -> Option<Surface> {
        let displayed = self.displayed.as_ref()?;
        let mut image = RgbaImage::clone(&displayed.bitmap);

        for annotation in self.store.get(displayed.page) {
            paint_annotation(&mut image, annotation);
        }

        let stale = displayed.page != self.current_page;
        if !stale {
            if let Some(preview) = self.controller.preview() {
                paint_preview(&mut image, preview, &self.controller.highlight_style());
            }
        }

        Some(Surface { page: displayed.page, image, stale })
    }

    fn commit(&mut self, annotation: Annotation) -> Option<&Annotation> {
        let annotation = match (self.clip_to_page, self.bitmap_size()) {
            (true, Some((width, height))) => annotation.clipped(width as f32, height as f32),
            _ => annotation,
        };

        log::debug!("committed {} on page {}", annotation_kind(&annotation), self.current_page);
        self.store.append(self.current_page, annotation);
        self.store.get(self.current_page).last()
    }

    fn show_current_page(&mut self) -> ViewerResult<()> {
        let page = self.current_page;

        match self.fetch_bitmap(page) {
            Ok(bitmap) => {
                self.displayed = Some(DisplayedPage { page, bitmap });
                Ok(())
            }
            Err(source) => {
                log::warn!("page {page} failed to render, keeping previous bitmap: {source}");
                Err(ViewerError::Render { page, source })
            }
        }
    }

    fn fetch_bitmap(&mut self, page: PageIndex) -> Result<Arc<RgbaImage>, PdfEngineError> {
        if let Some(bitmap) = self.cache.get(page) {
            log::trace!("bitmap cache hit for page {page}");
            return Ok(bitmap);
        }

        let document = self
            .document
            .ok_or_else(|| PdfEngineError::Backend("no document".to_owned()))?;
        let request = RenderRequest { page_index: page, ..self.render_request };
        let bitmap = Arc::new(self.engine.render_page(document.handle, request)?);
        self.cache.insert(page, Arc::clone(&bitmap));

        Ok(bitmap)
    }
}

fn annotation_kind(annotation: &Annotation) -> &'static str {
    match annotation {
        Annotation::Stroke(_) => "stroke",
        Annotation::Highlight(_) => "highlight",
    }
}
