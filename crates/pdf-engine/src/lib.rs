//! Document loading and page rasterization.
//!
//! The annotation core consumes this crate as an opaque service: it opens a
//! document, asks for its page count and gets back one RGBA bitmap per page.
//! The default [`LopdfEngine`] reads page geometry with lopdf and paints a
//! blank sheet of the right size; real rasterizers plug in behind [`PdfEngine`].

use image::{ImageBuffer, Rgba};
use lopdf::Document;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// Upper bound on the pixels of one rendered bitmap (256 MiB of RGBA).
pub const MAX_RENDER_PIXELS: u64 = 64 * 1024 * 1024;

/// What to rasterize and at which resolution.
///
/// With no target the bitmap is `page size * scale`. A single target
/// dimension keeps the page aspect ratio; both targets are taken verbatim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page_index: u32,
    pub scale: f32,
    pub target_width: Option<u32>,
    pub target_height: Option<u32>,
}

impl RenderRequest {
    pub fn page(page_index: u32) -> Self {
        Self { page_index, ..Self::default() }
    }

    pub fn with_scale(self, scale: f32) -> Self {
        Self { scale, ..self }
    }

    pub fn with_target(self, target_width: Option<u32>, target_height: Option<u32>) -> Self {
        Self { target_width, target_height, ..self }
    }

    /// Pixel dimensions of the bitmap this request produces for `page_size`.
    pub fn pixel_size(&self, page_size: PageSize) -> (u32, u32) {
        let scale = if self.scale <= 0.0 { 1.0 } else { self.scale };
        let aspect = if page_size.height_pt > 0.0 {
            page_size.width_pt / page_size.height_pt
        } else {
            1.0
        };

        let (width, height) = match (self.target_width, self.target_height) {
            (Some(width), Some(height)) => (width as f32, height as f32),
            (Some(width), None) => (width as f32, width as f32 / aspect),
            (None, Some(height)) => (height as f32 * aspect, height as f32),
            (None, None) => (page_size.width_pt * scale, page_size.height_pt * scale),
        };

        (width.round().max(1.0) as u32, height.round().max(1.0) as u32)
    }

    /// [`Self::pixel_size`], rejecting bitmaps above [`MAX_RENDER_PIXELS`].
    pub fn checked_pixel_size(&self, page_size: PageSize) -> Result<(u32, u32), PdfEngineError> {
        let (width, height) = self.pixel_size(page_size);
        let pixels = u64::from(width) * u64::from(height);
        if pixels > MAX_RENDER_PIXELS {
            return Err(PdfEngineError::ImageTooLarge { width, height });
        }
        Ok((width, height))
    }
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, scale: 1.0, target_width: None, target_height: None }
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("render size {width}x{height} exceeds the bitmap limit")]
    ImageTooLarge { width: u32, height: u32 },
    #[error("backend error: {0}")]
    Backend(String),
}

pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    page_sizes: Vec<PageSize>,
}

#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, PdfEngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
                })
                .unwrap_or(PageSize { width_pt: 612.0, height_pt: 792.0 });

            sizes.push(size);
        }

        if sizes.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }

        Ok(sizes)
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let page_sizes = Self::parse_sizes(&bytes)?;
        log::debug!("opened document with {} page(s)", page_sizes.len());

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.docs.insert(handle, DocumentRecord { page_sizes });

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let record = self.record(handle)?;
        record.page_sizes.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: record.page_sizes.len() as u32,
        })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError> {
        let page_size = self.page_size(handle, request.page_index)?;
        let (width, height) = request.checked_pixel_size(page_size)?;
        log::trace!("rasterizing page {} at {width}x{height}", request.page_index);

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
                image.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
            }
            for y in 0..height {
                image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
                image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
            }
        }

        Ok(image)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}

/// Builders for real PDF bytes used by tests across the workspace.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::PdfEngineError;
    use lopdf::{dictionary, Document, Object, Stream};

    /// Blank PDF with one page per `(width, height)` entry, in points.
    pub fn blank_pdf(page_sizes: &[(u32, u32)]) -> Result<Vec<u8>, PdfEngineError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::with_capacity(page_sizes.len());

        for &(width, height) in page_sizes {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(i64::from(width)),
                    Object::Integer(i64::from(height)),
                ],
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).map_err(|err| PdfEngineError::Backend(err.to_string()))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::blank_pdf;
    use super::*;

    fn open_blank(engine: &mut LopdfEngine, page_sizes: &[(u32, u32)]) -> DocumentHandle {
        let bytes = blank_pdf(page_sizes).expect("fixture should build");
        engine.open(OpenSource::Bytes(bytes)).expect("open should succeed")
    }

    #[test]
    fn opens_pdf_and_reads_page_count() {
        let mut engine = LopdfEngine::new();
        let handle = open_blank(&mut engine, &[(200, 300), (200, 300), (300, 200)]);

        assert_eq!(engine.page_count(handle).expect("count should succeed"), 3);
        let size = engine.page_size(handle, 2).expect("size should succeed");
        assert_eq!(size, PageSize { width_pt: 300.0, height_pt: 200.0 });
    }

    #[test]
    fn render_page_matches_page_size_times_scale() {
        let mut engine = LopdfEngine::new();
        let handle = open_blank(&mut engine, &[(100, 50)]);

        let image = engine
            .render_page(handle, RenderRequest::page(0).with_scale(2.0))
            .expect("page should render");

        assert_eq!(image.dimensions(), (200, 100));
        assert_eq!(image.get_pixel(50, 50), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn single_target_dimension_keeps_aspect_ratio() {
        let size = PageSize { width_pt: 100.0, height_pt: 200.0 };

        assert_eq!(RenderRequest::page(0).with_target(Some(50), None).pixel_size(size), (50, 100));
        assert_eq!(RenderRequest::page(0).with_target(None, Some(50)).pixel_size(size), (25, 50));
        assert_eq!(
            RenderRequest::page(0).with_target(Some(30), Some(30)).pixel_size(size),
            (30, 30)
        );
    }

    #[test]
    fn oversized_render_is_rejected() {
        let mut engine = LopdfEngine::new();
        let handle = open_blank(&mut engine, &[(612, 792)]);

        let err = engine
            .render_page(handle, RenderRequest::page(0).with_scale(1.0e7))
            .expect_err("huge scale should be refused");
        assert!(matches!(err, PdfEngineError::ImageTooLarge { .. }));

        let err = engine
            .render_page(handle, RenderRequest::page(0).with_target(Some(100_000), Some(100_000)))
            .expect_err("huge target should be refused");
        assert!(matches!(err, PdfEngineError::ImageTooLarge { width: 100_000, height: 100_000 }));

        let size = engine.page_size(handle, 0).expect("size should succeed");
        let at_limit = RenderRequest::page(0).with_target(Some(8192), Some(8192));
        assert_eq!(at_limit.checked_pixel_size(size).expect("limit is inclusive"), (8192, 8192));
    }

    #[test]
    fn render_out_of_range_page_fails() {
        let mut engine = LopdfEngine::new();
        let handle = open_blank(&mut engine, &[(100, 100)]);

        let err = engine
            .render_page(handle, RenderRequest::page(1))
            .expect_err("page 1 should be out of range");

        assert!(matches!(err, PdfEngineError::PageOutOfRange { page: 1, page_count: 1 }));
    }

    #[test]
    fn garbage_bytes_fail_to_open() {
        let mut engine = LopdfEngine::new();
        let err = engine
            .open(OpenSource::Bytes(b"not a pdf".to_vec()))
            .expect_err("garbage should not open");

        assert!(matches!(err, PdfEngineError::Parse(_)));
    }

    #[test]
    fn invalid_handle_returns_error() {
        let engine = LopdfEngine::new();
        let err =
            engine.page_count(DocumentHandle(999)).expect_err("should fail for unknown handle");

        assert!(matches!(err, PdfEngineError::InvalidHandle(999)));
    }

    #[test]
    fn closed_handle_is_forgotten() {
        let mut engine = LopdfEngine::new();
        let handle = open_blank(&mut engine, &[(100, 100)]);

        engine.close(handle).expect("close should succeed");

        assert!(matches!(engine.page_count(handle), Err(PdfEngineError::InvalidHandle(_))));
    }
}
