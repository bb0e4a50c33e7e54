use doc_model::PageIndex;
use pdf_engine::PdfEngineError;

/// Failures surfaced to the host UI.
///
/// None of these ever touch committed annotations. A load failure leaves the
/// view with no document; a render failure keeps the last good bitmap.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("failed to load document: {0}")]
    Load(#[source] PdfEngineError),
    #[error("failed to render page {page}: {source}")]
    Render {
        page: PageIndex,
        #[source]
        source: PdfEngineError,
    },
    #[error("no document loaded")]
    NoDocument,
}

pub type ViewerResult<T> = Result<T, ViewerError>;
