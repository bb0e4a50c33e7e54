//! Annotation overlay core.
//!
//! Maps pointer input from viewport space into page-bitmap space, turns
//! gestures into committed annotations and composes them over rendered pages.

pub mod cache;
pub mod compose;
pub mod error;
pub mod interaction;
pub mod mapper;
pub mod page_view;

pub use cache::BitmapCache;
pub use error::{ViewerError, ViewerResult};
pub use interaction::{InteractionController, InteractionState, PointerEvent, PointerKind, Preview};
pub use mapper::{to_page_space, to_viewport_space, Viewport};
pub use page_view::{PageView, Surface, HIT_TOLERANCE};
