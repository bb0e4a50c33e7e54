use crate::{Annotation, PageIndex};
use std::collections::BTreeMap;

/// Committed annotations keyed by page.
///
/// Each page holds its annotations in insertion order, which is also the
/// z-order: later entries are drawn on top. Page entries are created on the
/// first append and live until the store is cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationStore {
    pages: BTreeMap<PageIndex, Vec<Annotation>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, page: PageIndex, annotation: Annotation) {
        self.pages.entry(page).or_default().push(annotation);
    }

    /// Annotations of `page` in z-order, empty when none were committed.
    pub fn get(&self, page: PageIndex) -> &[Annotation] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear(&mut self, page: PageIndex) {
        self.pages.remove(&page);
    }

    pub fn clear_all(&mut self) {
        self.pages.clear();
    }

    /// Remove the most recently committed annotation of `page`.
    pub fn undo(&mut self, page: PageIndex) -> Option<Annotation> {
        let annotations = self.pages.get_mut(&page)?;
        let removed = annotations.pop();
        if annotations.is_empty() {
            self.pages.remove(&page);
        }
        removed
    }

    /// Pages that currently hold at least one annotation, ascending.
    pub fn pages(&self) -> impl Iterator<Item = PageIndex> + '_ {
        self.pages.iter().filter(|(_, annotations)| !annotations.is_empty()).map(|(page, _)| *page)
    }

    pub fn page_count_with_annotations(&self) -> usize {
        self.pages().count()
    }

    /// Total number of annotations across all pages.
    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, HighlightAnnotation, Point, StrokeAnnotation};

    fn dot(x: f32) -> Annotation {
        StrokeAnnotation::new(Point::new(x, x), Color::YELLOW, 3.0).into()
    }

    #[test]
    fn unknown_page_reads_as_empty() {
        let store = AnnotationStore::new();

        assert!(store.get(4).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn append_keeps_insertion_order_per_page() {
        let mut store = AnnotationStore::new();
        store.append(0, dot(1.0));
        store.append(1, dot(9.0));
        store.append(0, dot(2.0));

        assert_eq!(store.get(0), &[dot(1.0), dot(2.0)]);
        assert_eq!(store.get(1), &[dot(9.0)]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.pages().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn clear_only_touches_one_page() {
        let mut store = AnnotationStore::new();
        store.append(0, dot(1.0));
        store.append(2, dot(2.0));

        store.clear(0);

        assert!(store.get(0).is_empty());
        assert_eq!(store.get(2).len(), 1);
        assert_eq!(store.page_count_with_annotations(), 1);
    }

    #[test]
    fn undo_pops_topmost_annotation() {
        let mut store = AnnotationStore::new();
        let highlight: Annotation =
            HighlightAnnotation::new(Point::new(0.0, 0.0), Point::new(4.0, 4.0), Color::YELLOW)
                .into();
        store.append(3, dot(1.0));
        store.append(3, highlight.clone());

        assert_eq!(store.undo(3), Some(highlight));
        assert_eq!(store.undo(3), Some(dot(1.0)));
        assert_eq!(store.undo(3), None);
        assert_eq!(store.pages().count(), 0);
    }

    #[test]
    fn clear_all_drops_every_page() {
        let mut store = AnnotationStore::new();
        store.append(0, dot(1.0));
        store.append(5, dot(1.0));

        store.clear_all();

        assert!(store.is_empty());
    }
}
