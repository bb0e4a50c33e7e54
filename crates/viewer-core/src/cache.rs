use doc_model::PageIndex;
use pdf_engine::RgbaImage;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Least-recently-used cache of rasterized pages.
///
/// Entries are only valid for one document at one render resolution; the
/// owner clears the cache when either changes.
#[derive(Debug, Clone)]
pub struct BitmapCache {
    capacity: usize,
    bitmaps: HashMap<PageIndex, Arc<RgbaImage>>,
    order: VecDeque<PageIndex>,
    hits: u64,
    misses: u64,
}

impl BitmapCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            bitmaps: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.bitmaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bitmaps.is_empty()
    }

    pub fn contains(&self, page: PageIndex) -> bool {
        self.bitmaps.contains_key(&page)
    }

    /// Lookup without touching recency or the hit counters.
    pub fn peek(&self, page: PageIndex) -> Option<&Arc<RgbaImage>> {
        self.bitmaps.get(&page)
    }

    pub fn get(&mut self, page: PageIndex) -> Option<Arc<RgbaImage>> {
        match self.bitmaps.get(&page).cloned() {
            Some(bitmap) => {
                self.hits += 1;
                self.touch(page);
                Some(bitmap)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, page: PageIndex, bitmap: Arc<RgbaImage>) {
        if self.bitmaps.insert(page, bitmap).is_some() {
            self.touch(page);
            return;
        }

        self.order.push_back(page);

        while self.bitmaps.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.bitmaps.remove(&oldest);
            log::trace!("evicted bitmap for page {oldest}");
        }
    }

    pub fn clear(&mut self) {
        self.bitmaps.clear();
        self.order.clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    fn touch(&mut self, page: PageIndex) {
        if let Some(index) = self.order.iter().position(|existing| *existing == page) {
            if let Some(found) = self.order.remove(index) {
                self.order.push_back(found);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap() -> Arc<RgbaImage> {
        Arc::new(RgbaImage::new(2, 2))
    }

    #[test]
    fn evicts_least_recently_used_page() {
        let mut cache = BitmapCache::new(2);

        cache.insert(0, bitmap());
        cache.insert(1, bitmap());
        let _ = cache.get(0);
        cache.insert(2, bitmap());

        assert!(cache.contains(0));
        assert!(!cache.contains(1));
        assert!(cache.contains(2));
    }

    #[test]
    fn counts_hits_and_misses() {
        let mut cache = BitmapCache::new(4);
        cache.insert(3, bitmap());

        assert!(cache.get(3).is_some());
        assert!(cache.get(4).is_none());

        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn zero_capacity_still_holds_one_page() {
        let mut cache = BitmapCache::new(0);
        cache.insert(0, bitmap());
        cache.insert(1, bitmap());

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(1));
    }

    #[test]
    fn clear_empties_cache() {
        let mut cache = BitmapCache::new(2);
        cache.insert(0, bitmap());

        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.peek(0).is_none());
    }
}
