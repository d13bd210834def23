//! Fixed-size paging over the filtered view.

use std::fmt;

use serde::Serialize;

/// Half-open item range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

impl VisibleRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    Pagination,
}

/// Notification sent after a page change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChange {
    pub source: ChangeSource,
    pub page: usize,
}

type ChangeListener = Box<dyn FnMut(PageChange) + Send>;

pub struct Pagination {
    items_per_page: usize,
    current_page: usize,
    total_items: usize,
    total_pages: usize,
    on_change: Option<ChangeListener>,
}

impl fmt::Debug for Pagination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pagination")
            .field("items_per_page", &self.items_per_page)
            .field("current_page", &self.current_page)
            .field("total_items", &self.total_items)
            .field("total_pages", &self.total_pages)
            .finish()
    }
}

impl Pagination {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            items_per_page: items_per_page.max(1),
            current_page: 0,
            total_items: 0,
            total_pages: 1,
            on_change: None,
        }
    }

    pub fn set_on_change(&mut self, listener: impl FnMut(PageChange) + Send + 'static) {
        self.on_change = Some(Box::new(listener));
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    /// Recompute the page count, pulling the current page back inside it.
    pub fn set_total(&mut self, total_items: usize) {
        self.total_items = total_items;
        self.total_pages = total_items.div_ceil(self.items_per_page).max(1);
        if self.current_page >= self.total_pages {
            self.current_page = self.total_pages - 1;
        }
    }

    pub fn visible_range(&self) -> VisibleRange {
        let start = (self.current_page * self.items_per_page).min(self.total_items);
        let end = (start + self.items_per_page).min(self.total_items);
        VisibleRange { start, end }
    }

    /// Clamp `page` into range and move there. Returns false when the page
    /// did not change.
    pub fn go_to(&mut self, page: usize) -> bool {
        let clamped = page.min(self.total_pages - 1);
        if clamped == self.current_page {
            return false;
        }
        self.current_page = clamped;
        if let Some(listener) = self.on_change.as_mut() {
            listener(PageChange {
                source: ChangeSource::Pagination,
                page: clamped,
            });
        }
        true
    }

    /// Move to the page holding item `index`. False when the index is out of
    /// range or already visible.
    pub fn go_to_index(&mut self, index: usize) -> bool {
        if index >= self.total_items {
            return false;
        }
        self.go_to(index / self.items_per_page)
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.current_page + 1)
    }

    pub fn previous(&mut self) -> bool {
        match self.current_page.checked_sub(1) {
            Some(page) => self.go_to(page),
            None => false,
        }
    }

    /// Back to the first page without notifying.
    pub fn reset(&mut self) {
        self.current_page = 0;
    }

    pub fn contains_index(&self, index: usize) -> bool {
        index < self.total_items && self.visible_range().contains(index)
    }

    /// Paging controls are hidden when everything fits on one page.
    pub fn controls_visible(&self) -> bool {
        self.total_items > self.items_per_page
    }

    pub fn indicator(&self) -> String {
        format!("Page {} / {}", self.current_page + 1, self.total_pages)
    }

    /// Completion percentage for the progress bar.
    pub fn progress(&self) -> f32 {
        if self.total_items == 0 {
            return 0.0;
        }
        (self.current_page + 1) as f32 / self.total_pages as f32 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn twelve_items_make_three_pages() {
        let mut pages = Pagination::new(5);
        pages.set_total(12);
        assert_eq!(pages.total_pages(), 3);
        assert!(pages.go_to_index(10));
        assert_eq!(pages.current_page(), 2);
        assert_eq!(pages.visible_range(), VisibleRange { start: 10, end: 12 });
        assert_eq!(pages.indicator(), "Page 3 / 3");
        assert!(pages.contains_index(11));
        assert!(!pages.contains_index(9));
        assert!(!pages.contains_index(12));
    }

    #[test]
    fn visible_range_stays_in_bounds() {
        for per_page in 1..=7 {
            for total in 0..=30 {
                let mut pages = Pagination::new(per_page);
                pages.set_total(total);
                for page in 0..=(total / per_page + 2) {
                    pages.go_to(page);
                    let range = pages.visible_range();
                    assert!(range.start <= range.end);
                    assert!(range.end <= total);
                    assert!(range.len() <= per_page);
                }
            }
        }
    }

    #[test]
    fn shrinking_total_clamps_current_page() {
        let mut pages = Pagination::new(5);
        pages.set_total(40);
        pages.go_to(7);
        pages.set_total(11);
        assert_eq!(pages.current_page(), 2);
        pages.set_total(0);
        assert_eq!(pages.current_page(), 0);
        assert_eq!(pages.total_pages(), 1);
        assert!(pages.visible_range().is_empty());
        assert_eq!(pages.progress(), 0.0);
    }

    #[test]
    fn unchanged_or_invalid_moves_report_false() {
        let mut pages = Pagination::new(5);
        pages.set_total(12);
        assert!(!pages.go_to(0));
        assert!(!pages.previous());
        assert!(!pages.go_to_index(12));
        assert!(pages.next());
        assert!(pages.next());
        assert!(!pages.next());
        assert!(!pages.go_to(99));
        assert!(pages.previous());
        assert_eq!(pages.current_page(), 1);
    }

    #[test]
    fn listener_hears_page_changes() {
        let heard = Arc::new(Mutex::new(Vec::new()));
        let sink = heard.clone();
        let mut pages = Pagination::new(5);
        pages.set_on_change(move |change| sink.lock().unwrap().push(change));
        pages.set_total(12);
        pages.next();
        pages.go_to(1);
        pages.reset();
        assert_eq!(
            *heard.lock().unwrap(),
            vec![PageChange {
                source: ChangeSource::Pagination,
                page: 1
            }]
        );
        assert_eq!(pages.current_page(), 0);
    }

    #[test]
    fn controls_hidden_when_one_page_suffices() {
        let mut pages = Pagination::new(5);
        pages.set_total(5);
        assert!(!pages.controls_visible());
        pages.set_total(6);
        assert!(pages.controls_visible());
        assert_eq!(pages.progress(), 50.0);
    }
}
