//! Tag filter and free-text search predicates.

use vitrine_core::Entry;

/// At most one active tag. Selecting the active tag again clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    active: Option<String>,
}

impl TagFilter {
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Returns the tag left active afterwards.
    pub fn toggle(&mut self, tag: &str) -> Option<&str> {
        let tag = tag.trim();
        let same = self
            .active
            .as_deref()
            .is_some_and(|active| active.eq_ignore_ascii_case(tag));
        if same || tag.is_empty() {
            self.active = None;
        } else {
            self.active = Some(tag.to_string());
        }
        self.active()
    }

    pub fn set(&mut self, tag: Option<&str>) {
        self.active = tag
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        match &self.active {
            Some(tag) => entry.has_tag(tag),
            None => true,
        }
    }
}

/// Case-insensitive substring search over title, description and tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    raw: String,
    normalized: String,
    min_chars: usize,
}

impl SearchQuery {
    pub fn new(min_chars: usize) -> Self {
        Self {
            raw: String::new(),
            normalized: String::new(),
            min_chars: min_chars.max(1),
        }
    }

    pub fn set(&mut self, query: &str) {
        self.raw = query.to_string();
        self.normalized = query.trim().to_lowercase();
    }

    pub fn clear(&mut self) {
        self.set("");
    }

    /// The text as typed.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Whether the query is long enough to filter anything.
    pub fn is_active(&self) -> bool {
        self.normalized.chars().count() >= self.min_chars
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        !self.is_active() || entry.searchable_text().contains(&self.normalized)
    }
}
