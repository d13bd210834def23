//! Keeps browser history in step with navigation state.

use std::sync::{Arc, Mutex};

use vitrine_core::HistorySink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    Push,
    Replace,
}

/// Writes links to a `HistorySink`, skipping repeats. Links applied from
/// outside (back/forward, initial load) are adopted, never written.
pub struct HistorySync {
    sink: Arc<dyn HistorySink>,
    last: Option<String>,
}

impl HistorySync {
    pub fn new(sink: Arc<dyn HistorySink>) -> Self {
        Self {
            sink,
            last: None,
        }
    }

    /// Note the link the browser already shows, without writing it.
    pub fn adopt(&mut self, link: &str) {
        self.last = Some(link.to_string());
    }

    /// Returns whether the sink was written.
    pub fn record(&mut self, link: &str, mode: HistoryMode) -> bool {
        if self.last.as_deref() == Some(link) {
            return false;
        }
        match mode {
            HistoryMode::Push => self.sink.push(link),
            HistoryMode::Replace => self.sink.replace(link),
        }
        self.last = Some(link.to_string());
        true
    }
}

/// In-memory history stack, for headless sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<String>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn current(&self) -> Option<String> {
        self.entries.lock().ok().and_then(|e| e.last().cloned())
    }
}

impl HistorySink for MemoryHistory {
    fn push(&self, link: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(link.to_string());
        }
    }

    fn replace(&self, link: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            match entries.last_mut() {
                Some(last) => *last = link.to_string(),
                None => entries.push(link.to_string()),
            }
        }
    }
}
