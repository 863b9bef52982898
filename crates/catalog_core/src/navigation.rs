//! Address-bar collaborator.

use tracing::debug;

use crate::codec::LIST_PATH;

pub trait Navigation {
    /// Query string of the current entry, without the leading `?`.
    fn current_query(&self) -> String;
    /// Push a new history entry.
    fn navigate_to(&mut self, path: &str, query: &str);
    /// Step back one entry. Returns `false` when already at the oldest entry.
    fn back(&mut self) -> bool;
}

/// Entry paths the application serves directly. The root redirects to the
/// product list.
pub fn canonical_path(path: &str) -> &str {
    match path {
        "" | "/" => LIST_PATH,
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub path: String,
    pub query: String,
}

/// In-process history stack with push semantics.
#[derive(Debug, Clone)]
pub struct MemoryNavigation {
    entries: Vec<HistoryEntry>,
}

impl MemoryNavigation {
    pub fn new(path: &str, query: &str) -> Self {
        Self {
            entries: vec![HistoryEntry {
                path: canonical_path(path).to_string(),
                query: query.trim_start_matches('?').to_string(),
            }],
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn current(&self) -> &HistoryEntry {
        // `back` never pops the initial entry.
        &self.entries[self.entries.len() - 1]
    }
}

impl Default for MemoryNavigation {
    fn default() -> Self {
        Self::new(LIST_PATH, "")
    }
}

impl Navigation for MemoryNavigation {
    fn current_query(&self) -> String {
        self.current().query.clone()
    }

    fn navigate_to(&mut self, path: &str, query: &str) {
        let entry = HistoryEntry {
            path: canonical_path(path).to_string(),
            query: query.trim_start_matches('?').to_string(),
        };
        debug!(path = %entry.path, query = %entry.query, "history push");
        self.entries.push(entry);
    }

    fn back(&mut self) -> bool {
        if self.entries.len() <= 1 {
            return false;
        }
        self.entries.pop();
        true
    }
}

#[cfg(test)]
#[path = "tests/navigation_tests.rs"]
mod tests;
