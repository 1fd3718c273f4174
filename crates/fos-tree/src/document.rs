//! Document - per-document collaborator state
//!
//! Each Document node in a [`Dom`](crate::Dom) has a `DocumentState`: its
//! URL, the live ranges registered with it, and a tree version that bumps
//! on every child-list change below it.

use crate::Range;

/// State kept for one Document node
#[derive(Debug, Clone)]
pub struct DocumentState {
    /// Document URL
    url: String,
    /// Bumped whenever a child list under this document changes
    dom_tree_version: u64,
    /// Ranges owned by this document
    live_ranges: Vec<Range>,
}

impl DocumentState {
    pub(crate) fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            dom_tree_version: 0,
            live_ranges: Vec::new(),
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn dom_tree_version(&self) -> u64 {
        self.dom_tree_version
    }

    /// Ranges currently registered with this document
    pub fn live_ranges(&self) -> &[Range] {
        &self.live_ranges
    }

    pub(crate) fn bump_version(&mut self) {
        self.dom_tree_version = self.dom_tree_version.wrapping_add(1);
    }

    pub(crate) fn attach_range(&mut self, range: Range) {
        if !self.live_ranges.contains(&range) {
            self.live_ranges.push(range);
        }
    }

    pub(crate) fn detach_range(&mut self, range: Range) {
        self.live_ranges.retain(|r| *r != range);
    }

    pub(crate) fn take_ranges(&mut self) -> Vec<Range> {
        std::mem::take(&mut self.live_ranges)
    }
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new("about:blank")
    }
}
