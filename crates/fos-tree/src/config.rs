//! Tree configuration

/// Behaviour switches for a [`Dom`](crate::Dom)
#[derive(Debug, Clone)]
pub struct DomConfig {
    /// Fire legacy mutation events (`DOMNodeInserted` and friends) to hooks
    pub dispatch_mutation_events: bool,

    /// Re-check sibling links of the edited parent after every public edit
    pub verify_tree_invariants: bool,

    /// Maximum queued records per mutation observer (oldest dropped first)
    pub max_pending_records: usize,
}

impl Default for DomConfig {
    fn default() -> Self {
        Self {
            dispatch_mutation_events: true,
            verify_tree_invariants: cfg!(debug_assertions),
            max_pending_records: 1024,
        }
    }
}

impl DomConfig {
    /// Configuration for bulk tree construction: no events, no checks
    pub fn quiet() -> Self {
        Self {
            dispatch_mutation_events: false,
            verify_tree_invariants: false,
            ..Self::default()
        }
    }
}
