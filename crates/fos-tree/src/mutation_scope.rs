//! Child-list mutation batching
//!
//! Edits to one target made inside [`Dom::with_child_list_scope`] are
//! folded into as few `childList` records as possible: a contiguous run of
//! additions (or removals) becomes one record, flushed when the outermost
//! scope on that target closes. A non-contiguous edit flushes the pending
//! record first and starts a new one.

use crate::observer::Interest;
use crate::{Dom, DomTree, MutationRecord, MutationType, NodeId};

/// Pending record for one target, shared by all open scopes on it
#[derive(Debug)]
pub(crate) struct ChildListMutationAccumulator {
    target: NodeId,
    depth: u32,
    interests: Vec<Interest>,
    removed_nodes: Vec<NodeId>,
    added_nodes: Vec<NodeId>,
    previous_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    last_added: Option<NodeId>,
}

impl ChildListMutationAccumulator {
    fn new(target: NodeId, interests: Vec<Interest>) -> Self {
        Self {
            target,
            depth: 0,
            interests,
            removed_nodes: Vec::new(),
            added_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            last_added: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.removed_nodes.is_empty() && self.added_nodes.is_empty()
    }

    fn is_added_node_in_order(&self, tree: &DomTree, child: NodeId) -> bool {
        self.is_empty()
            || (self.last_added == tree.previous_sibling(child)
                && self.next_sibling == tree.next_sibling(child))
    }

    fn is_removed_node_in_order(&self, child: NodeId) -> bool {
        self.is_empty() || self.next_sibling == Some(child)
    }

    /// Record an inserted child. Returns a record to flush when the
    /// insertion does not extend the pending run.
    fn child_added(&mut self, tree: &DomTree, child: NodeId) -> Option<MutationRecord> {
        let flushed = if self.is_added_node_in_order(tree, child) {
            None
        } else {
            self.take_record()
        };
        if self.is_empty() {
            self.previous_sibling = tree.previous_sibling(child);
            self.next_sibling = tree.next_sibling(child);
        }
        self.last_added = Some(child);
        self.added_nodes.push(child);
        flushed
    }

    /// Record a child about to be removed. Must run before the splice.
    fn will_remove_child(&mut self, tree: &DomTree, child: NodeId) -> Option<MutationRecord> {
        let flushed = if !self.added_nodes.is_empty() || !self.is_removed_node_in_order(child) {
            self.take_record()
        } else {
            None
        };
        if self.is_empty() {
            self.previous_sibling = tree.previous_sibling(child);
            self.next_sibling = tree.next_sibling(child);
            self.last_added = tree.previous_sibling(child);
        } else {
            self.next_sibling = tree.next_sibling(child);
        }
        self.removed_nodes.push(child);
        flushed
    }

    fn take_record(&mut self) -> Option<MutationRecord> {
        if self.is_empty() {
            return None;
        }
        let record = MutationRecord::child_list(
            self.target,
            std::mem::take(&mut self.added_nodes),
            std::mem::take(&mut self.removed_nodes),
            self.previous_sibling.take(),
            self.next_sibling.take(),
        );
        self.last_added = None;
        Some(record)
    }
}

/// An open batch of child-list edits on one target.
///
/// Scopes nest: every scope on the same target shares one accumulator and
/// the record is queued when the outermost one closes. A scope opened while
/// nobody observes the target is inert.
#[must_use = "a mutation scope must be closed with `close`"]
#[derive(Debug)]
pub(crate) struct ChildListMutationScope {
    target: NodeId,
    active: bool,
}

impl ChildListMutationScope {
    pub(crate) fn open(dom: &mut Dom, target: NodeId) -> Self {
        if !dom.observers.has_observers_of(MutationType::ChildList) {
            return Self { target, active: false };
        }
        if let Some(accumulator) = dom.accumulators.get_mut(&target) {
            accumulator.depth += 1;
            return Self { target, active: true };
        }
        let interests = dom
            .observers
            .interested(&dom.tree, target, MutationType::ChildList);
        if interests.is_empty() {
            return Self { target, active: false };
        }
        let mut accumulator = ChildListMutationAccumulator::new(target, interests);
        accumulator.depth = 1;
        dom.accumulators.insert(target, accumulator);
        Self { target, active: true }
    }

    /// Record that `child` was just inserted under the target
    pub(crate) fn child_added(&self, dom: &mut Dom, child: NodeId) {
        if !self.active {
            return;
        }
        let Some(accumulator) = dom.accumulators.get_mut(&self.target) else {
            return;
        };
        if let Some(record) = accumulator.child_added(&dom.tree, child) {
            dom.observers
                .enqueue(&accumulator.interests, &record, dom.config.max_pending_records);
        }
    }

    /// Record that `child` is about to be removed from the target
    pub(crate) fn will_remove_child(&self, dom: &mut Dom, child: NodeId) {
        if !self.active {
            return;
        }
        let Some(accumulator) = dom.accumulators.get_mut(&self.target) else {
            return;
        };
        if let Some(record) = accumulator.will_remove_child(&dom.tree, child) {
            dom.observers
                .enqueue(&accumulator.interests, &record, dom.config.max_pending_records);
        }
    }

    pub(crate) fn close(self, dom: &mut Dom) {
        if !self.active {
            return;
        }
        let Some(accumulator) = dom.accumulators.get_mut(&self.target) else {
            return;
        };
        accumulator.depth -= 1;
        if accumulator.depth > 0 {
            return;
        }
        let Some(mut accumulator) = dom.accumulators.remove(&self.target) else {
            return;
        };
        if let Some(record) = accumulator.take_record() {
            tracing::trace!(
                target_node = %self.target,
                added = record.added_nodes.len(),
                removed = record.removed_nodes.len(),
                "queued child list record"
            );
            dom.observers
                .enqueue(&accumulator.interests, &record, dom.config.max_pending_records);
        }
    }
}

impl Dom {
    /// Run `f` inside a child-list scope on `target`. Scopes nest; the
    /// record is queued when the outermost one on `target` returns.
    pub fn with_child_list_scope<R>(&mut self, target: NodeId, f: impl FnOnce(&mut Dom) -> R) -> R {
        let scope = ChildListMutationScope::open(self, target);
        let result = f(self);
        scope.close(self);
        result
    }

    pub(crate) fn record_child_added(&mut self, parent: NodeId, child: NodeId) {
        let scope = ChildListMutationScope::open(self, parent);
        scope.child_added(self, child);
        scope.close(self);
    }

    pub(crate) fn record_will_remove_child(&mut self, parent: NodeId, child: NodeId) {
        let scope = ChildListMutationScope::open(self, parent);
        scope.will_remove_child(self, child);
        scope.close(self);
    }
}
