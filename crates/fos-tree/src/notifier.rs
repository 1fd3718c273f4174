//! Document hooks and tree notifiers
//!
//! Everything outside the tree (style, layout, script) learns about edits
//! through [`DocumentHooks`]. Hook code receives `&mut Dom` and may edit the
//! tree again; the walkers here snapshot what they iterate and re-check
//! links before each step so those edits cannot corrupt the walk.

use crate::{Dom, DomTree, MutationEvent, NodeId, NodeType, traversal};

/// Kind of child-list change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildChangeKind {
    ElementInserted,
    NonElementInserted,
    ElementRemoved,
    NonElementRemoved,
    AllChildrenRemoved,
}

/// Who performed a child-list change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildChangeSource {
    /// Document parser fast path
    Parser,
    /// Public tree API
    Api,
}

/// Description of one child-list change, passed to
/// [`DocumentHooks::children_changed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildChange {
    pub kind: ChildChangeKind,
    /// Inserted or removed child (None for `AllChildrenRemoved`)
    pub changed: Option<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub source: ChildChangeSource,
}

impl ChildChange {
    pub(crate) fn inserted(tree: &DomTree, child: NodeId, source: ChildChangeSource) -> Self {
        let kind = if tree.node_type(child) == Some(NodeType::Element) {
            ChildChangeKind::ElementInserted
        } else {
            ChildChangeKind::NonElementInserted
        };
        Self {
            kind,
            changed: Some(child),
            previous_sibling: tree.previous_sibling(child),
            next_sibling: tree.next_sibling(child),
            source,
        }
    }

    /// `prev`/`next` are the removed child's former siblings
    pub(crate) fn removed(
        tree: &DomTree,
        child: NodeId,
        prev: Option<NodeId>,
        next: Option<NodeId>,
        source: ChildChangeSource,
    ) -> Self {
        let kind = if tree.node_type(child) == Some(NodeType::Element) {
            ChildChangeKind::ElementRemoved
        } else {
            ChildChangeKind::NonElementRemoved
        };
        Self {
            kind,
            changed: Some(child),
            previous_sibling: prev,
            next_sibling: next,
            source,
        }
    }

    pub(crate) fn all_removed(source: ChildChangeSource) -> Self {
        Self {
            kind: ChildChangeKind::AllChildrenRemoved,
            changed: None,
            previous_sibling: None,
            next_sibling: None,
            source,
        }
    }

    pub fn is_insertion(&self) -> bool {
        matches!(
            self.kind,
            ChildChangeKind::ElementInserted | ChildChangeKind::NonElementInserted
        )
    }
}

/// Result of [`DocumentHooks::inserted_into_ancestor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertionOutcome {
    #[default]
    Done,
    /// Call [`DocumentHooks::did_finish_inserting_subtree`] for this node
    /// once the whole subtree has been notified
    NeedsPostInsertionCallback,
}

/// Callbacks into the embedder.
///
/// Every method has a no-op default. Methods take `&self`; hooks that keep
/// state use `Cell` or `RefCell`. Hooks stay installed while they run, so an
/// edit made from inside a hook calls back in before the outer call returns.
pub trait DocumentHooks {
    /// Legacy mutation event dispatch
    fn mutation_event(&self, _dom: &mut Dom, _event: &MutationEvent) {}

    /// `node` (or an ancestor of it) was inserted under `insertion_point`
    fn inserted_into_ancestor(
        &self,
        _dom: &mut Dom,
        _node: NodeId,
        _insertion_point: NodeId,
    ) -> InsertionOutcome {
        InsertionOutcome::Done
    }

    fn did_finish_inserting_subtree(&self, _dom: &mut Dom, _node: NodeId) {}

    /// `node` (or an ancestor of it) was removed from `old_parent`
    fn removed_from_ancestor(&self, _dom: &mut Dom, _node: NodeId, _old_parent: NodeId) {}

    /// All children of `container` are about to be removed
    fn will_remove_children(&self, _dom: &mut Dom, _container: NodeId) {}

    fn children_changed(&self, _dom: &mut Dom, _parent: NodeId, _change: &ChildChange) {}

    /// Render-tree attach for a node inserted under a connected parent
    fn attach_renderers(&self, _dom: &mut Dom, _node: NodeId) {}

    /// Render-tree detach for a connected node about to be removed
    fn detach_renderers(&self, _dom: &mut Dom, _node: NodeId) {}

    /// Style of `document` needs recalculation
    fn style_invalidated(&self, _dom: &mut Dom, _document: NodeId) {}
}

impl Dom {
    /// Tell `node` and its subtree they were inserted under `insertion_point`
    pub(crate) fn notify_inserted(&mut self, insertion_point: NodeId, node: NodeId) {
        if !self.has_hooks() {
            return;
        }
        let mut post_insertion = Vec::new();
        let mut stack = vec![(node, self.tree.parent(node))];
        while let Some((current, expected_parent)) = stack.pop() {
            // hook code may have moved this node since it was queued
            if self.tree.parent(current) != expected_parent
                || !self.tree.contains(insertion_point, current)
            {
                continue;
            }
            let outcome = self
                .with_hooks(|hooks, dom| hooks.inserted_into_ancestor(dom, current, insertion_point))
                .unwrap_or_default();
            if outcome == InsertionOutcome::NeedsPostInsertionCallback {
                post_insertion.push(current);
            }
            let children: Vec<NodeId> = self.tree.children(current).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, Some(current))));
        }
        for target in post_insertion {
            self.with_hooks(|hooks, dom| hooks.did_finish_inserting_subtree(dom, target));
        }
    }

    /// Tell `node` and its subtree they were removed from `old_parent`
    pub(crate) fn notify_removed(&mut self, old_parent: NodeId, node: NodeId) {
        if !self.has_hooks() {
            return;
        }
        let mut stack = vec![(node, None)];
        while let Some((current, expected_parent)) = stack.pop() {
            if expected_parent.is_some() && self.tree.parent(current) != expected_parent {
                continue;
            }
            self.with_hooks(|hooks, dom| hooks.removed_from_ancestor(dom, current, old_parent));
            let children: Vec<NodeId> = self.tree.children(current).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, Some(current))));
        }
    }

    /// Events for a freshly inserted child (API edits only)
    pub(crate) fn dispatch_child_insertion_events(&mut self, child: NodeId) {
        if !self.wants_events() {
            return;
        }
        let Some(parent) = self.tree.parent(child) else {
            return;
        };
        self.dispatch_event(MutationEvent::node_inserted(child, parent));
        if !self.tree.is_connected(child) {
            return;
        }
        let subtree = self.inclusive_subtree(child);
        for node in subtree {
            if self.tree.contains(child, node) && self.tree.is_connected(node) {
                self.dispatch_event(MutationEvent::inserted_into_document(node));
            }
        }
    }

    /// Events and renderer detach ahead of removing `child`
    pub(crate) fn dispatch_child_removal_events(&mut self, child: NodeId) {
        if !self.has_hooks() {
            return;
        }
        if let Some(parent) = self.tree.parent(child) {
            self.dispatch_event(MutationEvent::node_removed(child, parent));
        }
        if self.tree.is_connected(child) {
            let subtree = self.inclusive_subtree(child);
            for node in subtree {
                if self.tree.contains(child, node) && self.tree.is_connected(node) {
                    self.dispatch_event(MutationEvent::removed_from_document(node));
                }
            }
        }
        if self.tree.is_connected(child) {
            self.with_hooks(|hooks, dom| hooks.detach_renderers(dom, child));
        }
    }

    pub(crate) fn dispatch_subtree_modified(&mut self, parent: NodeId) {
        if self.wants_events() {
            self.dispatch_event(MutationEvent::subtree_modified(parent));
        }
    }

    fn inclusive_subtree(&self, root: NodeId) -> Vec<NodeId> {
        std::iter::once(root)
            .chain(traversal::descendants(&self.tree, root))
            .collect()
    }
}
