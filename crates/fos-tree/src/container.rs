//! Container node operations
//!
//! Core node manipulation: appendChild, insertBefore, replaceChild,
//! removeChild, removing all children, and the parser fast paths.
//!
//! Each public edit validates completely before touching any link. After
//! that, hook code (mutation events, notifiers, renderer hooks) may run
//! between the individual steps of a multi-node edit, so every loop re-checks
//! its preconditions before the next splice and stops quietly if they no
//! longer hold.

use crate::notifier::{ChildChange, ChildChangeSource};
use crate::{Dom, DomError, DomResult, NodeId, NodeType};

impl Dom {
    // --- Validation ---

    /// Whether `parent` may hold a child of type `child` at all
    fn child_type_allowed(&self, parent: NodeId, child: NodeType) -> bool {
        let Some(parent_type) = self.tree.node_type(parent) else {
            return false;
        };
        match parent_type {
            NodeType::Element | NodeType::DocumentFragment => matches!(
                child,
                NodeType::Element
                    | NodeType::Text
                    | NodeType::CDataSection
                    | NodeType::Comment
                    | NodeType::ProcessingInstruction
            ),
            NodeType::Document => match child {
                NodeType::Comment | NodeType::ProcessingInstruction => true,
                NodeType::Element | NodeType::DocumentType => self
                    .tree
                    .children(parent)
                    .all(|c| self.tree.node_type(c) != Some(child)),
                _ => false,
            },
            NodeType::Text
            | NodeType::CDataSection
            | NodeType::Comment
            | NodeType::ProcessingInstruction
            | NodeType::DocumentType => false,
        }
    }

    /// Same test, expanded over a fragment's children
    pub(crate) fn node_type_allowed_under(&self, parent: NodeId, node: NodeId) -> bool {
        match self.tree.node_type(node) {
            Some(NodeType::DocumentFragment) => self
                .tree
                .children(node)
                .all(|c| self.tree.node_type(c).is_some_and(|t| self.child_type_allowed(parent, t))),
            Some(kind) => self.child_type_allowed(parent, kind),
            None => false,
        }
    }

    /// One element and one doctype per document. `old_child` is the node
    /// being replaced and does not count.
    fn document_can_hold(&self, document: NodeId, new_child: NodeId, old_child: Option<NodeId>) -> bool {
        let Some(new_type) = self.tree.node_type(new_child) else {
            return false;
        };
        if let Some(old) = old_child
            && new_type != NodeType::DocumentFragment
            && self.tree.node_type(old) == Some(new_type)
        {
            return true;
        }

        let mut elements = 0u32;
        let mut doctypes = 0u32;
        for child in self.tree.children(document) {
            if Some(child) == old_child {
                continue;
            }
            match self.tree.node_type(child) {
                Some(NodeType::Element) => elements += 1,
                Some(NodeType::DocumentType) => doctypes += 1,
                _ => {}
            }
        }

        let incoming: Vec<NodeId> = if new_type == NodeType::DocumentFragment {
            self.tree.children(new_child).collect()
        } else {
            vec![new_child]
        };
        for node in incoming {
            match self.tree.node_type(node) {
                Some(NodeType::Element) => elements += 1,
                Some(NodeType::DocumentType) => doctypes += 1,
                Some(NodeType::Comment | NodeType::ProcessingInstruction) => {}
                _ => return false,
            }
        }
        elements <= 1 && doctypes <= 1
    }

    /// `node` contains `target`, following shadow roots out to their hosts
    fn contains_including_hosts(&self, node: NodeId, target: NodeId) -> bool {
        let mut cur = Some(target);
        while let Some(n) = cur {
            if n == node {
                return true;
            }
            cur = match self.tree.parent(n) {
                Some(parent) => Some(parent),
                None => self.shadow_host(n),
            };
        }
        false
    }

    /// Validate `new_child` as a child of `parent`, optionally in place of
    /// `old_child`
    pub(crate) fn check_accept_child(
        &self,
        parent: NodeId,
        new_child: NodeId,
        old_child: Option<NodeId>,
    ) -> DomResult<()> {
        if !self.tree.exists(parent) || !self.tree.exists(new_child) {
            return Err(DomError::NotFound);
        }
        let child = self.tree.node(new_child);
        if child.node_type() == NodeType::Document || child.is_shadow_root() {
            return Err(DomError::HierarchyRequest);
        }
        if self.contains_including_hosts(new_child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        let accepted = if self.tree.node_type(parent) == Some(NodeType::Document) {
            self.document_can_hold(parent, new_child, old_child)
        } else {
            self.node_type_allowed_under(parent, new_child)
        };
        if accepted {
            Ok(())
        } else {
            Err(DomError::HierarchyRequest)
        }
    }

    /// Re-check after hook code ran: only the cycle test can have changed
    fn check_accept_child_after_hooks(&self, parent: NodeId, new_child: NodeId) -> DomResult<()> {
        if self.contains_including_hosts(new_child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        Ok(())
    }

    /// Detach `new_child` from wherever it is and return the nodes to insert
    fn collect_children_and_remove_from_old_parent(&mut self, new_child: NodeId) -> DomResult<Vec<NodeId>> {
        if self.tree.node_type(new_child) != Some(NodeType::DocumentFragment) {
            if let Some(old_parent) = self.tree.parent(new_child) {
                self.remove_child(old_parent, new_child)?;
            }
            return Ok(vec![new_child]);
        }
        let children: Vec<NodeId> = self.tree.children(new_child).collect();
        self.remove_children(new_child);
        Ok(children)
    }

    /// Whether the next node of a batch may still be linked under `parent`
    fn can_still_insert(&self, parent: NodeId, child: NodeId) -> bool {
        self.tree.parent(child).is_none() && !self.contains_including_hosts(child, parent)
    }

    fn adopt_into(&mut self, parent: NodeId, child: NodeId) {
        let document = self.tree.node(parent).owner_document;
        self.tree.adopt_subtree(child, document);
    }

    // --- Post-splice bookkeeping ---

    pub(crate) fn children_changed(&mut self, parent: NodeId, change: ChildChange) {
        let document = self.tree.node(parent).owner_document;
        if let Some(state) = self.documents.get_mut(&document) {
            state.bump_version();
        }
        self.ranges.node_children_changed(parent);
        self.with_hooks(|hooks, dom| hooks.children_changed(dom, parent, &change));
        if self.tree.is_connected(parent) {
            self.with_hooks(|hooks, dom| hooks.style_invalidated(dom, document));
        }
    }

    fn update_tree_after_insertion(&mut self, parent: NodeId, child: NodeId, source: ChildChangeSource) {
        self.record_child_added(parent, child);
        let change = ChildChange::inserted(&self.tree, child, source);
        self.children_changed(parent, change);
        self.notify_inserted(parent, child);
        if self.tree.is_connected(parent) && self.tree.parent(child) == Some(parent) {
            self.with_hooks(|hooks, dom| hooks.attach_renderers(dom, child));
        }
        if source == ChildChangeSource::Api {
            self.dispatch_child_insertion_events(child);
        }
    }

    // --- Public edits ---

    /// Insert `new_child` before `ref_child` (append when `ref_child` is
    /// None). Returns `new_child`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        ref_child: Option<NodeId>,
    ) -> DomResult<NodeId> {
        let Some(ref_child) = ref_child else {
            return self.append_child(parent, new_child);
        };
        self.check_accept_child(parent, new_child, None)?;
        if !self.tree.exists(ref_child) || self.tree.parent(ref_child) != Some(parent) {
            return Err(DomError::NotFound);
        }
        if ref_child == new_child || self.tree.previous_sibling(ref_child) == Some(new_child) {
            return Ok(new_child);
        }

        let next = ref_child;
        let targets = self.collect_children_and_remove_from_old_parent(new_child)?;
        if targets.is_empty() {
            return Ok(new_child);
        }
        self.check_accept_child_after_hooks(parent, new_child)?;

        self.with_child_list_scope(parent, |dom| {
            for child in targets {
                if dom.tree.parent(next) != Some(parent) {
                    tracing::debug!(%parent, reference = %next, "reference child moved, stopping insertion");
                    break;
                }
                if !dom.can_still_insert(parent, child) {
                    break;
                }
                dom.adopt_into(parent, child);
                dom.tree.insert_before_common(parent, next, child);
                dom.update_tree_after_insertion(parent, child, ChildChangeSource::Api);
            }
        });

        self.dispatch_subtree_modified(parent);
        self.verify_after_edit(parent);
        Ok(new_child)
    }

    /// Append `new_child` as the last child of `parent`. Returns `new_child`.
    pub fn append_child(&mut self, parent: NodeId, new_child: NodeId) -> DomResult<NodeId> {
        self.check_accept_child(parent, new_child, None)?;
        if self.tree.last_child(parent) == Some(new_child) {
            return Ok(new_child);
        }

        let targets = self.collect_children_and_remove_from_old_parent(new_child)?;
        if targets.is_empty() {
            return Ok(new_child);
        }
        self.check_accept_child_after_hooks(parent, new_child)?;

        self.with_child_list_scope(parent, |dom| {
            for child in targets {
                if !dom.can_still_insert(parent, child) {
                    break;
                }
                dom.adopt_into(parent, child);
                dom.tree.append_child_common(parent, child);
                dom.update_tree_after_insertion(parent, child, ChildChangeSource::Api);
            }
        });

        self.dispatch_subtree_modified(parent);
        self.verify_after_edit(parent);
        Ok(new_child)
    }

    /// Replace `old_child` with `new_child`. Returns `old_child`.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<NodeId> {
        if old_child == new_child {
            return Ok(old_child);
        }
        if !self.tree.exists(old_child) {
            return Err(DomError::NotFound);
        }
        self.check_accept_child(parent, new_child, Some(old_child))?;
        if self.tree.parent(old_child) != Some(parent) {
            return Err(DomError::NotFound);
        }

        self.with_child_list_scope(parent, |dom| dom.replace_child_in_scope(parent, new_child, old_child))?;

        self.dispatch_subtree_modified(parent);
        self.verify_after_edit(parent);
        Ok(old_child)
    }

    fn replace_child_in_scope(&mut self, parent: NodeId, new_child: NodeId, old_child: NodeId) -> DomResult<()> {
        let next = self.tree.next_sibling(old_child);
        self.remove_child(parent, old_child)?;

        // new_child already sits where old_child was
        if let Some(next) = next
            && (next == new_child || self.tree.previous_sibling(next) == Some(new_child))
        {
            return Ok(());
        }

        self.check_accept_child(parent, new_child, Some(old_child))?;
        let targets = self.collect_children_and_remove_from_old_parent(new_child)?;
        self.check_accept_child_after_hooks(parent, new_child)?;

        for child in targets {
            if let Some(next) = next
                && self.tree.parent(next) != Some(parent)
            {
                tracing::debug!(%parent, reference = %next, "reference child moved, stopping replacement");
                break;
            }
            if !self.can_still_insert(parent, child) {
                break;
            }
            self.adopt_into(parent, child);
            match next {
                Some(next) => self.tree.insert_before_common(parent, next, child),
                None => self.tree.append_child_common(parent, child),
            }
            self.update_tree_after_insertion(parent, child, ChildChangeSource::Api);
        }
        Ok(())
    }

    /// Remove `old_child` from `parent`. Returns `old_child`.
    pub fn remove_child(&mut self, parent: NodeId, old_child: NodeId) -> DomResult<NodeId> {
        if !self.tree.exists(parent)
            || !self.tree.exists(old_child)
            || self.tree.parent(old_child) != Some(parent)
        {
            return Err(DomError::NotFound);
        }

        self.dispatch_child_removal_events(old_child);

        // events may have moved it
        if self.tree.parent(old_child) != Some(parent) {
            return Err(DomError::NotFound);
        }

        self.record_will_remove_child(parent, old_child);
        self.ranges.node_will_be_removed(&self.tree, old_child);

        let prev = self.tree.previous_sibling(old_child);
        let next = self.tree.next_sibling(old_child);
        self.tree.remove_between(parent, prev, next, old_child);

        let change = ChildChange::removed(&self.tree, old_child, prev, next, ChildChangeSource::Api);
        self.children_changed(parent, change);
        self.notify_removed(parent, old_child);

        self.dispatch_subtree_modified(parent);
        self.verify_after_edit(parent);
        Ok(old_child)
    }

    /// Remove every child of `container`
    pub fn remove_children(&mut self, container: NodeId) {
        if !self.tree.has_children(container) {
            return;
        }

        self.with_hooks(|hooks, dom| hooks.will_remove_children(dom, container));
        if self.tree.is_connected(container) && self.has_hooks() {
            let children: Vec<NodeId> = self.tree.children(container).collect();
            for child in children {
                if self.tree.parent(child) == Some(container) {
                    self.with_hooks(|hooks, dom| hooks.detach_renderers(dom, child));
                }
            }
        }

        // no hook code from here until every child is unlinked
        let children: Vec<NodeId> = self.tree.children(container).collect();
        if children.is_empty() {
            return;
        }
        let scope = crate::mutation_scope::ChildListMutationScope::open(self, container);
        for &child in &children {
            scope.will_remove_child(self, child);
        }
        scope.close(self);

        self.ranges.node_children_will_be_removed(&self.tree, container);

        while let Some(first) = self.tree.first_child(container) {
            let next = self.tree.next_sibling(first);
            self.tree.remove_between(container, None, next, first);
        }
        tracing::trace!(%container, count = children.len(), "removed all children");

        self.children_changed(container, ChildChange::all_removed(ChildChangeSource::Api));
        for child in children {
            self.notify_removed(container, child);
        }

        self.dispatch_subtree_modified(container);
        self.verify_after_edit(container);
    }

    // --- Parser fast paths ---

    /// Append without validation or legacy events. The caller guarantees
    /// `new_child` is a parentless, non-fragment node allowed under `parent`.
    pub fn parser_append_child(&mut self, parent: NodeId, new_child: NodeId) {
        debug_assert!(self.tree.parent(new_child).is_none());
        debug_assert_ne!(self.tree.node_type(new_child), Some(NodeType::DocumentFragment));
        debug_assert!(self.check_accept_child(parent, new_child, None).is_ok());

        self.adopt_into(parent, new_child);
        self.tree.append_child_common(parent, new_child);
        self.update_tree_after_insertion(parent, new_child, ChildChangeSource::Parser);
    }

    /// Insert before `next_child` without validation or legacy events
    pub fn parser_insert_before(&mut self, parent: NodeId, new_child: NodeId, next_child: NodeId) {
        debug_assert!(self.tree.parent(new_child).is_none());
        debug_assert_ne!(self.tree.node_type(new_child), Some(NodeType::DocumentFragment));

        if self.tree.previous_sibling(next_child) == Some(new_child) || next_child == new_child {
            return;
        }
        self.adopt_into(parent, new_child);
        self.tree.insert_before_common(parent, next_child, new_child);
        self.update_tree_after_insertion(parent, new_child, ChildChangeSource::Parser);
    }

    /// Remove without legacy events
    pub fn parser_remove_child(&mut self, parent: NodeId, old_child: NodeId) {
        debug_assert_eq!(self.tree.parent(old_child), Some(parent));

        self.record_will_remove_child(parent, old_child);
        self.ranges.node_will_be_removed(&self.tree, old_child);

        let prev = self.tree.previous_sibling(old_child);
        let next = self.tree.next_sibling(old_child);
        self.tree.remove_between(parent, prev, next, old_child);

        let change = ChildChange::removed(&self.tree, old_child, prev, next, ChildChangeSource::Parser);
        self.children_changed(parent, change);
        self.notify_removed(parent, old_child);
    }
}
