//! Range boundary points
//!
//! A boundary is stored as (container, child-before, cached offset). The
//! child-before link is what keeps the boundary attached to the right place
//! while children are inserted and removed around it. The numeric offset is
//! a cache that tree edits invalidate; it is recomputed from child-before on
//! demand.

use std::cell::Cell;

use crate::{DomTree, NodeId};

/// Range boundary point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundaryPoint {
    /// The container node
    pub node: NodeId,
    /// Offset within the container (character offset for character data,
    /// child index otherwise)
    pub offset: u32,
}

impl BoundaryPoint {
    pub fn new(node: NodeId, offset: u32) -> Self {
        Self { node, offset }
    }
}

/// Live boundary of a [`Range`](crate::Range)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeBoundaryPoint {
    container: NodeId,
    /// None when invalidated by a tree edit
    offset: Cell<Option<u32>>,
    /// Child immediately before the boundary (None at the container start,
    /// and always None for character data containers)
    child_before: Option<NodeId>,
}

impl RangeBoundaryPoint {
    pub fn new(container: NodeId) -> Self {
        Self {
            container,
            offset: Cell::new(Some(0)),
            child_before: None,
        }
    }

    #[inline]
    pub fn container(&self) -> NodeId {
        self.container
    }

    #[inline]
    pub fn child_before(&self) -> Option<NodeId> {
        self.child_before
    }

    /// Current offset, recomputed from child-before if the cache is stale
    pub fn offset(&self, tree: &DomTree) -> u32 {
        if let Some(offset) = self.offset.get() {
            return offset;
        }
        let offset = match self.child_before {
            Some(child) => tree.index(child) + 1,
            None => 0,
        };
        self.offset.set(Some(offset));
        offset
    }

    /// Child right after the boundary, for node containers
    pub fn child_at_offset(&self, tree: &DomTree) -> Option<NodeId> {
        match self.child_before {
            Some(child) => tree.next_sibling(child),
            None => tree.first_child(self.container),
        }
    }

    pub fn to_position(&self, tree: &DomTree) -> BoundaryPoint {
        BoundaryPoint::new(self.container, self.offset(tree))
    }

    /// Offset in a character data container, where it is always cached
    pub(crate) fn character_offset(&self) -> u32 {
        debug_assert!(self.child_before.is_none());
        self.offset.get().unwrap_or(0)
    }

    pub(crate) fn has_valid_offset(&self) -> bool {
        self.offset.get().is_some()
    }

    pub(crate) fn set(&mut self, container: NodeId, offset: u32, child_before: Option<NodeId>) {
        self.container = container;
        self.offset.set(Some(offset));
        self.child_before = child_before;
    }

    /// Move within character data of the same container
    pub(crate) fn set_offset(&mut self, offset: u32) {
        debug_assert!(self.child_before.is_none());
        self.offset.set(Some(offset));
    }

    pub(crate) fn set_to_before_child(&mut self, tree: &DomTree, child: NodeId) {
        let Some(parent) = tree.parent(child) else {
            return;
        };
        self.container = parent;
        self.child_before = tree.previous_sibling(child);
        self.offset.set(if self.child_before.is_some() { None } else { Some(0) });
    }

    pub(crate) fn set_to_after_child(&mut self, tree: &DomTree, child: NodeId) {
        let Some(parent) = tree.parent(child) else {
            return;
        };
        self.container = parent;
        self.child_before = Some(child);
        self.offset.set(None);
    }

    pub(crate) fn set_to_start_of_node(&mut self, container: NodeId) {
        self.set(container, 0, None);
    }

    pub(crate) fn set_to_end_of_node(&mut self, tree: &DomTree, container: NodeId) {
        self.container = container;
        match tree.character_data(container) {
            Some(_) => {
                self.child_before = None;
                self.offset.set(Some(tree.length(container)));
            }
            None => {
                self.child_before = tree.last_child(container);
                self.offset.set(if self.child_before.is_some() { None } else { Some(0) });
            }
        }
    }

    /// child-before is about to be unlinked: step back one sibling
    pub(crate) fn child_before_will_be_removed(&mut self, tree: &DomTree) {
        let Some(child) = self.child_before else {
            return;
        };
        self.child_before = tree.previous_sibling(child);
        match (self.offset.get(), self.child_before) {
            (_, None) => self.offset.set(Some(0)),
            (Some(offset), Some(_)) => {
                debug_assert!(offset > 0);
                self.offset.set(Some(offset.saturating_sub(1)));
            }
            (None, Some(_)) => {}
        }
    }

    pub(crate) fn invalidate_offset(&self) {
        if self.child_before.is_some() {
            self.offset.set(None);
        }
    }

    pub(crate) fn set_child_before(&mut self, child: Option<NodeId>) {
        self.child_before = child;
        self.offset.set(if child.is_some() { None } else { Some(0) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ElementData, Node, NodeData};

    fn tree_with_children(count: usize) -> (DomTree, NodeId, Vec<NodeId>) {
        let mut tree = DomTree::new();
        let parent = tree.push(Node::new(NodeData::Element(ElementData::new("p")), NodeId::NONE));
        let children = (0..count)
            .map(|_| {
                let child = tree.push(Node::new(NodeData::Element(ElementData::new("c")), NodeId::NONE));
                tree.append_child_common(parent, child);
                child
            })
            .collect();
        (tree, parent, children)
    }

    #[test]
    fn test_offset_derived_from_child_before() {
        let (tree, parent, children) = tree_with_children(3);
        let mut point = RangeBoundaryPoint::new(parent);
        point.set_to_after_child(&tree, children[1]);

        assert!(!point.has_valid_offset());
        assert_eq!(point.offset(&tree), 2);
        assert!(point.has_valid_offset());
        assert_eq!(point.child_at_offset(&tree), Some(children[2]));
    }

    #[test]
    fn test_child_before_removal_steps_back() {
        let (tree, parent, children) = tree_with_children(3);
        let mut point = RangeBoundaryPoint::new(parent);
        point.set(parent, 2, Some(children[1]));

        point.child_before_will_be_removed(&tree);
        assert_eq!(point.child_before(), Some(children[0]));
        assert_eq!(point.offset(&tree), 1);
    }

    #[test]
    fn test_start_and_end_of_node() {
        let (tree, parent, children) = tree_with_children(2);
        let mut point = RangeBoundaryPoint::new(parent);
        point.set_to_end_of_node(&tree, parent);
        assert_eq!(point.to_position(&tree), BoundaryPoint::new(parent, 2));
        assert_eq!(point.child_before(), Some(children[1]));

        point.set_to_start_of_node(parent);
        assert_eq!(point.to_position(&tree), BoundaryPoint::new(parent, 0));
        assert_eq!(point.child_at_offset(&tree), Some(children[0]));
    }
}
