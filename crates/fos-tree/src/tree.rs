//! DOM Tree (arena-based allocation)
//!
//! `DomTree` owns every node. It answers structural queries and provides the
//! low-level splice primitives. Splices only relink pointers: they never run
//! hook code, so nothing outside this module can observe a half-linked tree.

use crate::node::{Node, NodeData, NodeType, char_len};
use crate::{NodeId, link, traversal};

/// Arena-based DOM tree for memory efficiency
#[derive(Debug, Default)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a new empty DOM tree
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        assert!(id.is_valid(), "node arena exhausted");
        self.nodes.push(node);
        id
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Node that is known to exist. Panics on a foreign id.
    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Check that `id` was allocated by this tree
    #[inline]
    pub fn exists(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // --- Links ---

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::first_child)
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::last_child)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::previous_sibling)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::next_sibling)
    }

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.get(id).map(Node::node_type)
    }

    pub fn owner_document(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(Node::owner_document)
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.first_child(id).is_some()
    }

    /// Iterate over the children of a node
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    pub fn child_count(&self, id: NodeId) -> u32 {
        self.children(id).count() as u32
    }

    /// Position of a node among its siblings
    pub fn index(&self, id: NodeId) -> u32 {
        let mut count = 0;
        let mut cur = self.previous_sibling(id);
        while let Some(prev) = cur {
            count += 1;
            cur = self.previous_sibling(prev);
        }
        count
    }

    /// Child at `index`, if there are that many children
    pub fn child_at(&self, parent: NodeId, index: u32) -> Option<NodeId> {
        traversal::child_at(self, parent, index)
    }

    // --- Ancestry ---

    /// Strict descendant check. O(depth) walk up from `id`; this is the only
    /// thing standing between an insertion and a cycle, so it must not be
    /// skipped or cached.
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cur = self.parent(id);
        while let Some(node) = cur {
            if node == ancestor {
                return true;
            }
            cur = self.parent(node);
        }
        false
    }

    /// Inclusive descendant check (`ancestor.contains(id)`)
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.is_descendant_of(id, ancestor)
    }

    /// Topmost ancestor (the node itself when parentless)
    pub fn root(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(parent) = self.parent(cur) {
            cur = parent;
        }
        cur
    }

    /// Number of ancestors
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cur = self.parent(id);
        while let Some(node) = cur {
            depth += 1;
            cur = self.parent(node);
        }
        depth
    }

    /// Nearest inclusive ancestor shared by `a` and `b`
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let (mut a, mut b) = (a, b);
        let (mut depth_a, mut depth_b) = (self.depth(a), self.depth(b));
        while depth_a > depth_b {
            a = self.parent(a)?;
            depth_a -= 1;
        }
        while depth_b > depth_a {
            b = self.parent(b)?;
            depth_b -= 1;
        }
        while a != b {
            a = self.parent(a)?;
            b = self.parent(b)?;
        }
        Some(a)
    }

    /// Attached to a document (root of its tree is a Document)
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.node_type(self.root(id)) == Some(NodeType::Document)
    }

    // --- Content ---

    /// Character data of a text-like node
    pub fn character_data(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::character_data)
    }

    /// Offset bound of a node: characters for character data, children
    /// otherwise
    pub fn length(&self, id: NodeId) -> u32 {
        match self.get(id) {
            Some(node) => match node.character_data() {
                Some(data) => char_len(data),
                None => self.child_count(id),
            },
            None => 0,
        }
    }

    /// Concatenated text of all text/CDATA descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.get(id) else {
            return String::new();
        };
        if let Some(data) = node.character_data() {
            return data.to_string();
        }
        let mut out = String::new();
        for n in traversal::descendants(self, id) {
            let node = self.node(n);
            if node.node_type().is_text_like() {
                out.push_str(node.character_data().unwrap_or_default());
            }
        }
        out
    }

    // --- Splice primitives ---

    /// Link a parentless `new_child` before `next_child`
    pub(crate) fn insert_before_common(&mut self, parent: NodeId, next_child: NodeId, new_child: NodeId) {
        debug_assert!(self.node(new_child).parent().is_none());
        debug_assert!(self.node(new_child).next_sibling().is_none());
        debug_assert!(self.node(new_child).previous_sibling().is_none());
        assert_eq!(self.node(next_child).parent, parent, "reference child has moved");

        let prev = self.node(next_child).prev_sibling;
        self.node_mut(next_child).prev_sibling = new_child;
        if prev.is_valid() {
            debug_assert_eq!(self.node(prev).next_sibling, next_child);
            self.node_mut(prev).next_sibling = new_child;
        } else {
            debug_assert_eq!(self.node(parent).first_child, next_child);
            self.node_mut(parent).first_child = new_child;
        }
        let child = self.node_mut(new_child);
        child.parent = parent;
        child.prev_sibling = prev;
        child.next_sibling = next_child;
        tracing::trace!(%parent, child = %new_child, before = %next_child, "linked child");
    }

    /// Link a parentless `new_child` as last child of `parent`
    pub(crate) fn append_child_common(&mut self, parent: NodeId, new_child: NodeId) {
        debug_assert!(self.node(new_child).parent().is_none());
        let last = self.node(parent).last_child;
        if last.is_valid() {
            self.node_mut(last).next_sibling = new_child;
        } else {
            self.node_mut(parent).first_child = new_child;
        }
        self.node_mut(parent).last_child = new_child;
        let child = self.node_mut(new_child);
        child.parent = parent;
        child.prev_sibling = last;
        child.next_sibling = NodeId::NONE;
        tracing::trace!(%parent, child = %new_child, "appended child");
    }

    /// Unlink `old_child`, whose siblings are `prev` and `next`
    pub(crate) fn remove_between(
        &mut self,
        parent: NodeId,
        prev: Option<NodeId>,
        next: Option<NodeId>,
        old_child: NodeId,
    ) {
        assert_eq!(self.node(old_child).parent, parent, "removing a non-child");
        debug_assert_eq!(self.node(old_child).previous_sibling(), prev);
        debug_assert_eq!(self.node(old_child).next_sibling(), next);

        if let Some(next) = next {
            self.node_mut(next).prev_sibling = link(prev);
        }
        if let Some(prev) = prev {
            self.node_mut(prev).next_sibling = link(next);
        }
        let p = self.node_mut(parent);
        if p.first_child == old_child {
            p.first_child = link(next);
        }
        if p.last_child == old_child {
            p.last_child = link(prev);
        }
        let child = self.node_mut(old_child);
        child.prev_sibling = NodeId::NONE;
        child.next_sibling = NodeId::NONE;
        child.parent = NodeId::NONE;
        tracing::trace!(%parent, child = %old_child, "unlinked child");
    }

    /// Re-own a subtree to `document`
    pub(crate) fn adopt_subtree(&mut self, root: NodeId, document: NodeId) {
        if self.node(root).owner_document == document {
            return;
        }
        let mut cur = Some(root);
        while let Some(node) = cur {
            self.node_mut(node).owner_document = document;
            cur = traversal::next(self, node, Some(root));
        }
    }

    pub(crate) fn replace_character_data(&mut self, id: NodeId, data: String) {
        if let Some(slot) = self.node_mut(id).character_data_mut() {
            *slot = data;
        }
    }

    pub(crate) fn set_shadow_root(&mut self, host: NodeId, shadow: NodeId) {
        if let Some(el) = self.node_mut(host).as_element_mut() {
            el.shadow_root = shadow;
        }
    }

    /// Assert the child list of `parent` is consistently linked
    pub fn verify_child_links(&self, parent: NodeId) {
        let node = self.node(parent);
        assert_eq!(
            node.first_child.is_valid(),
            node.last_child.is_valid(),
            "first/last child disagree on {parent}"
        );
        let mut prev = NodeId::NONE;
        let mut cur = node.first_child;
        while cur.is_valid() {
            let child = self.node(cur);
            assert_eq!(child.parent, parent, "child {cur} has wrong parent");
            assert_eq!(child.prev_sibling, prev, "broken previous link at {cur}");
            prev = cur;
            cur = child.next_sibling;
        }
        assert_eq!(node.last_child, prev, "last child of {parent} is stale");
    }

    /// Clone data for a new node (shadow roots clone as plain fragments)
    pub(crate) fn clone_data(&self, id: NodeId) -> NodeData {
        match &self.node(id).data {
            NodeData::ShadowRoot { .. } => NodeData::DocumentFragment,
            NodeData::Element(el) => {
                let mut copy = el.clone();
                copy.shadow_root = NodeId::NONE;
                NodeData::Element(copy)
            }
            other => other.clone(),
        }
    }
}

/// Iterator over a node's children
pub struct Children<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.next?;
        self.next = self.tree.next_sibling(cur);
        Some(cur)
    }
}
