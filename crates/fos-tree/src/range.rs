//! Range API
//!
//! A `Range` is a pair of boundary points registered with its owner
//! document. The handle is a plain `Copy` value; the boundary state lives in
//! the [`Dom`]'s range registry so that every tree edit can adjust every
//! live range before any hook code runs.
//!
//! These APIs are used for:
//! - Text selection and manipulation
//! - Programmatic editing (insertNode, deleteContents, surroundContents)
//! - Copy/paste (extractContents, cloneContents)

use std::cmp::Ordering;

use crate::node::substring;
use crate::{BoundaryPoint, Dom, DomError, DomResult, DomTree, NodeId, NodeType, RangeBoundaryPoint, traversal};

/// Handle to a live range owned by a [`Dom`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    slot: u32,
    epoch: u32,
}

/// Range comparison types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeCompare {
    StartToStart,
    StartToEnd,
    EndToEnd,
    EndToStart,
}

/// What `process_contents` does with the selected nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentsAction {
    Delete,
    Extract,
    Clone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone)]
pub(crate) struct RangeData {
    owner_document: NodeId,
    start: RangeBoundaryPoint,
    end: RangeBoundaryPoint,
}

impl RangeData {
    fn new(document: NodeId) -> Self {
        Self {
            owner_document: document,
            start: RangeBoundaryPoint::new(document),
            end: RangeBoundaryPoint::new(document),
        }
    }

    fn collapse(&mut self, to_start: bool) {
        if to_start {
            self.end = self.start.clone();
        } else {
            self.start = self.end.clone();
        }
    }

    fn is_collapsed(&self, tree: &DomTree) -> bool {
        self.start.container() == self.end.container() && self.start.offset(tree) == self.end.offset(tree)
    }

    /// Same tree and start not after end
    fn is_ordered(&self, tree: &DomTree) -> bool {
        if tree.root(self.start.container()) != tree.root(self.end.container()) {
            return false;
        }
        compare_boundaries(tree, &self.start, &self.end).is_ok_and(|order| order != Ordering::Greater)
    }
}

fn boundaries(data: &mut RangeData) -> [&mut RangeBoundaryPoint; 2] {
    [&mut data.start, &mut data.end]
}

#[derive(Debug)]
struct RangeSlot {
    epoch: u32,
    data: Option<RangeData>,
}

/// Every live range of a `Dom`, indexed by handle
#[derive(Debug, Default)]
pub(crate) struct RangeRegistry {
    slots: Vec<RangeSlot>,
    free: Vec<u32>,
    live: usize,
}

impl RangeRegistry {
    fn insert(&mut self, data: RangeData) -> Range {
        self.live += 1;
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.epoch = entry.epoch.wrapping_add(1);
            entry.data = Some(data);
            return Range { slot, epoch: entry.epoch };
        }
        let slot = self.slots.len() as u32;
        self.slots.push(RangeSlot { epoch: 0, data: Some(data) });
        Range { slot, epoch: 0 }
    }

    pub fn remove(&mut self, range: Range) -> Option<RangeData> {
        let entry = self.slots.get_mut(range.slot as usize)?;
        if entry.epoch != range.epoch {
            return None;
        }
        let data = entry.data.take()?;
        self.free.push(range.slot);
        self.live -= 1;
        Some(data)
    }

    fn get(&self, range: Range) -> Option<&RangeData> {
        let entry = self.slots.get(range.slot as usize)?;
        if entry.epoch != range.epoch {
            return None;
        }
        entry.data.as_ref()
    }

    fn get_mut(&mut self, range: Range) -> Option<&mut RangeData> {
        let entry = self.slots.get_mut(range.slot as usize)?;
        if entry.epoch != range.epoch {
            return None;
        }
        entry.data.as_mut()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    fn boundaries_mut(&mut self) -> impl Iterator<Item = &mut RangeBoundaryPoint> {
        self.slots
            .iter_mut()
            .filter_map(|slot| slot.data.as_mut())
            .flat_map(boundaries)
    }

    // --- Adjustment hooks, called by the edit layer ---

    /// Sibling indices under `container` changed
    pub fn node_children_changed(&mut self, container: NodeId) {
        for boundary in self.boundaries_mut() {
            if boundary.container() == container {
                boundary.invalidate_offset();
            }
        }
    }

    /// `node` is about to be unlinked from its parent
    pub fn node_will_be_removed(&mut self, tree: &DomTree, node: NodeId) {
        for boundary in self.boundaries_mut() {
            if boundary.child_before() == Some(node) {
                boundary.child_before_will_be_removed(tree);
            } else if tree.contains(node, boundary.container()) {
                boundary.set_to_before_child(tree, node);
            }
        }
    }

    /// Every child of `container` is about to be unlinked
    pub fn node_children_will_be_removed(&mut self, tree: &DomTree, container: NodeId) {
        for boundary in self.boundaries_mut() {
            if tree.contains(container, boundary.container()) {
                boundary.set_to_start_of_node(container);
            }
        }
    }

    pub fn text_inserted(&mut self, node: NodeId, offset: u32, length: u32) {
        for boundary in self.boundaries_mut() {
            if boundary.container() != node {
                continue;
            }
            let current = boundary.character_offset();
            if offset < current {
                boundary.set_offset(current + length);
            }
        }
    }

    pub fn text_removed(&mut self, node: NodeId, offset: u32, length: u32) {
        for boundary in self.boundaries_mut() {
            if boundary.container() != node {
                continue;
            }
            let current = boundary.character_offset();
            if offset < current {
                let moved = if offset + length >= current { offset } else { current - length };
                boundary.set_offset(moved);
            }
        }
    }

    /// `old_node` is about to be merged into its previous sibling, whose
    /// length before the merge was `offset`
    pub fn text_nodes_merged(&mut self, tree: &DomTree, old_node: NodeId, offset: u32) {
        let Some(previous) = tree.previous_sibling(old_node) else {
            return;
        };
        let parent = tree.parent(old_node);
        let index = tree.index(old_node);
        for boundary in self.boundaries_mut() {
            if boundary.container() == old_node {
                let moved = boundary.character_offset() + offset;
                boundary.set(previous, moved, None);
            } else if Some(boundary.container()) == parent && boundary.offset(tree) == index {
                boundary.set(previous, offset, None);
            }
        }
    }

    /// `old_node` was split at `offset`; `new_node` (the tail) is already
    /// its next sibling
    pub fn text_node_split(&mut self, tree: &DomTree, old_node: NodeId, new_node: NodeId, offset: u32) {
        let parent = tree.parent(old_node);
        for boundary in self.boundaries_mut() {
            if boundary.container() == old_node {
                let current = boundary.character_offset();
                if current > offset {
                    boundary.set(new_node, current - offset, None);
                }
            } else if parent.is_some()
                && Some(boundary.container()) == parent
                && boundary.child_before() == Some(old_node)
            {
                boundary.set_child_before(Some(new_node));
            }
        }
    }
}

// --- Free helpers ---

/// Order two boundary points in the same tree
pub fn compare_boundary_points(
    tree: &DomTree,
    container_a: NodeId,
    offset_a: u32,
    container_b: NodeId,
    offset_b: u32,
) -> DomResult<Ordering> {
    if container_a == container_b {
        return Ok(offset_a.cmp(&offset_b));
    }

    // B is inside A: find the child of A that holds B
    let mut c = container_b;
    while let Some(parent) = tree.parent(c) {
        if parent == container_a {
            let offset_c = child_index_bounded(tree, container_a, c, offset_a);
            return Ok(if offset_a <= offset_c { Ordering::Less } else { Ordering::Greater });
        }
        c = parent;
    }

    // A is inside B
    let mut c = container_a;
    while let Some(parent) = tree.parent(c) {
        if parent == container_b {
            let offset_c = child_index_bounded(tree, container_b, c, offset_b);
            return Ok(if offset_c < offset_b { Ordering::Less } else { Ordering::Greater });
        }
        c = parent;
    }

    let common = tree
        .common_ancestor(container_a, container_b)
        .ok_or(DomError::WrongDocument)?;
    let child_a = child_of_ancestor(tree, container_a, common);
    let child_b = child_of_ancestor(tree, container_b, common);
    if child_a == child_b {
        return Ok(Ordering::Equal);
    }
    let mut n = tree.first_child(common);
    while let Some(node) = n {
        if node == child_a {
            return Ok(Ordering::Less);
        }
        if node == child_b {
            return Ok(Ordering::Greater);
        }
        n = tree.next_sibling(node);
    }
    panic!("children {child_a} and {child_b} of common ancestor {common} are not linked under it");
}

/// Index of `child` under `parent`, counting no further than `limit`
fn child_index_bounded(tree: &DomTree, parent: NodeId, child: NodeId, limit: u32) -> u32 {
    let mut offset = 0;
    let mut n = tree.first_child(parent);
    while let Some(node) = n {
        if node == child || offset >= limit {
            break;
        }
        offset += 1;
        n = tree.next_sibling(node);
    }
    offset
}

/// Inclusive ancestor of `node` whose parent is `ancestor` (`ancestor`
/// itself when they are the same node)
fn child_of_ancestor(tree: &DomTree, node: NodeId, ancestor: NodeId) -> NodeId {
    let mut cur = node;
    while let Some(parent) = tree.parent(cur) {
        if parent == ancestor {
            return cur;
        }
        cur = parent;
    }
    ancestor
}

fn compare_boundaries(tree: &DomTree, a: &RangeBoundaryPoint, b: &RangeBoundaryPoint) -> DomResult<Ordering> {
    compare_boundary_points(tree, a.container(), a.offset(tree), b.container(), b.offset(tree))
}

/// Validate (node, offset) and return the child before that offset
fn check_node_offset(tree: &DomTree, node: NodeId, offset: u32) -> DomResult<Option<NodeId>> {
    let node_type = tree.node_type(node).ok_or(DomError::NotFound)?;
    match node_type {
        NodeType::DocumentType => Err(DomError::InvalidNodeType),
        NodeType::Text | NodeType::CDataSection | NodeType::Comment | NodeType::ProcessingInstruction => {
            if offset > tree.length(node) {
                Err(DomError::IndexSize)
            } else {
                Ok(None)
            }
        }
        NodeType::Element | NodeType::Document | NodeType::DocumentFragment => {
            if offset == 0 {
                return Ok(None);
            }
            tree.child_at(node, offset - 1).map(Some).ok_or(DomError::IndexSize)
        }
    }
}

/// Topmost ancestor of `node` below `root` (None when `node` is `root`)
fn highest_ancestor_under(tree: &DomTree, node: NodeId, root: NodeId) -> Option<NodeId> {
    if node == root {
        return None;
    }
    let mut cur = node;
    while let Some(parent) = tree.parent(cur) {
        if parent == root {
            return Some(cur);
        }
        cur = parent;
    }
    None
}

fn child_of_common_root_before_offset(
    tree: &DomTree,
    container: NodeId,
    offset: u32,
    common_root: NodeId,
) -> Option<NodeId> {
    if !tree.contains(common_root, container) {
        return None;
    }
    if container == common_root {
        return tree.child_at(container, offset);
    }
    Some(child_of_ancestor(tree, container, common_root))
}

fn sibling_in(tree: &DomTree, node: NodeId, direction: Direction) -> Option<NodeId> {
    match direction {
        Direction::Forward => tree.next_sibling(node),
        Direction::Backward => tree.previous_sibling(node),
    }
}

impl Dom {
    /// Create a range collapsed at the start of `document`
    pub fn create_range(&mut self, document: NodeId) -> DomResult<Range> {
        let state = self.documents.get_mut(&document).ok_or(DomError::NotFound)?;
        let range = self.ranges.insert(RangeData::new(document));
        state.attach_range(range);
        tracing::debug!(%document, slot = range.slot, "created range");
        Ok(range)
    }

    /// Number of live ranges across all documents
    pub fn live_range_count(&self) -> usize {
        self.ranges.len()
    }

    fn move_range_to_document(&mut self, range: Range, from: NodeId, to: NodeId) {
        if let Some(state) = self.documents.get_mut(&from) {
            state.detach_range(range);
        }
        if let Some(state) = self.documents.get_mut(&to) {
            state.attach_range(range);
        }
        if let Some(data) = self.ranges.get_mut(range) {
            *data = RangeData::new(to);
        }
        tracing::debug!(slot = range.slot, %from, %to, "range adopted into document");
    }
}

impl Range {
    fn data<'a>(&self, dom: &'a Dom) -> DomResult<&'a RangeData> {
        dom.ranges.get(*self).ok_or(DomError::InvalidState)
    }

    /// Adopt into `node`'s document if it differs. Returns whether it moved.
    fn adopt_for(&self, dom: &mut Dom, node: NodeId) -> DomResult<bool> {
        let owner = self.data(dom)?.owner_document;
        let document = dom.tree.owner_document(node).ok_or(DomError::NotFound)?;
        if document == owner {
            return Ok(false);
        }
        dom.move_range_to_document(*self, owner, document);
        Ok(true)
    }

    pub fn is_detached(&self, dom: &Dom) -> bool {
        dom.ranges.get(*self).is_none()
    }

    pub fn owner_document(&self, dom: &Dom) -> Option<NodeId> {
        dom.ranges.get(*self).map(|data| data.owner_document)
    }

    /// Start boundary
    pub fn start(&self, dom: &Dom) -> DomResult<BoundaryPoint> {
        Ok(self.data(dom)?.start.to_position(&dom.tree))
    }

    /// End boundary
    pub fn end(&self, dom: &Dom) -> DomResult<BoundaryPoint> {
        Ok(self.data(dom)?.end.to_position(&dom.tree))
    }

    /// Start container (`NodeId::NONE` once detached)
    pub fn start_container(&self, dom: &Dom) -> NodeId {
        self.data(dom).map_or(NodeId::NONE, |data| data.start.container())
    }

    pub fn start_offset(&self, dom: &Dom) -> u32 {
        self.data(dom).map_or(0, |data| data.start.offset(&dom.tree))
    }

    pub fn end_container(&self, dom: &Dom) -> NodeId {
        self.data(dom).map_or(NodeId::NONE, |data| data.end.container())
    }

    pub fn end_offset(&self, dom: &Dom) -> u32 {
        self.data(dom).map_or(0, |data| data.end.offset(&dom.tree))
    }

    /// Whether start == end (a detached range reports collapsed)
    pub fn collapsed(&self, dom: &Dom) -> bool {
        self.data(dom).map_or(true, |data| data.is_collapsed(&dom.tree))
    }

    /// Get common ancestor container
    pub fn common_ancestor_container(&self, dom: &Dom) -> DomResult<NodeId> {
        let data = self.data(dom)?;
        dom.tree
            .common_ancestor(data.start.container(), data.end.container())
            .ok_or(DomError::WrongDocument)
    }

    // --- Setting boundaries ---

    /// Set the start boundary
    pub fn set_start(&self, dom: &mut Dom, node: NodeId, offset: u32) -> DomResult<()> {
        self.data(dom)?;
        let child_before = check_node_offset(&dom.tree, node, offset)?;
        let moved = self.adopt_for(dom, node)?;
        let data = dom.ranges.get_mut(*self).ok_or(DomError::InvalidState)?;
        data.start.set(node, offset, child_before);
        if moved || !data.is_ordered(&dom.tree) {
            data.collapse(true);
        }
        Ok(())
    }

    /// Set the end boundary
    pub fn set_end(&self, dom: &mut Dom, node: NodeId, offset: u32) -> DomResult<()> {
        self.data(dom)?;
        let child_before = check_node_offset(&dom.tree, node, offset)?;
        let moved = self.adopt_for(dom, node)?;
        let data = dom.ranges.get_mut(*self).ok_or(DomError::InvalidState)?;
        data.end.set(node, offset, child_before);
        if moved || !data.is_ordered(&dom.tree) {
            data.collapse(false);
        }
        Ok(())
    }

    fn parent_and_index(&self, dom: &Dom, node: NodeId) -> DomResult<(NodeId, u32)> {
        self.data(dom)?;
        if !dom.tree.exists(node) {
            return Err(DomError::NotFound);
        }
        let parent = dom.tree.parent(node).ok_or(DomError::InvalidNodeType)?;
        Ok((parent, dom.tree.index(node)))
    }

    pub fn set_start_before(&self, dom: &mut Dom, node: NodeId) -> DomResult<()> {
        let (parent, index) = self.parent_and_index(dom, node)?;
        self.set_start(dom, parent, index)
    }

    pub fn set_start_after(&self, dom: &mut Dom, node: NodeId) -> DomResult<()> {
        let (parent, index) = self.parent_and_index(dom, node)?;
        self.set_start(dom, parent, index + 1)
    }

    pub fn set_end_before(&self, dom: &mut Dom, node: NodeId) -> DomResult<()> {
        let (parent, index) = self.parent_and_index(dom, node)?;
        self.set_end(dom, parent, index)
    }

    pub fn set_end_after(&self, dom: &mut Dom, node: NodeId) -> DomResult<()> {
        let (parent, index) = self.parent_and_index(dom, node)?;
        self.set_end(dom, parent, index + 1)
    }

    /// Collapse the range to start or end
    pub fn collapse(&self, dom: &mut Dom, to_start: bool) -> DomResult<()> {
        let data = dom.ranges.get_mut(*self).ok_or(DomError::InvalidState)?;
        data.collapse(to_start);
        Ok(())
    }

    /// Select a node (including the node itself)
    pub fn select_node(&self, dom: &mut Dom, node: NodeId) -> DomResult<()> {
        let (parent, index) = self.parent_and_index(dom, node)?;
        match dom.tree.node_type(node) {
            Some(NodeType::Document | NodeType::DocumentFragment) => return Err(DomError::InvalidNodeType),
            Some(_) => {}
            None => return Err(DomError::NotFound),
        }
        self.adopt_for(dom, node)?;
        let previous = dom.tree.previous_sibling(node);
        let data = dom.ranges.get_mut(*self).ok_or(DomError::InvalidState)?;
        data.start.set(parent, index, previous);
        data.end.set(parent, index + 1, Some(node));
        Ok(())
    }

    /// Select the contents of a node
    pub fn select_node_contents(&self, dom: &mut Dom, node: NodeId) -> DomResult<()> {
        self.data(dom)?;
        match dom.tree.node_type(node) {
            Some(NodeType::DocumentType) => return Err(DomError::InvalidNodeType),
            Some(_) => {}
            None => return Err(DomError::NotFound),
        }
        self.adopt_for(dom, node)?;
        let data = dom.ranges.get_mut(*self).ok_or(DomError::InvalidState)?;
        data.start.set_to_start_of_node(node);
        data.end.set_to_end_of_node(&dom.tree, node);
        Ok(())
    }

    /// New live range with the same boundaries
    pub fn clone_range(&self, dom: &mut Dom) -> DomResult<Range> {
        let data = self.data(dom)?.clone();
        let document = data.owner_document;
        let range = dom.ranges.insert(data);
        if let Some(state) = dom.documents.get_mut(&document) {
            state.attach_range(range);
        }
        Ok(range)
    }

    /// Unregister the range. Later calls on this handle fail with
    /// `InvalidState`.
    pub fn detach(&self, dom: &mut Dom) -> DomResult<()> {
        let data = dom.ranges.remove(*self).ok_or(DomError::InvalidState)?;
        if let Some(state) = dom.documents.get_mut(&data.owner_document) {
            state.detach_range(*self);
        }
        tracing::debug!(slot = self.slot, "detached range");
        Ok(())
    }

    // --- Comparison ---

    /// Compare boundary points
    pub fn compare_boundary_points(&self, dom: &Dom, how: RangeCompare, source: &Range) -> DomResult<Ordering> {
        let this = self.data(dom)?;
        let other = source.data(dom)?;
        let tree = &dom.tree;
        if tree.root(this.start.container()) != tree.root(other.start.container()) {
            return Err(DomError::WrongDocument);
        }
        let (a, b) = match how {
            RangeCompare::StartToStart => (&this.start, &other.start),
            RangeCompare::StartToEnd => (&this.end, &other.start),
            RangeCompare::EndToEnd => (&this.end, &other.end),
            RangeCompare::EndToStart => (&this.start, &other.end),
        };
        compare_boundaries(tree, a, b)
    }

    /// Compare point to range: Less before start, Greater after end
    pub fn compare_point(&self, dom: &Dom, node: NodeId, offset: u32) -> DomResult<Ordering> {
        let data = self.data(dom)?;
        let tree = &dom.tree;
        if !tree.exists(node) {
            return Err(DomError::NotFound);
        }
        if tree.root(node) != tree.root(data.start.container()) {
            return Err(DomError::WrongDocument);
        }
        check_node_offset(tree, node, offset)?;
        let start = data.start.to_position(tree);
        if compare_boundary_points(tree, node, offset, start.node, start.offset)? == Ordering::Less {
            return Ok(Ordering::Less);
        }
        let end = data.end.to_position(tree);
        if compare_boundary_points(tree, node, offset, end.node, end.offset)? == Ordering::Greater {
            return Ok(Ordering::Greater);
        }
        Ok(Ordering::Equal)
    }

    /// Check if a point is in the range
    pub fn is_point_in_range(&self, dom: &Dom, node: NodeId, offset: u32) -> DomResult<bool> {
        let data = self.data(dom)?;
        let tree = &dom.tree;
        if !tree.exists(node) {
            return Err(DomError::NotFound);
        }
        if tree.root(node) != tree.root(data.start.container()) {
            return Ok(false);
        }
        Ok(self.compare_point(dom, node, offset)? == Ordering::Equal)
    }

    /// Whether any part of `node` lies inside the range
    pub fn intersects_node(&self, dom: &Dom, node: NodeId) -> DomResult<bool> {
        let data = self.data(dom)?;
        let tree = &dom.tree;
        if !tree.exists(node) {
            return Err(DomError::NotFound);
        }
        if tree.root(node) != tree.root(data.start.container()) {
            return Ok(false);
        }
        let Some(parent) = tree.parent(node) else {
            return Ok(true);
        };
        let index = tree.index(node);
        let start = data.start.to_position(tree);
        let end = data.end.to_position(tree);
        let before_end = compare_boundary_points(tree, parent, index, end.node, end.offset)? == Ordering::Less;
        let after_start =
            compare_boundary_points(tree, parent, index + 1, start.node, start.offset)? == Ordering::Greater;
        Ok(before_end && after_start)
    }

    // --- Traversal ---

    /// First node in tree order inside the range
    pub fn first_node(&self, dom: &Dom) -> Option<NodeId> {
        let data = self.data(dom).ok()?;
        let tree = &dom.tree;
        let container = data.start.container();
        if tree.node_type(container)?.offset_in_characters() {
            return Some(container);
        }
        if let Some(child) = data.start.child_at_offset(tree) {
            return Some(child);
        }
        if data.start.offset(tree) == 0 {
            return Some(container);
        }
        traversal::next_skipping_children(tree, container, None)
    }

    /// First node in tree order after the range
    pub fn past_last_node(&self, dom: &Dom) -> Option<NodeId> {
        let data = self.data(dom).ok()?;
        let tree = &dom.tree;
        let container = data.end.container();
        if tree.node_type(container)?.offset_in_characters() {
            return traversal::next_skipping_children(tree, container, None);
        }
        if let Some(child) = data.end.child_at_offset(tree) {
            return Some(child);
        }
        traversal::next_skipping_children(tree, container, None)
    }

    /// Text of the text and CDATA nodes in the range
    pub fn to_string(&self, dom: &Dom) -> String {
        let mut out = String::new();
        let Ok(data) = self.data(dom) else {
            return out;
        };
        let tree = &dom.tree;
        let past_last = self.past_last_node(dom);
        let mut n = self.first_node(dom);
        while let Some(node) = n {
            if Some(node) == past_last {
                break;
            }
            if let Some(text) = tree.node(node).character_data()
                && tree.node(node).node_type().is_text_like()
            {
                let length = tree.length(node);
                let start = if node == data.start.container() {
                    data.start.offset(tree).min(length)
                } else {
                    0
                };
                let end = if node == data.end.container() {
                    data.end.offset(tree).clamp(start, length)
                } else {
                    length
                };
                out.push_str(substring(text, start, end - start));
            }
            n = traversal::next(tree, node, None);
        }
        out
    }

    // --- Content editing ---

    /// Remove the range's contents from the tree
    pub fn delete_contents(&self, dom: &mut Dom) -> DomResult<()> {
        self.process_contents(dom, ContentsAction::Delete).map(|_| ())
    }

    /// Move the range's contents into a new fragment
    pub fn extract_contents(&self, dom: &mut Dom) -> DomResult<NodeId> {
        self.process_contents(dom, ContentsAction::Extract)?
            .ok_or(DomError::InvalidState)
    }

    /// Copy the range's contents into a new fragment
    pub fn clone_contents(&self, dom: &mut Dom) -> DomResult<NodeId> {
        self.process_contents(dom, ContentsAction::Clone)?
            .ok_or(DomError::InvalidState)
    }

    fn process_contents(&self, dom: &mut Dom, action: ContentsAction) -> DomResult<Option<NodeId>> {
        let data = self.data(dom)?.clone();
        let tree = &dom.tree;
        let (start_container, start_offset) = (data.start.container(), data.start.offset(tree));
        let (end_container, end_offset) = (data.end.container(), data.end.offset(tree));
        let common_root = tree
            .common_ancestor(start_container, end_container)
            .ok_or(DomError::WrongDocument)?;

        let fragment = match action {
            ContentsAction::Delete => None,
            ContentsAction::Extract | ContentsAction::Clone => {
                Some(dom.create_document_fragment(data.owner_document)?)
            }
        };
        if data.is_collapsed(&dom.tree) {
            return Ok(fragment);
        }

        // from here on the tree is being edited and hook code may interfere;
        // stop early and hand back what was gathered
        let outcome = if start_container == end_container {
            process_contents_between_offsets(dom, action, fragment, start_container, start_offset, end_offset)
                .map(|_| ())
        } else {
            self.process_partial_contents(
                dom,
                action,
                fragment,
                common_root,
                (start_container, start_offset),
                (end_container, end_offset),
            )
        };
        if let Err(error) = outcome {
            tracing::debug!(%error, ?action, "range contents processing stopped early");
        }
        Ok(fragment)
    }

    fn process_partial_contents(
        &self,
        dom: &mut Dom,
        action: ContentsAction,
        fragment: Option<NodeId>,
        common_root: NodeId,
        (start_container, start_offset): (NodeId, u32),
        (end_container, end_offset): (NodeId, u32),
    ) -> DomResult<()> {
        let partial_start = highest_ancestor_under(&dom.tree, start_container, common_root);
        let partial_end = highest_ancestor_under(&dom.tree, end_container, common_root);

        let mut left_contents = None;
        if start_container != common_root && dom.tree.contains(common_root, start_container) {
            let length = dom.tree.length(start_container);
            left_contents =
                process_contents_between_offsets(dom, action, None, start_container, start_offset, length)?;
            left_contents = process_ancestors_and_their_siblings(
                dom,
                action,
                start_container,
                Direction::Forward,
                left_contents,
                common_root,
            )?;
        }

        let mut right_contents = None;
        if end_container != common_root && dom.tree.contains(common_root, end_container) {
            right_contents = process_contents_between_offsets(dom, action, None, end_container, 0, end_offset)?;
            right_contents = process_ancestors_and_their_siblings(
                dom,
                action,
                end_container,
                Direction::Backward,
                right_contents,
                common_root,
            )?;
        }

        let mut process_start =
            child_of_common_root_before_offset(&dom.tree, start_container, start_offset, common_root);
        if let Some(node) = process_start
            && start_container != common_root
        {
            process_start = dom.tree.next_sibling(node);
        }
        let process_end = child_of_common_root_before_offset(&dom.tree, end_container, end_offset, common_root);

        // collapse outside any partially selected node
        if action != ContentsAction::Clone {
            let data = dom.ranges.get_mut(*self).ok_or(DomError::InvalidState)?;
            match (partial_start, partial_end) {
                (Some(start), _) if dom.tree.contains(common_root, start) => {
                    data.start.set_to_after_child(&dom.tree, start);
                }
                (_, Some(end)) if dom.tree.contains(common_root, end) => {
                    data.start.set_to_before_child(&dom.tree, end);
                }
                _ => {}
            }
            data.collapse(true);
        }

        if let (Some(fragment), Some(left)) = (fragment, left_contents) {
            dom.append_child(fragment, left)?;
        }

        let mut nodes = Vec::new();
        let mut n = process_start;
        while let Some(node) = n {
            if Some(node) == process_end {
                break;
            }
            nodes.push(node);
            n = dom.tree.next_sibling(node);
        }
        process_nodes(dom, action, nodes, common_root, fragment)?;

        if let (Some(fragment), Some(right)) = (fragment, right_contents) {
            dom.append_child(fragment, right)?;
        }
        Ok(())
    }

    /// Insert a node at the start of the range
    pub fn insert_node(&self, dom: &mut Dom, node: NodeId) -> DomResult<()> {
        let data = self.data(dom)?;
        if !dom.tree.exists(node) {
            return Err(DomError::NotFound);
        }
        let start_container = data.start.container();
        let start_offset = data.start.offset(&dom.tree);
        let start_child_before = data.start.child_before();
        let collapsed = data.is_collapsed(&dom.tree);

        let node_type = dom.tree.node(node).node_type();
        if node_type == NodeType::Document || dom.tree.node(node).is_shadow_root() {
            return Err(DomError::InvalidNodeType);
        }

        let start_type = dom.tree.node(start_container).node_type();
        if matches!(start_type, NodeType::Comment | NodeType::ProcessingInstruction) {
            return Err(DomError::HierarchyRequest);
        }
        let start_is_text = start_type.is_text_like();
        let check_against = if start_is_text {
            dom.tree.parent(start_container).ok_or(DomError::HierarchyRequest)?
        } else {
            start_container
        };
        if !dom.node_type_allowed_under(check_against, node) {
            return Err(DomError::HierarchyRequest);
        }
        if dom.tree.contains(node, start_container) {
            return Err(DomError::HierarchyRequest);
        }

        let inserted_count = if node_type == NodeType::DocumentFragment {
            dom.tree.child_count(node)
        } else {
            1
        };
        let (first_inserted, last_inserted) = if node_type == NodeType::DocumentFragment {
            (dom.tree.first_child(node), dom.tree.last_child(node))
        } else {
            (Some(node), Some(node))
        };

        if start_is_text {
            let new_text = dom.split_text(start_container, start_offset)?;
            let parent = dom.tree.parent(new_text).ok_or(DomError::HierarchyRequest)?;
            dom.insert_before(parent, node, Some(new_text))?;
            if collapsed && dom.tree.parent(new_text).is_some() {
                let data = dom.ranges.get_mut(*self).ok_or(DomError::InvalidState)?;
                data.end.set_to_before_child(&dom.tree, new_text);
            }
        } else {
            // re-inserting what sits right before the start is a no-op
            if last_inserted.is_some()
                && last_inserted == start_child_before
                && let Some(first) = first_inserted
            {
                let data = dom.ranges.get_mut(*self).ok_or(DomError::InvalidState)?;
                data.start.set_to_before_child(&dom.tree, first);
            }
            let mut reference = dom.tree.child_at(start_container, start_offset);
            if reference == Some(node) {
                reference = dom.tree.next_sibling(node);
            }
            dom.insert_before(start_container, node, reference)?;
            if collapsed
                && inserted_count > 0
                && let Some(last) = last_inserted
                && dom.tree.parent(last) == Some(start_container)
            {
                let data = dom.ranges.get_mut(*self).ok_or(DomError::InvalidState)?;
                data.end.set_to_after_child(&dom.tree, last);
            }
        }
        Ok(())
    }

    /// Wrap the range's contents in `new_parent`
    pub fn surround_contents(&self, dom: &mut Dom, new_parent: NodeId) -> DomResult<()> {
        let data = self.data(dom)?;
        if !dom.tree.exists(new_parent) {
            return Err(DomError::NotFound);
        }
        let tree = &dom.tree;
        let non_text = |container: NodeId| {
            if tree.node(container).node_type().is_text_like() {
                tree.parent(container)
            } else {
                Some(container)
            }
        };
        if non_text(data.start.container()) != non_text(data.end.container()) {
            return Err(DomError::InvalidState);
        }
        match tree.node(new_parent).node_type() {
            NodeType::Document | NodeType::DocumentType | NodeType::DocumentFragment => {
                return Err(DomError::InvalidNodeType);
            }
            _ => {}
        }

        let start_container = data.start.container();
        let check_against = non_text(start_container).ok_or(DomError::HierarchyRequest)?;
        if !dom.node_type_allowed_under(check_against, new_parent) {
            return Err(DomError::HierarchyRequest);
        }
        if dom.tree.contains(new_parent, start_container) {
            return Err(DomError::HierarchyRequest);
        }

        dom.remove_children(new_parent);
        let fragment = self.extract_contents(dom)?;
        self.insert_node(dom, new_parent)?;
        dom.append_child(new_parent, fragment)?;
        self.select_node(dom, new_parent)
    }
}

/// Handle the part of one container between two offsets
fn process_contents_between_offsets(
    dom: &mut Dom,
    action: ContentsAction,
    fragment: Option<NodeId>,
    container: NodeId,
    start_offset: u32,
    end_offset: u32,
) -> DomResult<Option<NodeId>> {
    let node_type = dom.tree.node_type(container).ok_or(DomError::NotFound)?;
    let mut result = None;

    if node_type.offset_in_characters() {
        let length = dom.tree.length(container);
        let end_offset = end_offset.min(length);
        let start_offset = start_offset.min(end_offset);
        if action != ContentsAction::Delete {
            let copy = dom.shallow_clone(container);
            let text = dom.substring_data(container, start_offset, end_offset - start_offset)?;
            dom.tree.replace_character_data(copy, text);
            result = match fragment {
                Some(fragment) => {
                    dom.append_child(fragment, copy)?;
                    Some(fragment)
                }
                None => Some(copy),
            };
        }
        if action != ContentsAction::Clone {
            dom.delete_data(container, start_offset, end_offset - start_offset)?;
        }
        return Ok(result);
    }

    if action != ContentsAction::Delete {
        result = match fragment {
            Some(fragment) => Some(fragment),
            None => Some(dom.clone_node(container, false)?),
        };
    }
    let mut nodes = Vec::new();
    let mut n = dom.tree.child_at(container, start_offset);
    for _ in start_offset..end_offset {
        let Some(node) = n else {
            break;
        };
        nodes.push(node);
        n = dom.tree.next_sibling(node);
    }
    process_nodes(dom, action, nodes, container, result)?;
    Ok(result)
}

fn process_nodes(
    dom: &mut Dom,
    action: ContentsAction,
    nodes: Vec<NodeId>,
    old_container: NodeId,
    new_container: Option<NodeId>,
) -> DomResult<()> {
    for node in nodes {
        match (action, new_container) {
            (ContentsAction::Delete, _) => {
                dom.remove_child(old_container, node)?;
            }
            (ContentsAction::Extract, Some(target)) => {
                dom.append_child(target, node)?;
            }
            (ContentsAction::Clone, Some(target)) => {
                let copy = dom.clone_node(node, true)?;
                dom.append_child(target, copy)?;
            }
            (_, None) => {}
        }
    }
    Ok(())
}

/// Walk from `container` up to (not including) `common_root`, cloning each
/// ancestor around the contents gathered so far and processing the siblings
/// on the selected side of the path
fn process_ancestors_and_their_siblings(
    dom: &mut Dom,
    action: ContentsAction,
    container: NodeId,
    direction: Direction,
    cloned_container: Option<NodeId>,
    common_root: NodeId,
) -> DomResult<Option<NodeId>> {
    let mut ancestors = Vec::new();
    let mut n = dom.tree.parent(container);
    while let Some(node) = n {
        if node == common_root {
            break;
        }
        ancestors.push(node);
        n = dom.tree.parent(node);
    }

    let mut cloned = cloned_container;
    let mut first_to_process = sibling_in(&dom.tree, container, direction);
    for ancestor in ancestors {
        if action != ContentsAction::Delete {
            let copy = dom.clone_node(ancestor, false)?;
            if let Some(inner) = cloned {
                dom.append_child(copy, inner)?;
            }
            cloned = Some(copy);
        }

        if let Some(first) = first_to_process
            && dom.tree.parent(first) != Some(ancestor)
        {
            tracing::debug!(%ancestor, "tree changed under range processing");
            break;
        }

        let mut siblings = Vec::new();
        let mut s = first_to_process;
        while let Some(sibling) = s {
            siblings.push(sibling);
            s = sibling_in(&dom.tree, sibling, direction);
        }

        for child in siblings {
            match (action, cloned) {
                (ContentsAction::Delete, _) => {
                    dom.remove_child(ancestor, child)?;
                }
                (ContentsAction::Extract, Some(target)) => match direction {
                    Direction::Forward => {
                        dom.append_child(target, child)?;
                    }
                    Direction::Backward => {
                        let first = dom.tree.first_child(target);
                        dom.insert_before(target, child, first)?;
                    }
                },
                (ContentsAction::Clone, Some(target)) => {
                    let copy = dom.clone_node(child, true)?;
                    match direction {
                        Direction::Forward => {
                            dom.append_child(target, copy)?;
                        }
                        Direction::Backward => {
                            let first = dom.tree.first_child(target);
                            dom.insert_before(target, copy, first)?;
                        }
                    }
                }
                (_, None) => {}
            }
        }
        first_to_process = sibling_in(&dom.tree, ancestor, direction);
    }
    Ok(cloned)
}
