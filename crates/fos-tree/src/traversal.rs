//! Node traversal
//!
//! Stateless pre-order and post-order stepping over a [`DomTree`]. Every
//! function takes an optional `stay_within` node; the walk never leaves that
//! subtree. Nothing here mutates, and a caller that edits the tree must do
//! so between steps, never while holding an iterator.

use crate::{DomTree, NodeId};

/// Next node in pre-order
pub fn next(tree: &DomTree, current: NodeId, stay_within: Option<NodeId>) -> Option<NodeId> {
    if let Some(child) = tree.first_child(current) {
        return Some(child);
    }
    next_skipping_children(tree, current, stay_within)
}

/// Next node in pre-order, not descending into `current`
pub fn next_skipping_children(
    tree: &DomTree,
    current: NodeId,
    stay_within: Option<NodeId>,
) -> Option<NodeId> {
    if Some(current) == stay_within {
        return None;
    }
    if let Some(sibling) = tree.next_sibling(current) {
        return Some(sibling);
    }
    next_ancestor_sibling(tree, current, stay_within)
}

/// Next sibling of the closest ancestor that has one
pub fn next_ancestor_sibling(
    tree: &DomTree,
    current: NodeId,
    stay_within: Option<NodeId>,
) -> Option<NodeId> {
    let mut parent = tree.parent(current);
    while let Some(p) = parent {
        if Some(p) == stay_within {
            return None;
        }
        if let Some(sibling) = tree.next_sibling(p) {
            return Some(sibling);
        }
        parent = tree.parent(p);
    }
    None
}

/// Previous node in pre-order
pub fn previous(tree: &DomTree, current: NodeId, stay_within: Option<NodeId>) -> Option<NodeId> {
    if Some(current) == stay_within {
        return None;
    }
    if let Some(sibling) = tree.previous_sibling(current) {
        return Some(last_within(tree, sibling).unwrap_or(sibling));
    }
    tree.parent(current)
}

/// Previous node in pre-order that is not an ancestor of `current`
pub fn previous_skipping_children(
    tree: &DomTree,
    current: NodeId,
    stay_within: Option<NodeId>,
) -> Option<NodeId> {
    if Some(current) == stay_within {
        return None;
    }
    if let Some(sibling) = tree.previous_sibling(current) {
        return Some(sibling);
    }
    let mut parent = tree.parent(current);
    while let Some(p) = parent {
        if Some(p) == stay_within {
            return None;
        }
        if let Some(sibling) = tree.previous_sibling(p) {
            return Some(sibling);
        }
        parent = tree.parent(p);
    }
    None
}

/// Next node in post-order
pub fn next_post_order(tree: &DomTree, current: NodeId, stay_within: Option<NodeId>) -> Option<NodeId> {
    if Some(current) == stay_within {
        return None;
    }
    let Some(mut next) = tree.next_sibling(current) else {
        return tree.parent(current);
    };
    while let Some(child) = tree.first_child(next) {
        next = child;
    }
    Some(next)
}

/// Previous node in post-order
pub fn previous_post_order(
    tree: &DomTree,
    current: NodeId,
    stay_within: Option<NodeId>,
) -> Option<NodeId> {
    if let Some(child) = tree.last_child(current) {
        return Some(child);
    }
    if Some(current) == stay_within {
        return None;
    }
    if let Some(sibling) = tree.previous_sibling(current) {
        return Some(sibling);
    }
    let mut parent = tree.parent(current);
    while let Some(p) = parent {
        if Some(p) == stay_within {
            return None;
        }
        if let Some(sibling) = tree.previous_sibling(p) {
            return Some(sibling);
        }
        parent = tree.parent(p);
    }
    None
}

/// Deepest last descendant of `current`
pub fn last_within(tree: &DomTree, current: NodeId) -> Option<NodeId> {
    let mut last = tree.last_child(current)?;
    while let Some(child) = tree.last_child(last) {
        last = child;
    }
    Some(last)
}

/// First node of `root`'s subtree in post-order
pub fn first_post_order(tree: &DomTree, root: NodeId) -> NodeId {
    let mut node = root;
    while let Some(child) = tree.first_child(node) {
        node = child;
    }
    node
}

/// The `index`-th child of `parent`
pub fn child_at(tree: &DomTree, parent: NodeId, index: u32) -> Option<NodeId> {
    let mut child = tree.first_child(parent);
    for _ in 0..index {
        child = tree.next_sibling(child?);
    }
    child
}

/// Pre-order iterator over the strict descendants of `root`
pub fn descendants(tree: &DomTree, root: NodeId) -> Descendants<'_> {
    Descendants {
        tree,
        root,
        next: tree.first_child(root),
    }
}

/// See [`descendants`]
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.next?;
        self.next = next(self.tree, cur, Some(self.root));
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ElementData, Node, NodeData};

    // root
    // ├── a
    // │   ├── a1
    // │   └── a2
    // └── b
    //     └── b1
    fn sample() -> (DomTree, [NodeId; 6]) {
        let mut tree = DomTree::new();
        let make = |tree: &mut DomTree, name: &str| {
            tree.push(Node::new(NodeData::Element(ElementData::new(name)), NodeId::NONE))
        };
        let root = make(&mut tree, "root");
        let a = make(&mut tree, "a");
        let a1 = make(&mut tree, "a1");
        let a2 = make(&mut tree, "a2");
        let b = make(&mut tree, "b");
        let b1 = make(&mut tree, "b1");
        tree.append_child_common(root, a);
        tree.append_child_common(a, a1);
        tree.append_child_common(a, a2);
        tree.append_child_common(root, b);
        tree.append_child_common(b, b1);
        (tree, [root, a, a1, a2, b, b1])
    }

    #[test]
    fn test_pre_order_walk() {
        let (tree, [root, a, a1, a2, b, b1]) = sample();
        let order: Vec<_> = descendants(&tree, root).collect();
        assert_eq!(order, vec![a, a1, a2, b, b1]);

        assert_eq!(next(&tree, a2, None), Some(b));
        assert_eq!(next(&tree, a2, Some(a)), None);
        assert_eq!(next_skipping_children(&tree, a, None), Some(b));
        assert_eq!(next(&tree, b1, None), None);
    }

    #[test]
    fn test_previous_walk() {
        let (tree, [root, a, a1, a2, b, b1]) = sample();
        assert_eq!(previous(&tree, b, None), Some(a2));
        assert_eq!(previous(&tree, a1, None), Some(a));
        assert_eq!(previous(&tree, a, None), Some(root));
        assert_eq!(previous(&tree, a, Some(a)), None);
        assert_eq!(previous_skipping_children(&tree, b1, None), Some(a));
        assert_eq!(previous_skipping_children(&tree, b1, Some(b)), None);
    }

    #[test]
    fn test_post_order_walk() {
        let (tree, [root, a, a1, a2, b, b1]) = sample();
        let mut order = vec![first_post_order(&tree, root)];
        while let Some(n) = next_post_order(&tree, *order.last().unwrap(), Some(root)) {
            order.push(n);
        }
        assert_eq!(order, vec![a1, a2, a, b1, b, root]);

        assert_eq!(previous_post_order(&tree, root, None), Some(b));
        assert_eq!(previous_post_order(&tree, b1, None), Some(a));
        assert_eq!(previous_post_order(&tree, a1, Some(a)), None);
    }

    #[test]
    fn test_child_at_and_last_within() {
        let (tree, [root, a, _a1, a2, b, b1]) = sample();
        assert_eq!(child_at(&tree, root, 0), Some(a));
        assert_eq!(child_at(&tree, root, 1), Some(b));
        assert_eq!(child_at(&tree, root, 2), None);
        assert_eq!(last_within(&tree, root), Some(b1));
        assert_eq!(last_within(&tree, a), Some(a2));
        assert_eq!(last_within(&tree, b1), None);
    }
}
