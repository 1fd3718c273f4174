//! Character data editing
//!
//! `replace_data` is the single primitive every text edit goes through; it
//! keeps live ranges, observers and legacy events in step. `split_text` and
//! `normalize` build on it and on the container edits.

use crate::node::{NodeData, char_len, substring};
use crate::{Dom, DomError, DomResult, MutationEvent, NodeId, NodeType, traversal};

impl Dom {
    fn data_of(&self, node: NodeId) -> DomResult<&str> {
        let node = self.tree.get(node).ok_or(DomError::NotFound)?;
        node.character_data().ok_or(DomError::InvalidNodeType)
    }

    /// Replace `count` characters at `offset` with `data`. `count` is
    /// clamped to the end of the node's data.
    pub fn replace_data(&mut self, node: NodeId, offset: u32, count: u32, data: &str) -> DomResult<()> {
        let old = self.data_of(node)?;
        let length = char_len(old);
        if offset > length {
            return Err(DomError::IndexSize);
        }
        let count = count.min(length - offset);

        let old = old.to_string();
        let mut new = String::with_capacity(old.len() + data.len());
        new.push_str(substring(&old, 0, offset));
        new.push_str(data);
        new.push_str(substring(&old, offset + count, length));
        self.tree.replace_character_data(node, new);

        if count > 0 {
            self.ranges.text_removed(node, offset, count);
        }
        let inserted = char_len(data);
        if inserted > 0 {
            self.ranges.text_inserted(node, offset, inserted);
        }
        self.enqueue_character_data_record(node, &old);

        if self.wants_events() {
            let current = self.tree.character_data(node).unwrap_or_default().to_string();
            self.dispatch_event(MutationEvent::char_data_modified(node, &old, &current));
        }
        Ok(())
    }

    pub fn set_data(&mut self, node: NodeId, data: &str) -> DomResult<()> {
        let length = char_len(self.data_of(node)?);
        self.replace_data(node, 0, length, data)
    }

    pub fn append_data(&mut self, node: NodeId, data: &str) -> DomResult<()> {
        let length = char_len(self.data_of(node)?);
        self.replace_data(node, length, 0, data)
    }

    pub fn insert_data(&mut self, node: NodeId, offset: u32, data: &str) -> DomResult<()> {
        self.replace_data(node, offset, 0, data)
    }

    pub fn delete_data(&mut self, node: NodeId, offset: u32, count: u32) -> DomResult<()> {
        self.replace_data(node, offset, count, "")
    }

    pub fn substring_data(&self, node: NodeId, offset: u32, count: u32) -> DomResult<String> {
        let data = self.data_of(node)?;
        if offset > char_len(data) {
            return Err(DomError::IndexSize);
        }
        Ok(substring(data, offset, count).to_string())
    }

    /// Split a text (or CDATA) node at `offset`. The tail becomes a new
    /// sibling right after it, which is returned.
    pub fn split_text(&mut self, node: NodeId, offset: u32) -> DomResult<NodeId> {
        let data = self.data_of(node)?;
        let node_type = self.tree.node_type(node).ok_or(DomError::NotFound)?;
        if !node_type.is_text_like() {
            return Err(DomError::InvalidNodeType);
        }
        let length = char_len(data);
        if offset > length {
            return Err(DomError::IndexSize);
        }

        let tail = substring(data, offset, length - offset).to_string();
        let owner = self.tree.node(node).owner_document;
        let new_data = match node_type {
            NodeType::CDataSection => NodeData::CDataSection(tail),
            _ => NodeData::Text(tail),
        };
        let new_node = self.tree.push(crate::Node::new(new_data, owner));

        if let Some(parent) = self.tree.parent(node) {
            let next = self.tree.next_sibling(node);
            self.insert_before(parent, new_node, next)?;
            if self.tree.next_sibling(node) == Some(new_node) {
                self.ranges.text_node_split(&self.tree, node, new_node, offset);
            }
        }

        let remaining = char_len(self.data_of(node)?);
        if offset <= remaining {
            self.replace_data(node, offset, remaining - offset, "")?;
        }
        tracing::trace!(%node, %new_node, offset, "split text");
        Ok(new_node)
    }

    /// Remove empty text nodes below `node` and merge adjacent ones
    pub fn normalize(&mut self, node: NodeId) {
        if !self.tree.exists(node) {
            return;
        }
        let mut cur = Some(traversal::first_post_order(&self.tree, node));
        while let Some(current) = cur {
            if current == node {
                break;
            }
            if self.tree.node_type(current) != Some(NodeType::Text) {
                cur = traversal::next_post_order(&self.tree, current, Some(node));
                continue;
            }

            if self.tree.length(current) == 0 {
                cur = traversal::next_post_order(&self.tree, current, Some(node));
                if let Some(parent) = self.tree.parent(current)
                    && let Err(error) = self.remove_child(parent, current)
                {
                    tracing::debug!(%error, node = %current, "could not drop empty text node");
                }
                continue;
            }

            while let Some(next) = self.tree.next_sibling(current) {
                if self.tree.node_type(next) != Some(NodeType::Text) {
                    break;
                }
                let Some(parent) = self.tree.parent(next) else {
                    break;
                };
                if self.tree.length(next) > 0 {
                    let offset = self.tree.length(current);
                    let tail = self.tree.character_data(next).unwrap_or_default().to_string();
                    if self.append_data(current, &tail).is_err() {
                        break;
                    }
                    // event handlers may have moved things around
                    if self.tree.next_sibling(current) != Some(next) {
                        break;
                    }
                    self.ranges.text_nodes_merged(&self.tree, next, offset);
                }
                if self.remove_child(parent, next).is_err() {
                    break;
                }
            }

            cur = traversal::next_post_order(&self.tree, current, Some(node));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Dom, DomError, NodeId};

    fn text_in_div(content: &str) -> (Dom, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new();
        let doc = dom.create_document("about:blank");
        let div = dom.create_element(doc, "div").unwrap();
        let text = dom.create_text(doc, content).unwrap();
        dom.append_child(div, text).unwrap();
        (dom, doc, div, text)
    }

    #[test]
    fn test_replace_data_edits() {
        let (mut dom, _doc, _div, text) = text_in_div("hello world");

        dom.insert_data(text, 5, ",").unwrap();
        assert_eq!(dom.tree().character_data(text), Some("hello, world"));
        dom.delete_data(text, 5, 100).unwrap();
        assert_eq!(dom.tree().character_data(text), Some("hello"));
        dom.append_data(text, "!").unwrap();
        dom.replace_data(text, 0, 1, "J").unwrap();
        assert_eq!(dom.tree().character_data(text), Some("Jello!"));
        assert_eq!(dom.substring_data(text, 1, 3).unwrap(), "ell");
        assert_eq!(dom.insert_data(text, 99, "x"), Err(DomError::IndexSize));
    }

    #[test]
    fn test_offsets_count_characters() {
        let (mut dom, _doc, _div, text) = text_in_div("héllo");
        dom.insert_data(text, 2, "-").unwrap();
        assert_eq!(dom.tree().character_data(text), Some("hé-llo"));
        assert_eq!(dom.tree().length(text), 6);
    }

    #[test]
    fn test_element_has_no_character_data() {
        let (mut dom, _doc, div, _text) = text_in_div("x");
        assert_eq!(dom.set_data(div, "y"), Err(DomError::InvalidNodeType));
    }

    #[test]
    fn test_split_text() {
        let (mut dom, _doc, div, text) = text_in_div("hello world");
        let tail = dom.split_text(text, 5).unwrap();

        assert_eq!(dom.tree().character_data(text), Some("hello"));
        assert_eq!(dom.tree().character_data(tail), Some(" world"));
        assert_eq!(dom.tree().children(div).collect::<Vec<_>>(), vec![text, tail]);
        assert_eq!(dom.split_text(text, 6), Err(DomError::IndexSize));
    }

    #[test]
    fn test_split_detached_text() {
        let mut dom = Dom::new();
        let doc = dom.create_document("about:blank");
        let text = dom.create_text(doc, "abcd").unwrap();
        let tail = dom.split_text(text, 1).unwrap();
        assert_eq!(dom.tree().character_data(text), Some("a"));
        assert_eq!(dom.tree().character_data(tail), Some("bcd"));
        assert_eq!(dom.tree().parent(tail), None);
    }

    #[test]
    fn test_normalize_merges_and_drops_empty() {
        let (mut dom, doc, div, text) = text_in_div("a");
        let empty = dom.create_text(doc, "").unwrap();
        let b = dom.create_text(doc, "b").unwrap();
        let span = dom.create_element(doc, "span").unwrap();
        let c = dom.create_text(doc, "c").unwrap();
        let d = dom.create_text(doc, "d").unwrap();
        dom.append_child(div, empty).unwrap();
        dom.append_child(div, b).unwrap();
        dom.append_child(div, span).unwrap();
        dom.append_child(span, c).unwrap();
        dom.append_child(span, d).unwrap();

        dom.normalize(div);

        assert_eq!(dom.tree().children(div).collect::<Vec<_>>(), vec![text, span]);
        assert_eq!(dom.tree().character_data(text), Some("ab"));
        assert_eq!(dom.tree().children(span).collect::<Vec<_>>(), vec![c]);
        assert_eq!(dom.tree().character_data(c), Some("cd"));
    }
}
