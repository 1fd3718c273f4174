//! Dom - owner of the node arena and everything attached to it
//!
//! A `Dom` holds every node of every document it created, the per-document
//! state, the live range registry, the mutation observer registry and the
//! embedder's [`DocumentHooks`].

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::mutation_scope::ChildListMutationAccumulator;
use crate::node::{ElementData, Node, NodeData, ShadowRootMode};
use crate::observer::MutationObserverRegistry;
use crate::range::RangeRegistry;
use crate::{
    DocumentHooks, DocumentState, DomConfig, DomError, DomResult, DomTree, MutationEvent,
    MutationObserverId, MutationObserverInit, MutationRecord, MutationType, NodeId, NodeType,
    traversal,
};

/// Document tree with live ranges and observers
pub struct Dom {
    pub(crate) tree: DomTree,
    pub(crate) documents: HashMap<NodeId, DocumentState>,
    pub(crate) ranges: RangeRegistry,
    pub(crate) observers: MutationObserverRegistry,
    pub(crate) accumulators: HashMap<NodeId, ChildListMutationAccumulator>,
    hooks: Option<Rc<dyn DocumentHooks>>,
    pub(crate) config: DomConfig,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dom")
            .field("nodes", &self.tree.len())
            .field("documents", &self.documents.len())
            .field("live_ranges", &self.ranges.len())
            .field("hooks", &self.hooks.is_some())
            .finish_non_exhaustive()
    }
}

impl Dom {
    /// Create an empty `Dom` with the default configuration
    pub fn new() -> Self {
        Self::with_config(DomConfig::default())
    }

    pub fn with_config(config: DomConfig) -> Self {
        Self {
            tree: DomTree::new(),
            documents: HashMap::new(),
            ranges: RangeRegistry::default(),
            observers: MutationObserverRegistry::default(),
            accumulators: HashMap::new(),
            hooks: None,
            config,
        }
    }

    pub fn config(&self) -> &DomConfig {
        &self.config
    }

    /// Read access to the node arena
    #[inline]
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Install embedder hooks, returning the previous ones
    pub fn set_hooks(&mut self, hooks: Rc<dyn DocumentHooks>) -> Option<Rc<dyn DocumentHooks>> {
        self.hooks.replace(hooks)
    }

    pub fn take_hooks(&mut self) -> Option<Rc<dyn DocumentHooks>> {
        self.hooks.take()
    }

    #[inline]
    pub(crate) fn has_hooks(&self) -> bool {
        self.hooks.is_some()
    }

    #[inline]
    pub(crate) fn wants_events(&self) -> bool {
        self.config.dispatch_mutation_events && self.hooks.is_some()
    }

    /// Run `f` against the installed hooks. Returns None when no hooks are
    /// installed. The hooks stay installed while `f` runs, so edits made
    /// from inside a hook are notified like any other edit.
    pub(crate) fn with_hooks<R>(
        &mut self,
        f: impl FnOnce(&dyn DocumentHooks, &mut Dom) -> R,
    ) -> Option<R> {
        let hooks = Rc::clone(self.hooks.as_ref()?);
        Some(f(&*hooks, self))
    }

    pub(crate) fn dispatch_event(&mut self, event: MutationEvent) {
        if !self.config.dispatch_mutation_events {
            return;
        }
        tracing::trace!(kind = ?event.event_type, target = %event.target, "mutation event");
        self.with_hooks(|hooks, dom| hooks.mutation_event(dom, &event));
    }

    pub(crate) fn verify_after_edit(&self, parent: NodeId) {
        if self.config.verify_tree_invariants {
            self.tree.verify_child_links(parent);
        }
    }

    // --- Documents ---

    /// Create a new, empty document
    pub fn create_document(&mut self, url: &str) -> NodeId {
        let id = self.tree.push(Node::new(NodeData::Document, NodeId::NONE));
        self.tree.node_mut(id).owner_document = id;
        self.documents.insert(id, DocumentState::new(url));
        tracing::debug!(document = %id, url, "created document");
        id
    }

    /// State of a document created by this `Dom`
    pub fn document(&self, document: NodeId) -> Option<&DocumentState> {
        self.documents.get(&document)
    }

    /// Tear a document down: its ranges are detached and it stops being a
    /// valid owner for new nodes. Nodes stay addressable.
    pub fn destroy_document(&mut self, document: NodeId) -> DomResult<()> {
        let mut state = self.documents.remove(&document).ok_or(DomError::NotFound)?;
        let ranges = state.take_ranges();
        for range in &ranges {
            self.ranges.remove(*range);
        }
        tracing::debug!(%document, ranges = ranges.len(), "destroyed document");
        Ok(())
    }

    fn owner_for(&self, document: NodeId) -> DomResult<NodeId> {
        if self.documents.contains_key(&document) {
            Ok(document)
        } else {
            Err(DomError::NotFound)
        }
    }

    fn create_node(&mut self, document: NodeId, data: NodeData) -> DomResult<NodeId> {
        let owner = self.owner_for(document)?;
        Ok(self.tree.push(Node::new(data, owner)))
    }

    // --- Factories ---

    pub fn create_element(&mut self, document: NodeId, name: &str) -> DomResult<NodeId> {
        self.create_node(document, NodeData::Element(ElementData::new(name)))
    }

    pub fn create_text(&mut self, document: NodeId, data: &str) -> DomResult<NodeId> {
        self.create_node(document, NodeData::Text(data.to_string()))
    }

    pub fn create_comment(&mut self, document: NodeId, data: &str) -> DomResult<NodeId> {
        self.create_node(document, NodeData::Comment(data.to_string()))
    }

    pub fn create_cdata_section(&mut self, document: NodeId, data: &str) -> DomResult<NodeId> {
        self.create_node(document, NodeData::CDataSection(data.to_string()))
    }

    pub fn create_processing_instruction(
        &mut self,
        document: NodeId,
        target: &str,
        data: &str,
    ) -> DomResult<NodeId> {
        self.create_node(document, NodeData::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        })
    }

    pub fn create_document_type(
        &mut self,
        document: NodeId,
        name: &str,
        public_id: &str,
        system_id: &str,
    ) -> DomResult<NodeId> {
        self.create_node(document, NodeData::DocumentType {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        })
    }

    pub fn create_document_fragment(&mut self, document: NodeId) -> DomResult<NodeId> {
        self.create_node(document, NodeData::DocumentFragment)
    }

    /// Attach a shadow root to an element that has none
    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowRootMode) -> DomResult<NodeId> {
        let element = self
            .tree
            .get(host)
            .ok_or(DomError::NotFound)?
            .as_element()
            .ok_or(DomError::InvalidNodeType)?;
        if element.shadow_root().is_some() {
            return Err(DomError::InvalidState);
        }
        let owner = self.tree.node(host).owner_document;
        let shadow = self.tree.push(Node::new(NodeData::ShadowRoot { host, mode }, owner));
        self.tree.set_shadow_root(host, shadow);
        tracing::debug!(%host, %shadow, ?mode, "attached shadow root");
        Ok(shadow)
    }

    /// Host element of a shadow root
    pub fn shadow_host(&self, shadow: NodeId) -> Option<NodeId> {
        match self.tree.get(shadow)?.data() {
            NodeData::ShadowRoot { host, .. } => Some(*host),
            _ => None,
        }
    }

    // --- Attributes ---

    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.tree
            .get_mut(element)
            .ok_or(DomError::NotFound)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?
            .set_attr(name, value);
        Ok(())
    }

    pub fn get_attribute(&self, element: NodeId, name: &str) -> Option<&str> {
        self.tree.get(element)?.as_element()?.get_attr(name)
    }

    /// First element in tree order under `document` with the given `id`
    pub fn get_element_by_id(&self, document: NodeId, id: &str) -> Option<NodeId> {
        traversal::descendants(&self.tree, document).find(|&n| {
            self.tree
                .node(n)
                .as_element()
                .and_then(|el| el.get_attr("id"))
                == Some(id)
        })
    }

    // --- Cloning ---

    /// Copy `node` (and, when `deep`, its subtree) into a new detached
    /// tree owned by the same document. Cloning a document yields a new
    /// document.
    pub fn clone_node(&mut self, node: NodeId, deep: bool) -> DomResult<NodeId> {
        if !self.tree.exists(node) {
            return Err(DomError::NotFound);
        }
        let copy = if self.tree.node_type(node) == Some(NodeType::Document) {
            let url = self
                .documents
                .get(&node)
                .map(|state| state.url().to_string())
                .unwrap_or_default();
            self.create_document(&url)
        } else {
            self.shallow_clone(node)
        };
        if deep {
            let owner = self.tree.node(copy).owner_document;
            let mut pending = vec![(node, copy)];
            while let Some((source, target)) = pending.pop() {
                let children: Vec<NodeId> = self.tree.children(source).collect();
                for child in children {
                    let data = self.tree.clone_data(child);
                    let cloned = self.tree.push(Node::new(data, owner));
                    self.tree.append_child_common(target, cloned);
                    pending.push((child, cloned));
                }
            }
        }
        Ok(copy)
    }

    /// Detached copy of a single node, same owner document
    pub(crate) fn shallow_clone(&mut self, node: NodeId) -> NodeId {
        let data = self.tree.clone_data(node);
        let owner = self.tree.node(node).owner_document;
        self.tree.push(Node::new(data, owner))
    }

    // --- Mutation observers ---

    pub fn create_mutation_observer(&mut self) -> MutationObserverId {
        self.observers.create()
    }

    pub fn observe(
        &mut self,
        observer: MutationObserverId,
        target: NodeId,
        init: MutationObserverInit,
    ) -> DomResult<()> {
        if !self.tree.exists(target) {
            return Err(DomError::NotFound);
        }
        if !init.child_list && !init.character_data && !init.character_data_old_value {
            return Err(DomError::InvalidState);
        }
        self.observers.observe(observer, target, init)
    }

    pub fn disconnect(&mut self, observer: MutationObserverId) -> DomResult<()> {
        self.observers.disconnect(observer)
    }

    /// Drain the records queued for `observer`
    pub fn take_records(&mut self, observer: MutationObserverId) -> DomResult<Vec<MutationRecord>> {
        self.observers.take_records(observer)
    }

    pub fn unregister_mutation_observer(&mut self, observer: MutationObserverId) {
        self.observers.unregister(observer);
    }

    pub(crate) fn enqueue_character_data_record(&mut self, target: NodeId, old_value: &str) {
        let interests = self
            .observers
            .interested(&self.tree, target, MutationType::CharacterData);
        if interests.is_empty() {
            return;
        }
        let record = MutationRecord::character_data(target, Some(old_value.to_string()));
        self.observers
            .enqueue(&interests, &record, self.config.max_pending_records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factories_set_owner_document() {
        let mut dom = Dom::new();
        let doc = dom.create_document("https://example.com/");
        let div = dom.create_element(doc, "div").unwrap();
        let text = dom.create_text(doc, "hi").unwrap();

        assert_eq!(dom.tree().owner_document(doc), Some(doc));
        assert_eq!(dom.tree().owner_document(div), Some(doc));
        assert_eq!(dom.tree().character_data(text), Some("hi"));
        assert_eq!(dom.document(doc).unwrap().url(), "https://example.com/");
    }

    #[test]
    fn test_factory_rejects_unknown_document() {
        let mut dom = Dom::new();
        let doc = dom.create_document("about:blank");
        let div = dom.create_element(doc, "div").unwrap();
        assert_eq!(dom.create_element(div, "span"), Err(DomError::NotFound));
    }

    #[test]
    fn test_attach_shadow_once() {
        let mut dom = Dom::new();
        let doc = dom.create_document("about:blank");
        let host = dom.create_element(doc, "div").unwrap();
        let shadow = dom.attach_shadow(host, ShadowRootMode::Open).unwrap();

        assert!(dom.tree().get(shadow).unwrap().is_shadow_root());
        assert_eq!(dom.shadow_host(shadow), Some(host));
        assert_eq!(dom.attach_shadow(host, ShadowRootMode::Open), Err(DomError::InvalidState));
    }

    #[test]
    fn test_deep_clone_copies_subtree() {
        let mut dom = Dom::new();
        let doc = dom.create_document("about:blank");
        let div = dom.create_element(doc, "div").unwrap();
        dom.set_attribute(div, "class", "box").unwrap();
        let text = dom.create_text(doc, "content").unwrap();
        dom.append_child(div, text).unwrap();

        let shallow = dom.clone_node(div, false).unwrap();
        assert!(!dom.tree().has_children(shallow));
        assert_eq!(dom.get_attribute(shallow, "class"), Some("box"));

        let deep = dom.clone_node(div, true).unwrap();
        assert_eq!(dom.tree().text_content(deep), "content");
        assert_ne!(dom.tree().first_child(deep), Some(text));
        assert_eq!(dom.tree().parent(deep), None);
    }

    #[test]
    fn test_get_element_by_id() {
        let mut dom = Dom::new();
        let doc = dom.create_document("about:blank");
        let html = dom.create_element(doc, "html").unwrap();
        let p = dom.create_element(doc, "p").unwrap();
        dom.set_attribute(p, "id", "intro").unwrap();
        dom.append_child(doc, html).unwrap();
        dom.append_child(html, p).unwrap();

        assert_eq!(dom.get_element_by_id(doc, "intro"), Some(p));
        assert_eq!(dom.get_element_by_id(doc, "missing"), None);
    }

    #[test]
    fn test_destroy_document_detaches_ranges() {
        let mut dom = Dom::new();
        let doc = dom.create_document("about:blank");
        let range = dom.create_range(doc).unwrap();
        assert_eq!(dom.document(doc).unwrap().live_ranges(), &[range]);

        dom.destroy_document(doc).unwrap();
        assert!(range.is_detached(&dom));
        assert!(dom.document(doc).is_none());
        assert_eq!(dom.destroy_document(doc), Err(DomError::NotFound));
    }
}
