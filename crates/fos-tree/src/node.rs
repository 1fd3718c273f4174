//! DOM Node - Compact representation
//!
//! Links are stored as `NodeId` with the `NodeId::NONE` sentinel instead of
//! `Option<NodeId>` so that every link field stays 4 bytes. Accessors hand
//! them out as `Option`.

use crate::NodeId;

/// DOM Node - Core structure
#[derive(Debug, Clone)]
pub struct Node {
    /// Parent node (NONE if detached or a tree root)
    pub(crate) parent: NodeId,
    /// First child
    pub(crate) first_child: NodeId,
    /// Last child (for O(1) append)
    pub(crate) last_child: NodeId,
    /// Previous sibling
    pub(crate) prev_sibling: NodeId,
    /// Next sibling
    pub(crate) next_sibling: NodeId,
    /// Document that owns this node (itself for documents)
    pub(crate) owner_document: NodeId,
    /// Node-specific data
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData, owner_document: NodeId) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            owner_document,
            data,
        }
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent.to_option()
    }

    #[inline]
    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child.to_option()
    }

    #[inline]
    pub fn last_child(&self) -> Option<NodeId> {
        self.last_child.to_option()
    }

    #[inline]
    pub fn previous_sibling(&self) -> Option<NodeId> {
        self.prev_sibling.to_option()
    }

    #[inline]
    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling.to_option()
    }

    #[inline]
    pub fn owner_document(&self) -> NodeId {
        self.owner_document
    }

    #[inline]
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Node type tag
    #[inline]
    pub fn node_type(&self) -> NodeType {
        self.data.node_type()
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is text
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    #[inline]
    pub fn is_shadow_root(&self) -> bool {
        matches!(self.data, NodeData::ShadowRoot { .. })
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Character data of text, CDATA, comment and processing instruction nodes
    #[inline]
    pub fn character_data(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(s) | NodeData::CDataSection(s) | NodeData::Comment(s) => Some(s),
            NodeData::ProcessingInstruction { data, .. } => Some(data),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn character_data_mut(&mut self) -> Option<&mut String> {
        match &mut self.data {
            NodeData::Text(s) | NodeData::CDataSection(s) | NodeData::Comment(s) => Some(s),
            NodeData::ProcessingInstruction { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Node type enumeration (DOM `nodeType` values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Element,
    Text,
    CDataSection,
    ProcessingInstruction,
    Comment,
    Document,
    DocumentType,
    DocumentFragment,
}

impl NodeType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(NodeType::Element),
            3 => Some(NodeType::Text),
            4 => Some(NodeType::CDataSection),
            7 => Some(NodeType::ProcessingInstruction),
            8 => Some(NodeType::Comment),
            9 => Some(NodeType::Document),
            10 => Some(NodeType::DocumentType),
            11 => Some(NodeType::DocumentFragment),
            _ => None,
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            NodeType::Element => 1,
            NodeType::Text => 3,
            NodeType::CDataSection => 4,
            NodeType::ProcessingInstruction => 7,
            NodeType::Comment => 8,
            NodeType::Document => 9,
            NodeType::DocumentType => 10,
            NodeType::DocumentFragment => 11,
        }
    }

    /// Offsets into these nodes count characters rather than children
    #[inline]
    pub fn offset_in_characters(self) -> bool {
        match self {
            NodeType::Text
            | NodeType::CDataSection
            | NodeType::Comment
            | NodeType::ProcessingInstruction => true,
            NodeType::Element
            | NodeType::Document
            | NodeType::DocumentType
            | NodeType::DocumentFragment => false,
        }
    }

    /// Text and CDATA nodes contribute to text content
    #[inline]
    pub fn is_text_like(self) -> bool {
        matches!(self, NodeType::Text | NodeType::CDataSection)
    }
}

/// Shadow root mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowRootMode {
    #[default]
    Open,
    Closed,
}

/// Node-specific data
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root
    Document,
    /// DOCTYPE
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    /// Detached container for moving node batches
    DocumentFragment,
    /// Root of an element's shadow tree
    ShadowRoot { host: NodeId, mode: ShadowRootMode },
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// CDATA section
    CDataSection(String),
    /// Comment
    Comment(String),
    /// Processing instruction
    ProcessingInstruction { target: String, data: String },
}

impl NodeData {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeData::Document => NodeType::Document,
            NodeData::DocumentType { .. } => NodeType::DocumentType,
            NodeData::DocumentFragment | NodeData::ShadowRoot { .. } => NodeType::DocumentFragment,
            NodeData::Element(_) => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
            NodeData::CDataSection(_) => NodeType::CDataSection,
            NodeData::Comment(_) => NodeType::Comment,
            NodeData::ProcessingInstruction { .. } => NodeType::ProcessingInstruction,
        }
    }
}

/// Element-specific data
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Tag name
    pub name: String,
    /// Attributes in insertion order
    pub attrs: Vec<Attribute>,
    /// Attached shadow root
    pub(crate) shadow_root: NodeId,
}

impl ElementData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            shadow_root: NodeId::NONE,
        }
    }

    /// Get an attribute value
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(attr) = self.attrs.iter_mut().find(|a| a.name == name) {
            attr.value = value;
            return;
        }
        self.attrs.push(Attribute {
            name: name.to_string(),
            value,
        });
    }

    /// Attached shadow root, if any
    pub fn shadow_root(&self) -> Option<NodeId> {
        self.shadow_root.to_option()
    }
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Number of characters in `s`
#[inline]
pub(crate) fn char_len(s: &str) -> u32 {
    s.chars().count() as u32
}

/// Byte index of the character at `offset` (end of string if past it)
#[inline]
pub(crate) fn byte_offset(s: &str, offset: u32) -> usize {
    s.char_indices()
        .nth(offset as usize)
        .map_or(s.len(), |(i, _)| i)
}

/// Characters `[start, start + count)` of `s`, clamped to its end
pub(crate) fn substring(s: &str, start: u32, count: u32) -> &str {
    let begin = byte_offset(s, start);
    let tail = &s[begin..];
    let end = byte_offset(tail, count);
    &tail[..end]
}
