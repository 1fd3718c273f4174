//! fOS Tree - Document tree and live ranges
//!
//! Arena-backed node tree with validated structural edits, batched
//! child-list mutation records, and `Range` objects that stay valid while
//! the tree is edited underneath them.

mod boundary;
mod character_data;
mod config;
mod container;
mod document;
mod dom;
mod dom_events;
mod error;
pub mod markup;
mod mutation_scope;
mod node;
mod notifier;
mod observer;
mod range;
pub mod traversal;
mod tree;

pub use boundary::{BoundaryPoint, RangeBoundaryPoint};
pub use config::DomConfig;
pub use document::DocumentState;
pub use dom::Dom;
pub use dom_events::{MutationEvent, MutationEventType};
pub use error::{DomError, DomResult};
pub use node::{Attribute, ElementData, Node, NodeData, NodeType, ShadowRootMode};
pub use notifier::{ChildChange, ChildChangeKind, ChildChangeSource, DocumentHooks, InsertionOutcome};
pub use observer::{MutationObserverId, MutationObserverInit, MutationRecord, MutationType};
pub use range::{Range, RangeCompare, compare_boundary_points};
pub use tree::DomTree;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Sentinel for "no node" in link fields
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this refers to a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Convert the sentinel into `None`
    #[inline]
    pub fn to_option(self) -> Option<NodeId> {
        if self.is_valid() { Some(self) } else { None }
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            write!(f, "#none")
        }
    }
}

#[inline]
pub(crate) fn link(id: Option<NodeId>) -> NodeId {
    id.unwrap_or(NodeId::NONE)
}
