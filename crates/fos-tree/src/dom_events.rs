//! DOM Events
//!
//! Legacy mutation events. They are handed to
//! [`DocumentHooks::mutation_event`](crate::DocumentHooks::mutation_event)
//! at the points where a browser would dispatch them, which are also the
//! points where hook code may reenter the tree.

use crate::NodeId;

/// Mutation event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationEventType {
    /// `DOMNodeInserted`, targeted at the inserted child
    NodeInserted,
    /// `DOMNodeRemoved`, targeted at the child about to be removed
    NodeRemoved,
    /// `DOMNodeInsertedIntoDocument`, for every node of a connected subtree
    NodeInsertedIntoDocument,
    /// `DOMNodeRemovedFromDocument`, for every node of a connected subtree
    NodeRemovedFromDocument,
    /// `DOMSubtreeModified`, once per completed edit
    SubtreeModified,
    /// `DOMCharacterDataModified`
    CharacterDataModified,
}

/// Mutation event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEvent {
    pub event_type: MutationEventType,
    pub target: NodeId,
    pub related_node: Option<NodeId>,
    pub prev_value: Option<String>,
    pub new_value: Option<String>,
}

impl MutationEvent {
    fn new(event_type: MutationEventType, target: NodeId, related_node: Option<NodeId>) -> Self {
        Self {
            event_type,
            target,
            related_node,
            prev_value: None,
            new_value: None,
        }
    }

    /// Create node inserted event
    pub fn node_inserted(target: NodeId, parent: NodeId) -> Self {
        Self::new(MutationEventType::NodeInserted, target, Some(parent))
    }

    /// Create node removed event
    pub fn node_removed(target: NodeId, parent: NodeId) -> Self {
        Self::new(MutationEventType::NodeRemoved, target, Some(parent))
    }

    pub fn inserted_into_document(target: NodeId) -> Self {
        Self::new(MutationEventType::NodeInsertedIntoDocument, target, None)
    }

    pub fn removed_from_document(target: NodeId) -> Self {
        Self::new(MutationEventType::NodeRemovedFromDocument, target, None)
    }

    /// Create subtree modified event
    pub fn subtree_modified(target: NodeId) -> Self {
        Self::new(MutationEventType::SubtreeModified, target, None)
    }

    /// Create character data modified event
    pub fn char_data_modified(target: NodeId, old_value: &str, new_value: &str) -> Self {
        Self {
            prev_value: Some(old_value.to_string()),
            new_value: Some(new_value.to_string()),
            ..Self::new(MutationEventType::CharacterDataModified, target, None)
        }
    }

    /// Events that bubble through ancestors in a browser
    pub fn bubbles(&self) -> bool {
        !matches!(
            self.event_type,
            MutationEventType::NodeInsertedIntoDocument | MutationEventType::NodeRemovedFromDocument
        )
    }
}
