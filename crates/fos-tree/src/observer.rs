//! DOM Observers
//!
//! MutationObserver registrations and their queued records. The registry is
//! owned by [`Dom`](crate::Dom); callers hold `MutationObserverId` handles.

use std::collections::VecDeque;

use crate::{DomError, DomResult, DomTree, NodeId};

/// Mutation observer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationObserverId(pub(crate) u32);

/// Mutation observer options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub character_data_old_value: bool,
}

impl MutationObserverInit {
    fn observes(&self, kind: MutationType) -> bool {
        match kind {
            MutationType::ChildList => self.child_list,
            MutationType::CharacterData => self.character_data || self.character_data_old_value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    CharacterData,
    ChildList,
}

/// Mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub fn child_list(
        target: NodeId,
        added_nodes: Vec<NodeId>,
        removed_nodes: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes,
            removed_nodes,
            previous_sibling,
            next_sibling,
            old_value: None,
        }
    }

    pub fn character_data(target: NodeId, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            old_value,
        }
    }
}

/// Mutation observer
#[derive(Debug, Default)]
struct MutationObserver {
    observed: Vec<(NodeId, MutationObserverInit)>,
    records: VecDeque<MutationRecord>,
}

/// Observer interested in a mutation, with the merged options that matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Interest {
    pub observer: MutationObserverId,
    pub wants_old_value: bool,
}

#[derive(Debug, Default)]
pub(crate) struct MutationObserverRegistry {
    observers: Vec<Option<MutationObserver>>,
}

impl MutationObserverRegistry {
    pub fn create(&mut self) -> MutationObserverId {
        if let Some(slot) = self.observers.iter().position(Option::is_none) {
            self.observers[slot] = Some(MutationObserver::default());
            return MutationObserverId(slot as u32);
        }
        self.observers.push(Some(MutationObserver::default()));
        MutationObserverId(self.observers.len() as u32 - 1)
    }

    fn get_mut(&mut self, id: MutationObserverId) -> DomResult<&mut MutationObserver> {
        self.observers
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(DomError::NotFound)
    }

    /// Register (or re-register with new options) interest in `target`
    pub fn observe(
        &mut self,
        id: MutationObserverId,
        target: NodeId,
        init: MutationObserverInit,
    ) -> DomResult<()> {
        let observer = self.get_mut(id)?;
        match observer.observed.iter_mut().find(|(node, _)| *node == target) {
            Some(entry) => entry.1 = init,
            None => observer.observed.push((target, init)),
        }
        Ok(())
    }

    pub fn disconnect(&mut self, id: MutationObserverId) -> DomResult<()> {
        let observer = self.get_mut(id)?;
        observer.observed.clear();
        observer.records.clear();
        Ok(())
    }

    pub fn unregister(&mut self, id: MutationObserverId) {
        if let Some(slot) = self.observers.get_mut(id.0 as usize) {
            *slot = None;
        }
    }

    pub fn take_records(&mut self, id: MutationObserverId) -> DomResult<Vec<MutationRecord>> {
        let observer = self.get_mut(id)?;
        Ok(observer.records.drain(..).collect())
    }

    /// Any registration at all for this kind of mutation
    pub fn has_observers_of(&self, kind: MutationType) -> bool {
        self.observers
            .iter()
            .flatten()
            .any(|o| o.observed.iter().any(|(_, init)| init.observes(kind)))
    }

    /// Observers registered on `target`, or on an ancestor with `subtree`
    pub fn interested(&self, tree: &DomTree, target: NodeId, kind: MutationType) -> Vec<Interest> {
        let mut result: Vec<Interest> = Vec::new();
        if !self.has_observers_of(kind) {
            return result;
        }
        let mut cur = Some(target);
        while let Some(node) = cur {
            for (index, observer) in self.observers.iter().enumerate() {
                let Some(observer) = observer else { continue };
                for (observed, init) in &observer.observed {
                    if *observed != node || !init.observes(kind) {
                        continue;
                    }
                    if node != target && !init.subtree {
                        continue;
                    }
                    let id = MutationObserverId(index as u32);
                    let wants_old_value = init.character_data_old_value;
                    match result.iter_mut().find(|i| i.observer == id) {
                        Some(existing) => existing.wants_old_value |= wants_old_value,
                        None => result.push(Interest {
                            observer: id,
                            wants_old_value,
                        }),
                    }
                }
            }
            cur = tree.parent(node);
        }
        result
    }

    /// Queue a record on each interested observer
    pub fn enqueue(&mut self, interests: &[Interest], record: &MutationRecord, max_pending: usize) {
        for interest in interests {
            let Ok(observer) = self.get_mut(interest.observer) else {
                continue;
            };
            let mut record = record.clone();
            if !interest.wants_old_value {
                record.old_value = None;
            }
            if observer.records.len() >= max_pending {
                tracing::debug!(observer = interest.observer.0, "mutation record queue full, dropping oldest");
                observer.records.pop_front();
            }
            observer.records.push_back(record);
        }
    }
}
