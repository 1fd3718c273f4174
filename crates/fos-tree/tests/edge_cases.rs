//! Edge case tests for fos-tree
//!
//! Hook reentrancy, detached handles, unicode offsets and the less common
//! node kinds.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fos_tree::markup::serialize_node;
use fos_tree::{
    BoundaryPoint, ChildChange, ChildChangeKind, ChildChangeSource, Dom, DomConfig, DomError, DocumentHooks,
    InsertionOutcome, MutationEvent, MutationEventType, MutationObserverInit, NodeId, ShadowRootMode,
};

type Log<T> = Rc<RefCell<Vec<T>>>;

fn new_doc() -> (Dom, NodeId) {
    let mut dom = Dom::new();
    let doc = dom.create_document("about:blank");
    (dom, doc)
}

// ============================================================================
// HOOKS
// ============================================================================

struct EventLog(Log<(MutationEventType, NodeId)>);

impl DocumentHooks for EventLog {
    fn mutation_event(&self, _dom: &mut Dom, event: &MutationEvent) {
        self.0.borrow_mut().push((event.event_type, event.target));
    }
}

#[test]
fn test_event_order_for_connected_insert() {
    let (mut dom, doc) = new_doc();
    let body = dom.create_element(doc, "body").unwrap();
    dom.append_child(doc, body).unwrap();
    let div = dom.create_element(doc, "div").unwrap();
    let span = dom.create_element(doc, "span").unwrap();
    dom.append_child(div, span).unwrap();

    let log: Log<_> = Rc::default();
    dom.set_hooks(Rc::new(EventLog(log.clone())));
    dom.append_child(body, div).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            (MutationEventType::NodeInserted, div),
            (MutationEventType::NodeInsertedIntoDocument, div),
            (MutationEventType::NodeInsertedIntoDocument, span),
            (MutationEventType::SubtreeModified, body),
        ]
    );

    log.borrow_mut().clear();
    dom.remove_child(body, div).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![
            (MutationEventType::NodeRemoved, div),
            (MutationEventType::NodeRemovedFromDocument, div),
            (MutationEventType::NodeRemovedFromDocument, span),
            (MutationEventType::SubtreeModified, body),
        ]
    );
}

#[test]
fn test_quiet_config_fires_no_events() {
    let mut dom = Dom::with_config(DomConfig::quiet());
    let doc = dom.create_document("about:blank");
    let log: Log<_> = Rc::default();
    dom.set_hooks(Rc::new(EventLog(log.clone())));

    let div = dom.create_element(doc, "div").unwrap();
    dom.append_child(doc, div).unwrap();
    let text = dom.create_text(doc, "x").unwrap();
    dom.append_child(div, text).unwrap();
    dom.set_data(text, "y").unwrap();

    assert!(log.borrow().is_empty());
}

/// Moves a fragment's second child elsewhere as soon as the first one lands
struct Thief {
    victim: NodeId,
    hideout: NodeId,
    done: Cell<bool>,
}

impl DocumentHooks for Thief {
    fn children_changed(&self, dom: &mut Dom, _parent: NodeId, change: &ChildChange) {
        if self.done.get() || !change.is_insertion() {
            return;
        }
        self.done.set(true);
        dom.append_child(self.hideout, self.victim).unwrap();
    }
}

#[test]
fn test_hook_moving_pending_fragment_child() {
    let (mut dom, doc) = new_doc();
    let target = dom.create_element(doc, "div").unwrap();
    let hideout = dom.create_element(doc, "aside").unwrap();
    let fragment = dom.create_document_fragment(doc).unwrap();
    let [a, b, c] = ["a", "b", "c"].map(|name| dom.create_element(doc, name).unwrap());
    for child in [a, b, c] {
        dom.append_child(fragment, child).unwrap();
    }

    dom.set_hooks(Rc::new(Thief {
        victim: b,
        hideout,
        done: Cell::new(false),
    }));
    dom.append_child(target, fragment).unwrap();

    // insertion stops at the first node that is no longer free to insert
    assert_eq!(dom.tree().children(target).collect::<Vec<_>>(), vec![a]);
    assert_eq!(dom.tree().children(hideout).collect::<Vec<_>>(), vec![b]);
    assert_eq!(dom.tree().parent(c), None);
    assert!(!dom.tree().has_children(fragment));
    for node in [target, hideout, fragment] {
        dom.tree().verify_child_links(node);
    }
}

/// Prunes the subtree being notified and records what it saw
struct Pruner {
    seen: Log<NodeId>,
    finished: Log<NodeId>,
}

impl DocumentHooks for Pruner {
    fn inserted_into_ancestor(&self, dom: &mut Dom, node: NodeId, _insertion_point: NodeId) -> InsertionOutcome {
        self.seen.borrow_mut().push(node);
        if let Some(child) = dom.tree().first_child(node) {
            dom.remove_child(node, child).unwrap();
        }
        InsertionOutcome::NeedsPostInsertionCallback
    }

    fn did_finish_inserting_subtree(&self, _dom: &mut Dom, node: NodeId) {
        self.finished.borrow_mut().push(node);
    }
}

#[test]
fn test_insertion_notification_skips_pruned_nodes() {
    let (mut dom, doc) = new_doc();
    let root = dom.create_element(doc, "main").unwrap();
    let section = dom.create_element(doc, "section").unwrap();
    let first = dom.create_element(doc, "h1").unwrap();
    let second = dom.create_element(doc, "p").unwrap();
    dom.append_child(section, first).unwrap();
    dom.append_child(section, second).unwrap();

    let seen: Log<NodeId> = Rc::default();
    let finished: Log<NodeId> = Rc::default();
    dom.set_hooks(Rc::new(Pruner {
        seen: seen.clone(),
        finished: finished.clone(),
    }));
    dom.append_child(root, section).unwrap();

    assert_eq!(*seen.borrow(), vec![section, second]);
    assert_eq!(*finished.borrow(), vec![section, second]);
    assert_eq!(dom.tree().children(section).collect::<Vec<_>>(), vec![second]);
    assert_eq!(dom.tree().parent(first), None);
}

/// Moves a node elsewhere when its removal is announced
struct Rescuer {
    node: NodeId,
    shelter: NodeId,
    fired: Cell<bool>,
}

impl DocumentHooks for Rescuer {
    fn mutation_event(&self, dom: &mut Dom, event: &MutationEvent) {
        if event.event_type != MutationEventType::NodeRemoved || event.target != self.node {
            return;
        }
        if !self.fired.replace(true) {
            dom.append_child(self.shelter, self.node).unwrap();
        }
    }
}

#[test]
fn test_normalize_keeps_going_when_hook_moves_empty_text() {
    let (mut dom, doc) = new_doc();
    let p = dom.create_element(doc, "p").unwrap();
    let empty = dom.create_text(doc, "").unwrap();
    let em = dom.create_element(doc, "em").unwrap();
    let left = dom.create_text(doc, "a").unwrap();
    let right = dom.create_text(doc, "b").unwrap();
    let shelter = dom.create_element(doc, "aside").unwrap();
    for child in [empty, em] {
        dom.append_child(p, child).unwrap();
    }
    dom.append_child(em, left).unwrap();
    dom.append_child(em, right).unwrap();

    dom.set_hooks(Rc::new(Rescuer {
        node: empty,
        shelter,
        fired: Cell::new(false),
    }));
    dom.normalize(p);

    assert_eq!(dom.tree().children(shelter).collect::<Vec<_>>(), vec![empty]);
    assert_eq!(dom.tree().children(p).collect::<Vec<_>>(), vec![em]);
    assert_eq!(dom.tree().children(em).collect::<Vec<_>>(), vec![left]);
    assert_eq!(dom.tree().character_data(left), Some("ab"));
}

/// Appends a spare node to every parent that gains some other child
struct Nested {
    calls: Log<ChildChangeKind>,
    inserted: Log<NodeId>,
    spare: NodeId,
}

impl DocumentHooks for Nested {
    fn children_changed(&self, dom: &mut Dom, parent: NodeId, change: &ChildChange) {
        self.calls.borrow_mut().push(change.kind);
        if change.changed != Some(self.spare) {
            dom.append_child(parent, self.spare).unwrap();
        }
    }

    fn inserted_into_ancestor(&self, _dom: &mut Dom, node: NodeId, _insertion_point: NodeId) -> InsertionOutcome {
        self.inserted.borrow_mut().push(node);
        InsertionOutcome::Done
    }
}

#[test]
fn test_edits_from_hooks_are_notified() {
    let (mut dom, doc) = new_doc();
    let parent = dom.create_element(doc, "div").unwrap();
    let child = dom.create_element(doc, "p").unwrap();
    let spare = dom.create_text(doc, "spare").unwrap();

    let calls: Log<_> = Rc::default();
    let inserted: Log<_> = Rc::default();
    dom.set_hooks(Rc::new(Nested {
        calls: calls.clone(),
        inserted: inserted.clone(),
        spare,
    }));
    dom.append_child(parent, child).unwrap();

    assert_eq!(dom.tree().children(parent).collect::<Vec<_>>(), vec![child, spare]);
    assert_eq!(
        *calls.borrow(),
        vec![ChildChangeKind::ElementInserted, ChildChangeKind::NonElementInserted]
    );
    // the nested insertion is notified before the outer call returns
    assert_eq!(*inserted.borrow(), vec![spare, child]);
}

/// Logs the source of every child-list change
struct Sources(Log<ChildChangeSource>);

impl DocumentHooks for Sources {
    fn children_changed(&self, _dom: &mut Dom, _parent: NodeId, change: &ChildChange) {
        self.0.borrow_mut().push(change.source);
    }
}

#[test]
fn test_parser_paths_report_parser_source() {
    let (mut dom, doc) = new_doc();
    let log: Log<_> = Rc::default();
    dom.set_hooks(Rc::new(Sources(log.clone())));

    let html = dom.create_element(doc, "html").unwrap();
    let head = dom.create_element(doc, "head").unwrap();
    let body = dom.create_element(doc, "body").unwrap();
    dom.parser_append_child(doc, html);
    dom.parser_append_child(html, body);
    dom.parser_insert_before(html, head, body);
    dom.parser_remove_child(html, head);
    dom.append_child(html, head).unwrap();

    assert_eq!(dom.tree().children(html).collect::<Vec<_>>(), vec![body, head]);
    assert_eq!(
        *log.borrow(),
        vec![
            ChildChangeSource::Parser,
            ChildChangeSource::Parser,
            ChildChangeSource::Parser,
            ChildChangeSource::Parser,
            ChildChangeSource::Api,
        ]
    );
}

// ============================================================================
// RANGES
// ============================================================================

#[test]
fn test_detached_range_handle() {
    let (mut dom, doc) = new_doc();
    let range = dom.create_range(doc).unwrap();
    let copy = range.clone_range(&mut dom).unwrap();
    range.detach(&mut dom).unwrap();

    assert_eq!(range.start(&dom), Err(DomError::InvalidState));
    assert_eq!(range.end_offset(&dom), 0);
    assert!(range.collapsed(&dom));
    assert_eq!(range.to_string(&dom), "");
    assert_eq!(range.collapse(&mut dom, true), Err(DomError::InvalidState));
    assert_eq!(range.clone_contents(&mut dom), Err(DomError::InvalidState));

    assert!(!copy.is_detached(&dom));
    assert_eq!(dom.document(doc).unwrap().live_ranges(), &[copy]);
}

#[test]
fn test_unknown_document_has_no_ranges() {
    let (mut dom, doc) = new_doc();
    let element = dom.create_element(doc, "div").unwrap();
    assert_eq!(dom.create_range(element).err(), Some(DomError::NotFound));
}

#[test]
fn test_range_moves_to_other_document() {
    let (mut dom, doc) = new_doc();
    let other = dom.create_document("about:other");
    let text = dom.create_text(other, "elsewhere").unwrap();
    let range = dom.create_range(doc).unwrap();

    range.set_end(&mut dom, text, 4).unwrap();

    assert_eq!(range.owner_document(&dom), Some(other));
    assert!(range.collapsed(&dom));
    assert_eq!(range.start(&dom).unwrap(), BoundaryPoint::new(text, 4));
    assert!(dom.document(doc).unwrap().live_ranges().is_empty());
    assert_eq!(dom.document(other).unwrap().live_ranges(), &[range]);
}

#[test]
fn test_offsets_count_characters() {
    let (mut dom, doc) = new_doc();
    let text = dom.create_text(doc, "naïve café").unwrap();
    let range = dom.create_range(doc).unwrap();
    range.set_start(&mut dom, text, 6).unwrap();
    range.set_end(&mut dom, text, 10).unwrap();

    assert_eq!(range.to_string(&dom), "café");
    assert_eq!(range.set_end(&mut dom, text, 11), Err(DomError::IndexSize));
}

#[test]
fn test_split_text_moves_boundaries() {
    let (mut dom, doc) = new_doc();
    let p = dom.create_element(doc, "p").unwrap();
    let text = dom.create_text(doc, "abcdef").unwrap();
    dom.append_child(p, text).unwrap();
    let range = dom.create_range(doc).unwrap();
    range.set_start(&mut dom, text, 1).unwrap();
    range.set_end(&mut dom, text, 5).unwrap();
    let after = dom.create_range(doc).unwrap();
    after.set_start(&mut dom, p, 1).unwrap();

    let tail = dom.split_text(text, 3).unwrap();

    assert_eq!(range.start(&dom).unwrap(), BoundaryPoint::new(text, 1));
    assert_eq!(range.end(&dom).unwrap(), BoundaryPoint::new(tail, 2));
    assert_eq!(range.to_string(&dom), "bcde");
    assert_eq!(after.start(&dom).unwrap(), BoundaryPoint::new(p, 2));
}

#[test]
fn test_normalize_moves_boundaries() {
    let (mut dom, doc) = new_doc();
    let p = dom.create_element(doc, "p").unwrap();
    let left = dom.create_text(doc, "ab").unwrap();
    let right = dom.create_text(doc, "cd").unwrap();
    dom.append_child(p, left).unwrap();
    dom.append_child(p, right).unwrap();
    let range = dom.create_range(doc).unwrap();
    range.set_start(&mut dom, right, 1).unwrap();
    range.set_end(&mut dom, p, 2).unwrap();

    dom.normalize(p);

    assert_eq!(dom.tree().children(p).collect::<Vec<_>>(), vec![left]);
    assert_eq!(range.start(&dom).unwrap(), BoundaryPoint::new(left, 3));
    assert_eq!(range.end(&dom).unwrap(), BoundaryPoint::new(p, 1));
    assert_eq!(range.to_string(&dom), "d");
}

#[test]
fn test_remove_children_moves_boundaries_to_container() {
    let (mut dom, doc) = new_doc();
    let list = dom.create_element(doc, "ul").unwrap();
    let item = dom.create_element(doc, "li").unwrap();
    let text = dom.create_text(doc, "entry").unwrap();
    dom.append_child(list, item).unwrap();
    dom.append_child(item, text).unwrap();
    let range = dom.create_range(doc).unwrap();
    range.set_start(&mut dom, text, 2).unwrap();
    range.set_end(&mut dom, list, 1).unwrap();

    dom.remove_children(list);

    assert_eq!(range.start(&dom).unwrap(), BoundaryPoint::new(list, 0));
    assert_eq!(range.end(&dom).unwrap(), BoundaryPoint::new(list, 0));
}

#[test]
fn test_insert_fragment_into_collapsed_range() {
    let (mut dom, doc) = new_doc();
    let div = dom.create_element(doc, "div").unwrap();
    let existing = dom.create_element(doc, "hr").unwrap();
    dom.append_child(div, existing).unwrap();
    let fragment = dom.create_document_fragment(doc).unwrap();
    let [x, y] = ["i", "em"].map(|name| dom.create_element(doc, name).unwrap());
    dom.append_child(fragment, x).unwrap();
    dom.append_child(fragment, y).unwrap();

    let range = dom.create_range(doc).unwrap();
    range.set_start(&mut dom, div, 0).unwrap();
    range.insert_node(&mut dom, fragment).unwrap();

    assert_eq!(dom.tree().children(div).collect::<Vec<_>>(), vec![x, y, existing]);
    assert_eq!(range.start(&dom).unwrap(), BoundaryPoint::new(div, 0));
    assert_eq!(range.end(&dom).unwrap(), BoundaryPoint::new(div, 2));
}

#[test]
fn test_insert_node_already_before_start() {
    let (mut dom, doc) = new_doc();
    let div = dom.create_element(doc, "div").unwrap();
    let [a, b] = ["a", "b"].map(|name| dom.create_element(doc, name).unwrap());
    dom.append_child(div, a).unwrap();
    dom.append_child(div, b).unwrap();
    let range = dom.create_range(doc).unwrap();
    range.set_start(&mut dom, div, 1).unwrap();

    range.insert_node(&mut dom, a).unwrap();

    assert_eq!(dom.tree().children(div).collect::<Vec<_>>(), vec![a, b]);
    assert_eq!(range.start(&dom).unwrap(), BoundaryPoint::new(div, 0));
    assert_eq!(range.end(&dom).unwrap(), BoundaryPoint::new(div, 1));
}

#[test]
fn test_removing_ancestor_moves_boundaries_to_parent() {
    let (mut dom, doc) = new_doc();
    let div = dom.create_element(doc, "div").unwrap();
    let h = dom.create_element(doc, "h2").unwrap();
    let p = dom.create_element(doc, "p").unwrap();
    let text = dom.create_text(doc, "inner").unwrap();
    dom.append_child(div, h).unwrap();
    dom.append_child(div, p).unwrap();
    dom.append_child(p, text).unwrap();
    let range = dom.create_range(doc).unwrap();
    range.set_start(&mut dom, text, 1).unwrap();
    range.set_end(&mut dom, text, 2).unwrap();

    dom.remove_child(div, p).unwrap();

    assert_eq!(range.start(&dom).unwrap(), BoundaryPoint::new(div, 1));
    assert_eq!(range.end(&dom).unwrap(), BoundaryPoint::new(div, 1));
    assert!(range.collapsed(&dom));
}

#[test]
fn test_text_deletion_over_boundary_clamps() {
    let (mut dom, doc) = new_doc();
    let text = dom.create_text(doc, "0123456789ab").unwrap();
    let range = dom.create_range(doc).unwrap();
    range.set_start(&mut dom, text, 2).unwrap();
    range.set_end(&mut dom, text, 9).unwrap();

    dom.delete_data(text, 1, 3).unwrap();

    assert_eq!(dom.tree().character_data(text), Some("0456789ab"));
    assert_eq!(range.start(&dom).unwrap(), BoundaryPoint::new(text, 1));
    assert_eq!(range.end(&dom).unwrap(), BoundaryPoint::new(text, 6));
    assert_eq!(range.to_string(&dom), "45678");
}

/// Empties a text node the first time anything is inserted
struct Truncate {
    text: NodeId,
    fired: Cell<bool>,
}

impl DocumentHooks for Truncate {
    fn mutation_event(&self, dom: &mut Dom, event: &MutationEvent) {
        if event.event_type != MutationEventType::NodeInserted || self.fired.replace(true) {
            return;
        }
        dom.set_data(self.text, "").unwrap();
    }
}

#[test]
fn test_extract_stopped_by_hook_returns_partial_fragment() {
    let (mut dom, doc) = new_doc();
    let p = dom.create_element(doc, "p").unwrap();
    let text = dom.create_text(doc, "hello").unwrap();
    dom.append_child(p, text).unwrap();
    let range = dom.create_range(doc).unwrap();
    range.set_start(&mut dom, text, 1).unwrap();
    range.set_end(&mut dom, text, 4).unwrap();

    dom.set_hooks(Rc::new(Truncate {
        text,
        fired: Cell::new(false),
    }));
    let fragment = range.extract_contents(&mut dom).unwrap();

    // the copy made it into the fragment; deleting from the emptied source did not happen
    assert_eq!(serialize_node(&dom, fragment), "ell");
    assert_eq!(dom.tree().character_data(text), Some(""));
    assert_eq!(range.start(&dom).unwrap(), BoundaryPoint::new(text, 0));
    assert!(range.collapsed(&dom));
}

#[test]
fn test_insert_node_into_comment_is_rejected() {
    let (mut dom, doc) = new_doc();
    let comment = dom.create_comment(doc, "note").unwrap();
    let div = dom.create_element(doc, "div").unwrap();
    dom.append_child(div, comment).unwrap();
    let range = dom.create_range(doc).unwrap();
    range.set_start(&mut dom, comment, 2).unwrap();
    let span = dom.create_element(doc, "span").unwrap();

    assert_eq!(range.insert_node(&mut dom, span), Err(DomError::HierarchyRequest));
    assert_eq!(dom.tree().parent(span), None);
}

#[test]
fn test_select_node_contents_rejects_doctype() {
    let (mut dom, doc) = new_doc();
    let doctype = dom.create_document_type(doc, "html", "", "").unwrap();
    dom.append_child(doc, doctype).unwrap();
    let range = dom.create_range(doc).unwrap();

    assert_eq!(range.select_node_contents(&mut dom, doctype), Err(DomError::InvalidNodeType));
    range.select_node(&mut dom, doctype).unwrap();
    assert_eq!(range.start(&dom).unwrap(), BoundaryPoint::new(doc, 0));
    assert_eq!(range.end(&dom).unwrap(), BoundaryPoint::new(doc, 1));
    assert_eq!(range.select_node(&mut dom, doc), Err(DomError::InvalidNodeType));
}

// ============================================================================
// DOCUMENTS AND SHADOW TREES
// ============================================================================

#[test]
fn test_document_accepts_one_element() {
    let (mut dom, doc) = new_doc();
    let html = dom.create_element(doc, "html").unwrap();
    let extra = dom.create_element(doc, "html").unwrap();
    let text = dom.create_text(doc, "stray").unwrap();
    dom.append_child(doc, html).unwrap();

    assert_eq!(dom.append_child(doc, extra), Err(DomError::HierarchyRequest));
    assert_eq!(dom.append_child(doc, text), Err(DomError::HierarchyRequest));
    assert_eq!(dom.replace_child(doc, extra, html), Ok(html));
    assert_eq!(dom.tree().children(doc).collect::<Vec<_>>(), vec![extra]);
}

#[test]
fn test_shadow_host_cannot_enter_its_shadow_tree() {
    let (mut dom, doc) = new_doc();
    let host = dom.create_element(doc, "x-widget").unwrap();
    let shadow = dom.attach_shadow(host, ShadowRootMode::Closed).unwrap();
    let inner = dom.create_element(doc, "slot").unwrap();
    dom.append_child(shadow, inner).unwrap();

    assert_eq!(dom.append_child(inner, host), Err(DomError::HierarchyRequest));
    assert_eq!(dom.shadow_host(shadow), Some(host));
    assert_eq!(serialize_node(&dom, host), "<x-widget></x-widget>");
}

#[test]
fn test_observer_queue_is_bounded() {
    let mut dom = Dom::with_config(DomConfig {
        max_pending_records: 3,
        ..DomConfig::default()
    });
    let doc = dom.create_document("about:blank");
    let text = dom.create_text(doc, "0").unwrap();
    let observer = dom.create_mutation_observer();
    dom.observe(
        observer,
        text,
        MutationObserverInit {
            character_data_old_value: true,
            ..Default::default()
        },
    )
    .unwrap();

    for i in 1..=5 {
        dom.set_data(text, &i.to_string()).unwrap();
    }

    let records = dom.take_records(observer).unwrap();
    let old: Vec<_> = records.iter().map(|r| r.old_value.clone().unwrap_or_default()).collect();
    assert_eq!(old, vec!["2", "3", "4"]);
}
