//! Markup serialization
//!
//! Outer markup for a node and its descendants, and markup for the contents
//! of a range. Shadow trees are not serialized.

use crate::{Dom, DomResult, DomTree, NodeData, NodeId, Range};

/// Void elements (no end tag)
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Raw text elements (content is not escaped)
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Serialize `node` including itself. Documents and fragments serialize
/// their children.
pub fn serialize_node(dom: &Dom, node: NodeId) -> String {
    let mut output = String::new();
    write_node(dom.tree(), node, false, &mut output);
    output
}

/// Serialize the children of `node`
pub fn serialize_children(dom: &Dom, node: NodeId) -> String {
    let mut output = String::new();
    write_children(dom.tree(), node, false, &mut output);
    output
}

/// Serialize what the range selects. The contents are cloned first, so the
/// tree is left as it was.
pub fn serialize_range(dom: &mut Dom, range: Range) -> DomResult<String> {
    let fragment = range.clone_contents(dom)?;
    Ok(serialize_children(dom, fragment))
}

fn write_node(tree: &DomTree, node: NodeId, raw: bool, output: &mut String) {
    let Some(n) = tree.get(node) else {
        return;
    };

    match n.data() {
        NodeData::Document | NodeData::DocumentFragment | NodeData::ShadowRoot { .. } => {
            write_children(tree, node, false, output);
        }
        NodeData::Element(el) => {
            output.push('<');
            output.push_str(&el.name);
            for attr in &el.attrs {
                output.push(' ');
                output.push_str(&attr.name);
                output.push_str("=\"");
                escape_attribute(&attr.value, output);
                output.push('"');
            }
            output.push('>');

            let tag = el.name.to_ascii_lowercase();
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            write_children(tree, node, RAW_TEXT_ELEMENTS.contains(&tag.as_str()), output);
            output.push_str("</");
            output.push_str(&el.name);
            output.push('>');
        }
        NodeData::Text(text) => {
            if raw {
                output.push_str(text);
            } else {
                escape_text(text, output);
            }
        }
        NodeData::CDataSection(text) => {
            output.push_str("<![CDATA[");
            output.push_str(text);
            output.push_str("]]>");
        }
        NodeData::Comment(text) => {
            output.push_str("<!--");
            output.push_str(text);
            output.push_str("-->");
        }
        NodeData::ProcessingInstruction { target, data } => {
            output.push_str("<?");
            output.push_str(target);
            if !data.is_empty() {
                output.push(' ');
                output.push_str(data);
            }
            output.push_str("?>");
        }
        NodeData::DocumentType { name, public_id, system_id } => {
            output.push_str("<!DOCTYPE ");
            output.push_str(name);
            if !public_id.is_empty() {
                output.push_str(" PUBLIC \"");
                output.push_str(public_id);
                output.push('"');
            }
            if !system_id.is_empty() {
                if public_id.is_empty() {
                    output.push_str(" SYSTEM");
                }
                output.push_str(" \"");
                output.push_str(system_id);
                output.push('"');
            }
            output.push('>');
        }
    }
}

fn write_children(tree: &DomTree, parent: NodeId, raw: bool, output: &mut String) {
    for child in tree.children(parent) {
        write_node(tree, child, raw, output);
    }
}

fn escape_text(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            _ => output.push(c),
        }
    }
}

fn escape_attribute(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            _ => output.push(c),
        }
    }
}
