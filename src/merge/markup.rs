//! Structural merge for XML-like markup.
//!
//! Elements match by tag name plus key attribute (`android:name`, `name`,
//! `id`). Source-only elements and attributes are added to the destination;
//! when both sides set the same attribute to different values, the
//! destination's value is kept.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::MergeError;

const KEY_ATTRS: [&str; 3] = ["android:name", "name", "id"];

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The identity key of this element: the first key attribute present.
    fn identity_key(&self) -> Option<(&'static str, &str)> {
        KEY_ATTRS
            .iter()
            .find_map(|key| self.attr(key).map(|v| (*key, v)))
    }

    fn matches(&self, other: &Element) -> bool {
        if self.name != other.name {
            return false;
        }
        match (self.identity_key(), other.identity_key()) {
            (Some((ka, va)), Some((kb, vb))) => ka == kb && va == vb,
            (None, None) => true,
            _ => false,
        }
    }
}

/// Merge `source` markup into `existing` markup and serialize the result.
pub fn merge_markup(source: &str, existing: &str) -> Result<String, MergeError> {
    let (src_root, _) = parse(source)?;
    let (mut dst_root, had_prolog) = parse(existing)?;

    if src_root.name != dst_root.name {
        return Err(MergeError::Markup(format!(
            "root elements differ: <{}> vs <{}>",
            src_root.name, dst_root.name
        )));
    }

    merge_into(&mut dst_root, &src_root);

    let mut out = String::new();
    if had_prolog {
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    }
    write_element(&mut out, &dst_root, 0);
    Ok(out)
}

fn merge_into(dst: &mut Element, src: &Element) {
    // Source-only attributes are added; conflicting values keep the
    // destination's value.
    for (key, value) in &src.attrs {
        if dst.attr(key).is_none() {
            dst.attrs.push((key.clone(), value.clone()));
        }
    }

    for child in &src.children {
        match child {
            Node::Element(src_child) => {
                let matched = dst.children.iter_mut().find_map(|n| match n {
                    Node::Element(e) if e.matches(src_child) => Some(e),
                    _ => None,
                });
                match matched {
                    Some(dst_child) => merge_into(dst_child, src_child),
                    None => dst.children.push(Node::Element(src_child.clone())),
                }
            }
            Node::Text(text) => {
                let has_text = dst
                    .children
                    .iter()
                    .any(|n| matches!(n, Node::Text(t) if !t.trim().is_empty()));
                if !has_text && !text.trim().is_empty() {
                    dst.children.push(Node::Text(text.clone()));
                }
            }
            Node::Comment(_) => {}
        }
    }
}

fn parse(input: &str) -> Result<(Element, bool), MergeError> {
    let mut reader = Reader::from_str(input);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut had_prolog = false;

    loop {
        match reader.read_event() {
            Ok(Event::Decl(_)) => had_prolog = true,
            Ok(Event::Start(ref e)) => {
                stack.push(element_from(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let element = element_from(e)?;
                attach(&mut stack, &mut root, Node::Element(element))?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| MergeError::Markup("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, Node::Element(element))?;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| MergeError::Markup(e.to_string()))?;
                let text = text.trim();
                if !text.is_empty() {
                    attach(&mut stack, &mut root, Node::Text(text.to_string()))?;
                }
            }
            Ok(Event::Comment(e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                if !stack.is_empty() {
                    attach(&mut stack, &mut root, Node::Comment(text))?;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(MergeError::Markup(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(MergeError::Markup("unclosed element".into()));
    }
    root.ok_or_else(|| MergeError::Markup("no root element".into()))
        .map(|r| (r, had_prolog))
}

fn element_from(e: &quick_xml::events::BytesStart<'_>) -> Result<Element, MergeError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MergeError::Markup(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| MergeError::Markup(e.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    node: Node,
) -> Result<(), MergeError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        Node::Element(e) if root.is_none() => {
            *root = Some(e);
            Ok(())
        }
        Node::Element(_) => Err(MergeError::Markup("multiple root elements".into())),
        // Stray top-level text is ignored.
        _ => Ok(()),
    }
}

fn write_element(out: &mut String, element: &Element, depth: usize) {
    let indent = "    ".repeat(depth);
    out.push_str(&indent);
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attrs {
        out.push_str(&format!(" {}=\"{}\"", key, escape_attr(value)));
    }

    if element.children.is_empty() {
        out.push_str(" />\n");
        return;
    }

    // Text-only elements stay on one line.
    if let [Node::Text(text)] = element.children.as_slice() {
        out.push('>');
        out.push_str(&escape_text(text));
        out.push_str(&format!("</{}>\n", element.name));
        return;
    }

    out.push_str(">\n");
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(out, e, depth + 1),
            Node::Text(text) => {
                out.push_str(&"    ".repeat(depth + 1));
                out.push_str(&escape_text(text));
                out.push('\n');
            }
            Node::Comment(text) => {
                out.push_str(&"    ".repeat(depth + 1));
                out.push_str(&format!("<!--{}-->\n", text));
            }
        }
    }
    out.push_str(&indent);
    out.push_str(&format!("</{}>\n", element.name));
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

fn escape_text(value: &str) -> String {
    value.replace('&', "&amp;").replace('<', "&lt;")
}
