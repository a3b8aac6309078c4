// DOM Module
//
// Handles:
// - The element abstraction extensions are injected into
// - An in-memory document for hosts without a browser DOM
// - The change feed of inserted nodes
// - Placeholder scanning (injector) and reactive scanning (watcher)

pub mod feed;
pub mod injector;
pub mod memory;
pub mod watcher;

use std::fmt;
use std::sync::Arc;

pub use feed::{change_feed, ChangeFeed, ChangeFeedSender, MutationBatch};
pub use memory::{MemoryDocument, MemoryElement};
pub use watcher::DomWatcher;

/// An element that can host extension markup
pub trait DomElement: Send + Sync {
    fn tag_name(&self) -> &str;

    fn get_attribute(&self, name: &str) -> Option<String>;

    /// Replace all contents of the element with `html`
    fn set_inner_html(&self, html: &str);

    fn inner_html(&self) -> String;

    fn outer_html(&self) -> String;

    /// Descendant elements with tag `tag`, in document order. The element itself is excluded.
    fn query_selector_all(&self, tag: &str) -> Vec<ElementRef>;

    /// Whether the element may contain descendants (false for void elements)
    fn can_have_children(&self) -> bool {
        true
    }

    fn matches(&self, tag: &str) -> bool {
        self.tag_name().eq_ignore_ascii_case(tag)
    }
}

pub type ElementRef = Arc<dyn DomElement>;

/// A node inserted into the document
#[derive(Clone)]
pub enum DomNode {
    Element(ElementRef),
    Text(String),
    Comment(String),
}

impl DomNode {
    pub fn element(element: impl DomElement + 'static) -> Self {
        DomNode::Element(Arc::new(element))
    }

    pub fn as_element(&self) -> Option<&ElementRef> {
        match self {
            DomNode::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn to_html(&self) -> String {
        match self {
            DomNode::Element(element) => element.outer_html(),
            DomNode::Text(text) => escape_html(text),
            DomNode::Comment(text) => format!("<!--{}-->", text),
        }
    }
}

impl fmt::Debug for DomNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomNode::Element(element) => write!(f, "Element(<{}>)", element.tag_name()),
            DomNode::Text(text) => f.debug_tuple("Text").field(text).finish(),
            DomNode::Comment(text) => f.debug_tuple("Comment").field(text).finish(),
        }
    }
}

/// Escape text for use in HTML content or a double-quoted attribute
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("/a.html"), "/a.html");
        assert_eq!(escape_html(r#"/a"b<c>&.html"#), "/a&quot;b&lt;c&gt;&amp;.html");
    }

    #[test]
    fn test_node_helpers() {
        let node = DomNode::element(MemoryElement::new("div"));
        assert!(node.as_element().is_some());
        assert!(DomNode::Text("x".into()).as_element().is_none());
        assert_eq!(DomNode::Comment("c".into()).to_html(), "<!--c-->");
        assert_eq!(format!("{:?}", node), "Element(<div>)");
    }
}
