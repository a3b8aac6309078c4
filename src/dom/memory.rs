// In-memory DOM
//
// A minimal element tree for hosts without a browser: enough structure for
// placeholder lookup, content replacement and insertion notifications.
// Markup set through `set_inner_html` is stored verbatim, not parsed.

use super::feed::{change_feed, ChangeFeed, ChangeFeedSender, MutationBatch};
use super::{escape_html, DomElement, DomNode, ElementRef};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Default)]
struct Content {
    markup: String,
    children: Vec<DomNode>,
}

pub struct MemoryElement {
    tag: String,
    attributes: Vec<(String, String)>,
    content: Mutex<Content>,
}

impl MemoryElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            content: Mutex::new(Content::default()),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.retain(|(n, _)| n != name);
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_child(self, node: DomNode) -> Self {
        self.append_child(node);
        self
    }

    pub fn into_ref(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn append_child(&self, node: DomNode) {
        self.lock().children.push(node);
    }

    pub fn children(&self) -> Vec<DomNode> {
        self.lock().children.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Content> {
        self.content.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DomElement for MemoryElement {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn get_attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn set_inner_html(&self, html: &str) {
        let mut content = self.lock();
        content.children.clear();
        content.markup = html.to_string();
    }

    fn inner_html(&self) -> String {
        let (markup, children) = {
            let content = self.lock();
            (content.markup.clone(), content.children.clone())
        };
        let mut html = markup;
        for child in &children {
            html.push_str(&child.to_html());
        }
        html
    }

    fn outer_html(&self) -> String {
        let mut html = format!("<{}", self.tag);
        for (name, value) in &self.attributes {
            html.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
        }
        html.push('>');
        if !self.can_have_children() {
            return html;
        }
        html.push_str(&self.inner_html());
        html.push_str(&format!("</{}>", self.tag));
        html
    }

    fn query_selector_all(&self, tag: &str) -> Vec<ElementRef> {
        let children = self.children();
        let mut found = Vec::new();
        for child in children {
            if let DomNode::Element(element) = child {
                if element.matches(tag) {
                    found.push(element.clone());
                }
                found.extend(element.query_selector_all(tag));
            }
        }
        found
    }

    fn can_have_children(&self) -> bool {
        !VOID_TAGS.contains(&self.tag.as_str())
    }
}

/// A document tree that publishes insertions to an optional change feed
pub struct MemoryDocument {
    root: Arc<MemoryElement>,
    feed: Option<ChangeFeedSender>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            root: MemoryElement::new("html").into_ref(),
            feed: None,
        }
    }

    /// A document whose insertions are published on the returned feed
    pub fn observed() -> (Self, ChangeFeed) {
        let (sender, feed) = change_feed();
        let document = Self {
            root: MemoryElement::new("html").into_ref(),
            feed: Some(sender),
        };
        (document, feed)
    }

    pub fn root(&self) -> ElementRef {
        self.root.clone()
    }

    pub fn root_element(&self) -> &Arc<MemoryElement> {
        &self.root
    }

    /// Append `nodes` under `parent` as a single mutation
    pub fn insert(&self, parent: &MemoryElement, nodes: Vec<DomNode>) {
        for node in &nodes {
            parent.append_child(node.clone());
        }
        if let Some(feed) = &self.feed {
            if !feed.publish(MutationBatch::added(nodes)) {
                log::debug!("Change feed closed, insertion not observed");
            }
        }
    }

    /// Append `nodes` directly under the document root
    pub fn insert_at_root(&self, nodes: Vec<DomNode>) {
        let root = self.root.clone();
        self.insert(&root, nodes);
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}
