// DOM Injector
//
// Finds extension placeholders under the given roots and injects the
// markup extensions registered for each one.

use super::{DomElement, ElementRef};
use crate::extensions::ExtensionLoader;
use futures_util::future::join_all;

impl ExtensionLoader {
    /// Load markup extensions for every placeholder under `roots`.
    ///
    /// `None` scans the attached document. Placeholders are processed
    /// concurrently; a placeholder without an extension point is logged and
    /// skipped without affecting its siblings.
    pub async fn load_html_extensions(&self, roots: Option<&[ElementRef]>) {
        let roots: Vec<ElementRef> = match roots {
            Some(roots) => roots.to_vec(),
            None => match self.document() {
                Some(document) => vec![document.clone()],
                None => {
                    log::warn!("No document attached, nothing to scan for extensions");
                    return;
                }
            },
        };

        let tag = &self.config().placeholder_tag;
        let placeholders: Vec<ElementRef> = roots
            .iter()
            .flat_map(|root| root.query_selector_all(tag))
            .collect();

        if placeholders.is_empty() {
            return;
        }

        log::debug!("Found {} extension placeholder(s)", placeholders.len());

        join_all(
            placeholders
                .iter()
                .map(|placeholder| self.inject_placeholder(placeholder.as_ref())),
        )
        .await;
    }

    /// Load markup extensions under a single root element
    pub async fn load_html_extensions_in(&self, root: &ElementRef) {
        self.load_html_extensions(Some(std::slice::from_ref(root)))
            .await;
    }

    /// Inject markup into one placeholder, reading the extension point from its attribute
    pub(crate) async fn inject_placeholder(&self, placeholder: &dyn DomElement) {
        let attribute = &self.config().placeholder_attribute;
        match placeholder.get_attribute(attribute).filter(|id| !id.is_empty()) {
            Some(extension_point) => {
                self.import_html_extensions(&extension_point, placeholder)
                    .await
            }
            None => log::error!(
                "{} missing {} attribute: {}",
                self.config().placeholder_tag,
                attribute,
                placeholder.outer_html()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::LoaderConfig;
    use crate::dom::{DomElement, DomNode, ElementRef, MemoryDocument, MemoryElement};
    use crate::extensions::ExtensionLoader;
    use crate::testing::{self, StaticModuleLoader, StaticResolver};
    use std::sync::Arc;

    fn placeholder(id: Option<&str>) -> Arc<MemoryElement> {
        let element = MemoryElement::new("x-extension");
        match id {
            Some(id) => element.with_attribute("id", id),
            None => element,
        }
        .into_ref()
    }

    fn loader(resolver: &Arc<StaticResolver>) -> ExtensionLoader {
        ExtensionLoader::new(
            LoaderConfig::default(),
            resolver.clone(),
            Arc::new(StaticModuleLoader::new()),
        )
    }

    #[tokio::test]
    async fn test_placeholder_without_id_is_skipped_and_siblings_resolve() {
        let resolver = Arc::new(
            StaticResolver::new()
                .with("sidebar-start", &["a.html"])
                .with("sidebar-end", &["b.html"]),
        );
        let loader = loader(&resolver);

        let start = placeholder(Some("sidebar-start"));
        let broken = placeholder(None);
        let end = placeholder(Some("sidebar-end"));
        let root: ElementRef = Arc::new(
            MemoryElement::new("div")
                .with_child(DomNode::Element(start.clone()))
                .with_child(DomNode::Element(broken.clone()))
                .with_child(DomNode::Element(end.clone())),
        );

        testing::capture_logs();
        loader.load_html_extensions(Some(std::slice::from_ref(&root))).await;

        let errors = testing::logged_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("x-extension missing id attribute"));

        assert_eq!(start.inner_html(), "<x-component path=\"/a.html\"></x-component>");
        assert_eq!(end.inner_html(), "<x-component path=\"/b.html\"></x-component>");
        assert_eq!(broken.inner_html(), "");
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_id_counts_as_missing() {
        let resolver = Arc::new(StaticResolver::new());
        let loader = loader(&resolver);
        let root: ElementRef = Arc::new(
            MemoryElement::new("div").with_child(DomNode::Element(placeholder(Some("")))),
        );

        loader.load_html_extensions_in(&root).await;
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_placeholders_means_no_network() {
        let resolver = Arc::new(StaticResolver::new());
        let loader = loader(&resolver);
        let root: ElementRef = Arc::new(
            MemoryElement::new("div").with_child(DomNode::element(MemoryElement::new("p"))),
        );

        loader.load_html_extensions(Some(std::slice::from_ref(&root))).await;
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_default_roots_scan_attached_document() {
        let resolver = Arc::new(StaticResolver::new().with("chat-top-start", &["top.html"]));
        let document = MemoryDocument::new();
        let slot = placeholder(Some("chat-top-start"));
        document.insert_at_root(vec![DomNode::Element(slot.clone())]);

        let loader = loader(&resolver).with_document(document.root());
        loader.load_html_extensions(None).await;

        assert_eq!(slot.inner_html(), "<x-component path=\"/top.html\"></x-component>");
    }

    #[tokio::test]
    async fn test_missing_document_is_a_no_op() {
        let resolver = Arc::new(StaticResolver::new());
        let loader = loader(&resolver);

        loader.load_html_extensions(None).await;
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_shared_point_across_roots_is_served_from_cache() {
        let resolver = Arc::new(StaticResolver::new().with("welcome-screen-start", &["w.html"]));
        let loader = loader(&resolver);

        let first = placeholder(Some("welcome-screen-start"));
        let second = placeholder(Some("welcome-screen-start"));
        let roots: Vec<ElementRef> = vec![
            Arc::new(MemoryElement::new("main").with_child(DomNode::Element(first.clone()))),
            Arc::new(MemoryElement::new("aside").with_child(DomNode::Element(second.clone()))),
        ];

        loader.load_html_extensions(Some(&roots[..1])).await;
        assert_eq!(resolver.calls(), 1);

        loader.load_html_extensions(Some(roots.as_slice())).await;
        assert_eq!(resolver.calls(), 1);
        assert_eq!(first.inner_html(), "<x-component path=\"/w.html\"></x-component>");
        assert_eq!(second.inner_html(), first.inner_html());
    }
}
