// Web UI Extension Loader
//
// Plugins contribute files to named extension points; this crate resolves
// them, activates executable modules in an embedded JS runtime, injects
// markup into placeholders and keeps injecting as the document changes.

pub mod cache;
pub mod config;
pub mod dom;
pub mod extensions;
pub mod server;

#[cfg(test)]
mod testing;

pub use config::{LoaderConfig, ServerConfig};
pub use dom::{ChangeFeed, DomElement, DomNode, DomWatcher, ElementRef, MemoryDocument};
pub use extensions::{ActivationReport, ExtensionLoader, ExtensionResource};
pub use server::ExtensionServer;

use std::sync::Arc;
use tokio::task::JoinHandle;

/// Scan the attached document once, then keep watching `feed` for new placeholders
pub fn run(loader: Arc<ExtensionLoader>, feed: ChangeFeed) -> JoinHandle<()> {
    tokio::spawn(async move {
        log::info!("Loading markup extensions for the attached document");
        loader.load_html_extensions(None).await;

        DomWatcher::new(loader).run(feed).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryElement;
    use crate::testing::{StaticModuleLoader, StaticResolver};

    #[tokio::test]
    async fn test_run_scans_existing_and_inserted_placeholders() {
        let resolver = Arc::new(
            StaticResolver::new()
                .with("sidebar-top-wrapper-start", &["top.html"])
                .with("right-panel-start", &["panel.html"]),
        );
        let document = MemoryDocument::new();
        let existing = MemoryElement::new("x-extension")
            .with_attribute("id", "sidebar-top-wrapper-start")
            .into_ref();
        document.insert_at_root(vec![DomNode::Element(existing.clone())]);

        let (feed_sender, feed) = dom::change_feed();
        let loader = Arc::new(
            ExtensionLoader::new(
                LoaderConfig::default(),
                resolver.clone(),
                Arc::new(StaticModuleLoader::new()),
            )
            .with_document(document.root()),
        );
        let handle = run(loader, feed);

        let inserted = MemoryElement::new("x-extension")
            .with_attribute("id", "right-panel-start")
            .into_ref();
        feed_sender.publish(dom::MutationBatch::added(vec![DomNode::Element(
            inserted.clone(),
        )]));
        drop(feed_sender);
        handle.await.unwrap();

        assert_eq!(
            existing.inner_html(),
            "<x-component path=\"/top.html\"></x-component>"
        );
        assert_eq!(
            inserted.inner_html(),
            "<x-component path=\"/panel.html\"></x-component>"
        );
    }
}
