// DOM Watcher
//
// Consumes the change feed for the lifetime of the page and activates
// placeholders inserted after the initial scan. Each added element is
// handled in its own task so a slow resolution never holds up later
// insertions.

use super::feed::{ChangeFeed, MutationBatch};
use super::DomNode;
use crate::extensions::ExtensionLoader;
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};

pub struct DomWatcher {
    loader: Arc<ExtensionLoader>,
}

impl DomWatcher {
    pub fn new(loader: Arc<ExtensionLoader>) -> Self {
        Self { loader }
    }

    /// Start watching `feed` on the tokio runtime
    pub fn spawn(self, feed: ChangeFeed) -> JoinHandle<()> {
        tokio::spawn(self.run(feed))
    }

    /// Process batches until the feed closes, then wait for in-flight work
    pub async fn run(self, mut feed: ChangeFeed) {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                batch = feed.next_batch() => match batch {
                    Some(batch) => self.dispatch(batch, &mut tasks),
                    None => break,
                },
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = result {
                        log::error!("Extension watcher task failed: {}", e);
                    }
                }
            }
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                log::error!("Extension watcher task failed: {}", e);
            }
        }

        log::debug!("Change feed closed, extension watcher stopped");
    }

    fn dispatch(&self, batch: MutationBatch, tasks: &mut JoinSet<()>) {
        let config = self.loader.config();

        for node in batch.added_nodes {
            let element = match node {
                DomNode::Element(element) => element,
                _ => continue,
            };

            let loader = self.loader.clone();
            if element.matches(&config.placeholder_tag) {
                let extension_point = match element
                    .get_attribute(&config.placeholder_attribute)
                    .filter(|id| !id.is_empty())
                {
                    Some(extension_point) => extension_point,
                    None => continue,
                };
                tasks.spawn(async move {
                    loader
                        .import_html_extensions(&extension_point, element.as_ref())
                        .await;
                });
            } else if element.can_have_children() {
                tasks.spawn(async move {
                    loader.load_html_extensions_in(&element).await;
                });
            }
        }
    }
}
