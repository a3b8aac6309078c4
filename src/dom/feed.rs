// Change feed of DOM insertions
//
// The document publishes one batch per mutation; the watcher consumes
// batches until every sender is dropped.

use super::DomNode;
use tokio::sync::mpsc;

/// Nodes added to the document by one mutation
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    pub added_nodes: Vec<DomNode>,
}

impl MutationBatch {
    pub fn added(nodes: Vec<DomNode>) -> Self {
        Self { added_nodes: nodes }
    }
}

/// Publishing half of the change feed
#[derive(Clone)]
pub struct ChangeFeedSender {
    tx: mpsc::UnboundedSender<MutationBatch>,
}

impl ChangeFeedSender {
    /// Publish a batch. Returns false once the consumer is gone.
    pub fn publish(&self, batch: MutationBatch) -> bool {
        self.tx.send(batch).is_ok()
    }
}

/// Consuming half of the change feed
pub struct ChangeFeed {
    rx: mpsc::UnboundedReceiver<MutationBatch>,
}

impl ChangeFeed {
    /// Next batch, or None when every sender has been dropped
    pub async fn next_batch(&mut self) -> Option<MutationBatch> {
        self.rx.recv().await
    }
}

pub fn change_feed() -> (ChangeFeedSender, ChangeFeed) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChangeFeedSender { tx }, ChangeFeed { rx })
}
