//! Merge chain: many concurrent producers, one current value
//!
//! Every registered producer gets a node and a worker. The worker stores each
//! value its producer delivers and, when the producer's channel closes,
//! unlinks its node. Queries walk the nodes newest-first under a short read
//! lock and never wait on any producer.

use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace};

use super::selector::Selector;
use crate::error::Result;
use crate::mailbox::spawn_mailbox;
use crate::port::rendezvous;

/// Identifier of a producer registered with a chain
pub type InputId = u64;

struct Node<T> {
    id: InputId,
    // None until the producer delivers for the first time
    latest: Mutex<Option<T>>,
}

struct ChainInner<T> {
    label: String,
    selector: Box<dyn Selector<T>>,
    // Most recently added first
    nodes: RwLock<Vec<Arc<Node<T>>>>,
    stops: Mutex<HashMap<InputId, Sender<()>>>,
    publish: Mutex<Sender<T>>,
}

impl<T: Clone + Send + 'static> ChainInner<T> {
    fn current(&self) -> Option<T> {
        let values: Vec<T> = {
            let nodes = self.nodes.read();
            nodes.iter().filter_map(|n| n.latest.lock().clone()).collect()
        };

        if values.is_empty() {
            return None;
        }
        self.selector.select(&values)
    }

    fn publish(&self) {
        // Compute and hand over under one lock so publications stay ordered
        let publisher = self.publish.lock();
        if let Some(value) = self.current() {
            let _ = publisher.send(value);
        }
    }

    fn unlink(&self, id: InputId) {
        self.nodes.write().retain(|n| n.id != id);
        self.stops.lock().remove(&id);
    }
}

/// Dynamically extensible merge of producer values
pub struct MergeChain<T> {
    inner: Arc<ChainInner<T>>,
    next_id: AtomicU64,
    output: Receiver<T>,
}

impl<T: Clone + Send + 'static> MergeChain<T> {
    /// Create an empty chain using `selector` to resolve competing values
    pub fn new(label: impl Into<String>, selector: impl Selector<T> + 'static) -> Result<Self> {
        let label = label.into();
        let (publish_tx, publish_rx) = rendezvous();
        let (out_tx, out_rx) = rendezvous();
        spawn_mailbox(&label, publish_rx, out_tx)?;

        Ok(Self {
            inner: Arc::new(ChainInner {
                label,
                selector: Box::new(selector),
                nodes: RwLock::new(Vec::new()),
                stops: Mutex::new(HashMap::new()),
                publish: Mutex::new(publish_tx),
            }),
            next_id: AtomicU64::new(1),
            output: out_rx,
        })
    }

    /// Register a producer. Closing the producer's sender removes it again.
    pub fn add_input(&self, producer: Receiver<T>) -> Result<InputId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let node = Arc::new(Node {
            id,
            latest: Mutex::new(None),
        });
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);

        // Linked before the worker starts, so an early close always finds its node
        self.inner.stops.lock().insert(id, stop_tx);
        self.inner.nodes.write().insert(0, node.clone());

        let inner = self.inner.clone();
        let spawned = thread::Builder::new()
            .name(format!("{}-input{}", self.inner.label, id))
            .spawn(move || run_node(inner, node, producer, stop_rx));
        if let Err(e) = spawned {
            self.inner.unlink(id);
            return Err(e.into());
        }
        debug!("{}: added input {}", self.inner.label, id);

        Ok(id)
    }

    /// Register a producer and return the sender feeding it
    pub fn open_input(&self) -> Result<(InputId, Sender<T>)> {
        let (tx, rx) = rendezvous();
        let id = self.add_input(rx)?;
        Ok((id, tx))
    }

    /// Drop a producer without waiting for it to close
    pub fn remove_input(&self, id: InputId) -> bool {
        let known = self.inner.stops.lock().remove(&id).is_some();
        if known {
            self.inner.nodes.write().retain(|n| n.id != id);
            self.inner.publish();
            debug!("{}: removed input {}", self.inner.label, id);
        }
        known
    }

    /// Current merged value, `None` when no producer has delivered
    pub fn value(&self) -> Option<T> {
        self.inner.current()
    }

    /// Receiver of the merged value, updated on every delivery or removal
    pub fn output(&self) -> Receiver<T> {
        self.output.clone()
    }

    /// Number of registered producers
    pub fn len(&self) -> usize {
        self.inner.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nodes.read().is_empty()
    }

    /// Number of producers that have delivered at least once
    pub fn available(&self) -> usize {
        self.inner
            .nodes
            .read()
            .iter()
            .filter(|n| n.latest.lock().is_some())
            .count()
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }
}

impl<T> Drop for MergeChain<T> {
    fn drop(&mut self) {
        // Disconnects every stop channel; node workers exit on their next wake
        self.inner.stops.lock().clear();
    }
}

fn run_node<T: Clone + Send + 'static>(
    chain: Arc<ChainInner<T>>,
    node: Arc<Node<T>>,
    producer: Receiver<T>,
    stop: Receiver<()>,
) {
    loop {
        select! {
            recv(producer) -> msg => match msg {
                Ok(value) => {
                    trace!("{}: input {} delivered", chain.label, node.id);
                    *node.latest.lock() = Some(value);
                    chain.publish();
                }
                Err(_) => {
                    debug!("{}: input {} closed", chain.label, node.id);
                    chain.unlink(node.id);
                    chain.publish();
                    break;
                }
            },
            recv(stop) -> _ => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::selector::{HighestTakesPrecedence, LatestTakesPrecedence};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[test]
    fn test_empty_chain_has_no_value() {
        let chain = MergeChain::<u8>::new("empty", LatestTakesPrecedence).unwrap();
        assert_eq!(chain.value(), None);
        assert!(chain.is_empty());
    }

    #[test]
    fn test_silent_producer_does_not_contribute() {
        let chain = MergeChain::<u8>::new("silent", LatestTakesPrecedence).unwrap();
        let (_id, _tx) = chain.open_input().unwrap();

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.available(), 0);
        assert_eq!(chain.value(), None);
    }

    #[test]
    fn test_zero_is_a_value() {
        let chain = MergeChain::<u8>::new("zero", LatestTakesPrecedence).unwrap();
        let out = chain.output();
        let (_id, tx) = chain.open_input().unwrap();

        tx.send(0).unwrap();
        assert_eq!(out.recv_timeout(TIMEOUT), Ok(0));
        assert_eq!(chain.value(), Some(0));
    }

    #[test]
    fn test_highest_policy() {
        let chain = MergeChain::<u8>::new("htp", HighestTakesPrecedence).unwrap();
        let out = chain.output();
        let (_a, tx_a) = chain.open_input().unwrap();
        let (_b, tx_b) = chain.open_input().unwrap();

        tx_a.send(200).unwrap();
        assert_eq!(out.recv_timeout(TIMEOUT), Ok(200));
        tx_b.send(50).unwrap();
        assert_eq!(out.recv_timeout(TIMEOUT), Ok(200));
    }

    #[test]
    fn test_remove_input() {
        let chain = MergeChain::<u8>::new("remove", LatestTakesPrecedence).unwrap();
        let out = chain.output();
        let (_a, tx_a) = chain.open_input().unwrap();
        let (b, tx_b) = chain.open_input().unwrap();

        tx_a.send(1).unwrap();
        assert_eq!(out.recv_timeout(TIMEOUT), Ok(1));
        tx_b.send(2).unwrap();
        assert_eq!(out.recv_timeout(TIMEOUT), Ok(2));

        assert!(chain.remove_input(b));
        assert!(!chain.remove_input(b));
        assert_eq!(out.recv_timeout(TIMEOUT), Ok(1));
        assert_eq!(chain.len(), 1);
    }
}
