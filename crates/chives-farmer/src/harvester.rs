//! Harvester connection handling and state change notifications

#[cfg(test)]
mod tests;

use crate::protocol::{HarvesterHandshake, HarvesterMessage, PublicKey};
use async_trait::async_trait;
use event_listener_primitives::{Bag, HandlerId};
use std::sync::Arc;
use tracing::{debug, info};

/// Event handler callback
pub type HandlerFn<A> = Arc<dyn Fn(&A) + Send + Sync + 'static>;
type Handler<A> = Bag<HandlerFn<A>, A>;

/// State change, consumed by UI and metrics
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    /// Name of the change, for instance `add_connection`
    pub change: String,
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Fans state changes out to registered handlers.
///
/// There are no delivery guarantees, handlers must tolerate drops and duplicates (connection
/// events are re-fired periodically as a heartbeat).
#[derive(Default, Debug)]
pub struct StateChangeNotifier {
    handlers: Handler<StateChange>,
}

impl StateChangeNotifier {
    pub fn notify(&self, change: &str, data: serde_json::Map<String, serde_json::Value>) {
        self.handlers.call_simple(&StateChange {
            change: change.to_string(),
            data,
        });
    }

    /// Subscribe to state changes, handler is removed once returned [`HandlerId`] is dropped
    pub fn on_state_change(&self, callback: HandlerFn<StateChange>) -> HandlerId {
        self.handlers.add(callback)
    }
}

/// Type of the remote end of a connection
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NodeType {
    FullNode,
    Harvester,
    Farmer,
    Timelord,
    Introducer,
    Wallet,
}

/// Connected peer, implemented by the transport layer
#[async_trait]
pub trait Peer: Send + Sync {
    fn node_type(&self) -> NodeType;

    /// Human-readable identity of the peer for logs
    fn peer_info(&self) -> String;

    async fn send_message(&self, message: HarvesterMessage) -> anyhow::Result<()>;
}

/// Performs handshakes with harvesters as they connect and reports connection changes
#[derive(Debug)]
pub struct HarvesterCoordinator {
    farmer_public_keys: Vec<PublicKey>,
    pool_public_keys: Vec<PublicKey>,
    state_change_notifier: Arc<StateChangeNotifier>,
}

impl HarvesterCoordinator {
    /// Create new instance, duplicate public keys are sent only once
    pub fn new(
        farmer_public_keys: Vec<PublicKey>,
        pool_public_keys: Vec<PublicKey>,
        state_change_notifier: Arc<StateChangeNotifier>,
    ) -> Self {
        Self {
            farmer_public_keys: dedup_preserving_order(farmer_public_keys),
            pool_public_keys: dedup_preserving_order(pool_public_keys),
            state_change_notifier,
        }
    }

    pub fn handshake(&self) -> HarvesterHandshake {
        HarvesterHandshake {
            farmer_public_keys: self.farmer_public_keys.clone(),
            pool_public_keys: self.pool_public_keys.clone(),
        }
    }

    /// Notifies about new connection and sends handshake if the peer is a harvester
    pub async fn on_connect(&self, peer: &dyn Peer) -> anyhow::Result<()> {
        self.state_change_notifier
            .notify("add_connection", Default::default());

        if peer.node_type() != NodeType::Harvester {
            return Ok(());
        }

        debug!(peer = %peer.peer_info(), "Sending handshake to harvester");
        peer.send_message(HarvesterMessage::HarvesterHandshake(self.handshake()))
            .await
    }

    pub fn on_disconnect(&self, peer: &dyn Peer) {
        info!(peer = %peer.peer_info(), "Peer disconnected");
        self.state_change_notifier
            .notify("close_connection", Default::default());
    }
}

fn dedup_preserving_order(keys: Vec<PublicKey>) -> Vec<PublicKey> {
    let mut deduplicated = Vec::with_capacity(keys.len());
    for key in keys {
        if !deduplicated.contains(&key) {
            deduplicated.push(key);
        }
    }
    deduplicated
}
