//! Broadcast/delivery layer.
//!
//! Events are serialized once, pushed onto a single broadcast channel, and
//! filtered per connection task. The single channel gives FIFO delivery per
//! recipient; a slow or broken peer only affects its own task.

use protocol::{ClientId, ServerEvent};
use std::collections::HashSet;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Utf8Bytes;
use tracing::warn;

/// Which connections a delivery is addressed to.
#[derive(Debug, Clone)]
pub enum Recipients {
    /// Every live connection except the given ids.
    All { exclude: HashSet<ClientId> },
    /// Only the listed connections.
    Only(Vec<ClientId>),
}

/// A pre-serialized event on its way out.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub recipients: Recipients,
    pub payload: Utf8Bytes,
}

impl Delivery {
    /// Whether the connection identified by `id` should receive this payload.
    pub fn is_for(&self, id: ClientId) -> bool {
        match &self.recipients {
            Recipients::All { exclude } => !exclude.contains(&id),
            Recipients::Only(ids) => ids.contains(&id),
        }
    }
}

/// Handle the hub uses to push events out; connection tasks subscribe via
/// [`Outbound::subscribe`].
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: broadcast::Sender<Delivery>,
}

impl Outbound {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Delivery> {
        self.tx.subscribe()
    }

    /// Serialize `event` once and queue it for every live connection not in
    /// `exclude`.
    pub fn broadcast_all(&self, event: &ServerEvent, exclude: &[ClientId]) {
        self.send(
            Recipients::All {
                exclude: exclude.iter().copied().collect(),
            },
            event,
        );
    }

    /// Serialize `event` once and queue it for the listed connections only.
    pub fn send_to(&self, ids: Vec<ClientId>, event: &ServerEvent) {
        self.send(Recipients::Only(ids), event);
    }

    fn send(&self, recipients: Recipients, event: &ServerEvent) {
        let payload = match event.encode() {
            Ok(json) => json,
            Err(e) => {
                warn!("Dropping unencodable event: {e}");
                return;
            }
        };
        // Send only fails when no connection is subscribed.
        let _ = self.tx.send(Delivery {
            recipients,
            payload: payload.into(),
        });
    }
}
