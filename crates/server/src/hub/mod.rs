//! Hub state: the single serialization point owning the registry and every
//! message-driven subsystem.
//!
//! All mutations — admit, remove, inbound events, the simulation tick —
//! funnel through one `Hub` behind an `Arc<RwLock<_>>` write lock, so they
//! linearize against each other and snapshots are never torn.

pub mod commune;
pub mod direct;
pub mod ping;
pub mod poll;

use crate::config::Config;
use crate::net::delivery::Outbound;
use crate::registry::Registry;
use crate::sim;
use protocol::{ClientEvent, ClientId, ServerEvent};
use tracing::{debug, info};

/// Registry plus subsystems plus the outbound fan-out handle.
pub struct Hub {
    registry: Registry,
    poll: poll::PollState,
    ping: ping::PingState,
    commune: commune::CommuneLog,
    outbound: Outbound,
}

impl Hub {
    pub fn new(config: &Config, outbound: Outbound) -> Self {
        Self {
            registry: Registry::new(config.swarm.clone()),
            poll: poll::PollState::default(),
            ping: ping::PingState::default(),
            commune: commune::CommuneLog::default(),
            outbound,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn poll(&self) -> &poll::PollState {
        &self.poll
    }

    pub fn ping(&self) -> &ping::PingState {
        &self.ping
    }

    pub fn commune(&self) -> &commune::CommuneLog {
        &self.commune
    }

    /// Admit a new connection: create its identity, tell everyone else the
    /// roster changed, and return the `init` event the connection task sends
    /// directly on its socket.
    pub fn admit_client(&mut self) -> (ClientId, ServerEvent) {
        let identity = self.registry.admit();
        let id = identity.id;
        info!("Client {id} joined the swarm ({} online)", self.registry.len());

        self.outbound.broadcast_all(
            &ServerEvent::Update {
                clients: self.registry.snapshot(),
            },
            &[id],
        );

        let init = ServerEvent::Init {
            id,
            clients: self.registry.snapshot(),
            ping: self.ping.current().cloned(),
            query: self.poll.current().cloned(),
        };
        (id, init)
    }

    /// Remove a connection. Clean close and transport error take this same
    /// path; calling it twice is harmless.
    pub fn remove_client(&mut self, id: ClientId) {
        if !self.registry.contains(id) {
            return;
        }
        self.registry.remove(id);
        info!("Client {id} left the swarm ({} online)", self.registry.len());

        self.outbound.broadcast_all(&ServerEvent::Remove { id }, &[]);
        self.outbound.broadcast_all(
            &ServerEvent::Update {
                clients: self.registry.snapshot(),
            },
            &[],
        );
    }

    /// Run one simulation step and publish the resulting snapshot.
    pub fn tick(&mut self) {
        sim::step(&mut self.registry);
        self.outbound.broadcast_all(
            &ServerEvent::Update {
                clients: self.registry.snapshot(),
            },
            &[],
        );
    }

    /// Dispatch one raw inbound frame from `sender`. Malformed payloads and
    /// unknown event types are dropped without a reply.
    pub fn handle_frame(&mut self, sender: ClientId, raw: &str) {
        match ClientEvent::decode(raw) {
            Ok(event) => self.handle_event(sender, event),
            Err(e) => debug!("Discarding frame from {sender}: {e}"),
        }
    }

    fn handle_event(&mut self, sender: ClientId, event: ClientEvent) {
        let broadcast = match event {
            ClientEvent::Vote { vote, question } => self.poll.submit_vote(sender, question, vote),
            ClientEvent::AdminQuery {
                question,
                options,
                time_to_decide,
            } => self.poll.submit_query(question, options, time_to_decide),
            ClientEvent::AdminPing { message } => self.ping.submit_ping(message),
            ClientEvent::PingResponse { ping_id, message } => {
                self.ping.submit_response(sender, ping_id, message)
            }
            ClientEvent::ClientMessage {
                id,
                message,
                parent_id,
                mentions,
            } => self
                .commune
                .post(&self.registry, sender, id, message, parent_id, mentions),
            ClientEvent::CommuneReaction {
                message_id,
                emoji,
                active,
            } => self
                .commune
                .toggle_reaction(sender, &message_id, emoji, active),
            ClientEvent::CommunePin { message_id } => self.commune.toggle_pin(&message_id),
            ClientEvent::DirectMessage { target_id, message } => {
                if let Some((recipients, event)) =
                    direct::route(&self.registry, sender, target_id, message)
                {
                    self.outbound.send_to(recipients, &event);
                }
                None
            }
        };

        if let Some(event) = broadcast {
            self.outbound.broadcast_all(&event, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::delivery::Delivery;
    use serde_json::Value;
    use tokio::sync::broadcast;
    use uuid::Uuid;

    fn test_hub() -> (Hub, broadcast::Receiver<Delivery>) {
        let outbound = Outbound::new(64);
        let rx = outbound.subscribe();
        (Hub::new(&Config::default(), outbound), rx)
    }

    fn drain(rx: &mut broadcast::Receiver<Delivery>) -> Vec<(Value, Delivery)> {
        let mut out = Vec::new();
        while let Ok(delivery) = rx.try_recv() {
            let value = serde_json::from_str(delivery.payload.as_str()).unwrap();
            out.push((value, delivery));
        }
        out
    }

    #[test]
    fn test_admit_broadcasts_roster_to_everyone_else() {
        let (mut hub, mut rx) = test_hub();
        let (first, _) = hub.admit_client();
        let (second, init) = hub.admit_client();

        let deliveries = drain(&mut rx);
        assert_eq!(deliveries.len(), 2);
        let (value, delivery) = &deliveries[1];
        assert_eq!(value["type"], "update");
        assert_eq!(value["clients"].as_array().unwrap().len(), 2);
        assert!(delivery.is_for(first));
        assert!(!delivery.is_for(second));

        match init {
            ServerEvent::Init { id, clients, .. } => {
                assert_eq!(id, second);
                assert_eq!(clients.len(), 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_init_carries_active_ping_and_query() {
        let (mut hub, _rx) = test_hub();
        let (admin, _) = hub.admit_client();
        hub.handle_frame(admin, r#"{"type":"admin-ping","message":"brief"}"#);
        hub.handle_frame(
            admin,
            r#"{"type":"admin-query","question":"Go/No-go","options":["Go","No-go"],"timeToDecide":5}"#,
        );

        let (_, init) = hub.admit_client();
        match init {
            ServerEvent::Init { ping, query, .. } => {
                assert_eq!(ping.unwrap().message, "brief");
                assert_eq!(query.unwrap().question, "Go/No-go");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_remove_broadcasts_remove_then_update() {
        let (mut hub, mut rx) = test_hub();
        let (id, _) = hub.admit_client();
        drain(&mut rx);

        hub.remove_client(id);
        hub.remove_client(id);

        let deliveries = drain(&mut rx);
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].0["type"], "remove");
        assert_eq!(deliveries[0].0["id"], id.to_string());
        assert_eq!(deliveries[1].0["type"], "update");
        assert_eq!(deliveries[1].0["clients"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_malformed_frames_are_dropped_silently() {
        let (mut hub, mut rx) = test_hub();
        let (id, _) = hub.admit_client();
        drain(&mut rx);

        hub.handle_frame(id, "{broken json");
        hub.handle_frame(id, r#"{"type":"warp-drive","engage":true}"#);
        hub.handle_frame(id, r#"{"type":"vote"}"#);

        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_go_no_go_scenario() {
        let (mut hub, mut rx) = test_hub();
        let (admin, _) = hub.admit_client();
        let (x, _) = hub.admit_client();
        let (_y, _) = hub.admit_client();
        drain(&mut rx);

        hub.handle_frame(
            admin,
            r#"{"type":"admin-query","question":"Go/No-go","options":["Go","No-go"],"timeToDecide":5}"#,
        );
        hub.handle_frame(x, r#"{"type":"vote","vote":"Go"}"#);
        hub.handle_frame(x, r#"{"type":"vote","vote":"No-go"}"#);

        assert_eq!(hub.poll().vote_of(x), Some("No-go"));

        // A new query supersedes the old one and clears its votes.
        let (late, _) = hub.admit_client();
        drain(&mut rx);
        hub.handle_frame(
            admin,
            r#"{"type":"admin-query","question":"Ship it?","options":["Yes","No"],"timeToDecide":5}"#,
        );
        assert_eq!(hub.poll().vote_count(), 0);
        assert_eq!(hub.poll().vote_of(x), None);

        let deliveries = drain(&mut rx);
        assert_eq!(deliveries.last().unwrap().0["question"], "Ship it?");

        // The 4th identity still votes on the superseded question; dropped.
        hub.handle_frame(
            late,
            r#"{"type":"vote","vote":"Go","question":"Go/No-go"}"#,
        );
        assert_eq!(hub.poll().vote_count(), 0);
        assert_eq!(hub.poll().vote_of(late), None);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_vote_broadcast_carries_voter_and_question() {
        let (mut hub, mut rx) = test_hub();
        let (admin, _) = hub.admit_client();
        drain(&mut rx);

        hub.handle_frame(
            admin,
            r#"{"type":"admin-query","question":"Go/No-go","options":["Go","No-go"]}"#,
        );
        hub.handle_frame(admin, r#"{"type":"vote","vote":"Go"}"#);

        let deliveries = drain(&mut rx);
        let vote = &deliveries.last().unwrap().0;
        assert_eq!(vote["type"], "vote");
        assert_eq!(vote["id"], admin.to_string());
        assert_eq!(vote["question"], "Go/No-go");
        assert_eq!(vote["vote"], "Go");
    }

    #[test]
    fn test_stale_ping_response_is_not_broadcast() {
        let (mut hub, mut rx) = test_hub();
        let (admin, _) = hub.admit_client();
        let (responder, _) = hub.admit_client();
        drain(&mut rx);

        hub.handle_frame(admin, r#"{"type":"admin-ping","message":"first"}"#);
        let stale_id = hub.ping().current().unwrap().id;
        hub.handle_frame(admin, r#"{"type":"admin-ping","message":"second"}"#);
        drain(&mut rx);

        hub.handle_frame(
            responder,
            &format!(r#"{{"type":"ping-response","pingId":"{stale_id}","message":"late"}}"#),
        );

        assert!(hub.ping().responses().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_direct_message_reaches_exactly_two() {
        let (mut hub, mut rx) = test_hub();
        let (a, _) = hub.admit_client();
        let (b, _) = hub.admit_client();
        let (c, _) = hub.admit_client();
        drain(&mut rx);

        hub.handle_frame(
            a,
            &format!(r#"{{"type":"direct-message","targetId":"{b}","message":"hi"}}"#),
        );

        let deliveries = drain(&mut rx);
        assert_eq!(deliveries.len(), 1);
        let (value, delivery) = &deliveries[0];
        assert_eq!(value["type"], "direct-message");
        assert!(delivery.is_for(a));
        assert!(delivery.is_for(b));
        assert!(!delivery.is_for(c));
    }

    #[test]
    fn test_direct_message_to_departed_target_is_dropped() {
        let (mut hub, mut rx) = test_hub();
        let (a, _) = hub.admit_client();
        let (b, _) = hub.admit_client();
        hub.remove_client(b);
        drain(&mut rx);

        hub.handle_frame(
            a,
            &format!(r#"{{"type":"direct-message","targetId":"{b}","message":"hi"}}"#),
        );

        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_reaction_round_trip_through_frames() {
        let (mut hub, mut rx) = test_hub();
        let (author, _) = hub.admit_client();
        let (reactor, _) = hub.admit_client();
        drain(&mut rx);

        hub.handle_frame(
            author,
            r#"{"type":"client-message","id":"m1","message":"hello"}"#,
        );
        hub.handle_frame(
            reactor,
            r#"{"type":"commune-reaction","messageId":"m1","emoji":"🔥","active":true}"#,
        );
        hub.handle_frame(
            reactor,
            r#"{"type":"commune-reaction","messageId":"m1","emoji":"🔥","active":true}"#,
        );

        let message = hub.commune().get("m1").unwrap();
        assert_eq!(message.reactions.len(), 1);
        assert_eq!(message.reactions[0].actors, vec![reactor]);

        let deliveries = drain(&mut rx);
        let last = &deliveries.last().unwrap().0;
        assert_eq!(last["type"], "commune-reaction");
        assert_eq!(last["actorId"], reactor.to_string());
        assert_eq!(last["active"], true);
    }

    #[test]
    fn test_commune_log_outlives_disconnected_author() {
        let (mut hub, mut rx) = test_hub();
        let (author, _) = hub.admit_client();
        let (replier, _) = hub.admit_client();
        drain(&mut rx);

        hub.handle_frame(
            author,
            r#"{"type":"client-message","id":"root","message":"thread start"}"#,
        );
        hub.handle_frame(
            replier,
            r#"{"type":"client-message","id":"leaf","message":"reply","parentId":"root"}"#,
        );
        hub.remove_client(author);

        assert_eq!(hub.commune().len(), 2);
        assert_eq!(
            hub.commune().get("leaf").unwrap().parent_id.as_deref(),
            Some("root")
        );
        drain(&mut rx);
    }

    #[test]
    fn test_tick_broadcasts_snapshot_to_all() {
        let (mut hub, mut rx) = test_hub();
        let (a, _) = hub.admit_client();
        drain(&mut rx);

        hub.tick();

        let deliveries = drain(&mut rx);
        assert_eq!(deliveries.len(), 1);
        let (value, delivery) = &deliveries[0];
        assert_eq!(value["type"], "update");
        assert!(delivery.is_for(a));
        assert!(delivery.is_for(Uuid::new_v4()));
    }
}
