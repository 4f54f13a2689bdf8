//! Threaded commune: append-only message log with reactions and pins.
//!
//! Messages are never deleted during the process lifetime, so thread
//! references stay resolvable even after their author disconnects.

use crate::registry::Registry;
use chrono::Utc;
use protocol::{ClientId, CommuneMessage, ReactionEntry, ServerEvent};
use std::collections::HashMap;
use uuid::Uuid;

/// The commune message log.
#[derive(Debug, Default)]
pub struct CommuneLog {
    messages: HashMap<String, CommuneMessage>,
    /// Ids in arrival order.
    order: Vec<String>,
}

impl CommuneLog {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CommuneMessage> {
        self.messages.get(id)
    }

    /// Messages in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &CommuneMessage> {
        self.order.iter().filter_map(|id| self.messages.get(id))
    }

    /// Append a message. Blank text is dropped, mentions of unregistered
    /// identities are filtered out, and a missing id gets a generated one.
    /// A `parent_id` is carried without validation; dangling references are
    /// the reader's problem and must simply never crash.
    pub fn post(
        &mut self,
        registry: &Registry,
        author: ClientId,
        id: Option<String>,
        message: String,
        parent_id: Option<String>,
        mentions: Vec<ClientId>,
    ) -> Option<ServerEvent> {
        let text = message.trim();
        if text.is_empty() {
            return None;
        }
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let message = CommuneMessage {
            id: id.clone(),
            client_id: author,
            message: text.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            parent_id,
            mentions: mentions
                .into_iter()
                .filter(|m| registry.contains(*m))
                .collect(),
            reactions: Vec::new(),
            pinned: false,
        };
        if self.messages.insert(id.clone(), message.clone()).is_none() {
            self.order.push(id);
        }
        Some(ServerEvent::ClientMessage(message))
    }

    /// Idempotently add or remove `actor` in an emoji's actor set. Unknown
    /// message ids and blank emoji are ignored. A row whose actor set drains
    /// empty is removed entirely.
    pub fn toggle_reaction(
        &mut self,
        actor: ClientId,
        message_id: &str,
        emoji: String,
        active: bool,
    ) -> Option<ServerEvent> {
        let emoji = emoji.trim();
        if emoji.is_empty() {
            return None;
        }
        let message = self.messages.get_mut(message_id)?;

        if active {
            match message.reactions.iter_mut().find(|r| r.emoji == emoji) {
                Some(entry) => {
                    if !entry.actors.contains(&actor) {
                        entry.actors.push(actor);
                    }
                }
                None => message.reactions.push(ReactionEntry {
                    emoji: emoji.to_string(),
                    actors: vec![actor],
                }),
            }
        } else if let Some(index) = message.reactions.iter().position(|r| r.emoji == emoji) {
            let entry = &mut message.reactions[index];
            entry.actors.retain(|a| *a != actor);
            if entry.actors.is_empty() {
                message.reactions.remove(index);
            }
        }

        // Peers apply the same idempotent update instead of receiving the
        // full reaction list.
        Some(ServerEvent::CommuneReaction {
            message_id: message_id.to_string(),
            emoji: emoji.to_string(),
            actor_id: actor,
            active,
        })
    }

    /// Flip a message's pinned flag. Unknown ids are ignored.
    pub fn toggle_pin(&mut self, message_id: &str) -> Option<ServerEvent> {
        let message = self.messages.get_mut(message_id)?;
        message.pinned = !message.pinned;
        Some(ServerEvent::CommunePin {
            message_id: message_id.to_string(),
            pinned: message.pinned,
        })
    }
}
