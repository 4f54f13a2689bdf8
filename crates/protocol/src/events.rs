//! Wire event definitions.
//!
//! Every frame is a UTF-8 JSON object discriminated by a kebab-case `type`
//! field; payload keys are camelCase to match the browser clients.

use crate::{ClientId, Color, Position, ProtocolError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One roster entry in `init`/`update` snapshots: `[id, position, color]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSummary(pub ClientId, pub Position, pub Color);

/// An admin-issued multiple-choice question with a decision deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub question: String,
    pub options: Vec<String>,
    /// Seconds the swarm has to decide.
    pub time_to_decide: f64,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// An admin-issued broadcast prompt expecting free-text replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPing {
    pub id: Uuid,
    pub message: String,
    pub created_at: i64,
}

/// A reply correlated to the active ping by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResponse {
    pub ping_id: Uuid,
    pub client_id: ClientId,
    pub message: String,
    pub timestamp: i64,
}

/// One reaction row on a commune message: an emoji and the identities that
/// applied it, each at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionEntry {
    pub emoji: String,
    pub actors: Vec<ClientId>,
}

/// A message in the threaded commune log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommuneMessage {
    pub id: String,
    pub client_id: ClientId,
    pub message: String,
    pub timestamp: i64,
    /// Parent message id when this is a threaded reply. The reference is not
    /// validated; a dangling id is carried as-is.
    pub parent_id: Option<String>,
    pub mentions: Vec<ClientId>,
    pub reactions: Vec<ReactionEntry>,
    pub pinned: bool,
}

/// A private message, delivered to exactly the target and the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub sender_id: ClientId,
    pub target_id: ClientId,
    pub message: String,
    pub timestamp: i64,
}

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Sent once, immediately after admission.
    Init {
        id: ClientId,
        clients: Vec<ClientSummary>,
        #[serde(skip_serializing_if = "Option::is_none")]
        ping: Option<AdminPing>,
        #[serde(skip_serializing_if = "Option::is_none")]
        query: Option<Query>,
    },
    /// Full roster snapshot, sent after any roster change and on every
    /// simulation tick.
    Update { clients: Vec<ClientSummary> },
    /// One identity left.
    Remove { id: ClientId },
    Query(Query),
    /// A recorded vote; `id` is the voter. No tally is computed server-side.
    Vote {
        id: ClientId,
        question: String,
        vote: String,
    },
    AdminPing(AdminPing),
    PingResponse(PingResponse),
    ClientMessage(CommuneMessage),
    #[serde(rename_all = "camelCase")]
    CommuneReaction {
        message_id: String,
        emoji: String,
        actor_id: ClientId,
        active: bool,
    },
    #[serde(rename_all = "camelCase")]
    CommunePin { message_id: String, pinned: bool },
    DirectMessage(DirectMessage),
}

impl ServerEvent {
    /// Serialize to a single JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Client → server events.
///
/// Extra fields are ignored; a frame that fails to decode is dropped by the
/// caller without a reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// `question` names the query the voter was looking at; when present and
    /// stale it disqualifies the vote.
    Vote {
        vote: String,
        #[serde(default)]
        question: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    AdminQuery {
        question: String,
        options: Vec<String>,
        #[serde(default = "default_time_to_decide")]
        time_to_decide: f64,
    },
    AdminPing { message: String },
    #[serde(rename_all = "camelCase")]
    PingResponse { ping_id: Uuid, message: String },
    #[serde(rename_all = "camelCase")]
    ClientMessage {
        #[serde(default)]
        id: Option<String>,
        message: String,
        #[serde(default)]
        parent_id: Option<String>,
        #[serde(default)]
        mentions: Vec<ClientId>,
    },
    #[serde(rename_all = "camelCase")]
    CommuneReaction {
        message_id: String,
        emoji: String,
        active: bool,
    },
    #[serde(rename_all = "camelCase")]
    CommunePin { message_id: String },
    #[serde(rename_all = "camelCase")]
    DirectMessage { target_id: ClientId, message: String },
}

fn default_time_to_decide() -> f64 {
    30.0
}

impl ClientEvent {
    /// Decode a single JSON text frame.
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }
}
