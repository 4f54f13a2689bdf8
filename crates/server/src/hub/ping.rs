//! Admin ping subsystem: one active broadcast prompt and its replies.

use chrono::Utc;
use protocol::{AdminPing, ClientId, PingResponse, ServerEvent};
use uuid::Uuid;

/// Tracks the active ping and the replies correlated to it.
#[derive(Debug, Default)]
pub struct PingState {
    current: Option<AdminPing>,
    responses: Vec<PingResponse>,
}

impl PingState {
    pub fn current(&self) -> Option<&AdminPing> {
        self.current.as_ref()
    }

    pub fn responses(&self) -> &[PingResponse] {
        &self.responses
    }

    /// Activate a new ping, superseding the old one and discarding its
    /// responses. Blank messages are rejected silently.
    pub fn submit_ping(&mut self, message: String) -> Option<ServerEvent> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }
        let ping = AdminPing {
            id: Uuid::new_v4(),
            message: message.to_string(),
            created_at: Utc::now().timestamp_millis(),
        };
        self.current = Some(ping.clone());
        self.responses.clear();
        Some(ServerEvent::AdminPing(ping))
    }

    /// Record a reply to the active ping. Blank replies and replies carrying
    /// a superseded ping id are dropped silently.
    pub fn submit_response(
        &mut self,
        responder: ClientId,
        ping_id: Uuid,
        message: String,
    ) -> Option<ServerEvent> {
        if self.current.as_ref()?.id != ping_id {
            return None;
        }
        let message = message.trim();
        if message.is_empty() {
            return None;
        }
        let response = PingResponse {
            ping_id,
            client_id: responder,
            message: message.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };
        self.responses.push(response.clone());
        Some(ServerEvent::PingResponse(response))
    }
}
