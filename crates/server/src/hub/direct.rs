//! Direct message routing: point-to-point delivery between two identities.

use crate::registry::Registry;
use chrono::Utc;
use protocol::{ClientId, DirectMessage, ServerEvent};

/// Build the delivery for a private message: the target receives it and the
/// sender gets an echo so its own UI can confirm delivery. Unknown targets
/// and blank text are dropped silently; no third connection ever sees it.
pub fn route(
    registry: &Registry,
    sender: ClientId,
    target: ClientId,
    message: String,
) -> Option<(Vec<ClientId>, ServerEvent)> {
    if !registry.contains(target) {
        return None;
    }
    let text = message.trim();
    if text.is_empty() {
        return None;
    }
    let event = ServerEvent::DirectMessage(DirectMessage {
        sender_id: sender,
        target_id: target,
        message: text.to_string(),
        timestamp: Utc::now().timestamp_millis(),
    });
    Some((vec![target, sender], event))
}
