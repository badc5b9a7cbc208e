//! Message reconciliation.
//!
//! Merges the canonical message list with a batch of freshly arrived messages.
//! Identity is resolved by exact id first, then by matching an optimistic
//! placeholder on `(role, trimmed content)`. The result is ordered by
//! `created_at` ascending with a stable sort, so repeated delivery of the same
//! batch is a no-op.

use super::message::ChatMessage;

/// Merges `incoming` into `existing` and returns the ordered result.
///
/// - Exact id match: the incoming message replaces the existing one.
/// - Otherwise, the first pending message with the same role and trimmed
///   content is replaced by the incoming one (it takes the incoming id).
/// - Otherwise the incoming message is appended.
///
/// The incoming batch is first folded onto itself with the same rules, which
/// makes `merge(&merge(a, b), b) == merge(a, b)` hold even when the batch
/// contains its own placeholder together with the confirmed copy.
pub fn merge(existing: &[ChatMessage], incoming: &[ChatMessage]) -> Vec<ChatMessage> {
    let batch = fold(Vec::with_capacity(incoming.len()), incoming);
    let mut merged = fold(existing.to_vec(), &batch);
    merged.sort_by_key(ChatMessage::created_at_millis);
    merged
}

fn fold(mut target: Vec<ChatMessage>, incoming: &[ChatMessage]) -> Vec<ChatMessage> {
    for message in incoming {
        if let Some(slot) = target.iter_mut().find(|m| m.id == message.id) {
            *slot = message.clone();
            continue;
        }

        let content = message.content.trim();
        if let Some(slot) = target
            .iter_mut()
            .find(|m| m.is_pending() && m.role == message.role && m.content.trim() == content)
        {
            tracing::debug!(
                "Replacing optimistic message {} with {}",
                slot.id,
                message.id
            );
            *slot = message.clone();
            continue;
        }

        target.push(message.clone());
    }
    target
}
