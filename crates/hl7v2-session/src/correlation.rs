//! Message correlation and conversation tracking

use std::sync::Arc;

use hl7v2_core::{ConversationId, CorrelationId, Message};

use crate::ack::MSA_CONTROL_ID;
use crate::store::{ConversationStore, ConversationTables, MemoryStore};

/// Pairs requests with responses and groups messages into conversations.
///
/// Safe to share between threads; every operation is a single critical
/// section on the underlying store.
#[derive(Debug, Default)]
pub struct MessageCorrelationTracker<S = MemoryStore> {
    store: S,
}

impl MessageCorrelationTracker<MemoryStore> {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl<S: ConversationStore> MessageCorrelationTracker<S> {
    pub fn with_store(store: S) -> Self {
        MessageCorrelationTracker { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Link a request and its response under a new id
    pub fn correlate(&self, original: &Message, response: &Message) -> CorrelationId {
        let id = CorrelationId::generate();
        let pair = vec![Arc::new(original.clone()), Arc::new(response.clone())];
        self.store.write(|t| t.insert_correlation(id, pair));
        tracing::debug!(
            "Correlated {:?} -> {:?} as {}",
            original.control_id(),
            response.control_id(),
            id
        );
        id
    }

    /// Messages linked by `correlate`, empty if the id is unknown
    pub fn get_correlated(&self, id: CorrelationId) -> Vec<Arc<Message>> {
        self.store
            .read(|t| t.correlated(id).map(<[_]>::to_vec))
            .unwrap_or_default()
    }

    /// Open a conversation starting with `initial`
    pub fn track_conversation(&self, initial: &Message) -> ConversationId {
        let id = ConversationId::generate();
        let message = Arc::new(initial.clone());
        self.store.write(|t| t.append(id, message));
        tracing::info!("Started conversation {} with {:?}", id, initial.control_id());
        id
    }

    /// Append to a conversation. Unknown ids are created on the fly.
    pub fn add_to_conversation(&self, id: ConversationId, message: &Message) {
        let message = Arc::new(message.clone());
        self.store.write(|t| {
            if !t.has_conversation(id) {
                tracing::warn!("Conversation {} not found, creating it", id);
            }
            t.append(id, message);
        });
    }

    /// Messages in a conversation, in insertion order
    pub fn get_conversation(&self, id: ConversationId) -> Vec<Arc<Message>> {
        self.store
            .read(|t| t.conversation(id).map(<[_]>::to_vec))
            .unwrap_or_default()
    }

    /// Conversation (or correlation) id owning an MSH-10 value
    pub fn get_conversation_for_message(&self, control_id: &str) -> Option<ConversationId> {
        self.store.read(|t| t.lookup(control_id))
    }

    /// Conversation an ACK belongs to, via MSA-2
    pub fn conversation_for_ack(&self, ack: &Message) -> Option<ConversationId> {
        let acked = ack
            .segment("MSA")
            .and_then(|msa| msa.field_value(MSA_CONTROL_ID))
            .filter(|v| !v.is_empty())?;
        self.get_conversation_for_message(acked)
    }

    /// All conversation ids, sorted
    pub fn get_all_conversations(&self) -> Vec<ConversationId> {
        let mut ids: Vec<ConversationId> = self.store.read(|t| t.conversation_ids().copied().collect());
        ids.sort_unstable();
        ids
    }

    pub fn conversation_count(&self) -> usize {
        self.store.read(ConversationTables::conversation_count)
    }

    pub fn correlation_count(&self) -> usize {
        self.store.read(ConversationTables::correlation_count)
    }

    /// Forget everything
    pub fn clear(&self) {
        self.store.write(ConversationTables::clear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl7v2_core::{EncodingCharacters, Field, Segment};

    fn message(control_id: &str) -> Message {
        let mut msh = Segment::header("MSH", &EncodingCharacters::default());
        msh.set_field(9, Field::from_components(["ADT", "A01"]));
        msh.set_field(10, Field::from_value(control_id));
        let mut msg = Message::new(EncodingCharacters::default());
        msg.push_segment(msh);
        msg
    }

    fn ack_for(control_id: &str, ack_id: &str) -> Message {
        let mut msg = message(ack_id);
        let mut msa = Segment::new("MSA");
        msa.push_field(Field::from_value("AA"));
        msa.push_field(Field::from_value(control_id));
        msg.push_segment(msa);
        msg
    }

    #[test]
    fn test_correlate() {
        let tracker = MessageCorrelationTracker::new();
        let req = message("REQ1");
        let resp = message("RESP1");
        let id = tracker.correlate(&req, &resp);

        let pair = tracker.get_correlated(id);
        assert_eq!(pair.len(), 2);
        assert_eq!(pair[0].control_id(), Some("REQ1"));
        assert_eq!(pair[1].control_id(), Some("RESP1"));
        assert_eq!(tracker.get_conversation_for_message("REQ1"), Some(id));
        assert_eq!(tracker.get_conversation_for_message("RESP1"), Some(id));
        assert_eq!(tracker.correlation_count(), 1);
    }

    #[test]
    fn test_unknown_ids() {
        let tracker = MessageCorrelationTracker::new();
        assert!(tracker.get_correlated(ConversationId::new(1)).is_empty());
        assert!(tracker.get_conversation(ConversationId::new(1)).is_empty());
        assert_eq!(tracker.get_conversation_for_message("nope"), None);
    }

    #[test]
    fn test_conversation_order() {
        let tracker = MessageCorrelationTracker::new();
        let id = tracker.track_conversation(&message("M1"));
        tracker.add_to_conversation(id, &message("M2"));
        tracker.add_to_conversation(id, &message("M3"));

        let ids: Vec<_> = tracker
            .get_conversation(id)
            .iter()
            .map(|m| m.control_id().unwrap_or("").to_string())
            .collect();
        assert_eq!(ids, vec!["M1", "M2", "M3"]);
        assert_eq!(tracker.get_conversation_for_message("M3"), Some(id));
    }

    #[test]
    fn test_add_to_unknown_creates() {
        let tracker = MessageCorrelationTracker::new();
        let id = ConversationId::new(42);
        tracker.add_to_conversation(id, &message("X1"));
        assert_eq!(tracker.get_conversation(id).len(), 1);
        assert_eq!(tracker.get_all_conversations(), vec![id]);
    }

    #[test]
    fn test_correlate_and_track_resolve_together() {
        let tracker = MessageCorrelationTracker::new();
        let req = message("Q1");
        let resp = message("R1");
        let conv = tracker.track_conversation(&req);
        tracker.add_to_conversation(conv, &resp);
        let corr = tracker.correlate(&req, &resp);

        let for_req = tracker.get_conversation_for_message("Q1");
        let for_resp = tracker.get_conversation_for_message("R1");
        assert_eq!(for_req, for_resp);
        assert_eq!(for_req, Some(corr));
    }

    #[test]
    fn test_conversation_for_ack() {
        let tracker = MessageCorrelationTracker::new();
        let conv = tracker.track_conversation(&message("ORIG"));
        let ack = ack_for("ORIG", "ACK1");
        assert_eq!(tracker.conversation_for_ack(&ack), Some(conv));
        assert_eq!(tracker.conversation_for_ack(&message("NOMSA")), None);
    }

    #[test]
    fn test_all_conversations_and_clear() {
        let tracker = MessageCorrelationTracker::new();
        let a = tracker.track_conversation(&message("A"));
        let b = tracker.track_conversation(&message("B"));
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(tracker.get_all_conversations(), expected);
        assert_eq!(tracker.conversation_count(), 2);

        tracker.clear();
        assert_eq!(tracker.conversation_count(), 0);
        assert_eq!(tracker.get_conversation_for_message("A"), None);
    }
}
