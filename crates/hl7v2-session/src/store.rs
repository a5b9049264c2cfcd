//! Conversation state storage
//!
//! The tracker never touches its maps directly. It runs closures against a
//! [`ConversationStore`], which owns the lock.

use std::collections::HashMap;
use std::sync::Arc;

use hl7v2_core::{ConversationId, CorrelationId, Message};
use parking_lot::RwLock;

/// Correlation and conversation maps plus the control-id index
#[derive(Debug, Default)]
pub struct ConversationTables {
    correlations: HashMap<CorrelationId, Vec<Arc<Message>>>,
    conversations: HashMap<ConversationId, Vec<Arc<Message>>>,
    /// MSH-10 to owning id
    by_control_id: HashMap<String, ConversationId>,
}

impl ConversationTables {
    pub fn new() -> Self {
        ConversationTables::default()
    }

    pub fn insert_correlation(&mut self, id: CorrelationId, messages: Vec<Arc<Message>>) {
        for message in &messages {
            self.index(message, id);
        }
        self.correlations.insert(id, messages);
    }

    pub fn correlated(&self, id: CorrelationId) -> Option<&[Arc<Message>]> {
        self.correlations.get(&id).map(Vec::as_slice)
    }

    pub fn has_conversation(&self, id: ConversationId) -> bool {
        self.conversations.contains_key(&id)
    }

    /// Append to a conversation, creating it if needed
    pub fn append(&mut self, id: ConversationId, message: Arc<Message>) {
        self.index(&message, id);
        self.conversations.entry(id).or_default().push(message);
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&[Arc<Message>]> {
        self.conversations.get(&id).map(Vec::as_slice)
    }

    pub fn lookup(&self, control_id: &str) -> Option<ConversationId> {
        self.by_control_id.get(control_id).copied()
    }

    pub fn conversation_ids(&self) -> impl Iterator<Item = &ConversationId> {
        self.conversations.keys()
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    pub fn correlation_count(&self) -> usize {
        self.correlations.len()
    }

    pub fn clear(&mut self) {
        self.correlations.clear();
        self.conversations.clear();
        self.by_control_id.clear();
    }

    fn index(&mut self, message: &Message, id: ConversationId) {
        match message.control_id() {
            Some(control_id) => {
                self.by_control_id.insert(control_id.to_string(), id);
            }
            None => tracing::debug!("Message without MSH-10 not indexed for {}", id),
        }
    }
}

/// Lock-guarded access to [`ConversationTables`].
///
/// Each call holds the lock for the whole closure.
pub trait ConversationStore: Send + Sync {
    fn read<R>(&self, f: impl FnOnce(&ConversationTables) -> R) -> R;

    fn write<R>(&self, f: impl FnOnce(&mut ConversationTables) -> R) -> R;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<ConversationTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl ConversationStore for MemoryStore {
    fn read<R>(&self, f: impl FnOnce(&ConversationTables) -> R) -> R {
        f(&self.tables.read())
    }

    fn write<R>(&self, f: impl FnOnce(&mut ConversationTables) -> R) -> R {
        f(&mut self.tables.write())
    }
}
