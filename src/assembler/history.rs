use crate::models::FinalizedMessage;

/// Append-only list of finalized messages, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationHistory {
    messages: Vec<FinalizedMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, message: FinalizedMessage) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[FinalizedMessage] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &FinalizedMessage> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&FinalizedMessage> {
        self.messages.last()
    }

    /// Most recent message with the given id.
    pub fn get(&self, message_id: &str) -> Option<&FinalizedMessage> {
        self.messages.iter().rev().find(|m| m.id == message_id)
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a FinalizedMessage;
    type IntoIter = std::slice::Iter<'a, FinalizedMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
