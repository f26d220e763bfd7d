//! Live conversation view
//!
//! An observable message list that renderers subscribe to while an exchange
//! is in flight. Writers publish whole snapshots; readers never see a
//! half-applied update.

use tokio::sync::watch;

use crate::message::Message;

/// Observable list of the messages of the active chat
#[derive(Debug)]
pub struct LiveConversation {
    tx: watch::Sender<Vec<Message>>,
}

impl Default for LiveConversation {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveConversation {
    pub fn new() -> Self {
        Self::with_messages(Vec::new())
    }

    pub fn with_messages(messages: Vec<Message>) -> Self {
        let (tx, _rx) = watch::channel(messages);
        Self { tx }
    }

    /// Append a finalized message
    pub fn push(&self, message: Message) {
        self.tx.send_modify(|messages| messages.push(message));
    }

    /// Swap the tail element for an updated copy of it
    pub fn replace_last(&self, message: Message) {
        self.tx.send_modify(|messages| match messages.last_mut() {
            Some(last) => *last = message,
            None => messages.push(message),
        });
    }

    /// Drop everything after the first `len` messages
    pub fn truncate(&self, len: usize) {
        self.tx.send_if_modified(|messages| {
            if messages.len() > len {
                messages.truncate(len);
                true
            } else {
                false
            }
        });
    }

    /// Replace the whole view, e.g. when another chat is selected
    pub fn replace_all(&self, messages: Vec<Message>) {
        self.tx.send_replace(messages);
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.tx.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.tx.subscribe()
    }
}
