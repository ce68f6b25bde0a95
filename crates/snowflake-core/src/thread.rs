//! [`DisputeThread`]: the chat attached to each rejected item.
//!
//! Sending inserts one row and then refetches the whole thread; there is no
//! local merge and no optimistic insert.

use uuid::Uuid;

use crate::{
  collection::Collection,
  error::{ReadError, WriteError},
  record::{ChatMessage, NewChatMessage, Record},
  role::RoleResolver,
  service::DataService,
  session::SessionStore,
  table::Query,
};

pub struct DisputeThread<S> {
  sessions: SessionStore<S>,
  messages: Collection<S, ChatMessage>,
}

impl<S> Clone for DisputeThread<S> {
  fn clone(&self) -> Self {
    Self { sessions: self.sessions.clone(), messages: self.messages.clone() }
  }
}

impl<S: DataService> DisputeThread<S> {
  pub fn new(sessions: SessionStore<S>, roles: RoleResolver<S>) -> Self {
    Self { messages: Collection::new(sessions.clone(), roles), sessions }
  }

  /// Messages for `parent`, oldest first.
  pub async fn list_messages(&self, parent: Uuid) -> Result<Vec<ChatMessage>, ReadError> {
    let session = self.sessions.current().ok_or(ReadError::Unauthenticated)?;
    let query = Query::new(ChatMessage::TABLE)
      .eq("rejected_item_id", parent.to_string())
      .order_by(ChatMessage::ORDER_COLUMN, ChatMessage::ASCENDING);
    self.messages.fetch(&session, &query).await
  }

  /// Post `body` as the current user and return the refreshed thread.
  ///
  /// A body that is empty after trimming is rejected without contacting
  /// the service.
  pub async fn send(&self, parent: Uuid, body: &str) -> Result<Vec<ChatMessage>, WriteError> {
    self
      .messages
      .create(NewChatMessage { rejected_item_id: parent, message: body.trim().to_owned() })
      .await?;
    Ok(self.list_messages(parent).await?)
  }

  /// Whether `message` was sent by the signed-in user.
  pub fn is_own(&self, message: &ChatMessage) -> bool {
    self
      .sessions
      .current()
      .is_some_and(|s| s.user_id == message.sender_id)
  }
}
