use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use serde::Serialize;
use uuid::Uuid;

use crate::{error::Error, schema::messages, store::Store};

use super::Me;

pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Direct message between two users
///
/// `read` is stored for clients that display it but nothing marks a message as read yet
#[derive(Serialize, Clone, Debug, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub uuid: Uuid,
    pub sender: Uuid,
    pub receiver: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Me {
    pub async fn send_message(
        &self,
        store: &dyn Store,
        receiver: Uuid,
        content: String,
    ) -> Result<Message, Error> {
        if content.trim().is_empty() {
            return Err(Error::BadRequest("Message is empty".to_string()));
        }

        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(Error::BadRequest(format!(
                "Message is longer than {MAX_MESSAGE_LENGTH} characters"
            )));
        }

        store.fetch_user(receiver).await?;

        let message = Message {
            uuid: Uuid::now_v7(),
            sender: self.uuid(),
            receiver,
            content,
            created_at: Utc::now(),
            read: false,
        };

        store.insert_message(&message).await?;

        Ok(message)
    }

    /// Every message exchanged with `other`, oldest first
    pub async fn fetch_conversation(
        &self,
        store: &dyn Store,
        other: Uuid,
    ) -> Result<Vec<Message>, Error> {
        store.fetch_conversation(self.uuid(), other).await
    }
}
