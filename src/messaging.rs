//! Messaging log - append-only messages between students and staff
//!
//! Timestamps are assigned by the server at acceptance and never go
//! backwards relative to what is already stored.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use crate::model::{lenient_text, Message, NewMessage};
use crate::storage::SqliteStore;
use crate::{Error, Result};

/// A send request as it arrives from a caller
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessage {
    #[serde(default, deserialize_with = "lenient_text")]
    pub rollno: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub fromid: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub toid: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phonenumber: Option<String>,
}

impl SendMessage {
    pub fn new(
        rollno: impl Into<String>,
        fromid: impl Into<String>,
        toid: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            rollno: Some(rollno.into()),
            fromid: Some(fromid.into()),
            toid: Some(toid.into()),
            content: Some(content.into()),
            phonenumber: None,
        }
    }

    fn validate(self) -> Result<NewMessage> {
        let missing = |v: &Option<String>| v.as_deref().is_none_or(str::is_empty);
        if missing(&self.rollno) || missing(&self.fromid) || missing(&self.toid) || missing(&self.content) {
            return Err(Error::Validation(
                "rollno, fromid, toid, content required".to_string(),
            ));
        }

        Ok(NewMessage {
            rollno: self.rollno.unwrap_or_default(),
            fromid: self.fromid.unwrap_or_default(),
            toid: self.toid.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            phonenumber: self.phonenumber.filter(|p| !p.is_empty()),
        })
    }
}

/// What the log assigned to an accepted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentMessage {
    pub id: i64,
    pub timestamp: String,
}

/// Format a UTC instant the way the log stores it
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct MessageLog<'s> {
    store: &'s mut SqliteStore,
}

impl<'s> MessageLog<'s> {
    pub fn new(store: &'s mut SqliteStore) -> Self {
        Self { store }
    }

    /// Accept a message now
    pub fn send(&mut self, request: SendMessage) -> Result<SentMessage> {
        self.send_at(request, Utc::now())
    }

    /// Accept a message as of `now`.
    ///
    /// The stored timestamp is `now`, or the latest stored timestamp if the
    /// clock reads earlier than that.
    pub fn send_at(&mut self, request: SendMessage, now: DateTime<Utc>) -> Result<SentMessage> {
        let message = request.validate()?;
        let proposed = format_timestamp(now);

        let sent = self.store.transaction(|entities| {
            if !entities.student_exists(&message.rollno)? {
                return Err(Error::NotFound(format!("Student not found: {}", message.rollno)));
            }

            let timestamp = match entities.latest_message_timestamp()? {
                Some(latest) if latest > proposed => latest,
                _ => proposed,
            };
            let id = entities.append_message(&message, &timestamp)?;
            Ok(SentMessage { id, timestamp })
        })?;

        tracing::debug!(rollno = %message.rollno, id = sent.id, "message delivered");
        Ok(sent)
    }

    /// Messages for a student, oldest first.
    ///
    /// An unknown roll number yields an empty list.
    pub fn list_for_student(&self, rollno: &str) -> Result<Vec<Message>> {
        if rollno.is_empty() {
            return Err(Error::Validation("rollno is required".to_string()));
        }
        self.store.entities().list_messages(rollno)
    }
}
