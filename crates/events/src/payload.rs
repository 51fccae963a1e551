//! Outbox message payloads.
//!
//! Two kinds of message flow through the outbox:
//!
//! - `vacancy_announcement`: scheduled by the API when a vacancy becomes
//!   approved. The dispatcher expands it into email batches.
//! - `email_batch`: one chunk of recipients for a single email.

use serde::{Deserialize, Serialize};
use eduboard_db::models::outbox::{NewOutboxMessage, OutboxMessage};
use eduboard_db::models::vacancy::Vacancy;
use eduboard_db::models::Record;

pub const KIND_VACANCY_ANNOUNCEMENT: &str = "vacancy_announcement";
pub const KIND_EMAIL_BATCH: &str = "email_batch";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyAnnouncement {
    pub vacancy_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailBatch {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// A decoded outbox payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboxPayload {
    VacancyAnnouncement(VacancyAnnouncement),
    EmailBatch(EmailBatch),
}

/// Error decoding an outbox row.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Unknown outbox message kind '{0}'")]
    UnknownKind(String),

    #[error("Malformed {kind} payload: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl OutboxPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboxPayload::VacancyAnnouncement(_) => KIND_VACANCY_ANNOUNCEMENT,
            OutboxPayload::EmailBatch(_) => KIND_EMAIL_BATCH,
        }
    }

    /// Build the insert DTO for this payload.
    pub fn to_message(&self, max_attempts: i32) -> Result<NewOutboxMessage, serde_json::Error> {
        let payload = match self {
            OutboxPayload::VacancyAnnouncement(p) => serde_json::to_value(p)?,
            OutboxPayload::EmailBatch(p) => serde_json::to_value(p)?,
        };
        Ok(NewOutboxMessage {
            kind: self.kind().to_string(),
            payload,
            max_attempts,
        })
    }

    /// Decode a stored outbox row.
    pub fn from_message(message: &OutboxMessage) -> Result<Self, PayloadError> {
        let malformed = |source| PayloadError::Malformed {
            kind: message.kind.clone(),
            source,
        };
        match message.kind.as_str() {
            KIND_VACANCY_ANNOUNCEMENT => serde_json::from_value(message.payload.clone())
                .map(OutboxPayload::VacancyAnnouncement)
                .map_err(malformed),
            KIND_EMAIL_BATCH => serde_json::from_value(message.payload.clone())
                .map(OutboxPayload::EmailBatch)
                .map_err(malformed),
            other => Err(PayloadError::UnknownKind(other.to_string())),
        }
    }
}

/// Subject and plain-text body announcing `vacancy`.
pub fn announcement_email(vacancy: &Record<Vacancy>) -> (String, String) {
    let v = &vacancy.body;
    let subject = format!("New vacancy: {} at {}", v.title, v.organization);

    let mut body = format!("{} is hiring: {}\n", v.organization, v.title);
    if let Some(city) = &v.city {
        body.push_str(&format!("City: {city}\n"));
    }
    if let Some(subject) = &v.subject {
        body.push_str(&format!("Subject: {subject}\n"));
    }
    if let Some(salary) = &v.salary {
        body.push_str(&format!("Salary: {salary}\n"));
    }
    let reference = vacancy.slug.as_deref().unwrap_or(&vacancy.short_id);
    body.push_str(&format!(
        "\nView and apply: /vacancies/{reference}\nContact: {}\n",
        v.contact_email
    ));

    (subject, body)
}
