//! Outbox dispatcher.
//!
//! [`OutboxDispatcher`] runs as a background task. It wakes on a poll
//! interval or when a request handler signals new work, claims due outbox
//! messages under a lease, and handles each one:
//!
//! - `vacancy_announcement`: gather recipient emails from the teacher and
//!   non-teacher collections (concurrently), dedupe case-insensitively, split
//!   into chunks and enqueue one `email_batch` per chunk.
//! - `email_batch`: send through the configured [`Mailer`].
//!
//! Failures are retried with exponential backoff until the message's attempt
//! budget runs out, after which it is marked `dead`. A crash between sending
//! and marking sent redelivers the batch once the lease expires, so delivery
//! is at-least-once.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use eduboard_core::batching::{chunk_recipients, dedupe_recipients, DEFAULT_BATCH_SIZE};
use eduboard_db::models::outbox::{OutboxMessage, DEFAULT_MAX_ATTEMPTS};
use eduboard_db::models::vacancy::{Vacancy, VacancyStatus};
use eduboard_db::repositories::CollectionRepo;
use eduboard_db::{Collection, DocumentStore, OutboxStore, RepoError, StoreError};

use crate::delivery::email::{EmailError, Mailer, OutgoingEmail};
use crate::payload::{
    announcement_email, EmailBatch, OutboxPayload, PayloadError, VacancyAnnouncement,
};

/// How often the dispatcher polls when nobody signals it.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Messages claimed per round.
const DEFAULT_CLAIM_LIMIT: i64 = 20;

/// Upper bound on claim rounds per wake-up.
const MAX_DRAIN_ROUNDS: usize = 50;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub poll_interval: Duration,
    /// Recipients per email batch.
    pub batch_size: usize,
    pub claim_limit: i64,
    /// How long a claimed message is hidden from other claimers.
    pub lease: chrono::Duration,
    /// Delay before the first retry; doubles per attempt.
    pub base_backoff: chrono::Duration,
    pub max_backoff: chrono::Duration,
    /// Attempt budget for email batches created by the dispatcher.
    pub max_attempts: i32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            claim_limit: DEFAULT_CLAIM_LIMIT,
            lease: chrono::Duration::minutes(5),
            base_backoff: chrono::Duration::seconds(30),
            max_backoff: chrono::Duration::hours(1),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Delay before retrying after the `attempts`-th failed attempt:
/// `base * 2^(attempts - 1)`, capped at `max`.
pub fn backoff_delay(
    base: chrono::Duration,
    max: chrono::Duration,
    attempts: i32,
) -> chrono::Duration {
    let exponent = attempts.saturating_sub(1).clamp(0, 20) as u32;
    let factor = 1i32 << exponent;
    base.checked_mul(factor).map_or(max, |d| d.min(max))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// OutboxDispatcher
// ---------------------------------------------------------------------------

/// Background service that drains the notification outbox.
pub struct OutboxDispatcher {
    documents: Arc<dyn DocumentStore>,
    outbox: Arc<dyn OutboxStore>,
    mailer: Arc<dyn Mailer>,
    signal: Arc<Notify>,
    config: DispatchConfig,
}

impl OutboxDispatcher {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        outbox: Arc<dyn OutboxStore>,
        mailer: Arc<dyn Mailer>,
        signal: Arc<Notify>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            documents,
            outbox,
            mailer,
            signal,
            config,
        }
    }

    /// Run the dispatch loop.
    ///
    /// Drains due messages on every poll tick and whenever the shared
    /// [`Notify`] is signalled. The loop exits gracefully when the provided
    /// [`CancellationToken`] is cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            poll_secs = self.config.poll_interval.as_secs(),
            batch_size = self.config.batch_size,
            "Outbox dispatcher started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Outbox dispatcher cancelled");
                    break;
                }
                _ = interval.tick() => {}
                _ = self.signal.notified() => {}
            }

            if let Err(e) = self.drain().await {
                tracing::error!(error = %e, "Failed to process outbox");
            }
        }
    }

    /// Process rounds until nothing is due (or [`MAX_DRAIN_ROUNDS`] is hit),
    /// so batches produced by an announcement go out in the same wake-up.
    /// Returns the number of messages handled.
    pub async fn drain(&self) -> Result<usize, StoreError> {
        let mut total = 0;
        for _ in 0..MAX_DRAIN_ROUNDS {
            let handled = self.process_due().await?;
            total += handled;
            if handled == 0 {
                break;
            }
        }
        if total > 0 {
            tracing::debug!(count = total, "Outbox drained");
        }
        Ok(total)
    }

    /// Claim one round of due messages and handle each. Returns how many
    /// messages were claimed.
    pub async fn process_due(&self) -> Result<usize, StoreError> {
        let claimed = self
            .outbox
            .claim_due(Utc::now(), self.config.claim_limit, self.config.lease)
            .await?;

        for message in &claimed {
            match self.handle(message).await {
                Ok(()) => self.outbox.mark_sent(message.id).await?,
                Err(e) => self.record_failure(message, &e).await?,
            }
        }

        Ok(claimed.len())
    }

    async fn record_failure(
        &self,
        message: &OutboxMessage,
        error: &DispatchError,
    ) -> Result<(), StoreError> {
        // Undecodable payloads never succeed on retry.
        let retryable = !matches!(error, DispatchError::Payload(_));

        if retryable && message.has_attempts_left() {
            let delay =
                backoff_delay(self.config.base_backoff, self.config.max_backoff, message.attempts);
            tracing::warn!(
                id = message.id,
                kind = %message.kind,
                attempts = message.attempts,
                retry_in_secs = delay.num_seconds(),
                error = %error,
                "Outbox message failed, will retry"
            );
            self.outbox
                .mark_failed(message.id, &error.to_string(), Some(Utc::now() + delay))
                .await
        } else {
            tracing::error!(
                id = message.id,
                kind = %message.kind,
                attempts = message.attempts,
                error = %error,
                "Outbox message dead"
            );
            self.outbox
                .mark_failed(message.id, &error.to_string(), None)
                .await
        }
    }

    async fn handle(&self, message: &OutboxMessage) -> Result<(), DispatchError> {
        match OutboxPayload::from_message(message)? {
            OutboxPayload::VacancyAnnouncement(announcement) => {
                self.expand_announcement(message.id, &announcement).await
            }
            OutboxPayload::EmailBatch(batch) => self.send_batch(message.id, batch).await,
        }
    }

    /// Fan an announcement out into email batches.
    async fn expand_announcement(
        &self,
        message_id: i64,
        announcement: &VacancyAnnouncement,
    ) -> Result<(), DispatchError> {
        let vacancy =
            CollectionRepo::<Vacancy>::find(self.documents.as_ref(), &announcement.vacancy_id)
                .await?;
        let Some(vacancy) = vacancy.filter(|v| v.body.status == VacancyStatus::Approved) else {
            tracing::info!(
                id = message_id,
                vacancy_id = %announcement.vacancy_id,
                "Vacancy no longer approved, announcement skipped"
            );
            return Ok(());
        };

        let (teachers, staff) = tokio::try_join!(
            self.documents.emails(Collection::Teachers),
            self.documents.emails(Collection::NonTeachers),
        )?;
        let recipients = dedupe_recipients(teachers.iter().chain(staff.iter()));
        let chunks = chunk_recipients(&recipients, self.config.batch_size);
        let (subject, body) = announcement_email(&vacancy);

        for chunk in &chunks {
            let payload = OutboxPayload::EmailBatch(EmailBatch {
                recipients: chunk.clone(),
                subject: subject.clone(),
                body: body.clone(),
            });
            self.outbox
                .enqueue(&payload.to_message(self.config.max_attempts)?)
                .await?;
        }

        tracing::info!(
            id = message_id,
            vacancy_id = %vacancy.id,
            recipients = recipients.len(),
            batches = chunks.len(),
            "Vacancy announcement expanded"
        );
        Ok(())
    }

    async fn send_batch(&self, message_id: i64, batch: EmailBatch) -> Result<(), DispatchError> {
        if batch.recipients.is_empty() {
            return Ok(());
        }
        let recipients = batch.recipients.len();
        self.mailer
            .send(&OutgoingEmail {
                recipients: batch.recipients,
                subject: batch.subject,
                body: batch.body,
            })
            .await?;
        tracing::debug!(id = message_id, recipients, "Email batch delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let base = chrono::Duration::seconds(30);
        let max = chrono::Duration::minutes(10);
        assert_eq!(backoff_delay(base, max, 1), chrono::Duration::seconds(30));
        assert_eq!(backoff_delay(base, max, 2), chrono::Duration::seconds(60));
        assert_eq!(backoff_delay(base, max, 3), chrono::Duration::seconds(120));
        assert_eq!(backoff_delay(base, max, 10), max);
        assert_eq!(backoff_delay(base, max, 0), base);
    }
}
