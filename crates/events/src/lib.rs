//! Notification infrastructure for the job board.
//!
//! - [`payload`]: the messages carried by the notification outbox.
//! - [`delivery`]: external delivery channels (SMTP email).
//! - [`OutboxDispatcher`]: background service that expands vacancy
//!   announcements into recipient batches and delivers them.

pub mod delivery;
pub mod dispatcher;
pub mod payload;

use eduboard_db::models::outbox::OutboxMessage;
use eduboard_db::models::vacancy::Vacancy;
use eduboard_db::models::Record;
use eduboard_db::{OutboxStore, StoreError};

pub use delivery::email::{EmailConfig, EmailError, LogMailer, Mailer, OutgoingEmail, SmtpMailer};
pub use dispatcher::{backoff_delay, DispatchConfig, DispatchError, OutboxDispatcher};
pub use payload::{OutboxPayload, VacancyAnnouncement};

/// Schedule the announcement for a newly approved vacancy.
pub async fn schedule_vacancy_announcement(
    outbox: &dyn OutboxStore,
    vacancy: &Record<Vacancy>,
    max_attempts: i32,
) -> Result<OutboxMessage, StoreError> {
    let payload = OutboxPayload::VacancyAnnouncement(VacancyAnnouncement {
        vacancy_id: vacancy.id.to_string(),
    });
    outbox.enqueue(&payload.to_message(max_attempts)?).await
}
