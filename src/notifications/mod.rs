use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::SmtpConfig;
use crate::db::models::Booking;

/// What a message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Confirmation,
    StatusUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientRole {
    Student,
    Instructor,
}

#[derive(Debug, Clone)]
pub struct Recipient {
    pub name: String,
    pub email: String,
    pub role: RecipientRole,
}

/// Outbound message port. Strictly fire-and-forget from the engine's point
/// of view: a failed delivery is logged and never rolls back a booking.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn notify(
        &self,
        kind: NotificationKind,
        booking: &Booking,
        recipient: &Recipient,
    ) -> Result<()>;
}

/// Pick the notifier implied by configuration: SMTP when configured, a
/// tracing-only sink otherwise (development, tests).
pub fn from_config(smtp: &Option<SmtpConfig>) -> Result<Arc<dyn NotificationPort>> {
    match smtp {
        Some(config) => Ok(Arc::new(SmtpNotifier::new(config)?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}

fn subject_line(kind: NotificationKind, booking: &Booking) -> String {
    match kind {
        NotificationKind::Confirmation => {
            format!("Booking {} received", booking.confirmation_code)
        }
        NotificationKind::StatusUpdate => format!(
            "Booking {} is now {}",
            booking.confirmation_code, booking.status
        ),
    }
}

fn body_text(kind: NotificationKind, booking: &Booking, recipient: &Recipient) -> String {
    let session = match recipient.role {
        RecipientRole::Student => "Your session",
        RecipientRole::Instructor => "A session on your calendar",
    };
    let mut body = format!(
        "Hello {},\n\n{} on {} from {} to {} ",
        recipient.name, session, booking.booking_date, booking.start_time, booking.end_time
    );
    match kind {
        NotificationKind::Confirmation => {
            body.push_str("has been requested.\n");
        }
        NotificationKind::StatusUpdate => {
            body.push_str(&format!("is now {}.\n", booking.status));
        }
    }
    if !booking.meeting_url.is_empty() {
        body.push_str(&format!("Meeting link: {}\n", booking.meeting_url));
    }
    if !booking.meeting_location.is_empty() {
        body.push_str(&format!("Location: {}\n", booking.meeting_location));
    }
    body.push_str(&format!(
        "\nConfirmation code: {}\n",
        booking.confirmation_code
    ));
    body
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .context("Failed to build SMTP transport")?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        let from = config
            .from_address
            .parse::<Mailbox>()
            .context("Failed to parse SMTP from address")?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl NotificationPort for SmtpNotifier {
    async fn notify(
        &self,
        kind: NotificationKind,
        booking: &Booking,
        recipient: &Recipient,
    ) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient
                .email
                .parse::<Mailbox>()
                .context("Failed to parse recipient address")?)
            .subject(subject_line(kind, booking))
            .header(ContentType::TEXT_PLAIN)
            .body(body_text(kind, booking, recipient))
            .context("Failed to build notification message")?;

        self.transport
            .send(message)
            .await
            .context("Failed to send notification")?;
        Ok(())
    }
}

/// Fallback sink used when SMTP is not configured.
pub struct LogNotifier;

#[async_trait]
impl NotificationPort for LogNotifier {
    async fn notify(
        &self,
        kind: NotificationKind,
        booking: &Booking,
        recipient: &Recipient,
    ) -> Result<()> {
        info!(
            booking_id = %booking.id,
            confirmation_code = %booking.confirmation_code,
            recipient = %recipient.email,
            kind = ?kind,
            "Notification (SMTP not configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{BookingStatus, MeetingType, PaymentStatus, SessionType};
    use sqlx::types::Uuid;
    use time::macros::date;
    use time::OffsetDateTime;

    fn sample_booking() -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            booking_date: date!(2024 - 06 - 10),
            start_time: "10:00".into(),
            end_time: "11:00".into(),
            duration_minutes: 60,
            session_type: SessionType::Tutoring,
            subject: String::new(),
            description: String::new(),
            meeting_type: MeetingType::Online,
            meeting_url: "https://meet.example/abc".into(),
            meeting_location: String::new(),
            status: BookingStatus::Confirmed,
            amount: 150.0,
            payment_status: PaymentStatus::Pending,
            payment_id: String::new(),
            user_notes: String::new(),
            instructor_notes: String::new(),
            admin_notes: String::new(),
            confirmation_code: "BK1700000000000042".into(),
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: String::new(),
            user_rating: None,
            user_feedback: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn status_update_subject_names_the_new_status() {
        let booking = sample_booking();
        let subject = subject_line(NotificationKind::StatusUpdate, &booking);
        assert!(subject.contains("BK1700000000000042"));
        assert!(subject.contains("confirmed"));
    }

    #[test]
    fn body_includes_meeting_point_and_code() {
        let booking = sample_booking();
        let recipient = Recipient {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role: RecipientRole::Student,
        };
        let body = body_text(NotificationKind::Confirmation, &booking, &recipient);
        assert!(body.contains("Hello Ada"));
        assert!(body.contains("https://meet.example/abc"));
        assert!(body.contains("BK1700000000000042"));
    }
}
