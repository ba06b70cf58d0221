use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{application::Application, offer::Offer, status::ApplicationStatus};

/// Message sent to the candidate when their application changes status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: Uuid,
    pub application_id: i64,
    pub email: String,
    pub status: Option<ApplicationStatus>,
    pub body: String,
}

impl Notification {
    pub fn new(application: &Application, offer: &Offer) -> Self {
        let status = application
            .status()
            .map(|s| s.to_string())
            .unwrap_or_default();
        let body = format!(
            "Dear applicant,\r\n\r\nyour application #'{}' to the position: '{}' \
             has changed the status to '{}'",
            application.id, offer.job_title, status
        );

        Self {
            notification_id: Uuid::new_v4(),
            application_id: application.id,
            email: application.email.clone(),
            status: application.status(),
            body,
        }
    }
}

/// One-way outbound channel. Failures are reported to the caller, who is
/// expected to log and drop them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Posts notifications as JSON to a webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    target_url: String,
    secret: Option<String>,
}

impl WebhookNotifier {
    pub fn new(client: Client, target_url: String, secret: Option<String>) -> Self {
        Self {
            client,
            target_url,
            secret,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let mut request = self.client.post(&self.target_url).json(notification);
        if let Some(secret) = &self.secret {
            request = request.header("X-Webhook-Secret", secret);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| Error::NotificationDelivery(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::NotificationDelivery(format!(
                "webhook responded {}: {}",
                status, body
            )));
        }

        info!(
            notification_id = %notification.notification_id,
            application_id = notification.application_id,
            http_status = status.as_u16(),
            "notification delivered"
        );
        Ok(())
    }
}

/// Used when no webhook is configured: the notification only goes to the log.
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        info!(
            notification_id = %notification.notification_id,
            application_id = notification.application_id,
            email = %notification.email,
            status = ?notification.status,
            "notification (log only): {}",
            notification.body.replace("\r\n", " ")
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{arena::Arena, relations, state_machine};
    use chrono::NaiveDate;

    #[test]
    fn body_names_application_offer_and_status() {
        let date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let mut offers = Arena::from(Offer::new(3, "Backend Engineer", date));
        let mut app = Application::new(12, "a@x.com", "cv");
        relations::set_offer_for_application(&mut app, &mut offers, Some(3)).unwrap();
        state_machine::on_create(&mut app, 1).unwrap();

        let n = Notification::new(&app, offers.get(3).unwrap());
        assert_eq!(n.email, "a@x.com");
        assert_eq!(n.status, Some(ApplicationStatus::Applied));
        assert_eq!(
            n.body,
            "Dear applicant,\r\n\r\nyour application #'12' to the position: \
             'Backend Engineer' has changed the status to 'APPLIED'"
        );
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        let date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let offer = Offer::new(1, "Backend Engineer", date);
        let app = Application::new(1, "a@x.com", "cv");
        assert!(LogNotifier.send(&Notification::new(&app, &offer)).await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_webhook_is_a_delivery_error() {
        let notifier = WebhookNotifier::new(
            Client::new(),
            "http://127.0.0.1:9/notifications".to_string(),
            Some("secret".to_string()),
        );
        let date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let offer = Offer::new(1, "Backend Engineer", date);
        let app = Application::new(1, "a@x.com", "cv");

        let err = notifier
            .send(&Notification::new(&app, &offer))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotificationDelivery(_)));
    }
}
