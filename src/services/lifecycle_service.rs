use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::database::repository::{EntityKind, Repository};
use crate::dto::{application_dto::CreateApplicationPayload, offer_dto::CreateOfferPayload};
use crate::error::{Error, Result};
use crate::lifecycle::{arena::Arena, history::HistoryLedger, relations, state_machine};
use crate::models::{application::Application, offer::Offer, status::ApplicationStatus};
use crate::services::notification_service::{Notification, Notifier};
use crate::utils::{
    time::today,
    validation::{invalid, require_not_blank, validate},
};

pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Entry point for offers and applications: validates input, drives the
/// state machine, persists through the repository and notifies candidates.
#[derive(Clone)]
pub struct LifecycleService {
    repository: Arc<dyn Repository>,
    notifier: Arc<dyn Notifier>,
    notify_timeout: Duration,
}

impl LifecycleService {
    pub fn new(repository: Arc<dyn Repository>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repository,
            notifier,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub async fn submit_offer(
        &self,
        job_title: String,
        start_date: Option<NaiveDate>,
    ) -> Result<Offer> {
        let payload = CreateOfferPayload {
            job_title,
            start_date,
        };
        validate(&payload)?;
        require_not_blank("job_title", &payload.job_title, "Job title cannot be empty")?;

        let start_date = payload.start_date.unwrap_or_else(today);
        if start_date < today() {
            return Err(invalid("start_date", "Job start date cannot be in the past"));
        }

        let id = self.repository.next_id(EntityKind::Offer).await?;
        let offer = Offer::new(id, payload.job_title, start_date);
        let saved = self
            .repository
            .save_offer(&offer)
            .await
            .map_err(|e| match e {
                Error::DuplicateKey(_) => Error::DuplicateOffer(offer.job_title.clone()),
                other => other,
            })?;

        info!(
            offer_id = saved.id,
            job_title = %saved.job_title,
            start_date = %saved.start_date,
            "offer created"
        );
        Ok(saved)
    }

    pub async fn submit_application(
        &self,
        offer_id: i64,
        email: String,
        resume: String,
    ) -> Result<Application> {
        let payload = CreateApplicationPayload {
            offer_id,
            email,
            resume,
        };
        validate(&payload)?;
        require_not_blank("resume", &payload.resume, "Resume cannot be empty")?;

        let offer = self.get_offer(offer_id).await?;

        let application_id = self.repository.next_id(EntityKind::Application).await?;
        let mut application = Application::new(application_id, payload.email, payload.resume);
        let mut offers = Arena::from(offer);
        relations::set_offer_for_application(&mut application, &mut offers, Some(offer_id))?;

        let entry_id = self.repository.next_id(EntityKind::HistoryEntry).await?;
        let entries: Vec<_> = state_machine::on_create(&mut application, entry_id)?
            .into_iter()
            .collect();

        let saved = self
            .repository
            .save_application(&application, &entries)
            .await
            .map_err(|e| match e {
                Error::DuplicateKey(_) => Error::DuplicateApplication {
                    offer_id,
                    email: application.email.clone(),
                },
                other => other,
            })?;

        info!(
            application_id = saved.id,
            offer_id,
            email = %saved.email,
            "application submitted"
        );

        if let Some(offer) = offers.get(offer_id) {
            self.notify(&saved, offer).await;
        }
        Ok(saved)
    }

    /// Moves an application to `requested`, persisting the offer and then
    /// the application with its new history entry. The notification that
    /// follows is best effort and never affects the result.
    pub async fn advance_status(
        &self,
        application_id: i64,
        requested: ApplicationStatus,
    ) -> Result<Application> {
        let mut application = self.get_application(application_id).await?;
        let offer_id = application.offer_id().ok_or_else(|| {
            Error::Internal(format!("application #{} has no offer", application_id))
        })?;
        let offer = self.get_offer(offer_id).await?;

        let entry_id = self.repository.next_id(EntityKind::HistoryEntry).await?;
        let entry = state_machine::transition(&mut application, requested, entry_id)?;

        let offer = self.repository.save_offer(&offer).await?;
        debug!(
            application_id,
            history = application.history().len(),
            "saving application"
        );
        let saved = self
            .repository
            .save_application(&application, std::slice::from_ref(&entry))
            .await?;

        self.notify(&saved, &offer).await;
        Ok(saved)
    }

    /// Severs the offer link, then deletes the application and its history.
    pub async fn remove_application(&self, application_id: i64) -> Result<()> {
        let mut application = self.get_application(application_id).await?;

        if let Some(offer_id) = application.offer_id() {
            let mut offers: Arena<Offer> = self
                .repository
                .find_offer_by_id(offer_id)
                .await?
                .into_iter()
                .collect();
            if offers.contains(offer_id) {
                relations::set_offer_for_application(&mut application, &mut offers, None)?;
                for offer in offers.into_values() {
                    self.repository.save_offer(&offer).await?;
                }
            } else {
                warn!(application_id, offer_id, "application points at a missing offer");
            }
        }

        self.repository.delete_application(application_id).await?;
        info!(application_id, "application removed");
        Ok(())
    }

    pub async fn get_offer(&self, id: i64) -> Result<Offer> {
        self.repository
            .find_offer_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Offer #{} not found", id)))
    }

    pub async fn list_offers(&self) -> Result<Vec<Offer>> {
        self.repository.find_all_offers().await
    }

    pub async fn get_application(&self, id: i64) -> Result<Application> {
        self.repository
            .find_application_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Application #{} not found", id)))
    }

    pub async fn list_applications(&self, offer_id: Option<i64>) -> Result<Vec<Application>> {
        match offer_id {
            Some(id) => self.applications_for_offer(id).await,
            None => self.repository.find_all_applications().await,
        }
    }

    pub async fn applications_for_offer(&self, offer_id: i64) -> Result<Vec<Application>> {
        let offer = self.get_offer(offer_id).await?;
        self.repository.find_applications_by_offer(offer.id).await
    }

    pub async fn count_applications(&self, offer_id: Option<i64>) -> Result<i64> {
        if let Some(id) = offer_id {
            self.get_offer(id).await?;
        }
        self.repository.count_applications(offer_id).await
    }

    pub async fn history_for(&self, application_id: i64) -> Result<HistoryLedger> {
        let application = self.get_application(application_id).await?;
        let entries = self.repository.find_history(application.id).await?;
        Ok(HistoryLedger::new(application.id, entries))
    }

    async fn notify(&self, application: &Application, offer: &Offer) {
        let notification = Notification::new(application, offer);
        debug!(
            notification_id = %notification.notification_id,
            application_id = application.id,
            "sending status notification"
        );

        match tokio::time::timeout(self.notify_timeout, self.notifier.send(&notification)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(
                    application_id = application.id,
                    error = %e,
                    "couldn't send status notification"
                );
            }
            Err(_) => {
                warn!(
                    application_id = application.id,
                    timeout_ms = self.notify_timeout.as_millis() as u64,
                    "status notification timed out"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::InMemoryRepository;
    use crate::models::history_entry::HistoryEntry;
    use crate::services::notification_service::MockNotifier;
    use chrono::Duration as ChronoDuration;

    fn service_with(notifier: MockNotifier) -> LifecycleService {
        LifecycleService::new(Arc::new(InMemoryRepository::new()), Arc::new(notifier))
    }

    fn accepting_notifier() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_send().returning(|_| Ok(()));
        notifier
    }

    fn future_date() -> NaiveDate {
        today() + ChronoDuration::days(30)
    }

    #[tokio::test]
    async fn submit_offer_defaults_start_date_to_today() {
        let service = service_with(accepting_notifier());
        let offer = service
            .submit_offer("Backend Engineer".into(), None)
            .await
            .unwrap();
        assert_eq!(offer.start_date, today());
        assert_eq!(offer.number_of_applications(), 0);
    }

    #[tokio::test]
    async fn submit_offer_rejects_past_dates_and_bad_titles() {
        let service = service_with(accepting_notifier());
        let yesterday = today() - ChronoDuration::days(1);

        let err = service
            .submit_offer("Backend Engineer".into(), Some(yesterday))
            .await
            .unwrap_err();
        match err {
            Error::Validation(errors) => {
                assert!(errors.field_errors().contains_key("start_date"));
                assert!(errors.to_string().contains("cannot be in the past"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = service.submit_offer("Dev".into(), None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = service
            .submit_offer("       ".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_offer_title_is_reported() {
        let service = service_with(accepting_notifier());
        service
            .submit_offer("Backend Engineer".into(), Some(future_date()))
            .await
            .unwrap();
        let err = service
            .submit_offer("Backend Engineer".into(), Some(future_date()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateOffer(title) if title == "Backend Engineer"));
    }

    #[tokio::test]
    async fn new_application_starts_applied_with_one_entry() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|n: &Notification| n.status == Some(ApplicationStatus::Applied))
            .times(1)
            .returning(|_| Ok(()));
        let service = service_with(notifier);

        let offer = service
            .submit_offer("Backend Engineer".into(), Some(future_date()))
            .await
            .unwrap();
        let app = service
            .submit_application(offer.id, "a@x.com".into(), "cv.pdf".into())
            .await
            .unwrap();

        assert_eq!(app.status(), Some(ApplicationStatus::Applied));
        assert_eq!(app.history().len(), 1);
        assert_eq!(app.offer_id(), Some(offer.id));

        let offer = service.get_offer(offer.id).await.unwrap();
        assert_eq!(offer.applications(), &[app.id]);
        let ledger = service.history_for(app.id).await.unwrap();
        assert_eq!(ledger.statuses(), vec![ApplicationStatus::Applied]);
    }

    #[tokio::test]
    async fn submit_application_validates_input() {
        let service = service_with(accepting_notifier());
        let offer = service
            .submit_offer("Backend Engineer".into(), None)
            .await
            .unwrap();

        let err = service
            .submit_application(offer.id, "not-an-email".into(), "cv".into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = service
            .submit_application(offer.id, "a@x.com".into(), "   ".into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = service
            .submit_application(offer.id + 100, "a@x.com".into(), "cv".into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn same_email_same_offer_is_a_duplicate() {
        let service = service_with(accepting_notifier());
        let first = service
            .submit_offer("Backend Engineer".into(), None)
            .await
            .unwrap();
        let second = service
            .submit_offer("Frontend Engineer".into(), None)
            .await
            .unwrap();

        service
            .submit_application(first.id, "a@x.com".into(), "cv".into())
            .await
            .unwrap();
        let err = service
            .submit_application(first.id, "a@x.com".into(), "cv".into())
            .await
            .unwrap_err();
        match err {
            Error::DuplicateApplication { offer_id, email } => {
                assert_eq!(offer_id, first.id);
                assert_eq!(email, "a@x.com");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        service
            .submit_application(first.id, "b@x.com".into(), "cv".into())
            .await
            .unwrap();
        service
            .submit_application(second.id, "a@x.com".into(), "cv".into())
            .await
            .unwrap();
        assert_eq!(service.count_applications(Some(first.id)).await.unwrap(), 2);
        assert_eq!(service.count_applications(None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn notifier_failure_does_not_affect_transition() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .returning(|_| Err(Error::NotificationDelivery("broker down".into())));
        let service = service_with(notifier);

        let offer = service
            .submit_offer("Backend Engineer".into(), None)
            .await
            .unwrap();
        let app = service
            .submit_application(offer.id, "a@x.com".into(), "cv".into())
            .await
            .unwrap();

        let updated = service
            .advance_status(app.id, ApplicationStatus::Invited)
            .await
            .unwrap();
        assert_eq!(updated.status(), Some(ApplicationStatus::Invited));

        let stored = service.get_application(app.id).await.unwrap();
        assert_eq!(stored.status(), Some(ApplicationStatus::Invited));
        assert_eq!(stored.history().len(), 2);
    }

    #[tokio::test]
    async fn slow_notifier_is_cut_off() {
        struct Stalled;

        #[async_trait::async_trait]
        impl Notifier for Stalled {
            async fn send(&self, _: &Notification) -> Result<()> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }

        let service = LifecycleService::new(Arc::new(InMemoryRepository::new()), Arc::new(Stalled))
            .with_notify_timeout(Duration::from_millis(20));
        let offer = service
            .submit_offer("Backend Engineer".into(), None)
            .await
            .unwrap();
        let app = service
            .submit_application(offer.id, "a@x.com".into(), "cv".into())
            .await
            .unwrap();
        let updated = service
            .advance_status(app.id, ApplicationStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(updated.status(), Some(ApplicationStatus::Rejected));
    }

    #[tokio::test]
    async fn invalid_transition_changes_nothing_and_skips_notification() {
        let mut notifier = MockNotifier::new();
        // Only the submission notifies.
        notifier.expect_send().times(1).returning(|_| Ok(()));
        let service = service_with(notifier);

        let offer = service
            .submit_offer("Backend Engineer".into(), None)
            .await
            .unwrap();
        let app = service
            .submit_application(offer.id, "a@x.com".into(), "cv".into())
            .await
            .unwrap();

        let err = service
            .advance_status(app.id, ApplicationStatus::Hired)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: Some(ApplicationStatus::Applied),
                to: ApplicationStatus::Hired
            }
        ));

        let stored = service.get_application(app.id).await.unwrap();
        assert_eq!(stored.status(), Some(ApplicationStatus::Applied));
        assert_eq!(stored.history().len(), 1);
    }

    #[tokio::test]
    async fn unknown_application_is_not_found() {
        let service = service_with(accepting_notifier());
        let err = service
            .advance_status(42, ApplicationStatus::Invited)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(matches!(
            service.history_for(42).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn removal_detaches_from_offer() {
        let service = service_with(accepting_notifier());
        let offer = service
            .submit_offer("Backend Engineer".into(), None)
            .await
            .unwrap();
        let keep = service
            .submit_application(offer.id, "a@x.com".into(), "cv".into())
            .await
            .unwrap();
        let gone = service
            .submit_application(offer.id, "b@x.com".into(), "cv".into())
            .await
            .unwrap();

        service.remove_application(gone.id).await.unwrap();

        let offer = service.get_offer(offer.id).await.unwrap();
        assert_eq!(offer.applications(), &[keep.id]);
        assert!(matches!(
            service.get_application(gone.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            service.remove_application(gone.id).await,
            Err(Error::NotFound(_))
        ));
    }

    /// Serves one pinned snapshot of an application, as a second reader that
    /// loaded it before a concurrent update would see it.
    #[derive(Default)]
    struct PinnedReads {
        inner: InMemoryRepository,
        pinned: std::sync::Mutex<Option<Application>>,
    }

    impl PinnedReads {
        fn pin(&self, application: Application) {
            *self.pinned.lock().unwrap() = Some(application);
        }
    }

    #[async_trait::async_trait]
    impl Repository for PinnedReads {
        async fn next_id(&self, kind: EntityKind) -> Result<i64> {
            self.inner.next_id(kind).await
        }

        async fn find_offer_by_id(&self, id: i64) -> Result<Option<Offer>> {
            self.inner.find_offer_by_id(id).await
        }

        async fn find_all_offers(&self) -> Result<Vec<Offer>> {
            self.inner.find_all_offers().await
        }

        async fn find_application_by_id(&self, id: i64) -> Result<Option<Application>> {
            let pinned = self.pinned.lock().unwrap().clone();
            match pinned {
                Some(app) if app.id == id => Ok(Some(app)),
                _ => self.inner.find_application_by_id(id).await,
            }
        }

        async fn find_all_applications(&self) -> Result<Vec<Application>> {
            self.inner.find_all_applications().await
        }

        async fn find_applications_by_offer(&self, offer_id: i64) -> Result<Vec<Application>> {
            self.inner.find_applications_by_offer(offer_id).await
        }

        async fn count_applications(&self, offer_id: Option<i64>) -> Result<i64> {
            self.inner.count_applications(offer_id).await
        }

        async fn find_history(&self, application_id: i64) -> Result<Vec<HistoryEntry>> {
            self.inner.find_history(application_id).await
        }

        async fn save_offer(&self, offer: &Offer) -> Result<Offer> {
            self.inner.save_offer(offer).await
        }

        async fn save_application(
            &self,
            application: &Application,
            new_entries: &[HistoryEntry],
        ) -> Result<Application> {
            self.inner.save_application(application, new_entries).await
        }

        async fn delete_application(&self, id: i64) -> Result<()> {
            self.inner.delete_application(id).await
        }
    }

    #[tokio::test]
    async fn advancing_a_stale_copy_is_a_conflict() {
        let repo = Arc::new(PinnedReads::default());
        let service = LifecycleService::new(repo.clone(), Arc::new(accepting_notifier()));

        let offer = service
            .submit_offer("Backend Engineer".into(), None)
            .await
            .unwrap();
        let app = service
            .submit_application(offer.id, "a@x.com".into(), "cv".into())
            .await
            .unwrap();

        // Both advances start from the same version.
        repo.pin(app.clone());
        service
            .advance_status(app.id, ApplicationStatus::Invited)
            .await
            .unwrap();
        let err = service
            .advance_status(app.id, ApplicationStatus::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let stored = repo.inner.find_application_by_id(app.id).await.unwrap().unwrap();
        assert_eq!(stored.status(), Some(ApplicationStatus::Invited));
        assert_eq!(stored.history().len(), 2);
        let ledger = service.history_for(app.id).await.unwrap();
        assert_eq!(
            ledger.statuses(),
            vec![ApplicationStatus::Applied, ApplicationStatus::Invited]
        );
    }
}
