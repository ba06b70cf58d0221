use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::database::repository::{check_entries, EntityKind, Repository};
use crate::error::{Error, Result};
use crate::lifecycle::arena::Arena;
use crate::models::{application::Application, history_entry::HistoryEntry, offer::Offer};
use crate::utils::time::now;

#[derive(Default)]
struct Store {
    offers: Arena<Offer>,
    applications: Arena<Application>,
    history: Arena<HistoryEntry>,
    sequences: HashMap<EntityKind, i64>,
}

impl Store {
    fn hydrate_offer(&self, offer: &Offer) -> Offer {
        let mut offer = offer.clone();
        offer.applications = self
            .applications
            .iter()
            .filter(|a| a.offer_id == Some(offer.id))
            .map(|a| a.id)
            .collect();
        offer
    }

    fn hydrate_application(&self, application: &Application) -> Application {
        let mut application = application.clone();
        application.history = self
            .entries_of(application.id)
            .into_iter()
            .map(|e| e.id)
            .collect();
        application
    }

    fn entries_of(&self, application_id: i64) -> Vec<HistoryEntry> {
        let mut entries: Vec<HistoryEntry> = self
            .history
            .iter()
            .filter(|e| e.application_id == Some(application_id))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.id);
        entries
    }
}

/// Arena-backed repository used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| Error::Internal("in-memory repository lock poisoned".to_string()))
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn next_id(&self, kind: EntityKind) -> Result<i64> {
        let mut store = self.lock()?;
        let seq = store.sequences.entry(kind).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn find_offer_by_id(&self, id: i64) -> Result<Option<Offer>> {
        let store = self.lock()?;
        Ok(store.offers.get(id).map(|o| store.hydrate_offer(o)))
    }

    async fn find_all_offers(&self) -> Result<Vec<Offer>> {
        let store = self.lock()?;
        Ok(store.offers.iter().map(|o| store.hydrate_offer(o)).collect())
    }

    async fn find_application_by_id(&self, id: i64) -> Result<Option<Application>> {
        let store = self.lock()?;
        Ok(store
            .applications
            .get(id)
            .map(|a| store.hydrate_application(a)))
    }

    async fn find_all_applications(&self) -> Result<Vec<Application>> {
        let store = self.lock()?;
        Ok(store
            .applications
            .iter()
            .map(|a| store.hydrate_application(a))
            .collect())
    }

    async fn find_applications_by_offer(&self, offer_id: i64) -> Result<Vec<Application>> {
        let store = self.lock()?;
        Ok(store
            .applications
            .iter()
            .filter(|a| a.offer_id == Some(offer_id))
            .map(|a| store.hydrate_application(a))
            .collect())
    }

    async fn count_applications(&self, offer_id: Option<i64>) -> Result<i64> {
        let store = self.lock()?;
        let count = store
            .applications
            .iter()
            .filter(|a| offer_id.is_none() || a.offer_id == offer_id)
            .count();
        Ok(count as i64)
    }

    async fn find_history(&self, application_id: i64) -> Result<Vec<HistoryEntry>> {
        let store = self.lock()?;
        Ok(store.entries_of(application_id))
    }

    async fn save_offer(&self, offer: &Offer) -> Result<Offer> {
        let mut store = self.lock()?;
        if store
            .offers
            .iter()
            .any(|o| o.id != offer.id && o.job_title == offer.job_title)
        {
            return Err(Error::DuplicateKey("offers_job_title_key".to_string()));
        }

        let mut stored = offer.clone();
        stored.applications.clear();
        stored.created_at = store
            .offers
            .get(offer.id)
            .and_then(|o| o.created_at)
            .or(offer.created_at)
            .or_else(|| Some(now()));
        let hydrated = store.hydrate_offer(&stored);
        store.offers.insert(stored);
        Ok(hydrated)
    }

    async fn save_application(
        &self,
        application: &Application,
        new_entries: &[HistoryEntry],
    ) -> Result<Application> {
        check_entries(application, new_entries)?;
        let mut store = self.lock()?;

        let stored_version = store.applications.get(application.id).map(|a| a.version);
        if stored_version.unwrap_or(0) != application.version {
            return Err(Error::Conflict(format!(
                "application #{} was modified concurrently",
                application.id
            )));
        }

        let offer_id = application.offer_id.ok_or_else(|| {
            Error::BadRequest(format!("application #{} has no offer", application.id))
        })?;
        if !store.offers.contains(offer_id) {
            return Err(Error::NotFound(format!("Offer #{} not found", offer_id)));
        }
        if store.applications.iter().any(|a| {
            a.id != application.id && a.offer_id == Some(offer_id) && a.email == application.email
        }) {
            return Err(Error::DuplicateKey(
                "applications_offer_id_email_key".to_string(),
            ));
        }

        let timestamp = now();
        let mut stored = application.clone();
        stored.history.clear();
        stored.version += 1;
        stored.created_at = stored.created_at.or(Some(timestamp));
        stored.updated_at = Some(timestamp);
        store.applications.insert(stored.clone());

        for entry in new_entries {
            if !store.history.contains(entry.id) {
                store.history.insert(entry.clone());
            }
        }

        Ok(store.hydrate_application(&stored))
    }

    async fn delete_application(&self, id: i64) -> Result<()> {
        let mut store = self.lock()?;
        if store.applications.remove(id).is_none() {
            return Err(Error::NotFound(format!("Application #{} not found", id)));
        }
        let orphaned: Vec<i64> = store
            .history
            .iter()
            .filter(|e| e.application_id == Some(id))
            .map(|e| e.id)
            .collect();
        for entry_id in orphaned {
            store.history.remove(entry_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{history, relations, state_machine};
    use crate::models::status::ApplicationStatus;
    use chrono::{Duration, NaiveDate};

    async fn seeded() -> (InMemoryRepository, Offer) {
        let repo = InMemoryRepository::new();
        let id = repo.next_id(EntityKind::Offer).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2030, 5, 1).unwrap();
        let offer = repo
            .save_offer(&Offer::new(id, "Backend Engineer", date))
            .await
            .unwrap();
        (repo, offer)
    }

    async fn new_application(
        repo: &InMemoryRepository,
        offer: &Offer,
        email: &str,
    ) -> Result<Application> {
        let id = repo.next_id(EntityKind::Application).await?;
        let entry_id = repo.next_id(EntityKind::HistoryEntry).await?;
        let mut app = Application::new(id, email, "cv.pdf");
        let mut offers = Arena::from(offer.clone());
        relations::set_offer_for_application(&mut app, &mut offers, Some(offer.id))?;
        let entry = state_machine::on_create(&mut app, entry_id)?;
        repo.save_application(&app, entry.as_slice()).await
    }

    #[tokio::test]
    async fn sequences_are_per_kind() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.next_id(EntityKind::Offer).await.unwrap(), 1);
        assert_eq!(repo.next_id(EntityKind::Offer).await.unwrap(), 2);
        assert_eq!(repo.next_id(EntityKind::Application).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn offer_titles_are_unique() {
        let (repo, offer) = seeded().await;
        let dup = Offer::new(99, offer.job_title.clone(), offer.start_date);
        let err = repo.save_offer(&dup).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));

        // Re-saving the same offer is not a violation.
        repo.save_offer(&offer).await.unwrap();
    }

    #[tokio::test]
    async fn loaded_collections_follow_foreign_keys() {
        let (repo, offer) = seeded().await;
        let a = new_application(&repo, &offer, "a@x.com").await.unwrap();
        let b = new_application(&repo, &offer, "b@x.com").await.unwrap();

        let offer = repo.find_offer_by_id(offer.id).await.unwrap().unwrap();
        assert_eq!(offer.applications(), &[a.id, b.id]);
        assert_eq!(repo.count_applications(Some(offer.id)).await.unwrap(), 2);
        assert_eq!(repo.count_applications(Some(offer.id + 1)).await.unwrap(), 0);

        let a = repo.find_application_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(a.history().len(), 1);
        assert_eq!(a.version, 1);
    }

    #[tokio::test]
    async fn duplicate_email_per_offer_is_rejected() {
        let (repo, offer) = seeded().await;
        new_application(&repo, &offer, "a@x.com").await.unwrap();
        let err = new_application(&repo, &offer, "a@x.com").await.unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));
        assert_eq!(repo.count_applications(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let (repo, offer) = seeded().await;
        let app = new_application(&repo, &offer, "a@x.com").await.unwrap();

        let mut first = app.clone();
        let entry = state_machine::transition(&mut first, ApplicationStatus::Invited, 50).unwrap();
        repo.save_application(&first, &[entry]).await.unwrap();

        let mut second = app;
        let entry =
            state_machine::transition(&mut second, ApplicationStatus::Rejected, 51).unwrap();
        let err = repo.save_application(&second, &[entry]).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(repo.find_history(first.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_cascades_history() {
        let (repo, offer) = seeded().await;
        let app = new_application(&repo, &offer, "a@x.com").await.unwrap();

        repo.delete_application(app.id).await.unwrap();
        assert!(repo.find_application_by_id(app.id).await.unwrap().is_none());
        assert!(repo.find_history(app.id).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_application(app.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn history_keeps_recording_order_when_clock_steps_back() {
        let (repo, offer) = seeded().await;
        let mut app = new_application(&repo, &offer, "a@x.com").await.unwrap();
        let applied_at = repo.find_history(app.id).await.unwrap()[0].recorded_at();

        let entry_id = repo.next_id(EntityKind::HistoryEntry).await.unwrap();
        let entry = history::append(
            &mut app,
            entry_id,
            ApplicationStatus::Invited,
            Some(applied_at - Duration::seconds(5)),
        )
        .unwrap();
        app.status = Some(ApplicationStatus::Invited);
        let saved = repo.save_application(&app, &[entry]).await.unwrap();

        let entries = repo.find_history(app.id).await.unwrap();
        let statuses: Vec<_> = entries.iter().map(|e| e.status()).collect();
        assert_eq!(
            statuses,
            vec![ApplicationStatus::Applied, ApplicationStatus::Invited]
        );
        assert_eq!(entries.last().map(|e| e.status()), saved.status());
        assert_eq!(saved.history(), &[entries[0].id(), entries[1].id()]);
    }
}
