use async_trait::async_trait;

use crate::error::Result;
use crate::models::{application::Application, history_entry::HistoryEntry, offer::Offer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Offer,
    Application,
    HistoryEntry,
}

/// Storage capability consumed by the lifecycle engine.
///
/// Loaded entities come back with their back-reference collections rebuilt
/// from the stored foreign keys. Saves enforce `offers.job_title` and
/// `(offer_id, email)` uniqueness by failing with `Error::DuplicateKey`, and
/// reject stale application versions with `Error::Conflict`.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Reserves an identity so entities can be linked before their first save.
    async fn next_id(&self, kind: EntityKind) -> Result<i64>;

    async fn find_offer_by_id(&self, id: i64) -> Result<Option<Offer>>;

    async fn find_all_offers(&self) -> Result<Vec<Offer>>;

    async fn find_application_by_id(&self, id: i64) -> Result<Option<Application>>;

    async fn find_all_applications(&self) -> Result<Vec<Application>>;

    async fn find_applications_by_offer(&self, offer_id: i64) -> Result<Vec<Application>>;

    async fn count_applications(&self, offer_id: Option<i64>) -> Result<i64>;

    /// Entries of one application, oldest first.
    async fn find_history(&self, application_id: i64) -> Result<Vec<HistoryEntry>>;

    async fn save_offer(&self, offer: &Offer) -> Result<Offer>;

    /// Upserts `application` and inserts `new_entries` in one unit. Entries
    /// already stored are left as they are.
    async fn save_application(
        &self,
        application: &Application,
        new_entries: &[HistoryEntry],
    ) -> Result<Application>;

    /// Deletes the application together with its history.
    async fn delete_application(&self, id: i64) -> Result<()>;
}

/// Entries handed to `save_application` must already be linked to it.
pub(crate) fn check_entries(application: &Application, entries: &[HistoryEntry]) -> Result<()> {
    for entry in entries {
        if entry.application_id() != Some(application.id)
            || !application.history().contains(&entry.id())
        {
            return Err(crate::error::Error::Internal(format!(
                "history entry #{} is not linked to application #{}",
                entry.id(),
                application.id
            )));
        }
    }
    Ok(())
}
