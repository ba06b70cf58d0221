use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::lifecycle::relations;
use crate::models::{
    application::Application, history_entry::HistoryEntry, status::ApplicationStatus,
};
use crate::utils::time::now;

/// Records one transition: builds the entry, links it to `application` and
/// returns it. `recorded_at` defaults to the current time.
pub fn append(
    application: &mut Application,
    entry_id: i64,
    status: ApplicationStatus,
    recorded_at: Option<DateTime<Utc>>,
) -> Result<HistoryEntry> {
    if application.history().contains(&entry_id) {
        return Err(Error::Internal(format!(
            "history entry #{} already recorded for application #{}",
            entry_id, application.id
        )));
    }

    let mut entry = HistoryEntry::new(entry_id, status, recorded_at.unwrap_or_else(now));
    relations::attach(&mut entry, application)?;
    Ok(entry)
}

/// Read-only, ordered audit trail of one application.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryLedger {
    application_id: i64,
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    /// Orders entries by id, dropping any that belong to another application.
    /// Ids are handed out in recording order; timestamps may not be.
    pub fn new(application_id: i64, entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let mut entries: Vec<HistoryEntry> = entries
            .into_iter()
            .filter(|e| e.application_id() == Some(application_id))
            .collect();
        entries.sort_by_key(|e| e.id());
        Self {
            application_id,
            entries,
        }
    }

    pub fn application_id(&self) -> i64 {
        self.application_id
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn statuses(&self) -> Vec<ApplicationStatus> {
        self.entries.iter().map(|e| e.status()).collect()
    }
}
