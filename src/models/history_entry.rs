use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::status::ApplicationStatus;

/// One recorded status change. Never mutated once linked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub(crate) id: i64,
    pub(crate) application_id: Option<i64>,
    pub(crate) recorded_at: DateTime<Utc>,
    pub(crate) status: ApplicationStatus,
}

impl HistoryEntry {
    pub(crate) fn new(id: i64, status: ApplicationStatus, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id,
            application_id: None,
            recorded_at,
            status,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn application_id(&self) -> Option<i64> {
        self.application_id
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn status(&self) -> ApplicationStatus {
        self.status
    }
}
