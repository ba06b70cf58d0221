use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::status::ApplicationStatus;

/// A candidate's submission against one offer.
///
/// `status` is only written by the lifecycle state machine and the offer link
/// only by the relationship manager, so both are read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Application {
    pub id: i64,
    pub(crate) offer_id: Option<i64>,
    pub email: String,
    pub resume: String,
    pub(crate) status: Option<ApplicationStatus>,
    /// Ids of the history entries in the order they were recorded.
    pub(crate) history: Vec<i64>,
    /// Optimistic concurrency token, bumped by every successful save.
    pub version: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Application {
    pub fn new(id: i64, email: impl Into<String>, resume: impl Into<String>) -> Self {
        Self {
            id,
            offer_id: None,
            email: email.into(),
            resume: resume.into(),
            status: None,
            history: Vec::new(),
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn offer_id(&self) -> Option<i64> {
        self.offer_id
    }

    pub fn status(&self) -> Option<ApplicationStatus> {
        self.status
    }

    pub fn history(&self) -> &[i64] {
        &self.history
    }
}
