use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Offer {
    pub id: i64,
    pub job_title: String,
    pub start_date: NaiveDate,
    /// Back-reference collection; `Application::offer_id` is authoritative.
    pub(crate) applications: Vec<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Offer {
    pub fn new(id: i64, job_title: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            id,
            job_title: job_title.into(),
            start_date,
            applications: Vec::new(),
            created_at: None,
        }
    }

    pub fn applications(&self) -> &[i64] {
        &self.applications
    }

    pub fn number_of_applications(&self) -> usize {
        self.applications.len()
    }
}
