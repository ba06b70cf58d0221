use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::Result;
use crate::lifecycle::history::HistoryLedger;
use crate::models::{
    application::Application, history_entry::HistoryEntry, status::ApplicationStatus,
};
use crate::utils::validation::invalid;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateApplicationPayload {
    #[validate(range(min = 1, message = "Offer id is invalid"))]
    pub offer_id: i64,
    #[validate(email(message = "Candidate email is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Resume cannot be empty"))]
    pub resume: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusPayload {
    /// Target status, case-insensitive (`invited`, `REJECTED`, ...).
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationListQuery {
    #[serde(alias = "offerId")]
    pub offer_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationResponse {
    pub id: i64,
    pub offer_id: Option<i64>,
    pub email: String,
    pub resume: String,
    pub status: Option<ApplicationStatus>,
    pub history_length: usize,
    pub version: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationListResponse {
    pub items: Vec<ApplicationResponse>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationTotalResponse {
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntryResponse {
    pub id: i64,
    pub status: ApplicationStatus,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub application_id: i64,
    pub items: Vec<HistoryEntryResponse>,
}

impl UpdateStatusPayload {
    /// Parses the requested status; unknown names are a validation failure.
    pub fn target_status(&self) -> Result<ApplicationStatus> {
        self.status
            .parse()
            .map_err(|message: String| invalid("status", message))
    }
}

impl From<Application> for ApplicationResponse {
    fn from(value: Application) -> Self {
        Self {
            id: value.id,
            offer_id: value.offer_id(),
            status: value.status(),
            history_length: value.history().len(),
            email: value.email,
            resume: value.resume,
            version: value.version,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<Vec<Application>> for ApplicationListResponse {
    fn from(value: Vec<Application>) -> Self {
        let items: Vec<ApplicationResponse> = value.into_iter().map(Into::into).collect();
        Self {
            total: items.len(),
            items,
        }
    }
}

impl From<&HistoryEntry> for HistoryEntryResponse {
    fn from(value: &HistoryEntry) -> Self {
        Self {
            id: value.id(),
            status: value.status(),
            recorded_at: value.recorded_at(),
        }
    }
}

impl From<HistoryLedger> for HistoryResponse {
    fn from(value: HistoryLedger) -> Self {
        Self {
            application_id: value.application_id(),
            items: value.entries().iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_a_validation_error() {
        let payload = UpdateStatusPayload {
            status: "invited".into(),
        };
        assert_eq!(payload.target_status().unwrap(), ApplicationStatus::Invited);

        let payload = UpdateStatusPayload {
            status: "archived".into(),
        };
        match payload.target_status().unwrap_err() {
            crate::error::Error::Validation(errors) => {
                assert!(errors.field_errors().contains_key("status"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_email_and_offer() {
        let valid = CreateApplicationPayload {
            offer_id: 1,
            email: "email@email.com".into(),
            resume: "cv".into(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = CreateApplicationPayload {
            email: "email".into(),
            ..valid.clone()
        };
        let errors = bad_email.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));

        let bad_offer = CreateApplicationPayload {
            offer_id: 0,
            ..valid
        };
        assert!(bad_offer.validate().is_err());
    }
}
