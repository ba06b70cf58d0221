use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::offer::Offer;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOfferPayload {
    #[validate(length(
        min = 5,
        max = 35,
        message = "Job title must be from 5 to 35 characters long"
    ))]
    pub job_title: String,
    /// Defaults to today when omitted.
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OfferResponse {
    pub id: i64,
    pub job_title: String,
    pub start_date: NaiveDate,
    pub number_of_applications: usize,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OfferListResponse {
    pub items: Vec<OfferResponse>,
    pub total: usize,
}

impl From<Offer> for OfferResponse {
    fn from(value: Offer) -> Self {
        Self {
            id: value.id,
            number_of_applications: value.number_of_applications(),
            job_title: value.job_title,
            start_date: value.start_date,
            created_at: value.created_at,
        }
    }
}

impl From<Vec<Offer>> for OfferListResponse {
    fn from(value: Vec<Offer>) -> Self {
        let items: Vec<OfferResponse> = value.into_iter().map(Into::into).collect();
        Self {
            total: items.len(),
            items,
        }
    }
}
