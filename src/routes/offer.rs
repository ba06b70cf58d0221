use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use crate::{
    dto::{
        application_dto::ApplicationListResponse,
        offer_dto::{CreateOfferPayload, OfferListResponse, OfferResponse},
    },
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/offers",
    request_body = CreateOfferPayload,
    responses(
        (status = 201, description = "Offer created", body = OfferResponse),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Job title already taken")
    )
)]
#[axum::debug_handler]
pub async fn create_offer(
    State(state): State<AppState>,
    Json(payload): Json<CreateOfferPayload>,
) -> Result<impl IntoResponse> {
    let offer = state
        .lifecycle_service
        .submit_offer(payload.job_title, payload.start_date)
        .await?;
    Ok((StatusCode::CREATED, Json(OfferResponse::from(offer))))
}

#[utoipa::path(
    get,
    path = "/offers",
    responses(
        (status = 200, description = "All offers", body = OfferListResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_offers(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let offers = state.lifecycle_service.list_offers().await?;
    Ok(Json(OfferListResponse::from(offers)))
}

#[utoipa::path(
    get,
    path = "/offers/{id}",
    params(
        ("id" = i64, Path, description = "Offer ID")
    ),
    responses(
        (status = 200, description = "Offer found", body = OfferResponse),
        (status = 404, description = "Offer not found")
    )
)]
#[axum::debug_handler]
pub async fn get_offer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let offer = state.lifecycle_service.get_offer(id).await?;
    Ok(Json(OfferResponse::from(offer)))
}

#[utoipa::path(
    get,
    path = "/offers/{id}/applications",
    params(
        ("id" = i64, Path, description = "Offer ID")
    ),
    responses(
        (status = 200, description = "Applications to the offer", body = ApplicationListResponse),
        (status = 404, description = "Offer not found")
    )
)]
#[axum::debug_handler]
pub async fn list_offer_applications(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let applications = state.lifecycle_service.applications_for_offer(id).await?;
    Ok(Json(ApplicationListResponse::from(applications)))
}
