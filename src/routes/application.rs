use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use crate::{
    dto::application_dto::{
        ApplicationListQuery, ApplicationListResponse, ApplicationResponse,
        ApplicationTotalResponse, CreateApplicationPayload, HistoryResponse, UpdateStatusPayload,
    },
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/applications",
    request_body = CreateApplicationPayload,
    responses(
        (status = 201, description = "Application submitted", body = ApplicationResponse),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Offer not found"),
        (status = 409, description = "Candidate already applied to this offer")
    )
)]
#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    Json(payload): Json<CreateApplicationPayload>,
) -> Result<impl IntoResponse> {
    let application = state
        .lifecycle_service
        .submit_application(payload.offer_id, payload.email, payload.resume)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApplicationResponse::from(application)),
    ))
}

#[utoipa::path(
    get,
    path = "/applications",
    params(
        ("offer_id" = Option<i64>, Query, description = "Only applications to this offer")
    ),
    responses(
        (status = 200, description = "Applications", body = ApplicationListResponse),
        (status = 404, description = "Offer not found")
    )
)]
#[axum::debug_handler]
pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let applications = state
        .lifecycle_service
        .list_applications(query.offer_id)
        .await?;
    Ok(Json(ApplicationListResponse::from(applications)))
}

#[utoipa::path(
    get,
    path = "/applications/total",
    params(
        ("offer_id" = Option<i64>, Query, description = "Only count applications to this offer")
    ),
    responses(
        (status = 200, description = "Number of applications", body = ApplicationTotalResponse),
        (status = 404, description = "Offer not found")
    )
)]
#[axum::debug_handler]
pub async fn count_applications(
    State(state): State<AppState>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let total = state
        .lifecycle_service
        .count_applications(query.offer_id)
        .await?;
    Ok(Json(ApplicationTotalResponse { total }))
}

#[utoipa::path(
    get,
    path = "/applications/{id}",
    params(
        ("id" = i64, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application found", body = ApplicationResponse),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let application = state.lifecycle_service.get_application(id).await?;
    Ok(Json(ApplicationResponse::from(application)))
}

#[utoipa::path(
    delete,
    path = "/applications/{id}",
    params(
        ("id" = i64, Path, description = "Application ID")
    ),
    responses(
        (status = 204, description = "Application removed"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.lifecycle_service.remove_application(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/applications/{id}/status",
    params(
        ("id" = i64, Path, description = "Application ID")
    ),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status changed", body = ApplicationResponse),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application was modified concurrently"),
        (status = 422, description = "Transition not allowed")
    )
)]
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse> {
    let status = payload.target_status()?;
    let application = state.lifecycle_service.advance_status(id, status).await?;
    Ok(Json(ApplicationResponse::from(application)))
}

#[utoipa::path(
    get,
    path = "/applications/{id}/history",
    params(
        ("id" = i64, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Status history, oldest first", body = HistoryResponse),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let ledger = state.lifecycle_service.history_for(id).await?;
    Ok(Json(HistoryResponse::from(ledger)))
}
