pub mod application;
pub mod health;
pub mod offer;

use axum::{
    routing::{get, patch},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::{
    dto::{application_dto, offer_dto},
    middleware::{cors::api_cors, rate_limit},
    models::status::ApplicationStatus,
    AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        offer::create_offer,
        offer::list_offers,
        offer::get_offer,
        offer::list_offer_applications,
        application::submit_application,
        application::list_applications,
        application::count_applications,
        application::get_application,
        application::delete_application,
        application::update_status,
        application::get_history,
    ),
    components(schemas(
        ApplicationStatus,
        offer_dto::CreateOfferPayload,
        offer_dto::OfferResponse,
        offer_dto::OfferListResponse,
        application_dto::CreateApplicationPayload,
        application_dto::UpdateStatusPayload,
        application_dto::ApplicationResponse,
        application_dto::ApplicationListResponse,
        application_dto::ApplicationTotalResponse,
        application_dto::HistoryEntryResponse,
        application_dto::HistoryResponse,
    ))
)]
pub struct ApiDoc;

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Full HTTP surface. The API routes sit behind one shared rate limiter;
/// health and the OpenAPI document do not.
pub fn router(state: AppState, api_rps: u32) -> Router {
    let api = Router::new()
        .route(
            "/offers",
            get(offer::list_offers).post(offer::create_offer),
        )
        .route("/offers/:id", get(offer::get_offer))
        .route(
            "/offers/:id/applications",
            get(offer::list_offer_applications),
        )
        .route(
            "/applications",
            get(application::list_applications).post(application::submit_application),
        )
        .route("/applications/total", get(application::count_applications))
        .route(
            "/applications/:id",
            get(application::get_application).delete(application::delete_application),
        )
        .route("/applications/:id/status", patch(application::update_status))
        .route("/applications/:id/history", get(application::get_history))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RateLimiter::new(api_rps),
            rate_limit::rps_middleware,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(openapi))
        .merge(api)
        .with_state(state)
        .layer(api_cors())
        .layer(TraceLayer::new_for_http())
}
