//! Routes for barbers on duty, plus public barber profiles and reviews.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    payment::PaymentMethod,
    queue_entry::QueueEntry,
    review::{CreateReview, Review},
};
use serde::{Deserialize, Serialize};
use services::services::barber::{
    BarberQueueView, BarberStats, BarberStatusWithShop, CompleteServiceRequest, CompletedService,
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::MaybeCaller};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BarbershopRequest {
    pub barbershop_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct BarbershopQuery {
    pub barbershop_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct EntryRequest {
    pub entry_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CompleteEntryRequest {
    pub entry_id: Uuid,
    pub amount: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ReviewRequest {
    pub barbershop_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

/// POST /api/barbers/activate
pub async fn activate(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Json(payload): Json<BarbershopRequest>,
) -> Result<ResponseJson<ApiResponse<BarberStatusWithShop>>, ApiError> {
    let status = deployment
        .barbers()
        .activate(caller.caller(), payload.barbershop_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        status,
        "Barber activated",
    )))
}

/// POST /api/barbers/deactivate
pub async fn deactivate(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.barbers().deactivate(caller.caller()).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Barber deactivated",
    )))
}

/// GET /api/barbers/status
pub async fn current_status(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
) -> Result<ResponseJson<ApiResponse<Option<BarberStatusWithShop>>>, ApiError> {
    let status = deployment.barbers().current_status(caller.caller()).await?;
    Ok(ResponseJson(ApiResponse::success(status)))
}

/// GET /api/barbers/queue?barbershop_id=...
pub async fn queue_view(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Query(query): Query<BarbershopQuery>,
) -> Result<ResponseJson<ApiResponse<BarberQueueView>>, ApiError> {
    let view = deployment
        .barbers()
        .queue_view(caller.caller(), query.barbershop_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

/// POST /api/barbers/next
pub async fn call_next(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Json(payload): Json<BarbershopRequest>,
) -> Result<ResponseJson<ApiResponse<QueueEntry>>, ApiError> {
    let entry = deployment
        .barbers()
        .call_next(caller.caller(), payload.barbershop_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        entry,
        "Customer called",
    )))
}

/// POST /api/barbers/timeout
pub async fn apply_timeout(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Json(payload): Json<EntryRequest>,
) -> Result<ResponseJson<ApiResponse<QueueEntry>>, ApiError> {
    let entry = deployment
        .barbers()
        .apply_timeout(caller.caller(), payload.entry_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        entry,
        "Timeout applied",
    )))
}

/// POST /api/barbers/start
pub async fn start_service(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Json(payload): Json<EntryRequest>,
) -> Result<ResponseJson<ApiResponse<QueueEntry>>, ApiError> {
    let entry = deployment
        .barbers()
        .start_service(caller.caller(), payload.entry_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(entry)))
}

/// POST /api/barbers/complete
pub async fn complete_service(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Json(payload): Json<CompleteEntryRequest>,
) -> Result<ResponseJson<ApiResponse<CompletedService>>, ApiError> {
    let request = CompleteServiceRequest {
        amount: payload.amount,
        payment_method: payload.payment_method,
    };
    let completed = deployment
        .barbers()
        .complete_service(caller.caller(), payload.entry_id, request)
        .await?;
    Ok(ResponseJson(ApiResponse::success(completed)))
}

/// GET /api/barbers/{id}/reviews
pub async fn barber_stats(
    State(deployment): State<DeploymentImpl>,
    Path(barber_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<BarberStats>>, ApiError> {
    let stats = deployment.barbers().barber_stats(barber_id).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

/// POST /api/barbers/{id}/reviews
pub async fn create_review(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Path(barber_id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> Result<ResponseJson<ApiResponse<Review>>, ApiError> {
    let data = CreateReview {
        barber_id,
        barbershop_id: payload.barbershop_id,
        rating: payload.rating,
        comment: payload.comment,
    };
    let review = deployment
        .barbers()
        .create_review(caller.caller(), data)
        .await?;
    Ok(ResponseJson(ApiResponse::success(review)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/barbers",
        Router::new()
            .route("/activate", post(activate))
            .route("/deactivate", post(deactivate))
            .route("/status", get(current_status))
            .route("/queue", get(queue_view))
            .route("/next", post(call_next))
            .route("/timeout", post(apply_timeout))
            .route("/start", post(start_service))
            .route("/complete", post(complete_service))
            .route("/{id}/reviews", get(barber_stats).post(create_review)),
    )
}
