use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    queue::{CreateQueue, Queue},
    queue_entry::QueueEntry,
};
use serde::{Deserialize, Serialize};
use services::services::queue::{JoinQueueRequest, JoinQueueResponse, QueueStatus};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::MaybeCaller};

#[derive(Debug, Deserialize)]
pub struct QueueListQuery {
    pub barbershop_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateDefaultQueueRequest {
    pub barbershop_id: Uuid,
}

/// Body of a leave request; guests identify themselves by phone
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LeaveQueueRequest {
    pub customer_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueueStatusQuery {
    pub customer_phone: Option<String>,
}

/// GET /api/queues?barbershop_id=...
pub async fn list_queues(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<QueueListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Queue>>>, ApiError> {
    let queues = deployment.queues().list_queues(query.barbershop_id).await?;
    Ok(ResponseJson(ApiResponse::success(queues)))
}

/// POST /api/queues (administrators only)
pub async fn create_queue(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Json(payload): Json<CreateQueue>,
) -> Result<ResponseJson<ApiResponse<Queue>>, ApiError> {
    let queue = deployment
        .queues()
        .create_queue(caller.caller(), payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(queue)))
}

/// POST /api/queues/create-default
pub async fn create_default_queue(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateDefaultQueueRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<Queue>>>, ApiError> {
    let queues = deployment
        .queues()
        .create_default_queue(payload.barbershop_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(queues)))
}

/// POST /api/queues/{id}/join
pub async fn join_queue(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Path(id): Path<Uuid>,
    Json(payload): Json<JoinQueueRequest>,
) -> Result<ResponseJson<ApiResponse<JoinQueueResponse>>, ApiError> {
    let joined = deployment
        .queues()
        .join(id, caller.caller(), payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        joined,
        "Joined the queue",
    )))
}

/// POST /api/queues/{id}/leave
pub async fn leave_queue(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Path(id): Path<Uuid>,
    payload: Option<Json<LeaveQueueRequest>>,
) -> Result<ResponseJson<ApiResponse<QueueEntry>>, ApiError> {
    let customer_phone = payload.and_then(|Json(body)| body.customer_phone);
    let entry = deployment
        .queues()
        .leave(id, caller.caller(), customer_phone.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        entry,
        "Left the queue",
    )))
}

/// GET /api/queues/{id}/status?customer_phone=...
pub async fn queue_status(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Path(id): Path<Uuid>,
    Query(query): Query<QueueStatusQuery>,
) -> Result<ResponseJson<ApiResponse<QueueStatus>>, ApiError> {
    let status = deployment
        .queues()
        .status(id, caller.caller(), query.customer_phone.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(status)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/queues", get(list_queues).post(create_queue))
        .route("/queues/create-default", post(create_default_queue))
        .nest(
            "/queues/{id}",
            Router::new()
                .route("/join", post(join_queue))
                .route("/leave", post(leave_queue))
                .route("/status", get(queue_status)),
        )
}
