//! Public catalog of barbershops, plus admin management of their services.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    barber_status::ActiveBarber,
    barbershop::Barbershop,
    barbershop_service::{BarbershopService, CreateBarbershopService, UpdateBarbershopService},
};
use services::services::queue::QueueWithDetails;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::MaybeCaller};

/// GET /api/barbershops
pub async fn list_barbershops(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Barbershop>>>, ApiError> {
    let shops = deployment.catalog().list_barbershops().await?;
    Ok(ResponseJson(ApiResponse::success(shops)))
}

/// GET /api/barbershops/{id}
pub async fn get_barbershop(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Barbershop>>, ApiError> {
    let shop = deployment.catalog().get_barbershop(id).await?;
    Ok(ResponseJson(ApiResponse::success(shop)))
}

/// GET /api/barbershops/{id}/services
pub async fn list_services(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<BarbershopService>>>, ApiError> {
    let services = deployment.catalog().list_services(id).await?;
    Ok(ResponseJson(ApiResponse::success(services)))
}

pub async fn create_service(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateBarbershopService>,
) -> Result<ResponseJson<ApiResponse<BarbershopService>>, ApiError> {
    let service = deployment
        .catalog()
        .create_service(caller.caller(), id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(service)))
}

pub async fn get_service(
    State(deployment): State<DeploymentImpl>,
    Path((id, service_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<BarbershopService>>, ApiError> {
    let service = deployment.catalog().get_service(id, service_id).await?;
    Ok(ResponseJson(ApiResponse::success(service)))
}

pub async fn update_service(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Path((id, service_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateBarbershopService>,
) -> Result<ResponseJson<ApiResponse<BarbershopService>>, ApiError> {
    let service = deployment
        .catalog()
        .update_service(caller.caller(), id, service_id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(service)))
}

/// Soft delete; the service disappears from listings
pub async fn delete_service(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Path((id, service_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .catalog()
        .delete_service(caller.caller(), id, service_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Service removed",
    )))
}

/// GET /api/barbershops/{id}/queues
///
/// Creates the general queue (and a specific one once a barber is on duty) on first access.
pub async fn list_shop_queues(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<QueueWithDetails>>>, ApiError> {
    let queues = deployment.queues().list_shop_queues(id).await?;
    Ok(ResponseJson(ApiResponse::success(queues)))
}

/// GET /api/barbershops/{id}/active-barbers
pub async fn active_barbers(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<ActiveBarber>>>, ApiError> {
    let barbers = deployment.barbers().active_barbers(id).await?;
    Ok(ResponseJson(ApiResponse::success(barbers)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/barbershops", get(list_barbershops)).nest(
        "/barbershops/{id}",
        Router::new()
            .route("/", get(get_barbershop))
            .route("/services", get(list_services).post(create_service))
            .route(
                "/services/{service_id}",
                get(get_service).put(update_service).delete(delete_service),
            )
            .route("/queues", get(list_shop_queues))
            .route("/active-barbers", get(active_barbers)),
    )
}
