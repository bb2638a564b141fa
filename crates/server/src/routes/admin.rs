//! Administrator provisioning of shops and accounts.

use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::post,
};
use db::models::{
    barbershop::{Barbershop, CreateBarbershop},
    user::{CreateUser, User},
};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::MaybeCaller};

/// POST /api/admin/barbershops
pub async fn create_barbershop(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Json(payload): Json<CreateBarbershop>,
) -> Result<ResponseJson<ApiResponse<Barbershop>>, ApiError> {
    let shop = deployment
        .catalog()
        .create_barbershop(caller.caller(), payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(shop)))
}

/// POST /api/admin/users
pub async fn create_user(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Json(payload): Json<CreateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = deployment
        .catalog()
        .create_user(caller.caller(), payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/admin",
        Router::new()
            .route("/barbershops", post(create_barbershop))
            .route("/users", post(create_user)),
    )
}
