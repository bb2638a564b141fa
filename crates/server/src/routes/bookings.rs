use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get},
};
use chrono::NaiveDate;
use db::models::booking::{Booking, BookingWithService, CreateBooking};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::MaybeCaller};

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    /// `YYYY-MM-DD`, interpreted as a UTC day
    pub date: String,
}

fn parse_day(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest("date must be formatted as YYYY-MM-DD".to_string()))
}

/// POST /api/bookings
pub async fn create_booking(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Json(payload): Json<CreateBooking>,
) -> Result<ResponseJson<ApiResponse<Booking>>, ApiError> {
    let booking = deployment
        .bookings()
        .create_booking(caller.caller(), payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        booking,
        "Booking confirmed",
    )))
}

/// GET /api/bookings?date=YYYY-MM-DD
pub async fn bookings_on_day(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<DayQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Booking>>>, ApiError> {
    let day = parse_day(&query.date)?;
    let bookings = deployment.bookings().bookings_on_day(day).await?;
    Ok(ResponseJson(ApiResponse::success(bookings)))
}

pub async fn delete_booking(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .bookings()
        .delete_booking(caller.caller(), id)
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Booking cancelled",
    )))
}

/// Upcoming bookings of the caller
pub async fn confirmed_bookings(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
) -> Result<ResponseJson<ApiResponse<Vec<BookingWithService>>>, ApiError> {
    let bookings = deployment
        .bookings()
        .confirmed_bookings(caller.caller())
        .await?;
    Ok(ResponseJson(ApiResponse::success(bookings)))
}

/// Past bookings of the caller
pub async fn concluded_bookings(
    State(deployment): State<DeploymentImpl>,
    caller: MaybeCaller,
) -> Result<ResponseJson<ApiResponse<Vec<BookingWithService>>>, ApiError> {
    let bookings = deployment
        .bookings()
        .concluded_bookings(caller.caller())
        .await?;
    Ok(ResponseJson(ApiResponse::success(bookings)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/bookings",
        Router::new()
            .route("/", get(bookings_on_day).post(create_booking))
            .route("/confirmed", get(confirmed_bookings))
            .route("/concluded", get(concluded_bookings))
            .route("/{id}", delete(delete_booking)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_must_be_iso_formatted() {
        assert_eq!(
            parse_day(" 2025-06-10 ").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
        );
        assert!(matches!(parse_day("10/06/2025"), Err(ApiError::BadRequest(_))));
        assert!(parse_day("2025-02-30").is_err());
    }
}
