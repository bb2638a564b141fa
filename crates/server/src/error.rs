use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    barber::BarberError, booking::BookingError, catalog::CatalogError, identity::AccessError,
    queue::QueueError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Barber(#[from] BarberError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("invalid or expired authentication token")]
    InvalidToken,
    #[error("{0}")]
    BadRequest(String),
}

fn access_status(err: &AccessError) -> StatusCode {
    match err {
        AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AccessError::Forbidden(_) => StatusCode::FORBIDDEN,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Queue(err) => match err {
                QueueError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                QueueError::Access(access) => access_status(access),
                QueueError::QueueNotFound
                | QueueError::BarbershopNotFound
                | QueueError::EntryNotFound => StatusCode::NOT_FOUND,
                QueueError::Validation(_) => StatusCode::BAD_REQUEST,
                QueueError::BarberNotActive | QueueError::AlreadyWaiting | QueueError::QueueFull => {
                    StatusCode::CONFLICT
                }
            },
            ApiError::Barber(err) => match err {
                BarberError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                BarberError::Access(access) => access_status(access),
                BarberError::BarbershopNotFound
                | BarberError::BarberNotFound
                | BarberError::NotActive
                | BarberError::EntryNotFound
                | BarberError::NobodyWaiting => StatusCode::NOT_FOUND,
                BarberError::BarbershopInactive
                | BarberError::UnexpectedStatus { .. }
                | BarberError::Validation(_) => StatusCode::BAD_REQUEST,
                BarberError::Conflict => StatusCode::CONFLICT,
            },
            ApiError::Catalog(err) => match err {
                CatalogError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CatalogError::Access(access) => access_status(access),
                CatalogError::BarbershopNotFound | CatalogError::ServiceNotFound => {
                    StatusCode::NOT_FOUND
                }
                CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
                CatalogError::EmailTaken => StatusCode::CONFLICT,
            },
            ApiError::Booking(err) => match err {
                BookingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                BookingError::Access(access) => access_status(access),
                BookingError::ServiceNotFound | BookingError::BookingNotFound => {
                    StatusCode::NOT_FOUND
                }
            },
            ApiError::Access(access) => access_status(access),
            ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let response = ApiResponse::<()>::error(&message);
        (status, Json(response)).into_response()
    }
}
