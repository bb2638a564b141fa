use std::time::Duration;

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{DeploymentImpl, middleware::security_headers};

pub mod admin;
pub mod barbers;
pub mod barbershops;
pub mod bookings;
pub mod health;
pub mod queues;

pub fn router(deployment: DeploymentImpl) -> Router {
    let api = Router::new()
        .merge(health::router(&deployment))
        .merge(barbershops::router(&deployment))
        .merge(queues::router(&deployment))
        .merge(barbers::router(&deployment))
        .merge(bookings::router(&deployment))
        .merge(admin::router(&deployment));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    security_headers::apply(app).with_state(deployment)
}
