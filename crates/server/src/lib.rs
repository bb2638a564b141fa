use std::sync::Arc;

use db::DBService;
use jsonwebtoken::DecodingKey;
use secrecy::ExposeSecret;
use services::services::{
    barber::BarberService, booking::BookingService, catalog::CatalogService, queue::QueueService,
};
use tokio::signal;
use tracing::{error, info};

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

use config::Config;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct DeploymentImpl {
    queues: QueueService,
    barbers: BarberService,
    catalog: CatalogService,
    bookings: BookingService,
    auth_key: Arc<DecodingKey>,
}

impl DeploymentImpl {
    pub fn new(db: DBService, config: &Config) -> Self {
        let queues = QueueService::new(db.clone(), config.queue);
        Self {
            barbers: BarberService::new(db.clone(), queues.clone()),
            catalog: CatalogService::new(db.clone()),
            bookings: BookingService::new(db),
            auth_key: Arc::new(DecodingKey::from_secret(
                config.jwt_secret.expose_secret().as_bytes(),
            )),
            queues,
        }
    }

    pub fn queues(&self) -> &QueueService {
        &self.queues
    }

    pub fn barbers(&self) -> &BarberService {
        &self.barbers
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn bookings(&self) -> &BookingService {
        &self.bookings
    }

    pub fn auth_key(&self) -> &DecodingKey {
        &self.auth_key
    }
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
