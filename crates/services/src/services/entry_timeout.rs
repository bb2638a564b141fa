//! Service for expiring called customers who never showed up at the chair.

use std::time::Duration;

use chrono::{DateTime, Utc};
use db::{
    DBService,
    models::queue_entry::{QueueEntry, QueueEntryStatus},
};
use thiserror::Error;
use tokio::time::interval;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum EntryTimeoutError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Background service that moves stale `called` entries to `timeout`
pub struct EntryTimeoutService {
    db: DBService,
    poll_interval: Duration,
}

impl EntryTimeoutService {
    pub fn new(db: DBService, poll_interval: Duration) -> Self {
        Self { db, poll_interval }
    }

    /// Spawn the background entry timeout service
    pub async fn spawn(db: DBService, poll_interval: Duration) -> tokio::task::JoinHandle<()> {
        let service = Self::new(db, poll_interval);
        tokio::spawn(async move {
            service.start().await;
        })
    }

    async fn start(&self) {
        info!(
            "Starting entry timeout service with interval {:?}",
            self.poll_interval
        );

        let mut interval = interval(self.poll_interval);

        loop {
            interval.tick().await;
            if let Err(e) = self.expire_called_entries(Utc::now()).await {
                error!("Error expiring called queue entries: {}", e);
            }
        }
    }

    /// Times out every called entry whose shop timeout has elapsed at `now`.
    /// Returns how many entries were expired.
    pub async fn expire_called_entries(&self, now: DateTime<Utc>) -> Result<usize, EntryTimeoutError> {
        let expired = QueueEntry::find_expired_calls(&self.db.pool, now).await?;
        if expired.is_empty() {
            debug!("Entry timeout: no expired calls");
            return Ok(0);
        }

        let mut count = 0;
        for call in expired {
            // Skipped when a barber started the service in the meantime
            let Some(entry) = QueueEntry::transition(
                &self.db.pool,
                call.id,
                QueueEntryStatus::Called,
                QueueEntryStatus::Timeout,
            )
            .await?
            else {
                continue;
            };

            info!(
                entry_id = %entry.id,
                queue_id = %call.queue_id,
                barbershop_id = %call.barbershop_id,
                timeout_minutes = call.timeout_minutes,
                called_at = %call.called_at,
                "Entry timeout: called customer did not show up, expiring"
            );
            count += 1;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use db::{
        fixtures,
        models::queue::{Queue, QueueType},
    };
    use uuid::Uuid;

    use super::*;

    async fn waiting_entry(db: &DBService, queue: &Queue, position: i32) -> QueueEntry {
        let data = db::models::queue_entry::NewQueueEntry {
            queue_id: queue.id,
            user_id: None,
            position,
            estimated_time: position * 15,
            selected_barber_id: None,
            selected_service_id: None,
            customer_name: Some("Guest".to_string()),
            customer_phone: Some(format!("555-000{position}")),
            is_guest: true,
            parent_phone: None,
        };
        QueueEntry::create(&db.pool, &data, Uuid::new_v4()).await.unwrap()
    }

    #[tokio::test]
    async fn expires_only_calls_older_than_shop_timeout() {
        let db = DBService::new_in_memory().await.unwrap();
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;
        let queue = fixtures::queue(&db.pool, shop.id, QueueType::General).await;
        let service = EntryTimeoutService::new(db.clone(), Duration::from_secs(10));

        let called = waiting_entry(&db, &queue, 1).await;
        let called = QueueEntry::transition(
            &db.pool,
            called.id,
            QueueEntryStatus::Waiting,
            QueueEntryStatus::Called,
        )
        .await
        .unwrap()
        .unwrap();
        let waiting = waiting_entry(&db, &queue, 2).await;
        let called_at = called.called_at.unwrap();

        let early = called_at + chrono::Duration::minutes(9);
        assert_eq!(service.expire_called_entries(early).await.unwrap(), 0);

        let late = called_at + chrono::Duration::minutes(11);
        assert_eq!(service.expire_called_entries(late).await.unwrap(), 1);

        let expired = QueueEntry::find_by_id(&db.pool, called.id).await.unwrap().unwrap();
        assert_eq!(expired.status, QueueEntryStatus::Timeout);
        assert!(expired.timeout_at.is_some());

        let untouched = QueueEntry::find_by_id(&db.pool, waiting.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, QueueEntryStatus::Waiting);

        // Nothing left to expire
        assert_eq!(service.expire_called_entries(late).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn entries_already_in_service_are_left_alone() {
        let db = DBService::new_in_memory().await.unwrap();
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;
        let queue = fixtures::queue(&db.pool, shop.id, QueueType::General).await;
        let service = EntryTimeoutService::new(db.clone(), Duration::from_secs(10));

        let entry = waiting_entry(&db, &queue, 1).await;
        let called = QueueEntry::transition(
            &db.pool,
            entry.id,
            QueueEntryStatus::Waiting,
            QueueEntryStatus::Called,
        )
        .await
        .unwrap()
        .unwrap();
        QueueEntry::transition(
            &db.pool,
            entry.id,
            QueueEntryStatus::Called,
            QueueEntryStatus::InService,
        )
        .await
        .unwrap()
        .unwrap();

        let late = called.called_at.unwrap() + chrono::Duration::hours(1);
        assert_eq!(service.expire_called_entries(late).await.unwrap(), 0);
        let entry = QueueEntry::find_by_id(&db.pool, entry.id).await.unwrap().unwrap();
        assert_eq!(entry.status, QueueEntryStatus::InService);
    }
}
