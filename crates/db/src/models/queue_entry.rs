use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use tracing::warn;
use ts_rs::TS;
use uuid::Uuid;

use super::barbershop_service::ServiceCategory;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "queue_entry_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueueEntryStatus {
    #[default]
    Waiting,
    Called,
    InService,
    Completed,
    Left,
    Timeout,
}

impl QueueEntryStatus {
    pub fn can_transition_to(self, next: QueueEntryStatus) -> bool {
        use QueueEntryStatus::{Called, Completed, InService, Left, Timeout, Waiting};
        matches!(
            (self, next),
            (Waiting, Called)
                | (Waiting, Left)
                | (Waiting, Timeout)
                | (Called, InService)
                | (Called, Left)
                | (Called, Timeout)
                | (InService, Completed)
        )
    }

    /// Column stamped when an entry enters this status
    fn timestamp_column(self) -> Option<&'static str> {
        match self {
            Self::Waiting => None,
            Self::Called => Some("called_at"),
            Self::InService => Some("started_at"),
            Self::Completed => Some("completed_at"),
            Self::Left => Some("left_at"),
            Self::Timeout => Some("timeout_at"),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct QueueEntry {
    pub id: Uuid,
    pub queue_id: Uuid,
    pub user_id: Option<Uuid>, // None for guests
    pub position: i32,
    pub status: QueueEntryStatus,
    pub estimated_time: Option<i32>, // minutes, computed at join time
    pub selected_barber_id: Option<Uuid>,
    pub selected_service_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub is_guest: bool,
    pub parent_phone: Option<String>, // Guardian contact for minors
    pub joined_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub timeout_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row values for a new waiting entry; position and estimate are computed by the caller
#[derive(Debug, Clone)]
pub struct NewQueueEntry {
    pub queue_id: Uuid,
    pub user_id: Option<Uuid>,
    pub position: i32,
    pub estimated_time: i32,
    pub selected_barber_id: Option<Uuid>,
    pub selected_service_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub is_guest: bool,
    pub parent_phone: Option<String>,
}

/// Public view of a waiting entry; carries no customer details
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct WaitingSlot {
    pub id: Uuid,
    pub position: i32,
    pub estimated_time: Option<i32>,
    pub joined_at: DateTime<Utc>,
}

/// A called entry whose shop timeout has elapsed
#[derive(Debug, Clone, FromRow)]
pub struct ExpiredCall {
    pub id: Uuid,
    pub queue_id: Uuid,
    pub barbershop_id: Uuid,
    pub timeout_minutes: i32,
    pub called_at: DateTime<Utc>,
}

impl QueueEntry {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, QueueEntry>(r#"SELECT * FROM queue_entries WHERE id = $1"#)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Highest waiting position + 1, or 1 when nobody is waiting
    pub async fn next_position<'e, E>(executor: E, queue_id: Uuid) -> Result<i32, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i32>(
            r#"SELECT COALESCE(MAX(position), 0) + 1
               FROM queue_entries
               WHERE queue_id = $1 AND status = 'waiting'"#,
        )
        .bind(queue_id)
        .fetch_one(executor)
        .await
    }

    pub async fn count_waiting<'e, E>(executor: E, queue_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM queue_entries WHERE queue_id = $1 AND status = 'waiting'"#,
        )
        .bind(queue_id)
        .fetch_one(executor)
        .await
    }

    /// Waiting entries with a lower position than `position`
    pub async fn count_ahead(
        pool: &SqlitePool,
        queue_id: Uuid,
        position: i32,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM queue_entries
               WHERE queue_id = $1 AND status = 'waiting' AND position < $2"#,
        )
        .bind(queue_id)
        .bind(position)
        .fetch_one(pool)
        .await
    }

    pub async fn create<'e, E>(executor: E, data: &NewQueueEntry, id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, QueueEntry>(
            r#"INSERT INTO queue_entries (id, queue_id, user_id, position, status, estimated_time, selected_barber_id, selected_service_id, customer_name, customer_phone, is_guest, parent_phone, joined_at, created_at, updated_at)
               VALUES ($1, $2, $3, $4, 'waiting', $5, $6, $7, $8, $9, $10, $11, $12, $12, $12)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.queue_id)
        .bind(data.user_id)
        .bind(data.position)
        .bind(data.estimated_time)
        .bind(data.selected_barber_id)
        .bind(data.selected_service_id)
        .bind(&data.customer_name)
        .bind(&data.customer_phone)
        .bind(data.is_guest)
        .bind(&data.parent_phone)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    /// Most recent waiting entry of an account in a queue
    pub async fn find_waiting_for_user<'e, E>(
        executor: E,
        queue_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, QueueEntry>(
            r#"SELECT * FROM queue_entries
               WHERE queue_id = $1 AND user_id = $2 AND status = 'waiting'
               ORDER BY created_at DESC, rowid DESC
               LIMIT 1"#,
        )
        .bind(queue_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Most recent waiting entry registered under a phone number in a queue
    pub async fn find_waiting_for_phone<'e, E>(
        executor: E,
        queue_id: Uuid,
        phone: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, QueueEntry>(
            r#"SELECT * FROM queue_entries
               WHERE queue_id = $1 AND customer_phone = $2 AND status = 'waiting'
               ORDER BY created_at DESC, rowid DESC
               LIMIT 1"#,
        )
        .bind(queue_id)
        .bind(phone)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_waiting_slots(
        pool: &SqlitePool,
        queue_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WaitingSlot>, sqlx::Error> {
        sqlx::query_as::<_, WaitingSlot>(
            r#"SELECT id, position, estimated_time, joined_at
               FROM queue_entries
               WHERE queue_id = $1 AND status = 'waiting'
               ORDER BY position ASC
               LIMIT $2"#,
        )
        .bind(queue_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Entries a barber still has to deal with: waiting, called or in service
    pub async fn find_open_by_queue(
        pool: &SqlitePool,
        queue_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, QueueEntry>(
            r#"SELECT * FROM queue_entries
               WHERE queue_id = $1 AND status IN ('waiting', 'called', 'in_service')
               ORDER BY position ASC, created_at ASC"#,
        )
        .bind(queue_id)
        .fetch_all(pool)
        .await
    }

    /// Lowest-position waiting entry in a queue
    pub async fn find_next_in_queue<'e, E>(
        executor: E,
        queue_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, QueueEntry>(
            r#"SELECT * FROM queue_entries
               WHERE queue_id = $1 AND status = 'waiting'
               ORDER BY position ASC, created_at ASC
               LIMIT 1"#,
        )
        .bind(queue_id)
        .fetch_optional(executor)
        .await
    }

    /// Lowest-position waiting entry that asked for this barber in any active queue of the shop
    pub async fn find_next_for_barber<'e, E>(
        executor: E,
        barbershop_id: Uuid,
        barber_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, QueueEntry>(
            r#"SELECT qe.* FROM queue_entries qe
               JOIN queues q ON q.id = qe.queue_id
               WHERE q.barbershop_id = $1
                 AND q.is_active = 1
                 AND qe.selected_barber_id = $2
                 AND qe.status = 'waiting'
               ORDER BY qe.position ASC, qe.created_at ASC
               LIMIT 1"#,
        )
        .bind(barbershop_id)
        .bind(barber_id)
        .fetch_optional(executor)
        .await
    }

    /// Compare-and-set status change. Stamps the column tied to `to` and returns
    /// None when the entry is missing, no longer in `from`, or `from -> to`
    /// is not a lifecycle step.
    pub async fn transition<'e, E>(
        executor: E,
        id: Uuid,
        from: QueueEntryStatus,
        to: QueueEntryStatus,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if !from.can_transition_to(to) {
            warn!(entry_id = %id, %from, %to, "Refusing queue entry status change outside the lifecycle");
            return Ok(None);
        }

        let stamp = to
            .timestamp_column()
            .map(|column| format!(", {column} = $4"))
            .unwrap_or_default();
        let sql = format!(
            "UPDATE queue_entries SET status = $3, updated_at = $4{stamp} \
             WHERE id = $1 AND status = $2 RETURNING *"
        );
        sqlx::query_as::<_, QueueEntry>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(Utc::now())
            .fetch_optional(executor)
            .await
    }

    /// Called entries whose shop timeout has passed at `now`
    pub async fn find_expired_calls(
        pool: &SqlitePool,
        now: DateTime<Utc>,
    ) -> Result<Vec<ExpiredCall>, sqlx::Error> {
        sqlx::query_as::<_, ExpiredCall>(
            r#"SELECT qe.id, qe.queue_id, q.barbershop_id, b.timeout_minutes, qe.called_at
               FROM queue_entries qe
               JOIN queues q ON q.id = qe.queue_id
               JOIN barbershops b ON b.id = q.barbershop_id
               WHERE qe.status = 'called'
                 AND qe.called_at IS NOT NULL
                 AND datetime(qe.called_at, '+' || b.timeout_minutes || ' minutes') <= datetime($1)
               ORDER BY qe.called_at ASC"#,
        )
        .bind(now)
        .fetch_all(pool)
        .await
    }

    /// Entries that picked this barber, created at or after `since`
    pub async fn count_for_barber_since(
        pool: &SqlitePool,
        barber_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM queue_entries
               WHERE selected_barber_id = $1 AND datetime(created_at) >= datetime($2)"#,
        )
        .bind(barber_id)
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Service categories most often picked with this barber, most frequent first
    pub async fn top_categories_for_barber(
        pool: &SqlitePool,
        barber_id: Uuid,
        limit: i64,
    ) -> Result<Vec<(ServiceCategory, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (ServiceCategory, i64)>(
            r#"SELECT s.category, COUNT(*) AS uses
               FROM queue_entries qe
               JOIN barbershop_services s ON s.id = qe.selected_service_id
               WHERE qe.selected_barber_id = $1
               GROUP BY s.category
               ORDER BY uses DESC, s.category ASC
               LIMIT $2"#,
        )
        .bind(barber_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService, fixtures,
        models::queue::{Queue, QueueType},
    };

    fn guest(queue: &Queue, position: i32, phone: &str) -> NewQueueEntry {
        NewQueueEntry {
            queue_id: queue.id,
            user_id: None,
            position,
            estimated_time: position * 15,
            selected_barber_id: None,
            selected_service_id: None,
            customer_name: Some("Guest".to_string()),
            customer_phone: Some(phone.to_string()),
            is_guest: true,
            parent_phone: None,
        }
    }

    #[test]
    fn transitions_follow_the_entry_lifecycle() {
        use QueueEntryStatus::*;
        assert!(Waiting.can_transition_to(Called));
        assert!(Waiting.can_transition_to(Left));
        assert!(Called.can_transition_to(Timeout));
        assert!(InService.can_transition_to(Completed));
        assert!(!Waiting.can_transition_to(Completed));
        assert!(!Left.can_transition_to(Waiting));
        assert!(!Timeout.can_transition_to(Called));
        for terminal in [Completed, Left, Timeout] {
            for next in [Waiting, Called, InService, Completed, Left, Timeout] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[tokio::test]
    async fn transition_refuses_steps_outside_the_lifecycle() {
        let db = DBService::new_in_memory().await.unwrap();
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;
        let queue = fixtures::queue(&db.pool, shop.id, QueueType::General).await;
        let entry = QueueEntry::create(&db.pool, &guest(&queue, 1, "555-0001"), Uuid::new_v4())
            .await
            .unwrap();

        let skipped = QueueEntry::transition(
            &db.pool,
            entry.id,
            QueueEntryStatus::Waiting,
            QueueEntryStatus::Completed,
        )
        .await
        .unwrap();
        assert!(skipped.is_none());

        let stored = QueueEntry::find_by_id(&db.pool, entry.id).await.unwrap().unwrap();
        assert_eq!(stored.status, QueueEntryStatus::Waiting);
        assert!(stored.completed_at.is_none());
    }

    #[test]
    fn status_round_trips_as_snake_case() {
        assert_eq!(QueueEntryStatus::InService.to_string(), "in_service");
        assert_eq!(
            "in_service".parse::<QueueEntryStatus>().unwrap(),
            QueueEntryStatus::InService
        );
    }

    #[tokio::test]
    async fn next_position_only_counts_waiting_entries() {
        let db = DBService::new_in_memory().await.unwrap();
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;
        let queue = fixtures::queue(&db.pool, shop.id, QueueType::General).await;

        assert_eq!(QueueEntry::next_position(&db.pool, queue.id).await.unwrap(), 1);

        let first = QueueEntry::create(&db.pool, &guest(&queue, 1, "555-0001"), Uuid::new_v4())
            .await
            .unwrap();
        QueueEntry::create(&db.pool, &guest(&queue, 2, "555-0002"), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(QueueEntry::next_position(&db.pool, queue.id).await.unwrap(), 3);
        assert_eq!(QueueEntry::count_ahead(&db.pool, queue.id, 2).await.unwrap(), 1);

        QueueEntry::transition(
            &db.pool,
            first.id,
            QueueEntryStatus::Waiting,
            QueueEntryStatus::Called,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(QueueEntry::count_waiting(&db.pool, queue.id).await.unwrap(), 1);
        assert_eq!(QueueEntry::count_ahead(&db.pool, queue.id, 2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn transition_stamps_and_refuses_stale_state() {
        let db = DBService::new_in_memory().await.unwrap();
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;
        let queue = fixtures::queue(&db.pool, shop.id, QueueType::General).await;
        let entry = QueueEntry::create(&db.pool, &guest(&queue, 1, "555-0001"), Uuid::new_v4())
            .await
            .unwrap();

        let left = QueueEntry::transition(
            &db.pool,
            entry.id,
            QueueEntryStatus::Waiting,
            QueueEntryStatus::Left,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(left.status, QueueEntryStatus::Left);
        assert!(left.left_at.is_some());
        assert!(left.called_at.is_none());

        let again = QueueEntry::transition(
            &db.pool,
            entry.id,
            QueueEntryStatus::Waiting,
            QueueEntryStatus::Called,
        )
        .await
        .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn expired_calls_respect_shop_timeout() {
        let db = DBService::new_in_memory().await.unwrap();
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;
        let queue = fixtures::queue(&db.pool, shop.id, QueueType::General).await;
        let entry = QueueEntry::create(&db.pool, &guest(&queue, 1, "555-0001"), Uuid::new_v4())
            .await
            .unwrap();
        let called = QueueEntry::transition(
            &db.pool,
            entry.id,
            QueueEntryStatus::Waiting,
            QueueEntryStatus::Called,
        )
        .await
        .unwrap()
        .unwrap();
        let called_at = called.called_at.unwrap();

        let soon = called_at + chrono::Duration::minutes(5);
        assert!(QueueEntry::find_expired_calls(&db.pool, soon).await.unwrap().is_empty());

        let later = called_at + chrono::Duration::minutes(11);
        let expired = QueueEntry::find_expired_calls(&db.pool, later).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, entry.id);
        assert_eq!(expired[0].barbershop_id, shop.id);
    }
}
