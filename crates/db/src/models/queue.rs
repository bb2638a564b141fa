use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "queue_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QueueType {
    /// Served by whichever barber is free
    #[default]
    General,
    /// Customers pick the barber they want to wait for
    Specific,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Queue {
    pub id: Uuid,
    pub barbershop_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub queue_type: QueueType,
    pub is_active: bool,
    pub max_capacity: Option<i32>,
    pub current_position: i32, // Position handed to the most recent joiner
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateQueue {
    pub barbershop_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub queue_type: Option<QueueType>,
    pub max_capacity: Option<i32>,
}

impl Queue {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Queue>(r#"SELECT * FROM queues WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_active_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Queue>(r#"SELECT * FROM queues WHERE id = $1 AND is_active = 1"#)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_active_by_barbershop(
        pool: &SqlitePool,
        barbershop_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Queue>(
            r#"SELECT * FROM queues
               WHERE barbershop_id = $1 AND is_active = 1
               ORDER BY created_at ASC, rowid ASC"#,
        )
        .bind(barbershop_id)
        .fetch_all(pool)
        .await
    }

    /// Oldest active queue of the given type for a shop
    pub async fn find_active_by_type<'e, E>(
        executor: E,
        barbershop_id: Uuid,
        queue_type: QueueType,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Queue>(
            r#"SELECT * FROM queues
               WHERE barbershop_id = $1 AND queue_type = $2 AND is_active = 1
               ORDER BY created_at ASC, rowid ASC
               LIMIT 1"#,
        )
        .bind(barbershop_id)
        .bind(queue_type)
        .fetch_optional(executor)
        .await
    }

    pub async fn create<'e, E>(executor: E, data: &CreateQueue, id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, Queue>(
            r#"INSERT INTO queues (id, barbershop_id, name, description, queue_type, is_active, max_capacity, current_position, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, 1, $6, 0, $7, $7)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.barbershop_id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.queue_type.unwrap_or_default())
        .bind(data.max_capacity)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn set_current_position<'e, E>(
        executor: E,
        id: Uuid,
        position: i32,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(r#"UPDATE queues SET current_position = $2, updated_at = $3 WHERE id = $1"#)
            .bind(id)
            .bind(position)
            .bind(Utc::now())
            .execute(executor)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DBService, fixtures};

    #[tokio::test]
    async fn find_active_by_type_returns_oldest_matching_queue() {
        let db = DBService::new_in_memory().await.unwrap();
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;
        let general = fixtures::queue(&db.pool, shop.id, QueueType::General).await;
        fixtures::queue(&db.pool, shop.id, QueueType::General).await;

        let found = Queue::find_active_by_type(&db.pool, shop.id, QueueType::General)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, general.id);
        assert!(
            Queue::find_active_by_type(&db.pool, shop.id, QueueType::Specific)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn set_current_position_updates_row() {
        let db = DBService::new_in_memory().await.unwrap();
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;
        let queue = fixtures::queue(&db.pool, shop.id, QueueType::General).await;
        assert_eq!(queue.current_position, 0);

        Queue::set_current_position(&db.pool, queue.id, 4).await.unwrap();
        let queue = Queue::find_by_id(&db.pool, queue.id).await.unwrap().unwrap();
        assert_eq!(queue.current_position, 4);
    }
}
