use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// One on-duty session of a barber at a shop. At most one row per barber is
/// active at a time; ending a session sets `ended_at` and clears `is_active`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct BarberStatus {
    pub id: Uuid,
    pub barber_id: Uuid,
    pub barbershop_id: Uuid,
    pub is_active: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ActiveBarber {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub barbershop_id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl BarberStatus {
    pub async fn find_active_for_barber<'e, E>(
        executor: E,
        barber_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, BarberStatus>(
            r#"SELECT * FROM barber_status
               WHERE barber_id = $1 AND is_active = 1
               ORDER BY started_at DESC
               LIMIT 1"#,
        )
        .bind(barber_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn is_active_at<'e, E>(
        executor: E,
        barber_id: Uuid,
        barbershop_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM barber_status
               WHERE barber_id = $1 AND barbershop_id = $2 AND is_active = 1"#,
        )
        .bind(barber_id)
        .bind(barbershop_id)
        .fetch_one(executor)
        .await?;
        Ok(count > 0)
    }

    pub async fn create_active<'e, E>(
        executor: E,
        barber_id: Uuid,
        barbershop_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, BarberStatus>(
            r#"INSERT INTO barber_status (id, barber_id, barbershop_id, is_active, started_at, created_at, updated_at)
               VALUES ($1, $2, $3, 1, $4, $4, $4)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(barber_id)
        .bind(barbershop_id)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    /// Ends every open session of the barber, wherever it was started.
    /// Returns the number of sessions closed.
    pub async fn end_all_for_barber<'e, E>(executor: E, barber_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        let result = sqlx::query(
            r#"UPDATE barber_status
               SET is_active = 0, ended_at = $2, updated_at = $2
               WHERE barber_id = $1 AND is_active = 1"#,
        )
        .bind(barber_id)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Barbers currently on duty at a shop, in the order they clocked in
    pub async fn find_active_barbers(
        pool: &SqlitePool,
        barbershop_id: Uuid,
    ) -> Result<Vec<ActiveBarber>, sqlx::Error> {
        sqlx::query_as::<_, ActiveBarber>(
            r#"SELECT u.id, u.name, u.avatar_url, bs.barbershop_id, bs.started_at
               FROM barber_status bs
               JOIN users u ON u.id = bs.barber_id
               WHERE bs.barbershop_id = $1 AND bs.is_active = 1
               ORDER BY bs.started_at ASC"#,
        )
        .bind(barbershop_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_active(pool: &SqlitePool, barbershop_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM barber_status WHERE barbershop_id = $1 AND is_active = 1"#,
        )
        .bind(barbershop_id)
        .fetch_one(pool)
        .await
    }
}
