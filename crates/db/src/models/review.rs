use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub barber_id: Uuid,
    pub barbershop_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ReviewWithAuthor {
    pub id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateReview {
    pub barber_id: Uuid,
    pub barbershop_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

impl Review {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Option<Uuid>,
        data: &CreateReview,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"INSERT INTO reviews (id, user_id, barber_id, barbershop_id, rating, comment, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING *"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(data.barber_id)
        .bind(data.barbershop_id)
        .bind(data.rating)
        .bind(&data.comment)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    /// Reviews of a barber, newest first
    pub async fn find_by_barber_with_author(
        pool: &SqlitePool,
        barber_id: Uuid,
    ) -> Result<Vec<ReviewWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, ReviewWithAuthor>(
            r#"SELECT r.id, r.rating, r.comment, r.created_at, u.name AS author_name
               FROM reviews r
               LEFT JOIN users u ON u.id = r.user_id
               WHERE r.barber_id = $1
               ORDER BY r.created_at DESC, r.rowid DESC"#,
        )
        .bind(barber_id)
        .fetch_all(pool)
        .await
    }
}
