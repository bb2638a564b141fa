use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

pub const DEFAULT_ESTIMATED_MINUTES: i32 = 30;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display,
)]
#[sqlx(type_name = "service_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServiceCategory {
    Hair,
    Beard,
    Eyebrows,
    Hydration,
    Finishing,
}

/// A service a barbershop offers, priced in cents
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct BarbershopService {
    pub id: Uuid,
    pub barbershop_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: ServiceCategory,
    pub price: i64,
    pub estimated_time: i32, // minutes
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or replacing a service
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateBarbershopService {
    pub name: String,
    pub description: Option<String>,
    pub category: ServiceCategory,
    pub price: i64,
    pub estimated_time: Option<i32>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

pub type UpdateBarbershopService = CreateBarbershopService;

impl BarbershopService {
    pub async fn find_active_by_barbershop(
        pool: &SqlitePool,
        barbershop_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, BarbershopService>(
            r#"SELECT * FROM barbershop_services
               WHERE barbershop_id = $1 AND is_active = 1
               ORDER BY category ASC, name ASC"#,
        )
        .bind(barbershop_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, BarbershopService>(r#"SELECT * FROM barbershop_services WHERE id = $1"#)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        barbershop_id: Uuid,
        data: &CreateBarbershopService,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, BarbershopService>(
            r#"INSERT INTO barbershop_services (id, barbershop_id, name, description, category, price, estimated_time, image_url, is_active, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
               RETURNING *"#,
        )
        .bind(id)
        .bind(barbershop_id)
        .bind(&data.name)
        .bind(data.description.clone().unwrap_or_default())
        .bind(data.category)
        .bind(data.price)
        .bind(data.estimated_time.unwrap_or(DEFAULT_ESTIMATED_MINUTES))
        .bind(&data.image_url)
        .bind(data.is_active.unwrap_or(true))
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateBarbershopService,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BarbershopService>(
            r#"UPDATE barbershop_services
               SET name = $2, description = $3, category = $4, price = $5, estimated_time = $6,
                   image_url = $7, is_active = $8, updated_at = $9
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(data.description.clone().unwrap_or_default())
        .bind(data.category)
        .bind(data.price)
        .bind(data.estimated_time.unwrap_or(DEFAULT_ESTIMATED_MINUTES))
        .bind(&data.image_url)
        .bind(data.is_active.unwrap_or(true))
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    /// Soft delete: the row stays for bookings and queue history
    pub async fn deactivate(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE barbershop_services SET is_active = 0, updated_at = $2 WHERE id = $1"#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DBService, fixtures};

    #[tokio::test]
    async fn active_services_are_ordered_and_soft_deleted_ones_hidden() {
        let db = DBService::new_in_memory().await.unwrap();
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;
        fixtures::service(&db.pool, shop.id, "Skin fade", ServiceCategory::Hair).await;
        fixtures::service(&db.pool, shop.id, "Beard trim", ServiceCategory::Beard).await;
        let classic = fixtures::service(&db.pool, shop.id, "Classic cut", ServiceCategory::Hair).await;

        let names: Vec<String> = BarbershopService::find_active_by_barbershop(&db.pool, shop.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Beard trim", "Classic cut", "Skin fade"]);

        assert_eq!(BarbershopService::deactivate(&db.pool, classic.id).await.unwrap(), 1);
        let remaining = BarbershopService::find_active_by_barbershop(&db.pool, shop.id)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(
            !BarbershopService::find_by_id(&db.pool, classic.id)
                .await
                .unwrap()
                .unwrap()
                .is_active
        );
    }
}
