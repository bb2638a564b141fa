use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, types::Json};
use ts_rs::TS;
use uuid::Uuid;

pub const DEFAULT_COMMISSION_RATE: i32 = 30;
pub const DEFAULT_TIMEOUT_MINUTES: i32 = 10;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Barbershop {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    #[ts(type = "Array<string>")]
    pub phones: Json<Vec<String>>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub admin_id: Option<Uuid>,
    pub commission_rate: i32, // Percent of each payment kept by the shop
    pub timeout_minutes: i32, // How long a called customer may take to show up
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a barbershop embedded in queue and barber responses
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BarbershopSummary {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phones: Vec<String>,
}

impl From<&Barbershop> for BarbershopSummary {
    fn from(shop: &Barbershop) -> Self {
        Self {
            id: shop.id,
            name: shop.name.clone(),
            address: shop.address.clone(),
            phones: shop.phones.0.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateBarbershop {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub phones: Vec<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub commission_rate: Option<i32>,
    pub timeout_minutes: Option<i32>,
}

impl Barbershop {
    pub async fn find_active(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Barbershop>(
            r#"SELECT * FROM barbershops
               WHERE is_active = 1
               ORDER BY name ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Barbershop>(r#"SELECT * FROM barbershops WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Inserts a shop. `phones` must already be cleaned; missing rates fall back to the defaults.
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateBarbershop,
        admin_id: Option<Uuid>,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Barbershop>(
            r#"INSERT INTO barbershops (id, name, address, phones, description, image_url, is_active, admin_id, commission_rate, timeout_minutes, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.address)
        .bind(Json(&data.phones))
        .bind(&data.description)
        .bind(&data.image_url)
        .bind(data.is_active.unwrap_or(true))
        .bind(admin_id)
        .bind(data.commission_rate.unwrap_or(DEFAULT_COMMISSION_RATE))
        .bind(data.timeout_minutes.unwrap_or(DEFAULT_TIMEOUT_MINUTES))
        .bind(now)
        .fetch_one(pool)
        .await
    }
}
