use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    CreditCard,
    DebitCard,
    Pix,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Payment {
    pub id: Uuid,
    pub queue_entry_id: Uuid,
    pub barber_id: Uuid,
    pub amount: i64, // cents
    pub commission_rate: i32,
    pub commission_amount: i64,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub queue_entry_id: Uuid,
    pub barber_id: Uuid,
    pub amount: i64,
    pub commission_rate: i32,
    pub commission_amount: i64,
    pub payment_method: PaymentMethod,
}

impl Payment {
    pub async fn create<'e, E>(executor: E, data: &NewPayment, id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Payment>(
            r#"INSERT INTO payments (id, queue_entry_id, barber_id, amount, commission_rate, commission_amount, payment_method, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.queue_entry_id)
        .bind(data.barber_id)
        .bind(data.amount)
        .bind(data.commission_rate)
        .bind(data.commission_amount)
        .bind(data.payment_method)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_entry(
        pool: &SqlitePool,
        queue_entry_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"SELECT * FROM payments WHERE queue_entry_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(queue_entry_id)
        .fetch_all(pool)
        .await
    }
}
