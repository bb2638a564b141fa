use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    #[default]
    Client,
    Barber,
    Receptionist,
    Admin,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub barbershop_id: Option<Uuid>, // Only receptionists are tied to a shop
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub barbershop_id: Option<Uuid>,
    pub avatar_url: Option<String>,
}

impl User {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE lower(email) = lower($1)"#)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn create<'e, E>(executor: E, data: &CreateUser, id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, name, email, phone, role, barbershop_id, avatar_url, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(data.role)
        .bind(data.barbershop_id)
        .bind(&data.avatar_url)
        .bind(now)
        .fetch_one(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DBService, fixtures};

    #[tokio::test]
    async fn email_lookup_ignores_case_and_duplicates_fail() {
        let db = DBService::new_in_memory().await.unwrap();
        let data = CreateUser {
            name: "Rita".to_string(),
            email: "rita@example.com".to_string(),
            phone: None,
            role: UserRole::Receptionist,
            barbershop_id: Some(fixtures::barbershop(&db.pool, "Main Street").await.id),
            avatar_url: None,
        };
        let rita = User::create(&db.pool, &data, Uuid::new_v4()).await.unwrap();

        let found = User::find_by_email(&db.pool, "RITA@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, rita.id);
        assert_eq!(found.role, UserRole::Receptionist);

        assert!(User::create(&db.pool, &data, Uuid::new_v4()).await.is_err());
    }
}
