use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::{barbershop::BarbershopSummary, barbershop_service::BarbershopService};

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    #[default]
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_id: Uuid,
    pub date: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateBooking {
    pub service_id: Uuid,
    pub date: DateTime<Utc>,
}

/// A booking together with the service and the shop offering it
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BookingWithService {
    #[serde(flatten)]
    #[ts(flatten)]
    pub booking: Booking,
    pub service: BarbershopService,
    pub barbershop: BarbershopSummary,
}

impl Booking {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(r#"SELECT * FROM bookings WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        data: &CreateBooking,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Booking>(
            r#"INSERT INTO bookings (id, user_id, service_id, date, status, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $6)
               RETURNING *"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(data.service_id)
        .bind(data.date)
        .bind(BookingStatus::Confirmed)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    /// Bookings with `from <= date < to`, earliest first
    pub async fn find_between(
        pool: &SqlitePool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"SELECT * FROM bookings
               WHERE datetime(date) >= datetime($1) AND datetime(date) < datetime($2)
               ORDER BY datetime(date) ASC"#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }

    pub async fn find_for_user_from(
        pool: &SqlitePool,
        user_id: Uuid,
        from: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"SELECT * FROM bookings
               WHERE user_id = $1 AND datetime(date) >= datetime($2)
               ORDER BY datetime(date) ASC"#,
        )
        .bind(user_id)
        .bind(from)
        .fetch_all(pool)
        .await
    }

    pub async fn find_for_user_before(
        pool: &SqlitePool,
        user_id: Uuid,
        before: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"SELECT * FROM bookings
               WHERE user_id = $1 AND datetime(date) < datetime($2)
               ORDER BY datetime(date) ASC"#,
        )
        .bind(user_id)
        .bind(before)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM bookings WHERE id = $1"#)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::{
        DBService, fixtures,
        models::{barbershop_service::ServiceCategory, user::UserRole},
    };

    #[tokio::test]
    async fn user_bookings_split_around_a_moment() {
        let db = DBService::new_in_memory().await.unwrap();
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;
        let service = fixtures::service(&db.pool, shop.id, "Cut", ServiceCategory::Hair).await;
        let user = fixtures::user(&db.pool, "Ana", UserRole::Client).await;
        let pivot = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();

        for offset in [-2, 3, -1] {
            let data = CreateBooking {
                service_id: service.id,
                date: pivot + Duration::hours(offset),
            };
            Booking::create(&db.pool, user.id, &data, Uuid::new_v4()).await.unwrap();
        }

        let upcoming = Booking::find_for_user_from(&db.pool, user.id, pivot).await.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].status, BookingStatus::Confirmed);

        let past = Booking::find_for_user_before(&db.pool, user.id, pivot).await.unwrap();
        assert_eq!(past.len(), 2);
        assert!(past[0].date < past[1].date);

        let day_start = Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap();
        let on_day = Booking::find_between(&db.pool, day_start, day_start + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(on_day.len(), 3);

        assert_eq!(Booking::delete(&db.pool, past[0].id).await.unwrap(), 1);
        assert!(Booking::find_by_id(&db.pool, past[0].id).await.unwrap().is_none());
    }
}
