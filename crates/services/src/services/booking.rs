use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use db::{
    DBService,
    models::{
        barbershop::{Barbershop, BarbershopSummary},
        barbershop_service::BarbershopService,
        booking::{Booking, BookingWithService, CreateBooking},
    },
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::identity::{self, AccessError, Caller};

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("service not found")]
    ServiceNotFound,
    #[error("booking not found")]
    BookingNotFound,
}

#[derive(Clone)]
pub struct BookingService {
    db: DBService,
}

impl BookingService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub async fn create_booking(
        &self,
        caller: Option<&Caller>,
        data: CreateBooking,
    ) -> Result<Booking, BookingError> {
        let user = identity::require(caller)?;

        let available = BarbershopService::find_by_id(&self.db.pool, data.service_id)
            .await?
            .is_some_and(|service| service.is_active);
        if !available {
            return Err(BookingError::ServiceNotFound);
        }

        let booking = Booking::create(&self.db.pool, user.id, &data, Uuid::new_v4()).await?;
        info!(booking_id = %booking.id, user_id = %user.id, date = %booking.date, "Booking created");
        Ok(booking)
    }

    /// Every booking on the given UTC calendar day
    pub async fn bookings_on_day(&self, day: NaiveDate) -> Result<Vec<Booking>, BookingError> {
        let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
        Ok(Booking::find_between(&self.db.pool, start, start + Duration::days(1)).await?)
    }

    pub async fn delete_booking(
        &self,
        caller: Option<&Caller>,
        booking_id: Uuid,
    ) -> Result<(), BookingError> {
        let user = identity::require(caller)?;
        let booking = Booking::find_by_id(&self.db.pool, booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        if booking.user_id != user.id && !user.is_admin() {
            return Err(AccessError::Forbidden("only the owner can cancel this booking").into());
        }

        Booking::delete(&self.db.pool, booking.id).await?;
        info!(booking_id = %booking.id, user_id = %user.id, "Booking deleted");
        Ok(())
    }

    pub async fn confirmed_bookings(
        &self,
        caller: Option<&Caller>,
    ) -> Result<Vec<BookingWithService>, BookingError> {
        self.confirmed_bookings_at(caller, Utc::now()).await
    }

    pub async fn confirmed_bookings_at(
        &self,
        caller: Option<&Caller>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BookingWithService>, BookingError> {
        let user = identity::require(caller)?;
        let bookings = Booking::find_for_user_from(&self.db.pool, user.id, now).await?;
        self.with_services(bookings).await
    }

    pub async fn concluded_bookings(
        &self,
        caller: Option<&Caller>,
    ) -> Result<Vec<BookingWithService>, BookingError> {
        self.concluded_bookings_at(caller, Utc::now()).await
    }

    pub async fn concluded_bookings_at(
        &self,
        caller: Option<&Caller>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BookingWithService>, BookingError> {
        let user = identity::require(caller)?;
        let bookings = Booking::find_for_user_before(&self.db.pool, user.id, now).await?;
        self.with_services(bookings).await
    }

    /// Attaches service and shop to each booking. Bookings whose service or
    /// shop has since been removed are skipped.
    async fn with_services(
        &self,
        bookings: Vec<Booking>,
    ) -> Result<Vec<BookingWithService>, BookingError> {
        let mut shops: HashMap<Uuid, Option<BarbershopSummary>> = HashMap::new();
        let mut detailed = Vec::with_capacity(bookings.len());

        for booking in bookings {
            let Some(service) = BarbershopService::find_by_id(&self.db.pool, booking.service_id).await?
            else {
                continue;
            };
            let barbershop = match shops.get(&service.barbershop_id) {
                Some(cached) => cached.clone(),
                None => {
                    let summary = Barbershop::find_by_id(&self.db.pool, service.barbershop_id)
                        .await?
                        .map(|shop| BarbershopSummary::from(&shop));
                    shops.insert(service.barbershop_id, summary.clone());
                    summary
                }
            };
            if let Some(barbershop) = barbershop {
                detailed.push(BookingWithService {
                    booking,
                    service,
                    barbershop,
                });
            }
        }
        Ok(detailed)
    }
}
