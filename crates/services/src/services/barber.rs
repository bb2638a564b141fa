//! Barber availability and the calls that move customers through a queue.

use chrono::{DateTime, Utc};
use db::{
    DBService,
    models::{
        barber_status::{ActiveBarber, BarberStatus},
        barbershop::{Barbershop, BarbershopSummary},
        barbershop_service::ServiceCategory,
        payment::{NewPayment, Payment, PaymentMethod},
        queue::{Queue, QueueType},
        queue_entry::{QueueEntry, QueueEntryStatus},
        review::{CreateReview, Review, ReviewWithAuthor},
        user::{User, UserRole},
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    catalog::MAX_PRICE_CENTS,
    identity::{self, AccessError, Caller},
    queue::{DEFAULT_BARBER_NAME, QueueService, QueueStatistics},
};

/// Shown until service times are actually tracked
pub const DEFAULT_AVG_SERVICE_MINUTES: i32 = 25;
const TOP_SPECIALTIES: i64 = 3;
const FALLBACK_SPECIALTIES: [ServiceCategory; 2] = [ServiceCategory::Hair, ServiceCategory::Beard];

#[derive(Debug, Error)]
pub enum BarberError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("barbershop not found")]
    BarbershopNotFound,
    #[error("barbershop is not active")]
    BarbershopInactive,
    #[error("barber not found")]
    BarberNotFound,
    #[error("barber is not active")]
    NotActive,
    #[error("queue entry not found")]
    EntryNotFound,
    #[error("no customers waiting")]
    NobodyWaiting,
    #[error("entry is {actual}, expected {expected}")]
    UnexpectedStatus {
        expected: QueueEntryStatus,
        actual: QueueEntryStatus,
    },
    #[error("entry changed while being updated")]
    Conflict,
    #[error("{0}")]
    Validation(String),
}

const BARBERS_ONLY: &str = "only barbers can perform this action";
const NOT_ON_DUTY: &str = "barber is not active at this barbershop";

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BarberStatusWithShop {
    pub status: BarberStatus,
    pub barbershop: BarbershopSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BarberQueueView {
    pub barbershop: BarbershopSummary,
    pub queue: Option<Queue>,
    pub entries: Vec<QueueEntry>,
    pub statistics: QueueStatistics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CompleteServiceRequest {
    /// Amount charged in cents; no payment is recorded when absent
    pub amount: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CompletedService {
    pub entry: QueueEntry,
    pub payment: Option<Payment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BarberStats {
    pub reviews: Vec<ReviewWithAuthor>,
    pub average_rating: f64,
    pub total_reviews: usize,
    pub clients_today: i64,
    pub specialties: Vec<ServiceCategory>,
    pub avg_service_time: i32,
}

/// Shop's cut of `amount`, in cents, rounded half up. `None` on overflow.
pub fn commission_amount(amount: i64, rate_percent: i32) -> Option<i64> {
    amount
        .checked_mul(i64::from(rate_percent))?
        .checked_add(50)
        .map(|scaled| scaled.div_euclid(100))
}

/// Mean rating rounded to one decimal, 0 without reviews
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let total: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let mean = total as f64 / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[derive(Clone)]
pub struct BarberService {
    db: DBService,
    queues: QueueService,
}

impl BarberService {
    pub fn new(db: DBService, queues: QueueService) -> Self {
        Self { db, queues }
    }

    /// Puts the barber on duty at `barbershop_id`, ending any session elsewhere.
    pub async fn activate(
        &self,
        caller: Option<&Caller>,
        barbershop_id: Uuid,
    ) -> Result<BarberStatusWithShop, BarberError> {
        let barber = identity::require_role(caller, UserRole::Barber, BARBERS_ONLY)?;

        let shop = Barbershop::find_by_id(&self.db.pool, barbershop_id)
            .await?
            .ok_or(BarberError::BarbershopNotFound)?;
        if !shop.is_active {
            return Err(BarberError::BarbershopInactive);
        }

        let mut tx = self.db.begin_write().await?;
        let ended = BarberStatus::end_all_for_barber(&mut *tx, barber.id).await?;
        let status = BarberStatus::create_active(&mut *tx, barber.id, shop.id).await?;
        tx.commit().await?;

        info!(barber_id = %barber.id, barbershop_id = %shop.id, ended_sessions = ended, "Barber activated");

        let name = barber.display_name(DEFAULT_BARBER_NAME);
        if let Err(e) = self.queues.ensure_specific_queue(shop.id, name).await {
            warn!(barber_id = %barber.id, barbershop_id = %shop.id, error = %e, "Could not create specific queue on activation");
        }

        Ok(BarberStatusWithShop {
            status,
            barbershop: BarbershopSummary::from(&shop),
        })
    }

    pub async fn deactivate(&self, caller: Option<&Caller>) -> Result<(), BarberError> {
        let barber = identity::require_role(caller, UserRole::Barber, BARBERS_ONLY)?;

        let ended = BarberStatus::end_all_for_barber(&self.db.pool, barber.id).await?;
        if ended == 0 {
            return Err(BarberError::NotActive);
        }
        info!(barber_id = %barber.id, "Barber deactivated");
        Ok(())
    }

    pub async fn current_status(
        &self,
        caller: Option<&Caller>,
    ) -> Result<Option<BarberStatusWithShop>, BarberError> {
        let barber = identity::require_role(caller, UserRole::Barber, BARBERS_ONLY)?;

        let Some(status) = BarberStatus::find_active_for_barber(&self.db.pool, barber.id).await?
        else {
            return Ok(None);
        };
        let shop = Barbershop::find_by_id(&self.db.pool, status.barbershop_id)
            .await?
            .ok_or(BarberError::BarbershopNotFound)?;
        Ok(Some(BarberStatusWithShop {
            barbershop: BarbershopSummary::from(&shop),
            status,
        }))
    }

    /// The shop's general queue as a barber on duty sees it
    pub async fn queue_view(
        &self,
        caller: Option<&Caller>,
        barbershop_id: Uuid,
    ) -> Result<BarberQueueView, BarberError> {
        let barber = identity::require_role(caller, UserRole::Barber, BARBERS_ONLY)?;
        if !BarberStatus::is_active_at(&self.db.pool, barber.id, barbershop_id).await? {
            return Err(AccessError::Forbidden(NOT_ON_DUTY).into());
        }

        let shop = Barbershop::find_by_id(&self.db.pool, barbershop_id)
            .await?
            .ok_or(BarberError::BarbershopNotFound)?;
        let queue =
            Queue::find_active_by_type(&self.db.pool, barbershop_id, QueueType::General).await?;
        let entries = match &queue {
            Some(queue) => QueueEntry::find_open_by_queue(&self.db.pool, queue.id).await?,
            None => Vec::new(),
        };

        let total_waiting = entries
            .iter()
            .filter(|entry| entry.status == QueueEntryStatus::Waiting)
            .count() as i64;
        let active_barbers = BarberStatus::count_active(&self.db.pool, barbershop_id).await?;

        Ok(BarberQueueView {
            barbershop: BarbershopSummary::from(&shop),
            queue,
            entries,
            statistics: QueueStatistics {
                total_waiting,
                estimated_wait_time: self.queues.settings().estimated_wait(total_waiting),
                active_barbers,
            },
        })
    }

    /// Calls the next customer: someone who asked for this barber first, then
    /// the head of the general queue.
    pub async fn call_next(
        &self,
        caller: Option<&Caller>,
        barbershop_id: Uuid,
    ) -> Result<QueueEntry, BarberError> {
        let barber = identity::require_role(caller, UserRole::Barber, BARBERS_ONLY)?;

        let mut tx = self.db.begin_write().await?;
        if !BarberStatus::is_active_at(&mut *tx, barber.id, barbershop_id).await? {
            return Err(AccessError::Forbidden(NOT_ON_DUTY).into());
        }

        let mut next = QueueEntry::find_next_for_barber(&mut *tx, barbershop_id, barber.id).await?;
        if next.is_none() {
            if let Some(general) =
                Queue::find_active_by_type(&mut *tx, barbershop_id, QueueType::General).await?
            {
                next = QueueEntry::find_next_in_queue(&mut *tx, general.id).await?;
            }
        }
        let next = next.ok_or(BarberError::NobodyWaiting)?;

        let called = QueueEntry::transition(
            &mut *tx,
            next.id,
            QueueEntryStatus::Waiting,
            QueueEntryStatus::Called,
        )
        .await?
        .ok_or(BarberError::Conflict)?;
        tx.commit().await?;

        info!(
            entry_id = %called.id,
            queue_id = %called.queue_id,
            barber_id = %barber.id,
            position = called.position,
            "Customer called"
        );
        Ok(called)
    }

    /// Marks a waiting customer who did not show up as timed out
    pub async fn apply_timeout(
        &self,
        caller: Option<&Caller>,
        entry_id: Uuid,
    ) -> Result<QueueEntry, BarberError> {
        let (barber_id, entry, _) = self.entry_at_own_shop(caller, entry_id).await?;
        let entry = self
            .advance(&entry, QueueEntryStatus::Waiting, QueueEntryStatus::Timeout)
            .await?;
        info!(entry_id = %entry.id, barber_id = %barber_id, "Timeout applied to waiting customer");
        Ok(entry)
    }

    pub async fn start_service(
        &self,
        caller: Option<&Caller>,
        entry_id: Uuid,
    ) -> Result<QueueEntry, BarberError> {
        let (barber_id, entry, _) = self.entry_at_own_shop(caller, entry_id).await?;
        let entry = self
            .advance(&entry, QueueEntryStatus::Called, QueueEntryStatus::InService)
            .await?;
        info!(entry_id = %entry.id, barber_id = %barber_id, "Service started");
        Ok(entry)
    }

    /// Finishes a service, recording the payment with the shop's commission when an amount is given.
    pub async fn complete_service(
        &self,
        caller: Option<&Caller>,
        entry_id: Uuid,
        request: CompleteServiceRequest,
    ) -> Result<CompletedService, BarberError> {
        let (barber_id, entry, shop) = self.entry_at_own_shop(caller, entry_id).await?;
        expect_status(&entry, QueueEntryStatus::InService)?;
        let charge = match request.amount {
            Some(amount) => {
                if !(1..=MAX_PRICE_CENTS).contains(&amount) {
                    return Err(BarberError::Validation(format!(
                        "payment amount must be between 1 and {MAX_PRICE_CENTS} cents"
                    )));
                }
                let commission = commission_amount(amount, shop.commission_rate).ok_or_else(|| {
                    BarberError::Validation("payment amount is too large".to_string())
                })?;
                Some((amount, commission))
            }
            None => None,
        };

        let mut tx = self.db.begin_write().await?;
        let completed = QueueEntry::transition(
            &mut *tx,
            entry.id,
            QueueEntryStatus::InService,
            QueueEntryStatus::Completed,
        )
        .await?
        .ok_or(BarberError::Conflict)?;

        let payment = match charge {
            Some((amount, commission)) => {
                let data = NewPayment {
                    queue_entry_id: completed.id,
                    barber_id,
                    amount,
                    commission_rate: shop.commission_rate,
                    commission_amount: commission,
                    payment_method: request.payment_method.unwrap_or_default(),
                };
                Some(Payment::create(&mut *tx, &data, Uuid::new_v4()).await?)
            }
            None => None,
        };
        tx.commit().await?;

        info!(
            entry_id = %completed.id,
            barber_id = %barber_id,
            amount = ?payment.as_ref().map(|p| p.amount),
            "Service completed"
        );
        Ok(CompletedService {
            entry: completed,
            payment,
        })
    }

    pub async fn active_barbers(&self, barbershop_id: Uuid) -> Result<Vec<ActiveBarber>, BarberError> {
        Ok(BarberStatus::find_active_barbers(&self.db.pool, barbershop_id).await?)
    }

    pub async fn barber_stats(&self, barber_id: Uuid) -> Result<BarberStats, BarberError> {
        self.barber_stats_at(barber_id, Utc::now()).await
    }

    /// Stats with "today" taken as the UTC day containing `now`
    pub async fn barber_stats_at(
        &self,
        barber_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<BarberStats, BarberError> {
        let reviews = Review::find_by_barber_with_author(&self.db.pool, barber_id).await?;
        let ratings: Vec<i32> = reviews.iter().map(|review| review.rating).collect();

        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|start| start.and_utc())
            .unwrap_or(now);
        let clients_today =
            QueueEntry::count_for_barber_since(&self.db.pool, barber_id, midnight).await?;

        let mut specialties: Vec<ServiceCategory> =
            QueueEntry::top_categories_for_barber(&self.db.pool, barber_id, TOP_SPECIALTIES)
                .await?
                .into_iter()
                .map(|(category, _)| category)
                .collect();
        if specialties.is_empty() {
            specialties = FALLBACK_SPECIALTIES.to_vec();
        }

        Ok(BarberStats {
            average_rating: average_rating(&ratings),
            total_reviews: reviews.len(),
            reviews,
            clients_today,
            specialties,
            avg_service_time: DEFAULT_AVG_SERVICE_MINUTES,
        })
    }

    pub async fn create_review(
        &self,
        caller: Option<&Caller>,
        data: CreateReview,
    ) -> Result<Review, BarberError> {
        let author = identity::require(caller)?;
        if !(1..=5).contains(&data.rating) {
            return Err(BarberError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        if data.comment.as_ref().is_some_and(|c| c.chars().count() > 1000) {
            return Err(BarberError::Validation(
                "comment must be at most 1000 characters".to_string(),
            ));
        }

        let is_barber = User::find_by_id(&self.db.pool, data.barber_id)
            .await?
            .is_some_and(|user| user.role == UserRole::Barber);
        if !is_barber {
            return Err(BarberError::BarberNotFound);
        }
        if Barbershop::find_by_id(&self.db.pool, data.barbershop_id)
            .await?
            .is_none()
        {
            return Err(BarberError::BarbershopNotFound);
        }

        let review = Review::create(&self.db.pool, Some(author.id), &data, Uuid::new_v4()).await?;
        info!(review_id = %review.id, barber_id = %review.barber_id, rating = review.rating, "Review created");
        Ok(review)
    }

    /// Resolves an entry a barber on duty may act on: it must exist and sit
    /// in a queue of the shop where the barber is active.
    async fn entry_at_own_shop(
        &self,
        caller: Option<&Caller>,
        entry_id: Uuid,
    ) -> Result<(Uuid, QueueEntry, Barbershop), BarberError> {
        let barber = identity::require_role(caller, UserRole::Barber, BARBERS_ONLY)?;
        let status = BarberStatus::find_active_for_barber(&self.db.pool, barber.id)
            .await?
            .ok_or(AccessError::Forbidden("barber is not active"))?;

        let entry = QueueEntry::find_by_id(&self.db.pool, entry_id)
            .await?
            .ok_or(BarberError::EntryNotFound)?;
        let queue = Queue::find_by_id(&self.db.pool, entry.queue_id)
            .await?
            .ok_or(BarberError::EntryNotFound)?;
        if queue.barbershop_id != status.barbershop_id {
            return Err(AccessError::Forbidden("entry belongs to another barbershop").into());
        }

        let shop = Barbershop::find_by_id(&self.db.pool, queue.barbershop_id)
            .await?
            .ok_or(BarberError::BarbershopNotFound)?;
        Ok((barber.id, entry, shop))
    }

    async fn advance(
        &self,
        entry: &QueueEntry,
        from: QueueEntryStatus,
        to: QueueEntryStatus,
    ) -> Result<QueueEntry, BarberError> {
        expect_status(entry, from)?;
        QueueEntry::transition(&self.db.pool, entry.id, from, to)
            .await?
            .ok_or(BarberError::Conflict)
    }
}

fn expect_status(entry: &QueueEntry, expected: QueueEntryStatus) -> Result<(), BarberError> {
    if entry.status != expected {
        return Err(BarberError::UnexpectedStatus {
            expected,
            actual: entry.status,
        });
    }
    Ok(())
}
