//! Walk-in queue workflow: joining, leaving and inspecting a shop's queues.

use db::{
    DBService,
    models::{
        barber_status::{ActiveBarber, BarberStatus},
        barbershop::{Barbershop, BarbershopSummary},
        barbershop_service::BarbershopService,
        queue::{CreateQueue, Queue, QueueType},
        queue_entry::{NewQueueEntry, QueueEntry, QueueEntryStatus, WaitingSlot},
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use ts_rs::TS;
use utils::phone::{is_valid_phone, normalize_phone};
use uuid::Uuid;

use super::{
    config::QueueSettings,
    identity::{self, AccessError, Caller},
};

pub const GENERAL_QUEUE_NAME: &str = "General queue";
pub const DEFAULT_BARBER_NAME: &str = "Barber";
const STATUS_PREVIEW_LIMIT: i64 = 10;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("queue not found")]
    QueueNotFound,
    #[error("barbershop not found")]
    BarbershopNotFound,
    #[error("no waiting entry found for this customer")]
    EntryNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("selected barber is not active at this barbershop")]
    BarberNotActive,
    #[error("customer is already waiting in this queue")]
    AlreadyWaiting,
    #[error("queue is full")]
    QueueFull,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct JoinQueueRequest {
    #[serde(default)]
    pub is_guest: bool,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub parent_phone: Option<String>,
    pub selected_barber_id: Option<Uuid>,
    pub selected_service_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct JoinQueueResponse {
    pub entry: QueueEntry,
    pub position: i32,
    pub estimated_time: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BarberSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl From<ActiveBarber> for BarberSummary {
    fn from(barber: ActiveBarber) -> Self {
        let name = if barber.name.trim().is_empty() {
            DEFAULT_BARBER_NAME.to_string()
        } else {
            barber.name
        };
        Self {
            id: barber.id,
            name,
            avatar_url: barber.avatar_url,
        }
    }
}

/// A queue as listed on a barbershop page
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct QueueWithDetails {
    #[serde(flatten)]
    #[ts(flatten)]
    pub queue: Queue,
    pub people_in_queue: i64,
    pub barbers: Vec<BarberSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct QueueStatistics {
    pub total_waiting: i64,
    pub estimated_wait_time: i64,
    pub active_barbers: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ClientEntry {
    #[serde(flatten)]
    #[ts(flatten)]
    pub entry: QueueEntry,
    pub people_ahead: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct QueueStatus {
    pub queue: Queue,
    pub barbershop: BarbershopSummary,
    pub statistics: QueueStatistics,
    pub active_barbers: Vec<BarberSummary>,
    pub client_entry: Option<ClientEntry>,
    pub waiting: Vec<WaitingSlot>,
}

#[derive(Clone)]
pub struct QueueService {
    db: DBService,
    settings: QueueSettings,
}

impl QueueService {
    pub fn new(db: DBService, settings: QueueSettings) -> Self {
        Self { db, settings }
    }

    pub fn settings(&self) -> QueueSettings {
        self.settings
    }

    pub async fn list_queues(&self, barbershop_id: Uuid) -> Result<Vec<Queue>, QueueError> {
        Ok(Queue::find_active_by_barbershop(&self.db.pool, barbershop_id).await?)
    }

    pub async fn create_queue(
        &self,
        caller: Option<&Caller>,
        data: CreateQueue,
    ) -> Result<Queue, QueueError> {
        identity::require_admin(caller)?;

        let name = data.name.trim();
        if name.is_empty() {
            return Err(QueueError::Validation("queue name is required".to_string()));
        }
        if data.max_capacity.is_some_and(|capacity| capacity < 1) {
            return Err(QueueError::Validation(
                "max capacity must be at least 1".to_string(),
            ));
        }
        self.require_barbershop(data.barbershop_id).await?;

        let data = CreateQueue {
            name: name.to_string(),
            ..data
        };
        let queue = Queue::create(&self.db.pool, &data, Uuid::new_v4()).await?;
        info!(queue_id = %queue.id, barbershop_id = %queue.barbershop_id, queue_type = %queue.queue_type, "Queue created");
        Ok(queue)
    }

    /// Returns the shop's active queues, creating the general queue when there are none.
    pub async fn create_default_queue(&self, barbershop_id: Uuid) -> Result<Vec<Queue>, QueueError> {
        self.require_barbershop(barbershop_id).await?;

        let existing = Queue::find_active_by_barbershop(&self.db.pool, barbershop_id).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let queue = Queue::create(&self.db.pool, &general_queue(barbershop_id), Uuid::new_v4()).await?;
        info!(queue_id = %queue.id, barbershop_id = %barbershop_id, "Default queue created");
        Ok(vec![queue])
    }

    /// Makes sure the shop has a general queue and, once a barber is on duty, a specific one.
    pub async fn ensure_queues(&self, barbershop_id: Uuid) -> Result<(), QueueError> {
        if Queue::find_active_by_type(&self.db.pool, barbershop_id, QueueType::General)
            .await?
            .is_none()
        {
            let queue =
                Queue::create(&self.db.pool, &general_queue(barbershop_id), Uuid::new_v4()).await?;
            info!(queue_id = %queue.id, barbershop_id = %barbershop_id, "General queue created");
        }

        let barbers = BarberStatus::find_active_barbers(&self.db.pool, barbershop_id).await?;
        if let Some(first) = barbers.into_iter().next() {
            let barber = BarberSummary::from(first);
            self.ensure_specific_queue(barbershop_id, &barber.name).await?;
        }
        Ok(())
    }

    /// Creates a specific queue named after `barber_name` unless the shop already has one.
    pub async fn ensure_specific_queue(
        &self,
        barbershop_id: Uuid,
        barber_name: &str,
    ) -> Result<Option<Queue>, QueueError> {
        if Queue::find_active_by_type(&self.db.pool, barbershop_id, QueueType::Specific)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let data = CreateQueue {
            barbershop_id,
            name: format!("{}'s queue", barber_name),
            description: Some(format!("Customers waiting for {}", barber_name)),
            queue_type: Some(QueueType::Specific),
            max_capacity: None,
        };
        let queue = Queue::create(&self.db.pool, &data, Uuid::new_v4()).await?;
        info!(queue_id = %queue.id, barbershop_id = %barbershop_id, barber_name, "Specific queue created");
        Ok(Some(queue))
    }

    pub async fn list_shop_queues(
        &self,
        barbershop_id: Uuid,
    ) -> Result<Vec<QueueWithDetails>, QueueError> {
        self.require_barbershop(barbershop_id).await?;
        self.ensure_queues(barbershop_id).await?;

        let queues = Queue::find_active_by_barbershop(&self.db.pool, barbershop_id).await?;
        let barbers: Vec<BarberSummary> =
            BarberStatus::find_active_barbers(&self.db.pool, barbershop_id)
                .await?
                .into_iter()
                .map(BarberSummary::from)
                .collect();

        let mut details = Vec::with_capacity(queues.len());
        for queue in queues {
            let people_in_queue = QueueEntry::count_waiting(&self.db.pool, queue.id).await?;
            let barbers = match queue.queue_type {
                QueueType::Specific => barbers.clone(),
                QueueType::General => Vec::new(),
            };
            details.push(QueueWithDetails {
                queue,
                people_in_queue,
                barbers,
            });
        }
        Ok(details)
    }

    /// Adds the caller (or a guest) to the back of a queue. All reads and the
    /// insert run in one write transaction so concurrent joins queue up on the
    /// lock instead of sharing a position.
    pub async fn join(
        &self,
        queue_id: Uuid,
        caller: Option<&Caller>,
        request: JoinQueueRequest,
    ) -> Result<JoinQueueResponse, QueueError> {
        let mut tx = self.db.begin_write().await?;

        let queue = Queue::find_active_by_id(&mut *tx, queue_id)
            .await?
            .ok_or(QueueError::QueueNotFound)?;

        let user_id = if request.is_guest {
            None
        } else {
            Some(identity::require(caller)?.id)
        };

        let (customer_name, customer_phone) = if request.is_guest {
            let (name, phone) = guest_contact(&request)?;
            (Some(name), Some(phone))
        } else {
            (None, None)
        };

        let parent_phone = request.parent_phone.as_deref().and_then(normalize_phone);
        if parent_phone.as_deref().is_some_and(|phone| !is_valid_phone(phone)) {
            return Err(QueueError::Validation("invalid parent phone".to_string()));
        }

        if let Some(barber_id) = request.selected_barber_id {
            if !BarberStatus::is_active_at(&mut *tx, barber_id, queue.barbershop_id).await? {
                return Err(QueueError::BarberNotActive);
            }
        }

        if let Some(service_id) = request.selected_service_id {
            let offered = BarbershopService::find_by_id(&mut *tx, service_id)
                .await?
                .is_some_and(|service| service.is_active && service.barbershop_id == queue.barbershop_id);
            if !offered {
                return Err(QueueError::Validation(
                    "selected service is not offered by this barbershop".to_string(),
                ));
            }
        }

        let existing = match (user_id, customer_phone.as_deref()) {
            (Some(user_id), _) => {
                QueueEntry::find_waiting_for_user(&mut *tx, queue.id, user_id).await?
            }
            (None, Some(phone)) => {
                QueueEntry::find_waiting_for_phone(&mut *tx, queue.id, phone).await?
            }
            (None, None) => None,
        };
        if existing.is_some() {
            return Err(QueueError::AlreadyWaiting);
        }

        if let Some(capacity) = queue.max_capacity {
            let waiting = QueueEntry::count_waiting(&mut *tx, queue.id).await?;
            if waiting >= i64::from(capacity) {
                return Err(QueueError::QueueFull);
            }
        }

        let position = QueueEntry::next_position(&mut *tx, queue.id).await?;
        let estimated_time = self.settings.estimated_time(position);
        let data = NewQueueEntry {
            queue_id: queue.id,
            user_id,
            position,
            estimated_time,
            selected_barber_id: request.selected_barber_id,
            selected_service_id: request.selected_service_id,
            customer_name,
            customer_phone,
            is_guest: request.is_guest,
            parent_phone,
        };
        let entry = QueueEntry::create(&mut *tx, &data, Uuid::new_v4()).await?;
        Queue::set_current_position(&mut *tx, queue.id, position).await?;
        tx.commit().await?;

        info!(
            entry_id = %entry.id,
            queue_id = %queue.id,
            position,
            is_guest = entry.is_guest,
            "Customer joined queue"
        );

        Ok(JoinQueueResponse {
            entry,
            position,
            estimated_time,
        })
    }

    /// Marks the caller's waiting entry as left. Guests are found by phone.
    pub async fn leave(
        &self,
        queue_id: Uuid,
        caller: Option<&Caller>,
        customer_phone: Option<&str>,
    ) -> Result<QueueEntry, QueueError> {
        let entry = match (caller, customer_phone.and_then(normalize_phone)) {
            (Some(caller), _) => {
                QueueEntry::find_waiting_for_user(&self.db.pool, queue_id, caller.id).await?
            }
            (None, Some(phone)) => {
                QueueEntry::find_waiting_for_phone(&self.db.pool, queue_id, &phone).await?
            }
            (None, None) => {
                return Err(QueueError::Validation(
                    "customer phone is required to leave as a guest".to_string(),
                ));
            }
        }
        .ok_or(QueueError::EntryNotFound)?;

        let left = QueueEntry::transition(
            &self.db.pool,
            entry.id,
            QueueEntryStatus::Waiting,
            QueueEntryStatus::Left,
        )
        .await?
        .ok_or(QueueError::EntryNotFound)?;

        info!(entry_id = %left.id, queue_id = %queue_id, position = left.position, "Customer left queue");
        Ok(left)
    }

    pub async fn status(
        &self,
        queue_id: Uuid,
        caller: Option<&Caller>,
        customer_phone: Option<&str>,
    ) -> Result<QueueStatus, QueueError> {
        let queue = Queue::find_by_id(&self.db.pool, queue_id)
            .await?
            .ok_or(QueueError::QueueNotFound)?;
        let barbershop = self.require_barbershop(queue.barbershop_id).await?;

        let total_waiting = QueueEntry::count_waiting(&self.db.pool, queue.id).await?;
        let active_barbers: Vec<BarberSummary> =
            BarberStatus::find_active_barbers(&self.db.pool, queue.barbershop_id)
                .await?
                .into_iter()
                .map(BarberSummary::from)
                .collect();

        let own_entry = match (caller, customer_phone.and_then(normalize_phone)) {
            (Some(caller), _) => {
                QueueEntry::find_waiting_for_user(&self.db.pool, queue.id, caller.id).await?
            }
            (None, Some(phone)) => {
                QueueEntry::find_waiting_for_phone(&self.db.pool, queue.id, &phone).await?
            }
            (None, None) => None,
        };
        let client_entry = match own_entry {
            Some(entry) => {
                let people_ahead =
                    QueueEntry::count_ahead(&self.db.pool, queue.id, entry.position).await?;
                Some(ClientEntry {
                    entry,
                    people_ahead,
                })
            }
            None => None,
        };

        let waiting =
            QueueEntry::find_waiting_slots(&self.db.pool, queue.id, STATUS_PREVIEW_LIMIT).await?;
        debug!(queue_id = %queue.id, total_waiting, "Queue status computed");

        Ok(QueueStatus {
            statistics: QueueStatistics {
                total_waiting,
                estimated_wait_time: self.settings.estimated_wait(total_waiting),
                active_barbers: active_barbers.len() as i64,
            },
            barbershop: BarbershopSummary::from(&barbershop),
            queue,
            active_barbers,
            client_entry,
            waiting,
        })
    }

    async fn require_barbershop(&self, barbershop_id: Uuid) -> Result<Barbershop, QueueError> {
        Barbershop::find_by_id(&self.db.pool, barbershop_id)
            .await?
            .ok_or(QueueError::BarbershopNotFound)
    }
}

fn general_queue(barbershop_id: Uuid) -> CreateQueue {
    CreateQueue {
        barbershop_id,
        name: GENERAL_QUEUE_NAME.to_string(),
        description: Some("Walk-in customers served by any barber".to_string()),
        queue_type: Some(QueueType::General),
        max_capacity: None,
    }
}

/// Trimmed guest name and phone; both are mandatory and the phone must look valid.
fn guest_contact(request: &JoinQueueRequest) -> Result<(String, String), QueueError> {
    let name = request
        .customer_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| QueueError::Validation("guest name is required".to_string()))?;
    let phone = request
        .customer_phone
        .as_deref()
        .and_then(normalize_phone)
        .ok_or_else(|| QueueError::Validation("guest phone is required".to_string()))?;
    if !is_valid_phone(&phone) {
        return Err(QueueError::Validation("invalid guest phone".to_string()));
    }
    Ok((name.to_string(), phone))
}

#[cfg(test)]
mod tests {
    use db::{
        fixtures,
        models::{barbershop_service::ServiceCategory, user::UserRole},
    };

    use super::*;

    async fn setup() -> (DBService, QueueService, Barbershop, Queue) {
        let db = DBService::new_in_memory().await.unwrap();
        let service = QueueService::new(db.clone(), QueueSettings::default());
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;
        let queue = fixtures::queue(&db.pool, shop.id, QueueType::General).await;
        (db, service, shop, queue)
    }

    fn caller(id: Uuid, role: UserRole) -> Caller {
        Caller {
            id,
            role,
            name: None,
        }
    }

    fn guest(name: &str, phone: &str) -> JoinQueueRequest {
        JoinQueueRequest {
            is_guest: true,
            customer_name: Some(name.to_string()),
            customer_phone: Some(phone.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn positions_and_estimates_grow_with_each_join() {
        let (db, service, _shop, queue) = setup().await;
        let ana = fixtures::user(&db.pool, "Ana", UserRole::Client).await;

        let first = service
            .join(queue.id, Some(&caller(ana.id, UserRole::Client)), JoinQueueRequest::default())
            .await
            .unwrap();
        assert_eq!(first.position, 1);
        assert_eq!(first.estimated_time, 15);
        assert_eq!(first.entry.user_id, Some(ana.id));
        assert!(first.entry.customer_name.is_none());
        assert!(!first.entry.is_guest);

        let second = service
            .join(queue.id, None, guest("Bruno", "+55 11 5555-0101"))
            .await
            .unwrap();
        assert_eq!(second.position, 2);
        assert_eq!(second.estimated_time, 30);
        assert!(second.entry.is_guest);
        assert!(second.entry.user_id.is_none());
        assert_eq!(second.entry.customer_phone.as_deref(), Some("+55 11 5555-0101"));

        let stored = Queue::find_by_id(&db.pool, queue.id).await.unwrap().unwrap();
        assert_eq!(stored.current_position, 2);
    }

    #[tokio::test]
    async fn position_restarts_when_nobody_is_waiting() {
        let (_db, service, _shop, queue) = setup().await;
        service
            .join(queue.id, None, guest("Bruno", "555-0101"))
            .await
            .unwrap();
        service
            .leave(queue.id, None, Some("555-0101"))
            .await
            .unwrap();

        let again = service
            .join(queue.id, None, guest("Carla", "555-0102"))
            .await
            .unwrap();
        assert_eq!(again.position, 1);
    }

    #[tokio::test]
    async fn join_rejects_missing_identity_and_bad_guest_details() {
        let (_db, service, _shop, queue) = setup().await;

        let err = service
            .join(queue.id, None, JoinQueueRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Access(AccessError::Unauthenticated)));

        let err = service
            .join(queue.id, None, guest("  ", "555-0101"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));

        let err = service
            .join(queue.id, None, guest("Bruno", "call me"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));

        let request = JoinQueueRequest {
            parent_phone: Some("abc".to_string()),
            ..guest("Bruno", "555-0101")
        };
        let err = service.join(queue.id, None, request).await.unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));

        let err = service
            .join(Uuid::new_v4(), None, guest("Bruno", "555-0101"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::QueueNotFound));
    }

    #[tokio::test]
    async fn selected_barber_must_be_on_duty_at_the_shop() {
        let (db, service, shop, queue) = setup().await;
        let other_shop = fixtures::barbershop(&db.pool, "Harbour").await;
        let off_duty = fixtures::user(&db.pool, "Off", UserRole::Barber).await;
        let elsewhere = fixtures::active_barber(&db.pool, "Away", other_shop.id).await;
        let on_duty = fixtures::active_barber(&db.pool, "Joe", shop.id).await;

        for barber in [off_duty.id, elsewhere.id] {
            let request = JoinQueueRequest {
                selected_barber_id: Some(barber),
                ..guest("Bruno", "555-0101")
            };
            let err = service.join(queue.id, None, request).await.unwrap_err();
            assert!(matches!(err, QueueError::BarberNotActive));
        }

        let request = JoinQueueRequest {
            selected_barber_id: Some(on_duty.id),
            ..guest("Bruno", "555-0101")
        };
        let joined = service.join(queue.id, None, request).await.unwrap();
        assert_eq!(joined.entry.selected_barber_id, Some(on_duty.id));
    }

    #[tokio::test]
    async fn selected_service_must_belong_to_the_shop() {
        let (db, service, shop, queue) = setup().await;
        let other_shop = fixtures::barbershop(&db.pool, "Harbour").await;
        let foreign = fixtures::service(&db.pool, other_shop.id, "Cut", ServiceCategory::Hair).await;
        let local = fixtures::service(&db.pool, shop.id, "Beard", ServiceCategory::Beard).await;

        let request = JoinQueueRequest {
            selected_service_id: Some(foreign.id),
            ..guest("Bruno", "555-0101")
        };
        assert!(matches!(
            service.join(queue.id, None, request).await.unwrap_err(),
            QueueError::Validation(_)
        ));

        let request = JoinQueueRequest {
            selected_service_id: Some(local.id),
            ..guest("Bruno", "555-0101")
        };
        assert!(service.join(queue.id, None, request).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_waiting_entries_and_full_queues_are_rejected() {
        let (db, service, shop, _queue) = setup().await;
        let admin = fixtures::user(&db.pool, "Root", UserRole::Admin).await;
        let small = service
            .create_queue(
                Some(&caller(admin.id, UserRole::Admin)),
                CreateQueue {
                    barbershop_id: shop.id,
                    name: "Express".to_string(),
                    description: None,
                    queue_type: None,
                    max_capacity: Some(2),
                },
            )
            .await
            .unwrap();

        service
            .join(small.id, None, guest("Bruno", "555-0101"))
            .await
            .unwrap();
        let err = service
            .join(small.id, None, guest("Bruno again", "555-0101"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::AlreadyWaiting));

        service
            .join(small.id, None, guest("Carla", "555-0102"))
            .await
            .unwrap();
        let err = service
            .join(small.id, None, guest("Dora", "555-0103"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::QueueFull));
    }

    #[tokio::test]
    async fn leave_finds_entry_by_account_or_phone() {
        let (db, service, _shop, queue) = setup().await;
        let ana = fixtures::user(&db.pool, "Ana", UserRole::Client).await;
        let ana = caller(ana.id, UserRole::Client);

        assert!(matches!(
            service.leave(queue.id, Some(&ana), None).await.unwrap_err(),
            QueueError::EntryNotFound
        ));
        assert!(matches!(
            service.leave(queue.id, None, None).await.unwrap_err(),
            QueueError::Validation(_)
        ));

        service
            .join(queue.id, Some(&ana), JoinQueueRequest::default())
            .await
            .unwrap();
        let left = service.leave(queue.id, Some(&ana), None).await.unwrap();
        assert_eq!(left.status, QueueEntryStatus::Left);
        assert!(left.left_at.is_some());

        assert!(matches!(
            service.leave(queue.id, Some(&ana), None).await.unwrap_err(),
            QueueError::EntryNotFound
        ));
    }

    #[tokio::test]
    async fn status_reports_people_ahead_and_waiting_preview() {
        let (db, service, shop, queue) = setup().await;
        fixtures::active_barber(&db.pool, "Joe", shop.id).await;
        for (name, phone) in [("A", "555-0001"), ("B", "555-0002"), ("C", "555-0003")] {
            service.join(queue.id, None, guest(name, phone)).await.unwrap();
        }

        let status = service
            .status(queue.id, None, Some("555-0003"))
            .await
            .unwrap();
        assert_eq!(status.statistics.total_waiting, 3);
        assert_eq!(status.statistics.estimated_wait_time, 45);
        assert_eq!(status.statistics.active_barbers, 1);
        assert_eq!(status.active_barbers[0].name, "Joe");
        assert_eq!(status.barbershop.id, shop.id);
        let mine = status.client_entry.unwrap();
        assert_eq!(mine.entry.position, 3);
        assert_eq!(mine.people_ahead, 2);
        let positions: Vec<i32> = status.waiting.iter().map(|slot| slot.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);

        let anonymous = service.status(queue.id, None, None).await.unwrap();
        assert!(anonymous.client_entry.is_none());
    }

    #[tokio::test]
    async fn default_queue_creation_is_idempotent() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = QueueService::new(db.clone(), QueueSettings::default());
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;

        let first = service.create_default_queue(shop.id).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, GENERAL_QUEUE_NAME);
        assert_eq!(first[0].queue_type, QueueType::General);
        assert_eq!(first[0].current_position, 0);

        let second = service.create_default_queue(shop.id).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, first[0].id);

        assert!(matches!(
            service.create_default_queue(Uuid::new_v4()).await.unwrap_err(),
            QueueError::BarbershopNotFound
        ));
    }

    #[tokio::test]
    async fn shop_queues_gain_a_specific_queue_once_a_barber_is_active() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = QueueService::new(db.clone(), QueueSettings::default());
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;

        let listed = service.list_shop_queues(shop.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].queue.queue_type, QueueType::General);
        assert_eq!(listed[0].people_in_queue, 0);

        fixtures::active_barber(&db.pool, "Joe", shop.id).await;
        let listed = service.list_shop_queues(shop.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        let specific = listed
            .iter()
            .find(|q| q.queue.queue_type == QueueType::Specific)
            .unwrap();
        assert_eq!(specific.queue.name, "Joe's queue");
        assert_eq!(specific.barbers.len(), 1);

        // Running again does not duplicate anything
        assert_eq!(service.list_shop_queues(shop.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn only_admins_create_queues() {
        let (db, service, shop, _queue) = setup().await;
        let client = fixtures::user(&db.pool, "Ana", UserRole::Client).await;
        let data = CreateQueue {
            barbershop_id: shop.id,
            name: "VIP".to_string(),
            description: None,
            queue_type: Some(QueueType::Specific),
            max_capacity: None,
        };

        let err = service
            .create_queue(Some(&caller(client.id, UserRole::Client)), data.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Access(AccessError::Forbidden(_))));

        let err = service
            .create_queue(
                Some(&caller(Uuid::new_v4(), UserRole::Admin)),
                CreateQueue {
                    name: " ".to_string(),
                    ..data
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_get_distinct_positions() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("queue.db").display());
        let db = DBService::new(&url).await.unwrap();
        let service = QueueService::new(db.clone(), QueueSettings::default());
        let shop = fixtures::barbershop(&db.pool, "Main Street").await;
        let queue_id = fixtures::queue(&db.pool, shop.id, QueueType::General).await.id;

        let joins: Vec<_> = (0..16)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    let phone = format!("555-01{i:02}");
                    service
                        .join(queue_id, None, guest(&format!("Guest {i}"), &phone))
                        .await
                })
            })
            .collect();

        let mut positions = Vec::new();
        for join in joins {
            positions.push(join.await.unwrap().unwrap().position);
        }
        positions.sort_unstable();
        assert_eq!(positions, (1..=16).collect::<Vec<i32>>());

        let queue = Queue::find_by_id(&db.pool, queue_id).await.unwrap().unwrap();
        assert_eq!(queue.current_position, 16);
    }
}
