//! Row builders shared by the test suites of this crate and its dependents.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{
    barber_status::BarberStatus,
    barbershop::{Barbershop, CreateBarbershop},
    barbershop_service::{BarbershopService, CreateBarbershopService, ServiceCategory},
    queue::{CreateQueue, Queue, QueueType},
    user::{CreateUser, User, UserRole},
};

pub fn barbershop_data(name: &str) -> CreateBarbershop {
    CreateBarbershop {
        name: name.to_string(),
        address: "12 Main Street".to_string(),
        phones: vec!["+1 555 0100".to_string()],
        description: None,
        image_url: None,
        is_active: None,
        commission_rate: None,
        timeout_minutes: None,
    }
}

pub async fn barbershop(pool: &SqlitePool, name: &str) -> Barbershop {
    Barbershop::create(pool, &barbershop_data(name), None, Uuid::new_v4())
        .await
        .expect("create barbershop")
}

pub async fn user(pool: &SqlitePool, name: &str, role: UserRole) -> User {
    let data = CreateUser {
        name: name.to_string(),
        email: format!("{}-{}@example.com", name.to_lowercase().replace(' ', "."), Uuid::new_v4()),
        phone: None,
        role,
        barbershop_id: None,
        avatar_url: None,
    };
    User::create(pool, &data, Uuid::new_v4())
        .await
        .expect("create user")
}

pub async fn queue(pool: &SqlitePool, barbershop_id: Uuid, queue_type: QueueType) -> Queue {
    let data = CreateQueue {
        barbershop_id,
        name: format!("{} queue", queue_type),
        description: None,
        queue_type: Some(queue_type),
        max_capacity: None,
    };
    Queue::create(pool, &data, Uuid::new_v4())
        .await
        .expect("create queue")
}

pub async fn active_barber(pool: &SqlitePool, name: &str, barbershop_id: Uuid) -> User {
    let barber = user(pool, name, UserRole::Barber).await;
    BarberStatus::create_active(pool, barber.id, barbershop_id)
        .await
        .expect("activate barber");
    barber
}

pub async fn service(
    pool: &SqlitePool,
    barbershop_id: Uuid,
    name: &str,
    category: ServiceCategory,
) -> BarbershopService {
    let data = CreateBarbershopService {
        name: name.to_string(),
        description: None,
        category,
        price: 4500,
        estimated_time: Some(30),
        image_url: None,
        is_active: None,
    };
    BarbershopService::create(pool, barbershop_id, &data, Uuid::new_v4())
        .await
        .expect("create service")
}
