//! Barbershops, the services they offer, and staff accounts.

use db::{
    DBService,
    models::{
        barbershop::{Barbershop, CreateBarbershop},
        barbershop_service::{BarbershopService, CreateBarbershopService, UpdateBarbershopService},
        user::{CreateUser, User, UserRole},
    },
};
use thiserror::Error;
use tracing::info;
use utils::phone::clean_phone_list;
use uuid::Uuid;

use super::identity::{self, AccessError, Caller};

pub const MAX_SERVICE_NAME_CHARS: usize = 100;
pub const MAX_SERVICE_DESCRIPTION_CHARS: usize = 500;
pub const MAX_PRICE_CENTS: i64 = 1_000_000;
pub const MAX_ESTIMATED_MINUTES: i32 = 480;
pub const MAX_TIMEOUT_MINUTES: i32 = 480;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("barbershop not found")]
    BarbershopNotFound,
    #[error("service not found")]
    ServiceNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("email is already registered")]
    EmailTaken,
}

fn invalid(message: impl Into<String>) -> CatalogError {
    CatalogError::Validation(message.into())
}

/// Checks a service payload and returns it with the name and description trimmed
pub fn validate_service(data: &CreateBarbershopService) -> Result<CreateBarbershopService, CatalogError> {
    let name = data.name.trim();
    if name.is_empty() {
        return Err(invalid("service name is required"));
    }
    if name.chars().count() > MAX_SERVICE_NAME_CHARS {
        return Err(invalid(format!(
            "service name must be at most {} characters",
            MAX_SERVICE_NAME_CHARS
        )));
    }

    let description = data.description.as_deref().map(str::trim);
    if description.is_some_and(|d| d.chars().count() > MAX_SERVICE_DESCRIPTION_CHARS) {
        return Err(invalid(format!(
            "description must be at most {} characters",
            MAX_SERVICE_DESCRIPTION_CHARS
        )));
    }

    if !(1..=MAX_PRICE_CENTS).contains(&data.price) {
        return Err(invalid("price must be between 0.01 and 10000.00"));
    }
    if data
        .estimated_time
        .is_some_and(|minutes| !(1..=MAX_ESTIMATED_MINUTES).contains(&minutes))
    {
        return Err(invalid(format!(
            "estimated time must be between 1 and {} minutes",
            MAX_ESTIMATED_MINUTES
        )));
    }

    Ok(CreateBarbershopService {
        name: name.to_string(),
        description: description.map(str::to_string),
        ..data.clone()
    })
}

pub fn validate_barbershop(data: &CreateBarbershop) -> Result<CreateBarbershop, CatalogError> {
    let name = data.name.trim();
    let address = data.address.trim();
    if name.is_empty() {
        return Err(invalid("barbershop name is required"));
    }
    if address.is_empty() {
        return Err(invalid("barbershop address is required"));
    }
    let phones = clean_phone_list(&data.phones)
        .map_err(|phone| invalid(format!("invalid phone number: {}", phone)))?;
    if data
        .commission_rate
        .is_some_and(|rate| !(0..=100).contains(&rate))
    {
        return Err(invalid("commission rate must be between 0 and 100"));
    }
    if data
        .timeout_minutes
        .is_some_and(|minutes| !(1..=MAX_TIMEOUT_MINUTES).contains(&minutes))
    {
        return Err(invalid(format!(
            "timeout must be between 1 and {} minutes",
            MAX_TIMEOUT_MINUTES
        )));
    }

    Ok(CreateBarbershop {
        name: name.to_string(),
        address: address.to_string(),
        phones,
        ..data.clone()
    })
}

#[derive(Clone)]
pub struct CatalogService {
    db: DBService,
}

impl CatalogService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub async fn list_barbershops(&self) -> Result<Vec<Barbershop>, CatalogError> {
        Ok(Barbershop::find_active(&self.db.pool).await?)
    }

    pub async fn get_barbershop(&self, id: Uuid) -> Result<Barbershop, CatalogError> {
        Barbershop::find_by_id(&self.db.pool, id)
            .await?
            .ok_or(CatalogError::BarbershopNotFound)
    }

    pub async fn list_services(
        &self,
        barbershop_id: Uuid,
    ) -> Result<Vec<BarbershopService>, CatalogError> {
        Ok(BarbershopService::find_active_by_barbershop(&self.db.pool, barbershop_id).await?)
    }

    pub async fn get_service(
        &self,
        barbershop_id: Uuid,
        service_id: Uuid,
    ) -> Result<BarbershopService, CatalogError> {
        BarbershopService::find_by_id(&self.db.pool, service_id)
            .await?
            .filter(|service| service.barbershop_id == barbershop_id)
            .ok_or(CatalogError::ServiceNotFound)
    }

    pub async fn create_service(
        &self,
        caller: Option<&Caller>,
        barbershop_id: Uuid,
        data: CreateBarbershopService,
    ) -> Result<BarbershopService, CatalogError> {
        identity::require_admin(caller)?;
        let data = validate_service(&data)?;
        self.get_barbershop(barbershop_id).await?;

        let service =
            BarbershopService::create(&self.db.pool, barbershop_id, &data, Uuid::new_v4()).await?;
        info!(service_id = %service.id, barbershop_id = %barbershop_id, "Service created");
        Ok(service)
    }

    pub async fn update_service(
        &self,
        caller: Option<&Caller>,
        barbershop_id: Uuid,
        service_id: Uuid,
        data: UpdateBarbershopService,
    ) -> Result<BarbershopService, CatalogError> {
        identity::require_admin(caller)?;
        let data = validate_service(&data)?;
        self.get_service(barbershop_id, service_id).await?;

        let service = BarbershopService::update(&self.db.pool, service_id, &data)
            .await?
            .ok_or(CatalogError::ServiceNotFound)?;
        info!(service_id = %service.id, barbershop_id = %barbershop_id, "Service updated");
        Ok(service)
    }

    pub async fn delete_service(
        &self,
        caller: Option<&Caller>,
        barbershop_id: Uuid,
        service_id: Uuid,
    ) -> Result<(), CatalogError> {
        identity::require_admin(caller)?;
        self.get_service(barbershop_id, service_id).await?;

        BarbershopService::deactivate(&self.db.pool, service_id).await?;
        info!(service_id = %service_id, barbershop_id = %barbershop_id, "Service deactivated");
        Ok(())
    }

    pub async fn create_barbershop(
        &self,
        caller: Option<&Caller>,
        data: CreateBarbershop,
    ) -> Result<Barbershop, CatalogError> {
        let admin = identity::require_admin(caller)?;
        let data = validate_barbershop(&data)?;

        let shop = Barbershop::create(&self.db.pool, &data, Some(admin.id), Uuid::new_v4()).await?;
        info!(barbershop_id = %shop.id, admin_id = %admin.id, "Barbershop created");
        Ok(shop)
    }

    /// Provisions a staff or client account. Only receptionists are tied to a shop.
    pub async fn create_user(
        &self,
        caller: Option<&Caller>,
        data: CreateUser,
    ) -> Result<User, CatalogError> {
        identity::require_admin(caller)?;

        let name = data.name.trim();
        let email = data.email.trim().to_lowercase();
        if name.is_empty() {
            return Err(invalid("name is required"));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(invalid("a valid email is required"));
        }
        let barbershop_id = match data.role {
            UserRole::Receptionist => {
                let id = data
                    .barbershop_id
                    .ok_or_else(|| invalid("receptionists must be assigned to a barbershop"))?;
                self.get_barbershop(id).await?;
                Some(id)
            }
            _ => None,
        };

        if User::find_by_email(&self.db.pool, &email).await?.is_some() {
            return Err(CatalogError::EmailTaken);
        }

        let data = CreateUser {
            name: name.to_string(),
            email,
            barbershop_id,
            ..data
        };
        let user = User::create(&self.db.pool, &data, Uuid::new_v4()).await?;
        info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }
}
