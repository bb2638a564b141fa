//! Who is calling: the authenticated account behind a request, if any.

use db::models::user::UserRole;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: Uuid,
    pub role: UserRole,
    pub name: Option<String>,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Display name, falling back to `fallback` when the token carried none
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(fallback)
    }
}

pub fn require(caller: Option<&Caller>) -> Result<&Caller, AccessError> {
    caller.ok_or(AccessError::Unauthenticated)
}

pub fn require_role<'a>(
    caller: Option<&'a Caller>,
    role: UserRole,
    denied: &'static str,
) -> Result<&'a Caller, AccessError> {
    let caller = require(caller)?;
    if caller.role != role {
        return Err(AccessError::Forbidden(denied));
    }
    Ok(caller)
}

pub fn require_admin(caller: Option<&Caller>) -> Result<&Caller, AccessError> {
    require_role(caller, UserRole::Admin, "administrator access required")
}
