pub mod barber;
pub mod booking;
pub mod catalog;
pub mod config;
pub mod database_validator;
pub mod entry_timeout;
pub mod identity;
pub mod queue;
