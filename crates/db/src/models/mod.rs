pub mod barber_status;
pub mod barbershop;
pub mod barbershop_service;
pub mod booking;
pub mod payment;
pub mod queue;
pub mod queue_entry;
pub mod review;
pub mod user;

