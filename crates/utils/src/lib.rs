pub mod phone;
pub mod response;
pub mod sentry;
