//! handlers/mod.rs
pub mod appointment_handler;
pub mod booking_handler;
pub mod notification_handler;
