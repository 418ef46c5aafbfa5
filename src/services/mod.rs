//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

pub mod appointment_service;
pub mod booking_service;
pub mod notification_channel_service;
pub mod whatsapp_service;
