//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod appointment_model;
pub mod booking_model;
pub mod notification_model;
