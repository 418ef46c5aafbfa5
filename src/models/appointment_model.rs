use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fila de la tabla `appointments`. Nunca se modifica después de crearse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub service: String,
    pub appointment_date: String, // texto libre, no se parsea como fecha
    pub created_at: DateTime<Utc>,
}

/// Datos ya validados para insertar; `id` y `created_at` los asigna el gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub name: String,
    pub phone: String,
    pub service: String,
    pub appointment_date: String,
}
