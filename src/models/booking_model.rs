use serde::{Deserialize, Serialize};

use crate::{errors::ValidationError, models::appointment_model::NewAppointment};

/// Longitud máxima (en caracteres) de cada campo; coincide con VARCHAR(255).
pub const MAX_FIELD_CHARS: usize = 255;

/// Body de POST /api/book. Un campo ausente o `null` cuenta como vacío; lo decide `validate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl BookingRequest {
    /// Valida presencia y longitud. Los valores se conservan tal cual (sin trim).
    pub fn validate(self) -> Result<NewAppointment, ValidationError> {
        let name = self.name.unwrap_or_default();
        let phone = self.phone.unwrap_or_default();
        let service = self.service.unwrap_or_default();
        let date = self.date.unwrap_or_default();

        require("name", &name)?;
        require("phone", &phone)?;
        require("date", &date)?;

        for (field, value) in [
            ("name", &name),
            ("phone", &phone),
            ("service", &service),
            ("date", &date),
        ] {
            if value.chars().count() > MAX_FIELD_CHARS {
                return Err(ValidationError::TooLong {
                    field,
                    max: MAX_FIELD_CHARS,
                });
            }
        }

        Ok(NewAppointment {
            name,
            phone,
            service,
            appointment_date: date,
        })
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(())
    }
}

/// Resultado de `BookingService::submit_booking`.
#[derive(Debug)]
pub enum BookingOutcome {
    BookedAndNotified { id: i64 },
    BookedNotificationFailed { id: i64, reason: String },
    BookedChannelNotReady { id: i64 },
    PersistenceFailed(crate::errors::StorageError),
}

impl BookingOutcome {
    /// Texto para el cliente. Solo orientativo respecto a WhatsApp.
    pub fn message(&self) -> &'static str {
        match self {
            BookingOutcome::BookedAndNotified { .. } => "Success! Sent to DB and WhatsApp.",
            BookingOutcome::BookedNotificationFailed { .. } => "Saved to DB, but WhatsApp failed.",
            BookingOutcome::BookedChannelNotReady { .. } => {
                "Saved to DB. Waiting for WhatsApp login."
            }
            BookingOutcome::PersistenceFailed(_) => "Database failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub success: bool,
    pub appointment_id: i64,
    pub message: String,
}
