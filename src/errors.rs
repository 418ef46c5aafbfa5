//! errors.rs
//! Taxonomía de errores del servicio: almacenamiento, notificación y validación.

use thiserror::Error;

/// Fallos del gateway de persistencia.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no se pudo conectar a la base de datos: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("falló la consulta '{context}': {source}")]
    Query {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("no se pudo crear el esquema de 'appointments': {0}")]
    Schema(#[source] sqlx::Error),

    #[error("registro inválido en 'appointments': {0}")]
    Decode(String),
}

impl StorageError {
    /// Clasifica un error de sqlx: los de pool/io cuentan como conexión.
    pub fn from_query(context: &'static str, source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => StorageError::Connection(source),
            other => StorageError::Query {
                context,
                source: other,
            },
        }
    }
}

/// Fallos del canal de notificación. Nunca hacen fallar una reserva.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("el canal de WhatsApp todavía no está listo")]
    NotReady,

    #[error("el canal de WhatsApp está deshabilitado")]
    Disabled,

    #[error("la autenticación de WhatsApp falló: {0}")]
    AuthFailed(String),

    #[error("error de transporte hacia el gateway de WhatsApp: {0}")]
    Transport(String),

    #[error("el gateway de WhatsApp rechazó el mensaje (status={status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for NotificationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            NotificationError::Transport(format!("timeout: {}", e))
        } else {
            NotificationError::Transport(e.to_string())
        }
    }
}

/// Datos de reserva incompletos o fuera de rango.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("falta el campo obligatorio '{0}'")]
    Missing(&'static str),

    #[error("el campo '{field}' supera los {max} caracteres")]
    TooLong { field: &'static str, max: usize },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Missing(field) => *field,
            ValidationError::TooLong { field, .. } => *field,
        }
    }
}
