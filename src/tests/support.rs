//! tests/support.rs
//! Helpers compartidos por las pruebas.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::config::app_config::AppConfig;
use crate::errors::NotificationError;
use crate::services::appointment_service::AppointmentService;
use crate::services::notification_channel_service::{
    ChannelReadiness, MessageTransport, NotificationChannelService,
};

pub const ADMIN_CHAT_ID: &str = "918000000000@c.us";

/// Transporte que guarda cada mensaje en memoria; opcionalmente falla siempre.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        if self.fail {
            return Err(NotificationError::Rejected {
                status: 500,
                body: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Gateway de persistencia sobre SQLite en memoria, sin tabla todavía.
pub fn empty_memory_store() -> AppointmentService {
    let config = AppConfig::from_lookup(|key| match key {
        "DATABASE_URL" => Some("sqlite::memory:".to_string()),
        _ => None,
    })
    .expect("config de test");

    AppointmentService::connect_lazy(&config.database).expect("pool de test")
}

/// Gateway de persistencia sobre SQLite en memoria, con la tabla ya creada.
pub async fn memory_store() -> AppointmentService {
    let store = empty_memory_store();
    store.ensure_schema().await.expect("esquema de test");
    store
}

/// Hace que todo INSERT falle a partir de ahora (la lectura sigue funcionando).
pub async fn reject_inserts(store: &AppointmentService) {
    sqlx::query(
        r#"
        CREATE TRIGGER reject_inserts BEFORE INSERT ON appointments
        BEGIN
            SELECT RAISE(ABORT, 'forced failure');
        END
        "#,
    )
    .execute(store.pool())
    .await
    .expect("trigger de test");
}

pub fn channel_with(transport: Arc<RecordingTransport>, ready: bool) -> NotificationChannelService {
    let channel = NotificationChannelService::new(transport, ChannelReadiness::new());
    if ready {
        channel.on_ready();
    }
    channel
}
