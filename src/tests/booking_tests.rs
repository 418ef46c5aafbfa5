//! tests/booking_tests.rs
//! Pruebas del pipeline de reserva: validar, guardar, notificar.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use crate::errors::{NotificationError, ValidationError};
    use crate::models::appointment_model::NewAppointment;
    use crate::models::booking_model::{BookingOutcome, BookingRequest, MAX_FIELD_CHARS};
    use crate::services::booking_service::{format_notification, BookingService};
    use crate::services::notification_channel_service::NotificationChannel;
    use crate::tests::support::{
        channel_with, memory_store, reject_inserts, RecordingTransport, ADMIN_CHAT_ID,
    };

    fn booking() -> NewAppointment {
        NewAppointment {
            name: "A".to_string(),
            phone: "111".to_string(),
            service: "Scaling".to_string(),
            appointment_date: "2024-01-01".to_string(),
        }
    }

    async fn service_with(
        transport: Arc<RecordingTransport>,
        ready: bool,
    ) -> (BookingService, crate::services::appointment_service::AppointmentService) {
        let store = memory_store().await;
        let channel = channel_with(transport, ready);
        let service = BookingService::new(
            store.clone(),
            Arc::new(channel),
            ADMIN_CHAT_ID.to_string(),
            "DR. TEST".to_string(),
        );
        (service, store)
    }

    #[actix_rt::test]
    async fn test_ready_channel_saves_and_notifies() {
        let transport = Arc::new(RecordingTransport::default());
        let (service, store) = service_with(transport.clone(), true).await;

        let outcome = service.submit_booking(booking()).await;
        let id = match outcome {
            BookingOutcome::BookedAndNotified { id } => id,
            other => panic!("resultado inesperado: {:?}", other),
        };

        let list = store.list_all().await.expect("list");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, id);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ADMIN_CHAT_ID);
        for field in ["A", "111", "Scaling", "2024-01-01"] {
            assert!(sent[0].1.contains(field), "falta '{}' en el mensaje", field);
        }
    }

    #[actix_rt::test]
    async fn test_channel_not_ready_still_saves_without_sending() {
        let transport = Arc::new(RecordingTransport::default());
        let (service, store) = service_with(transport.clone(), false).await;

        let outcome = service.submit_booking(booking()).await;
        assert!(matches!(outcome, BookingOutcome::BookedChannelNotReady { .. }));
        assert_eq!(store.list_all().await.expect("list").len(), 1);
        assert!(transport.sent().is_empty());
    }

    #[actix_rt::test]
    async fn test_send_failure_is_not_a_booking_failure() {
        let transport = Arc::new(RecordingTransport::failing());
        let (service, store) = service_with(transport.clone(), true).await;

        let outcome = service.submit_booking(booking()).await;
        match outcome {
            BookingOutcome::BookedNotificationFailed { reason, .. } => {
                assert!(reason.contains("simulated failure"));
            }
            other => panic!("resultado inesperado: {:?}", other),
        }
        assert_eq!(store.list_all().await.expect("list").len(), 1);
        assert_eq!(transport.sent().len(), 1, "un solo intento, sin reintentos");
    }

    #[actix_rt::test]
    async fn test_insert_failure_never_sends() {
        let transport = Arc::new(RecordingTransport::default());
        let (service, store) = service_with(transport.clone(), true).await;
        reject_inserts(&store).await;

        let outcome = service.submit_booking(booking()).await;
        assert!(matches!(outcome, BookingOutcome::PersistenceFailed(_)));
        assert!(transport.sent().is_empty());
        assert!(store.list_all().await.expect("list").is_empty());
    }

    /// Canal que cuenta las lecturas de readiness y se vuelve "listo" después de la primera.
    #[derive(Default)]
    struct FlippingChannel {
        reads: AtomicUsize,
        sends: AtomicUsize,
    }

    #[async_trait]
    impl NotificationChannel for FlippingChannel {
        fn is_ready(&self) -> bool {
            self.reads.fetch_add(1, Ordering::SeqCst) > 0
        }

        async fn send(&self, _recipient: &str, _text: &str) -> Result<(), NotificationError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[actix_rt::test]
    async fn test_readiness_is_read_once_per_booking() {
        let store = memory_store().await;
        let channel = Arc::new(FlippingChannel::default());
        let service = BookingService::new(
            store,
            channel.clone(),
            ADMIN_CHAT_ID.to_string(),
            "DR. TEST".to_string(),
        );

        let outcome = service.submit_booking(booking()).await;
        assert!(matches!(outcome, BookingOutcome::BookedChannelNotReady { .. }));
        assert_eq!(channel.reads.load(Ordering::SeqCst), 1);
        assert_eq!(channel.sends.load(Ordering::SeqCst), 0);
    }

    #[actix_rt::test]
    async fn test_readiness_is_captured_before_the_insert() {
        let transport = Arc::new(RecordingTransport::default());
        let store = memory_store().await;
        let channel = channel_with(transport.clone(), false);
        let service = BookingService::new(
            store.clone(),
            Arc::new(channel.clone()),
            ADMIN_CHAT_ID.to_string(),
            "DR. TEST".to_string(),
        );

        // Única conexión del pool ocupada: el insert queda esperando
        let held = store.pool().acquire().await.expect("conexión");
        let pending = tokio::spawn(async move { service.submit_booking(booking()).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // El canal se activa mientras la reserva sigue en curso
        channel.on_ready();
        drop(held);

        let outcome = pending.await.expect("tarea");
        assert!(matches!(outcome, BookingOutcome::BookedChannelNotReady { .. }));
        assert!(transport.sent().is_empty());
        assert_eq!(store.list_all().await.expect("list").len(), 1);
    }

    #[test]
    fn test_notification_template() {
        let msg = format_notification("DR. TEST", &booking());
        assert!(msg.starts_with("*DR. TEST - NEW APPOINTMENT*"));
        assert!(msg.contains("Patient: A\n"));
        assert!(msg.contains("Contact: 111\n"));
        assert!(msg.contains("Service: Scaling\n"));
        assert!(msg.contains("Date: 2024-01-01"));
    }

    #[test]
    fn test_validation_requires_name_phone_and_date() {
        let full = BookingRequest {
            name: Some("A".to_string()),
            phone: Some("111".to_string()),
            service: None,
            date: Some("2024-01-01".to_string()),
        };
        let valid = full.clone().validate().expect("válido");
        assert_eq!(valid.service, "");

        let no_name = BookingRequest {
            name: Some("   ".to_string()),
            ..full.clone()
        };
        assert_eq!(no_name.validate(), Err(ValidationError::Missing("name")));

        let no_phone = BookingRequest {
            phone: None,
            ..full.clone()
        };
        assert_eq!(no_phone.validate(), Err(ValidationError::Missing("phone")));

        let no_date = BookingRequest {
            date: Some(String::new()),
            ..full
        };
        assert_eq!(no_date.validate(), Err(ValidationError::Missing("date")));
    }

    #[test]
    fn test_null_fields_deserialize_as_empty() {
        let req: BookingRequest = serde_json::from_str(
            r#"{"name": "A", "phone": null, "service": null, "date": "2024-01-01"}"#,
        )
        .expect("null es JSON válido");
        assert_eq!(req.service, None);
        assert_eq!(req.validate(), Err(ValidationError::Missing("phone")));
    }

    #[test]
    fn test_validation_limits_length_but_keeps_values() {
        let long = BookingRequest {
            name: Some("x".repeat(MAX_FIELD_CHARS + 1)),
            phone: Some("111".to_string()),
            service: None,
            date: Some("d".to_string()),
        };
        let err = long.validate().unwrap_err();
        assert_eq!(err.field(), "name");

        let padded = BookingRequest {
            name: Some(" A ".to_string()),
            phone: Some("111".to_string()),
            service: Some("ñandú".to_string()),
            date: Some("d".to_string()),
        };
        let valid = padded.validate().expect("válido");
        assert_eq!(valid.name, " A ");
        assert_eq!(valid.service, "ñandú");
    }
}
