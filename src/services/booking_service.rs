use std::sync::Arc;

use crate::{
    models::{appointment_model::NewAppointment, booking_model::BookingOutcome},
    services::{
        appointment_service::AppointmentService,
        notification_channel_service::NotificationChannel,
    },
};

#[derive(Clone)]
pub struct BookingService {
    appointment_service: AppointmentService,
    channel: Arc<dyn NotificationChannel>,
    /// chatId fijo del administrador (p.e. "918080301527@c.us").
    admin_recipient: String,
    clinic_name: String,
}

impl BookingService {
    pub fn new(
        appointment_service: AppointmentService,
        channel: Arc<dyn NotificationChannel>,
        admin_recipient: String,
        clinic_name: String,
    ) -> Self {
        Self {
            appointment_service,
            channel,
            admin_recipient,
            clinic_name,
        }
    }

    /// Guarda la cita y, si el canal está listo, avisa al administrador.
    /// Un fallo de la notificación nunca deshace ni invalida la reserva.
    pub async fn submit_booking(&self, booking: NewAppointment) -> BookingOutcome {
        // 1) La readiness se lee una sola vez, antes de persistir
        let channel_ready = self.channel.is_ready();

        // 2) Persistir: si falla, no se intenta notificar
        let id = match self.appointment_service.insert(&booking).await {
            Ok(id) => id,
            Err(e) => {
                log::error!("(submit_booking) Error guardando la cita: {}", e);
                return BookingOutcome::PersistenceFailed(e);
            }
        };

        log::info!(
            "(submit_booking) Cita {} guardada para {}. Intentando WhatsApp...",
            id,
            booking.name
        );

        if !channel_ready {
            log::warn!("(submit_booking) WhatsApp no está listo; falta escanear el QR.");
            return BookingOutcome::BookedChannelNotReady { id };
        }

        // 3) Notificar
        let message = format_notification(&self.clinic_name, &booking);
        match self.channel.send(&self.admin_recipient, &message).await {
            Ok(()) => {
                log::info!("(submit_booking) Notificación enviada al administrador (cita {}).", id);
                BookingOutcome::BookedAndNotified { id }
            }
            Err(e) => {
                log::error!("(submit_booking) Error enviando WhatsApp (cita {}): {}", id, e);
                BookingOutcome::BookedNotificationFailed {
                    id,
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Mensaje fijo para el administrador, con los cuatro campos de la reserva.
pub fn format_notification(clinic_name: &str, booking: &NewAppointment) -> String {
    format!(
        "*{} - NEW APPOINTMENT*\n\n\
         Patient: {}\n\
         Contact: {}\n\
         Service: {}\n\
         Date: {}\n\n\
         _Sent from the clinic website._",
        clinic_name, booking.name, booking.phone, booking.service, booking.appointment_date
    )
}
