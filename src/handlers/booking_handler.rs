//! handlers/booking_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    models::booking_model::{BookingOutcome, BookingRequest, BookingResponse},
    services::booking_service::BookingService,
};

/// POST /api/book
pub async fn book_appointment_endpoint(
    booking_service: web::Data<BookingService>,
    body: web::Json<BookingRequest>,
) -> HttpResponse {
    let booking = match body.into_inner().validate() {
        Ok(booking) => booking,
        Err(e) => {
            log::warn!("Reserva rechazada: {}", e);
            return HttpResponse::BadRequest().json(json!({
                "success": false,
                "error": e.to_string(),
                "field": e.field()
            }));
        }
    };

    let outcome = booking_service.submit_booking(booking).await;
    let message = outcome.message();
    match outcome {
        BookingOutcome::PersistenceFailed(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": message,
            "details": e.to_string()
        })),
        BookingOutcome::BookedNotificationFailed { id, reason } => {
            log::debug!("Cita {} guardada sin notificación: {}", id, reason);
            booked_response(id, message)
        }
        BookingOutcome::BookedAndNotified { id } | BookingOutcome::BookedChannelNotReady { id } => {
            booked_response(id, message)
        }
    }
}

// Siempre 200: la cita quedó guardada, la notificación es solo orientativa.
fn booked_response(id: i64, message: &str) -> HttpResponse {
    HttpResponse::Ok().json(BookingResponse {
        success: true,
        appointment_id: id,
        message: message.to_string(),
    })
}
