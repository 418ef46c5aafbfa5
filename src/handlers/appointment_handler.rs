//! handlers/appointment_handler.rs
use actix_web::{web, HttpResponse};

use crate::services::appointment_service::AppointmentService;

/// GET /api/appointments
pub async fn list_appointments_endpoint(
    appointment_service: web::Data<AppointmentService>,
) -> HttpResponse {
    match appointment_service.list_all().await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => {
            log::error!("Error listando citas: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error",
                "details": e.to_string()
            }))
        }
    }
}

/// GET /
pub async fn liveness_endpoint() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Clinic booking service is running")
}
