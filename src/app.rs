//! app.rs
use crate::handlers::{appointment_handler, booking_handler, notification_handler};
use actix_cors::Cors;
use actix_web::{error, http::header, web, HttpResponse};

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(appointment_handler::liveness_endpoint))
        .service(
            web::scope("/api")
                .route("/book", web::post().to(booking_handler::book_appointment_endpoint))
                .route(
                    "/appointments",
                    web::get().to(appointment_handler::list_appointments_endpoint),
                )
                .route(
                    "/notifications/status",
                    web::get().to(notification_handler::channel_status_endpoint),
                ),
        );
}

/// JSON inválido => 400 con cuerpo JSON en lugar del texto plano por defecto.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let detail = err.to_string();
        log::warn!("Body JSON inválido: {}", detail);
        error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": "Invalid JSON body",
                "details": detail
            })),
        )
        .into()
    })
}

/// Sin lista de orígenes => cualquier origen (como el front original).
pub fn cors_policy(allowed_origins: Option<&[String]>) -> Cors {
    match allowed_origins {
        None => Cors::permissive(),
        Some(origins) => origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST"])
            .allowed_header(header::CONTENT_TYPE)
            .max_age(3600),
    }
}
