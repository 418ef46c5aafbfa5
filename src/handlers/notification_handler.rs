//! handlers/notification_handler.rs
use actix_web::{web, HttpResponse};

use crate::{
    models::notification_model::ChannelStatusResponse,
    services::notification_channel_service::{NotificationChannel, NotificationChannelService},
};

/// GET /api/notifications/status
/// Solo el estado; el código de emparejamiento nunca sale por HTTP.
pub async fn channel_status_endpoint(
    channel_service: web::Data<NotificationChannelService>,
) -> HttpResponse {
    HttpResponse::Ok().json(ChannelStatusResponse {
        state: channel_service.state(),
        ready: channel_service.is_ready(),
    })
}
