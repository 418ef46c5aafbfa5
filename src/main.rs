use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use std::sync::Arc;
use tokio::{process::Child, sync::mpsc};

use crate::config::app_config::{AppConfig, DatabaseConfig, WhatsAppConfig};
use crate::logger::init_logger;
use crate::services::appointment_service::AppointmentService;
use crate::services::booking_service::BookingService;
use crate::services::notification_channel_service::{
    ChannelReadiness, NotificationChannelService,
};
use crate::services::whatsapp_service::{spawn_gateway, WhatsAppClient};

mod app;
mod config;
mod errors;
mod handlers;
mod logger;
mod models;
mod services;
#[cfg(test)]
mod tests;

async fn setup_database(config: &DatabaseConfig) -> anyhow::Result<AppointmentService> {
    log::info!("Conectando a la base de datos en {}", config.redacted_url());
    if config.trust_any_cert && config.url.is_none() {
        log::warn!(
            "DB_TRUST_ANY_CERT activo: TLS sin verificar certificado (ssl-mode={})",
            config.effective_ssl_mode()
        );
    }

    let appointment_service = AppointmentService::connect_lazy(config)?;

    // Si falla, el proceso sigue vivo y reintenta el esquema en la primera consulta
    match appointment_service.ensure_schema().await {
        Ok(()) => log::info!("Base de datos conectada"),
        Err(e) => log::error!("Base de datos no disponible, modo degradado: {}", e),
    }

    Ok(appointment_service)
}

/// Arma el canal de WhatsApp. Cualquier fallo deja el canal deshabilitado, nunca tumba el proceso.
fn setup_notification_channel(
    config: Option<&WhatsAppConfig>,
) -> (NotificationChannelService, Option<Child>) {
    let Some(wa_config) = config else {
        log::warn!("WHATSAPP_API_URL / WHATSAPP_ADMIN_NUMBER no definidos: notificaciones deshabilitadas");
        return (NotificationChannelService::disabled(), None);
    };

    let gateway = match spawn_gateway(wa_config) {
        Ok(child) => child,
        Err(e) => {
            log::error!("No se pudo lanzar el gateway de WhatsApp: {:?}", e);
            None
        }
    };

    let client = match WhatsAppClient::new(wa_config) {
        Ok(client) => client,
        Err(e) => {
            log::error!("Notificaciones deshabilitadas: {:?}", e);
            return (NotificationChannelService::disabled(), gateway);
        }
    };

    let channel_service =
        NotificationChannelService::new(Arc::new(client.clone()), ChannelReadiness::new());

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move { client.watch_session(tx).await });
    tokio::spawn(channel_service.clone().run_event_loop(rx));

    (channel_service, gateway)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = AppConfig::from_env().context("Configuración inválida")?;

    let appointment_service = setup_database(&config.database).await?;

    // El Child del gateway vive mientras viva main
    let (channel_service, _gateway) = setup_notification_channel(config.whatsapp.as_ref());

    let admin_recipient = config
        .whatsapp
        .as_ref()
        .map(WhatsAppConfig::admin_chat_id)
        .unwrap_or_default();
    let booking_service = BookingService::new(
        appointment_service.clone(),
        Arc::new(channel_service.clone()),
        admin_recipient,
        config.clinic_name.clone(),
    );

    // Levantar servidor
    let bind = (config.server.bind_address.clone(), config.server.port);
    log::info!("Levantando servidor en {}:{}", bind.0, bind.1);
    let cors_origins = config.cors_allowed_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(app::cors_policy(cors_origins.as_deref()))
            .app_data(web::Data::new(appointment_service.clone()))
            .app_data(web::Data::new(channel_service.clone()))
            .app_data(web::Data::new(booking_service.clone()))
            .configure(app::init_app)
    })
    .workers(1)
    .bind(bind)
    .with_context(|| format!("No se pudo abrir el puerto {}", config.server.port))?
    .run()
    .await?;

    Ok(())
}
