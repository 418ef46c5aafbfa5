//! services/whatsapp_service.rs
//! Cliente del gateway HTTP de WhatsApp Web: envío de texto y seguimiento de la sesión.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tokio::{
    process::{Child, Command},
    sync::mpsc,
};

use crate::{
    config::app_config::WhatsAppConfig,
    errors::NotificationError,
    models::notification_model::ChannelEvent,
    services::notification_channel_service::MessageTransport,
};

/// Estados de WhatsApp Web que no se recuperan sin intervención manual.
const TERMINAL_STATES: &[&str] = &[
    "CONFLICT",
    "DEPRECATED_VERSION",
    "PROXYBLOCK",
    "SMB_TOS_BLOCK",
    "TOS_BLOCK",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Connected,
    /// Todavía sin emparejar / abriendo; lleva el estado reportado.
    Pending(String),
    /// Fallo de autenticación definitivo.
    Terminal(String),
}

/// Interpreta la respuesta de GET /session/status/{id}.
pub fn classify_session_status(http_status: u16, body: &Value) -> SessionStatus {
    if http_status == 401 || http_status == 403 {
        return SessionStatus::Terminal(format!("gateway respondió {}", http_status));
    }

    let state = body
        .get("state")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_ascii_uppercase();

    if state == "CONNECTED" {
        SessionStatus::Connected
    } else if TERMINAL_STATES.contains(&state.as_str()) {
        SessionStatus::Terminal(state)
    } else if state.is_empty() {
        let message = body
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("sin estado");
        SessionStatus::Pending(message.to_string())
    } else {
        SessionStatus::Pending(state)
    }
}

#[derive(Clone)]
pub struct WhatsAppClient {
    http_client: Client,
    base_url: String,
    session_id: String,
    api_key: Option<String>,
    poll_interval: Duration,
}

impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("No se pudo construir el cliente HTTP de WhatsApp")?;

        Ok(Self {
            http_client,
            base_url: config.api_url.clone(),
            session_id: config.session_id.clone(),
            api_key: config.api_key.clone(),
            poll_interval: config.poll_interval,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, path, self.session_id);
        let builder = self.http_client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("x-api-key", key),
            None => builder,
        }
    }

    async fn start_session(&self) -> Result<(), NotificationError> {
        let resp = self.request(Method::GET, "session/start").send().await?;
        log::info!(
            "(start_session) session_id={} status={}",
            self.session_id,
            resp.status()
        );
        Ok(())
    }

    async fn session_status(&self) -> Result<SessionStatus, NotificationError> {
        let resp = self.request(Method::GET, "session/status").send().await?;
        let status = resp.status().as_u16();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        Ok(classify_session_status(status, &body))
    }

    async fn session_qr(&self) -> Result<Option<String>, NotificationError> {
        let resp = self.request(Method::GET, "session/qr").send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body = resp.json::<Value>().await?;
        Ok(body
            .get("qr")
            .and_then(|v| v.as_str())
            .filter(|qr| !qr.is_empty())
            .map(str::to_string))
    }

    /// Sigue la sesión y emite eventos de ciclo de vida hasta `Ready` o `AuthFailure`.
    /// No reintenta el emparejamiento después de un fallo de autenticación.
    pub async fn watch_session(&self, events: mpsc::Sender<ChannelEvent>) {
        if events.send(ChannelEvent::Connecting).await.is_err() {
            return;
        }
        if let Err(e) = self.start_session().await {
            log::warn!("(watch_session) No se pudo iniciar la sesión: {}", e);
        }

        let mut last_qr: Option<String> = None;
        loop {
            let event = match self.session_status().await {
                Ok(SessionStatus::Connected) => {
                    if events.send(ChannelEvent::Authenticated).await.is_ok() {
                        let _ = events.send(ChannelEvent::Ready).await;
                    }
                    return;
                }
                Ok(SessionStatus::Terminal(reason)) => {
                    let _ = events.send(ChannelEvent::AuthFailure(reason)).await;
                    return;
                }
                Ok(SessionStatus::Pending(state)) => {
                    log::debug!("(watch_session) Sesión pendiente: {}", state);
                    match self.session_qr().await {
                        Ok(Some(qr)) if last_qr.as_deref() != Some(qr.as_str()) => {
                            last_qr = Some(qr.clone());
                            Some(ChannelEvent::QrChallenge(qr))
                        }
                        Ok(_) => None,
                        Err(e) => {
                            log::warn!("(watch_session) Error pidiendo el QR: {}", e);
                            None
                        }
                    }
                }
                Err(e) => {
                    log::warn!("(watch_session) Gateway de WhatsApp no disponible: {}", e);
                    None
                }
            };

            if let Some(event) = event {
                if events.send(event).await.is_err() {
                    return;
                }
            }
            if events.is_closed() {
                return;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl MessageTransport for WhatsAppClient {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), NotificationError> {
        let payload = serde_json::json!({
            "chatId": chat_id,
            "contentType": "string",
            "content": text
        });

        let resp = self
            .request(Method::POST, "client/sendMessage")
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        log::info!("(send_text) -> Envío a '{}': status={}", chat_id, status);
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Lanza el gateway como proceso hijo si se configuró `WHATSAPP_GATEWAY_BIN`.
/// El `Child` hay que mantenerlo vivo: se mata al soltarlo.
pub fn spawn_gateway(config: &WhatsAppConfig) -> Result<Option<Child>> {
    let Some(bin) = &config.gateway_bin else {
        if config.browser_path.is_some() {
            log::warn!("(spawn_gateway) WHATSAPP_BROWSER_PATH se ignora sin WHATSAPP_GATEWAY_BIN");
        }
        return Ok(None);
    };

    let bin_path =
        which::which(bin).with_context(|| format!("No se encontró el gateway '{}'", bin))?;

    let mut cmd = Command::new(&bin_path);
    cmd.kill_on_drop(true);
    if let Some(browser) = &config.browser_path {
        cmd.env("CHROME_BIN", browser);
    }
    if let Some(key) = &config.api_key {
        cmd.env("API_KEY", key);
    }

    let child = cmd
        .spawn()
        .with_context(|| format!("No se pudo lanzar {}", bin_path.display()))?;
    log::info!(
        "(spawn_gateway) Gateway lanzado: {} (pid={:?})",
        bin_path.display(),
        child.id()
    );
    Ok(Some(child))
}
