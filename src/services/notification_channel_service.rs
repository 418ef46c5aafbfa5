use async_trait::async_trait;
use qrcode::{render::unicode, QrCode};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};
use tokio::sync::mpsc;

use crate::{
    errors::NotificationError,
    models::notification_model::{ChannelEvent, ChannelState},
};

/// Bandera de readiness del canal. Arranca en false, pasa a true una sola vez.
#[derive(Clone, Debug, Default)]
pub struct ChannelReadiness(Arc<AtomicBool>);

impl ChannelReadiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Retorna true solo en la transición false -> true.
    pub fn mark_ready(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }
}

/// Transporte real del mensaje (gateway HTTP de WhatsApp, o un doble en tests).
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), NotificationError>;
}

/// Capacidad que consume `BookingService`.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn is_ready(&self) -> bool;

    /// Solo debe llamarse con `is_ready() == true`; si no, `NotificationError::NotReady`.
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotificationError>;
}

#[derive(Clone)]
pub struct NotificationChannelService {
    readiness: ChannelReadiness,
    state: Arc<RwLock<ChannelState>>,
    transport: Option<Arc<dyn MessageTransport>>,
}

impl NotificationChannelService {
    pub fn new(transport: Arc<dyn MessageTransport>, readiness: ChannelReadiness) -> Self {
        NotificationChannelService {
            readiness,
            state: Arc::new(RwLock::new(ChannelState::Connecting)),
            transport: Some(transport),
        }
    }

    /// Canal sin configuración: nunca estará listo.
    pub fn disabled() -> Self {
        NotificationChannelService {
            readiness: ChannelReadiness::new(),
            state: Arc::new(RwLock::new(ChannelState::Disabled)),
            transport: None,
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, new_state: ChannelState) {
        *self.state.write().unwrap_or_else(|p| p.into_inner()) = new_state;
    }

    /// Tras un auth_failure (o sin transporte) ya no se aceptan eventos.
    fn is_terminal(&self) -> bool {
        matches!(self.state(), ChannelState::AuthFailed | ChannelState::Disabled)
    }

    pub fn handle_event(&self, event: ChannelEvent) {
        if self.is_terminal() {
            log::warn!(
                "(handle_event) Canal en estado {:?}, se ignora el evento {:?}",
                self.state(),
                event
            );
            return;
        }
        match event {
            ChannelEvent::Connecting => self.on_connecting(),
            ChannelEvent::QrChallenge(code) => self.on_qr_challenge(&code),
            ChannelEvent::Authenticated => self.on_authenticated(),
            ChannelEvent::Ready => self.on_ready(),
            ChannelEvent::AuthFailure(reason) => self.on_auth_failure(&reason),
        }
    }

    pub fn on_connecting(&self) {
        if !self.readiness.is_ready() {
            self.set_state(ChannelState::Connecting);
        }
        log::info!("(on_connecting) Conectando con el gateway de WhatsApp...");
    }

    /// Muestra el código de emparejamiento en consola; sin esto nunca habrá readiness.
    pub fn on_qr_challenge(&self, code: &str) {
        if self.readiness.is_ready() {
            log::warn!("(on_qr_challenge) Canal ya activo; se ignora un QR tardío.");
            return;
        }
        self.set_state(ChannelState::Pairing);
        log::warn!("(on_qr_challenge) ACCIÓN REQUERIDA: escanea este QR desde WhatsApp para activar las notificaciones.");

        match render_qr(code) {
            Some(qr) => println!("{}", qr),
            None => log::warn!("(on_qr_challenge) No se pudo dibujar el QR; código: {}", code),
        }
    }

    pub fn on_authenticated(&self) {
        if !self.readiness.is_ready() {
            self.set_state(ChannelState::Authenticated);
        }
        log::info!("(on_authenticated) WhatsApp autenticado.");
    }

    pub fn on_ready(&self) {
        self.set_state(ChannelState::Ready);
        if self.readiness.mark_ready() {
            log::info!("(on_ready) Automatización de WhatsApp activa.");
        }
    }

    pub fn on_auth_failure(&self, reason: &str) {
        self.set_state(ChannelState::AuthFailed);
        log::error!(
            "(on_auth_failure) Falló la autenticación de WhatsApp: {}. Las reservas se siguen guardando, sin notificación.",
            reason
        );
    }

    /// Consume eventos del watcher hasta que se cierre el canal.
    pub async fn run_event_loop(self, mut events: mpsc::Receiver<ChannelEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        log::info!("(run_event_loop) Fin de eventos del canal; estado final {:?}", self.state());
    }
}

#[async_trait]
impl NotificationChannel for NotificationChannelService {
    fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotificationError> {
        let transport = self.transport.as_ref().ok_or(NotificationError::Disabled)?;
        if self.state() == ChannelState::AuthFailed {
            return Err(NotificationError::AuthFailed(
                "sesión de WhatsApp sin emparejar".to_string(),
            ));
        }
        if !self.readiness.is_ready() {
            return Err(NotificationError::NotReady);
        }
        transport.send_text(recipient, text).await
    }
}

fn render_qr(code: &str) -> Option<String> {
    let qr = QrCode::new(code.as_bytes()).ok()?;
    Some(
        qr.render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build(),
    )
}
