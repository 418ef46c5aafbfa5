use serde::{Deserialize, Serialize};

/// Eventos del ciclo de vida del cliente de WhatsApp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Connecting,
    /// Hay que escanear este código desde el teléfono del administrador.
    QrChallenge(String),
    Authenticated,
    Ready,
    AuthFailure(String),
}

/// Estado descriptivo del canal (el booleano de readiness vive aparte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Disabled,
    Connecting,
    Pairing,
    Authenticated,
    Ready,
    AuthFailed,
}

/// Respuesta de GET /api/notifications/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStatusResponse {
    pub state: ChannelState,
    pub ready: bool,
}
