//! config/app_config.rs
//! Configuración global de la app, leída de variables de entorno (.env incluido).

use anyhow::{anyhow, Context, Result};
use std::{fmt, str::FromStr, time::Duration};

/// Modo TLS de la conexión MySQL (parámetro `ssl-mode` de sqlx).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    Disabled,
    Preferred,
    Required,
    VerifyCa,
    VerifyIdentity,
}

impl FromStr for SslMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "disabled" => Ok(SslMode::Disabled),
            "preferred" => Ok(SslMode::Preferred),
            "required" => Ok(SslMode::Required),
            "verify_ca" => Ok(SslMode::VerifyCa),
            "verify_identity" => Ok(SslMode::VerifyIdentity),
            other => Err(anyhow!("DB_SSL_MODE desconocido: '{}'", other)),
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SslMode::Disabled => "disabled",
            SslMode::Preferred => "preferred",
            SslMode::Required => "required",
            SslMode::VerifyCa => "verify_ca",
            SslMode::VerifyIdentity => "verify_identity",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    MySql,
    Sqlite,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Si está, se usa tal cual y se ignoran host/usuario/etc.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: SslMode,
    /// Cifrar sin verificar el certificado. Siempre opt-in explícito.
    pub trust_any_cert: bool,
}

impl DatabaseConfig {
    /// Modo TLS efectivo: `trust_any_cert` degrada cualquier modo a `required`.
    pub fn effective_ssl_mode(&self) -> SslMode {
        if self.trust_any_cert {
            SslMode::Required
        } else {
            self.ssl_mode
        }
    }

    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        format!(
            "mysql://{}:{}@{}:{}/{}?ssl-mode={}",
            urlencoding::encode(&self.user),
            urlencoding::encode(&self.password),
            self.host,
            self.port,
            urlencoding::encode(&self.name),
            self.effective_ssl_mode()
        )
    }

    pub fn backend(&self) -> DatabaseBackend {
        match &self.url {
            Some(url) if url.starts_with("sqlite:") => DatabaseBackend::Sqlite,
            _ => DatabaseBackend::MySql,
        }
    }

    /// Versión del URL apta para logs (sin password).
    pub fn redacted_url(&self) -> String {
        match &self.url {
            Some(url) => match url.find('@') {
                Some(at) => format!("{}://***{}", self.scheme(), &url[at..]),
                None => url.clone(),
            },
            None => format!(
                "mysql://{}:***@{}:{}/{}?ssl-mode={}",
                self.user,
                self.host,
                self.port,
                self.name,
                self.effective_ssl_mode()
            ),
        }
    }

    fn scheme(&self) -> &str {
        self.url
            .as_deref()
            .and_then(|u| u.split("://").next())
            .unwrap_or("mysql")
    }
}

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub session_id: String,
    pub api_key: Option<String>,
    /// Número del administrador (solo dígitos, con código de país).
    pub admin_number: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Binario opcional del gateway para lanzarlo como proceso hijo.
    pub gateway_bin: Option<String>,
    /// Ruta del navegador que usa el gateway (se le pasa como CHROME_BIN).
    pub browser_path: Option<String>,
}

impl WhatsAppConfig {
    pub fn admin_chat_id(&self) -> String {
        format!("{}@c.us", self.admin_number)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// `None` => canal de notificación deshabilitado.
    pub whatsapp: Option<WhatsAppConfig>,
    pub clinic_name: String,
    /// `None` => CORS permisivo (cualquier origen).
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la config a partir de una función de lookup (útil en tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server = ServerConfig {
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 5000)?,
        };

        let database = DatabaseConfig {
            url: get("DATABASE_URL"),
            host: get("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or(&get, "DB_PORT", 3306)?,
            user: get("DB_USER").unwrap_or_else(|| "root".to_string()),
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            name: get("DB_NAME").unwrap_or_else(|| "clinic_website".to_string()),
            ssl_mode: parse_or(&get, "DB_SSL_MODE", SslMode::Preferred)?,
            trust_any_cert: parse_bool(&get, "DB_TRUST_ANY_CERT")?,
        };

        let whatsapp = match (get("WHATSAPP_API_URL"), get("WHATSAPP_ADMIN_NUMBER")) {
            (Some(api_url), Some(admin_number)) => Some(WhatsAppConfig {
                api_url: api_url.trim_end_matches('/').to_string(),
                session_id: get("WHATSAPP_SESSION_ID").unwrap_or_else(|| "clinic".to_string()),
                api_key: get("WHATSAPP_API_KEY"),
                admin_number: normalize_number(&admin_number)?,
                poll_interval: Duration::from_secs(parse_or(&get, "WHATSAPP_POLL_SECS", 5)?),
                request_timeout: Duration::from_secs(parse_or(
                    &get,
                    "WHATSAPP_TIMEOUT_SECS",
                    15,
                )?),
                gateway_bin: get("WHATSAPP_GATEWAY_BIN"),
                browser_path: get("WHATSAPP_BROWSER_PATH"),
            }),
            _ => None,
        };

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS").map(|raw| {
            raw.split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect()
        });

        Ok(AppConfig {
            server,
            database,
            whatsapp,
            clinic_name: get("CLINIC_NAME").unwrap_or_else(|| "CLINIC".to_string()),
            cors_allowed_origins,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("Valor inválido para {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, key: &str) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow!("Valor inválido para {}: '{}'", key, v)),
        },
    }
}

/// Deja solo los dígitos ("+91 80803-01527" -> "918080301527").
fn normalize_number(raw: &str) -> Result<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(anyhow!(
            "WHATSAPP_ADMIN_NUMBER no contiene dígitos: '{}'",
            raw
        ));
    }
    Ok(digits)
}
