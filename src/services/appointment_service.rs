use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{
    any::{AnyPoolOptions, AnyRow},
    AnyPool, Row,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::OnceCell;

use crate::{
    config::app_config::{DatabaseBackend, DatabaseConfig},
    errors::StorageError,
    models::appointment_model::{Appointment, NewAppointment},
};

/// Formato de `created_at`: ancho fijo, así el orden de texto es el cronológico.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const SQLITE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS appointments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        phone TEXT NOT NULL,
        service TEXT NOT NULL DEFAULT '',
        appointment_date TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now') || '000')
    )
"#;

const MYSQL_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS appointments (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        phone VARCHAR(255) NOT NULL,
        service VARCHAR(255) NOT NULL DEFAULT '',
        appointment_date VARCHAR(255) NOT NULL,
        created_at VARCHAR(32) NOT NULL
            DEFAULT (DATE_FORMAT(UTC_TIMESTAMP(6), '%Y-%m-%d %H:%i:%s.%f')),
        INDEX idx_appointments_created_at (created_at)
    ) CHARACTER SET utf8mb4
"#;

#[derive(Clone, Debug)]
pub struct AppointmentService {
    db_pool: AnyPool,
    backend: DatabaseBackend,
    schema_ready: Arc<OnceCell<()>>,
}

impl AppointmentService {
    pub fn new(db_pool: AnyPool, backend: DatabaseBackend) -> Self {
        AppointmentService {
            db_pool,
            backend,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    /// Crea el pool sin conectar todavía: si la base está caída el proceso sigue vivo
    /// y cada operación falla con `StorageError::Connection` hasta que vuelva.
    pub fn connect_lazy(config: &DatabaseConfig) -> anyhow::Result<Self> {
        sqlx::any::install_default_drivers();

        let url = config.connection_url();
        let backend = config.backend();
        let in_memory = backend == DatabaseBackend::Sqlite && url.contains(":memory:");

        let mut options = AnyPoolOptions::new().acquire_timeout(Duration::from_secs(10));
        if in_memory {
            // Cada conexión SQLite en memoria es una base distinta: una sola, para siempre.
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            options = options.max_connections(5);
        }

        let db_pool = options
            .connect_lazy(&url)
            .with_context(|| format!("URL de base de datos inválida: {}", config.redacted_url()))?;

        Ok(Self::new(db_pool, backend))
    }

    /// Crea la tabla si no existe. Solo corre hasta el primer éxito.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        self.schema_ready
            .get_or_try_init(|| self.create_table())
            .await
            .map(|_| ())
    }

    async fn create_table(&self) -> Result<(), StorageError> {
        let ddl = match self.backend {
            DatabaseBackend::Sqlite => SQLITE_SCHEMA,
            DatabaseBackend::MySql => MYSQL_SCHEMA,
        };

        sqlx::query(ddl)
            .execute(&self.db_pool)
            .await
            .map_err(|e| match StorageError::from_query("create appointments", e) {
                StorageError::Query { source, .. } => StorageError::Schema(source),
                other => other,
            })?;

        log::info!("(create_table) Tabla 'appointments' verificada ({:?}).", self.backend);
        Ok(())
    }

    /// Inserta una cita; `id` y `created_at` se asignan aquí. Retorna el id nuevo.
    pub async fn insert(&self, new: &NewAppointment) -> Result<i64, StorageError> {
        self.ensure_schema().await?;

        let created_at = format_timestamp(Utc::now());

        // Any+SQLite no reporta last_insert_id: ahí se pide el id con RETURNING
        let id = match self.backend {
            DatabaseBackend::Sqlite => {
                let row = sqlx::query(
                    r#"
                    INSERT INTO appointments (name, phone, service, appointment_date, created_at)
                    VALUES (?, ?, ?, ?, ?)
                    RETURNING id
                    "#,
                )
                .bind(new.name.as_str())
                .bind(new.phone.as_str())
                .bind(new.service.as_str())
                .bind(new.appointment_date.as_str())
                .bind(created_at.as_str())
                .fetch_one(&self.db_pool)
                .await
                .map_err(|e| StorageError::from_query("insert appointment", e))?;

                row.try_get::<i64, _>("id")
                    .map_err(|e| StorageError::Decode(e.to_string()))?
            }
            DatabaseBackend::MySql => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO appointments (name, phone, service, appointment_date, created_at)
                    VALUES (?, ?, ?, ?, ?)
                    "#,
                )
                .bind(new.name.as_str())
                .bind(new.phone.as_str())
                .bind(new.service.as_str())
                .bind(new.appointment_date.as_str())
                .bind(created_at.as_str())
                .execute(&self.db_pool)
                .await
                .map_err(|e| StorageError::from_query("insert appointment", e))?;

                result.last_insert_id().ok_or_else(|| {
                    StorageError::Decode("el motor no devolvió el id insertado".into())
                })?
            }
        };

        log::info!("(insert) Cita guardada con id={} para '{}'", id, new.name);
        Ok(id)
    }

    /// Todas las citas, de la más reciente a la más antigua. Sin paginación.
    pub async fn list_all(&self) -> Result<Vec<Appointment>, StorageError> {
        self.ensure_schema().await?;

        // En MySQL la columna puede ser TIMESTAMP si la tabla es anterior a este servicio.
        let created_at_expr = match self.backend {
            DatabaseBackend::Sqlite => "created_at",
            DatabaseBackend::MySql => "CAST(created_at AS CHAR)",
        };
        let sql = format!(
            r#"
            SELECT id, name, phone, service, appointment_date,
                   {created_at_expr} AS created_at
            FROM appointments
            ORDER BY created_at DESC, id DESC
            "#
        );

        let rows = sqlx::query(&sql)
            .fetch_all(&self.db_pool)
            .await
            .map_err(|e| StorageError::from_query("list appointments", e))?;

        rows.iter().map(row_to_appointment).collect()
    }

    #[cfg(test)]
    pub fn pool(&self) -> &AnyPool {
        &self.db_pool
    }
}

fn row_to_appointment(row: &AnyRow) -> Result<Appointment, StorageError> {
    let decode = |e: sqlx::Error| StorageError::Decode(e.to_string());
    // Tablas previas a este servicio pueden traer NULL en las columnas de texto
    let text = |column: &str| -> Result<String, StorageError> {
        row.try_get::<Option<String>, _>(column)
            .map(Option::unwrap_or_default)
            .map_err(decode)
    };

    Ok(Appointment {
        id: row.try_get("id").map_err(decode)?,
        name: text("name")?,
        phone: text("phone")?,
        service: text("service")?,
        appointment_date: text("appointment_date")?,
        created_at: parse_timestamp(&text("created_at")?)?,
    })
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| StorageError::Decode(format!("created_at '{}': {}", raw, e)))
}
