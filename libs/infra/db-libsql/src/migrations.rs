// [libs/infra/db-libsql/src/migrations.rs]
/*!
 * =================================================================
 * APARATO: MIGRATION LEDGER ENGINE (V3.0 - MONOTONIC CHAIN)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EVOLUCIÓN VERSIONADA Y DETERMINISTA DEL ESQUEMA
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. EMBEDDED ASSETS: Los ficheros NNN_*.sql viajan dentro del binario;
 *    nombres fuera del patrón son ignorados silenciosamente.
 * 2. MONOTONIC CHAIN: Solo se aplican versiones superiores a
 *    max(schema_version); aplicar N y luego N+1 equivale a una
 *    instalación limpia en N+1.
 * 3. TRANSACTIONAL STEPS: Cada migración ejecuta en su propia
 *    transacción inmediata; un fallo revierte el paso completo.
 * =================================================================
 */

use crate::client::begin_write;
use crate::errors::StoreError;
use libsql::{params, Connection};
use tracing::{debug, info, instrument};

/// Catálogo embebido de migraciones (nombre de fichero, contenido SQL).
const EMBEDDED_MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_initial_topology.sql",
        include_str!("../migrations/001_initial_topology.sql"),
    ),
    ("002_edge_tls.sql", include_str!("../migrations/002_edge_tls.sql")),
    (
        "003_proxy_search.sql",
        include_str!("../migrations/003_proxy_search.sql"),
    ),
    ("004_governance.sql", include_str!("../migrations/004_governance.sql")),
    (
        "005_templates_integrations.sql",
        include_str!("../migrations/005_templates_integrations.sql"),
    ),
];

/// Extrae el número de versión del patrón `NNN_*.sql`; fuera de patrón → None.
fn parse_migration_version(file_name: &str) -> Option<i64> {
    let stem = file_name.strip_suffix(".sql")?;
    let (numeric_prefix, remainder) = stem.split_once('_')?;
    if remainder.is_empty() {
        return None;
    }
    numeric_prefix.parse::<i64>().ok()
}

/// Divide un fichero de migración en sentencias individuales.
/// Los ficheros del catálogo no portan triggers ni literales con ';'.
fn split_statements(sql_body: &str) -> Vec<String> {
    sql_body
        .split(';')
        .map(|fragment| {
            fragment
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .map(|statement| statement.trim().to_string())
        .filter(|statement| !statement.is_empty())
        .collect()
}

/**
 * Aplica toda migración cuyo número exceda max(schema_version).
 *
 * Retorna la cantidad de migraciones aplicadas en esta pasada.
 *
 * # Errors:
 * - `StoreError::Query`: una sentencia colapsó; la transacción del paso
 *   se revierte y el ledger queda en la versión previa.
 */
#[instrument(skip(connection))]
pub async fn apply_pending_migrations(connection: &Connection) -> Result<u32, StoreError> {
    // 1. SOLIDIFICACIÓN DEL LEDGER DE VERSIONES
    connection
        .execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            (),
        )
        .await
        .map_err(StoreError::classify)?;

    let current_version = max_applied_version(connection).await?;

    // 2. RESOLUCIÓN DEL CATÁLOGO (orden numérico estricto)
    let mut pending_catalog: Vec<(i64, &str, &str)> = EMBEDDED_MIGRATIONS
        .iter()
        .filter_map(|(file_name, sql_body)| {
            parse_migration_version(file_name)
                .map(|version| (version, *file_name, *sql_body))
        })
        .filter(|(version, _, _)| *version > current_version)
        .collect();
    pending_catalog.sort_by_key(|(version, _, _)| *version);

    // 3. APLICACIÓN TRANSACCIONAL PASO A PASO
    let mut applied_count = 0u32;
    for (version, file_name, sql_body) in pending_catalog {
        debug!("  ↳ Applying migration stratum: {}", file_name);

        let migration_transaction = begin_write(connection).await?;
        for statement in split_statements(sql_body) {
            migration_transaction
                .execute(statement.as_str(), ())
                .await
                .map_err(StoreError::classify)?;
        }
        migration_transaction
            .execute(
                "INSERT INTO schema_version (version, name) VALUES (?1, ?2)",
                params![version, file_name],
            )
            .await
            .map_err(StoreError::classify)?;
        migration_transaction
            .commit()
            .await
            .map_err(StoreError::classify)?;

        applied_count += 1;
    }

    if applied_count > 0 {
        info!(
            "🏗️ [SCHEMA_ENGINE]: Ledger leveled to V{:03}. {} strata applied.",
            max_applied_version(connection).await?,
            applied_count
        );
    }
    Ok(applied_count)
}

/// Versión máxima registrada en el ledger; 0 en instalación virgen.
pub async fn max_applied_version(connection: &Connection) -> Result<i64, StoreError> {
    let mut version_rows = connection
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await
        .map_err(StoreError::classify)?;

    match version_rows.next().await.map_err(StoreError::classify)? {
        Some(data_row) => data_row
            .get::<i64>(0)
            .map_err(|e| StoreError::Mapping(e.to_string())),
        None => Ok(0),
    }
}
