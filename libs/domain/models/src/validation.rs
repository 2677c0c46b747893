// [libs/domain/models/src/validation.rs]
/*!
 * =================================================================
 * APARATO: BOUNDARY VALIDATION ENGINE (V2.2 - NOMINAL SYNC)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: GUARDIA DE FRONTERA PREVIA A TODA PERSISTENCIA
 *
 * # Mathematical Proof (Fail-Fast Purity):
 * Toda violación retorna antes de que el Store toque el Ledger, por lo que
 * una entrada inválida jamás produce una escritura parcial.
 * =================================================================
 */

use thiserror::Error;

/// Violación de una restricción estructural de la frontera de datos.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[L2_VALIDATION_FAULT]: field '{field}' violates: {rule}")]
pub struct ValidationFault {
    pub field: &'static str,
    pub rule: String,
}

/// Resultado nominal de los validadores de frontera.
pub type ValidationResult = Result<(), ValidationFault>;

fn fault(field: &'static str, rule: &str) -> ValidationResult {
    Err(ValidationFault {
        field,
        rule: rule.into(),
    })
}

/// Nombre de proyecto: 1 a 64 caracteres.
pub fn validate_project_name(name: &str) -> ValidationResult {
    if name.is_empty() || name.chars().count() > 64 {
        return fault("project.name", "length must be within 1..=64");
    }
    Ok(())
}

/// Nombre de servicio: etiqueta DNS (minúsculas, alfanumérico y guiones, 1–63).
pub fn validate_service_name(name: &str) -> ValidationResult {
    if name.is_empty() || name.len() > 63 {
        return fault("service.name", "length must be within 1..=63");
    }
    if !name
        .bytes()
        .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-')
    {
        return fault("service.name", "only lowercase alphanumerics and hyphens are legal");
    }
    if name.starts_with('-') || name.ends_with('-') {
        return fault("service.name", "hyphen cannot anchor the label");
    }
    Ok(())
}

/// Dominio de ruta: 1 a 253 caracteres.
pub fn validate_domain_name(domain: &str) -> ValidationResult {
    if domain.is_empty() || domain.len() > 253 {
        return fault("route.domain", "length must be within 1..=253");
    }
    Ok(())
}

/// Puerto de ruta: 1..=65535.
pub fn validate_port(port: i64) -> ValidationResult {
    if !(1..=65535).contains(&port) {
        return fault("route.port", "port must be within 1..=65535");
    }
    Ok(())
}

/// Llave de variable de entorno: no vacía.
pub fn validate_env_key(key: &str) -> ValidationResult {
    if key.is_empty() {
        return fault("env_var.key", "key must be non-empty");
    }
    Ok(())
}

/// Nombre de token: 1 a 64 caracteres.
pub fn validate_token_name(name: &str) -> ValidationResult {
    if name.is_empty() || name.chars().count() > 64 {
        return fault("token.name", "length must be within 1..=64");
    }
    Ok(())
}
