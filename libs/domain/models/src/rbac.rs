// [libs/domain/models/src/rbac.rs]
/*!
 * =================================================================
 * APARATO: RBAC & TOKEN DOMAIN MODEL (V3.1 - HIERARCHY SEALED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: JERARQUÍA DE ROLES Y CONTRATO DE TOKEN DE API
 *
 * # Mathematical Proof (Role Lattice):
 * admin ⊃ deployer ⊃ viewer forma una cadena total; can_access es la
 * comparación de rangos y por tanto transitiva y reflexiva.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Jerarquía cerrada de roles del plano de control.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Deployer,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Deployer => "deployer",
            Role::Viewer => "viewer",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "admin" => Some(Role::Admin),
            "deployer" => Some(Role::Deployer),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    /// Rango numérico del rol dentro de la cadena total.
    fn rank(&self) -> u8 {
        match self {
            Role::Admin => 3,
            Role::Deployer => 2,
            Role::Viewer => 1,
        }
    }

    /// Un portador accede a todo objetivo de rango igual o inferior.
    pub fn can_access(&self, target: Role) -> bool {
        self.rank() >= target.rank()
    }

    /// Solo el administrador emite tokens, de cualquier rol.
    pub fn can_issue_tokens(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Token de API; el hash jamás se serializa hacia vistas públicas.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    /// Nombre único del token (1–64 caracteres).
    pub name: String,
    /// Hash PHC del secreto; excluido de toda serialización.
    #[serde(skip_serializing)]
    pub secret_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Cliente de API registrado (automatización externa).
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Operador humano registrado vía OAuth.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    pub login: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}
