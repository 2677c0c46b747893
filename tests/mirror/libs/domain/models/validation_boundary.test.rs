// [tests/mirror/libs/domain/models/validation_boundary.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE FRONTERA DE VALIDACIÓN (V2.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE LOS GUARDIAS DE FRONTERA DE DATOS
 * =================================================================
 */

use helmsman_domain_models::validation::{
    validate_domain_name, validate_port, validate_project_name, validate_service_name,
};
use helmsman_domain_models::{DomainStatus, EnvVar, Role};

#[test]
fn certify_project_name_window() {
    assert!(validate_project_name("edge").is_ok());
    assert!(validate_project_name(&"p".repeat(64)).is_ok());
    assert!(validate_project_name("").is_err());
    assert!(validate_project_name(&"p".repeat(65)).is_err());
}

#[test]
fn certify_dns_label_discipline() {
    assert!(validate_service_name("api").is_ok());
    assert!(validate_service_name("worker-7").is_ok());
    assert!(validate_service_name(&"a".repeat(63)).is_ok());

    assert!(validate_service_name("").is_err());
    assert!(validate_service_name(&"a".repeat(64)).is_err());
    assert!(validate_service_name("UPPER").is_err());
    assert!(validate_service_name("under_score").is_err());
    assert!(validate_service_name("-edge").is_err());
    assert!(validate_service_name("edge-").is_err());
}

#[test]
fn certify_domain_and_port_windows() {
    assert!(validate_domain_name("a.example.com").is_ok());
    assert!(validate_domain_name(&"d".repeat(253)).is_ok());
    assert!(validate_domain_name(&"d".repeat(254)).is_err());
    assert!(validate_domain_name("").is_err());

    assert!(validate_port(1).is_ok());
    assert!(validate_port(65535).is_ok());
    assert!(validate_port(0).is_err());
    assert!(validate_port(65536).is_err());
}

#[test]
fn certify_env_var_xor_gate() {
    // Forma plana legal.
    assert!(EnvVar::validate_shape("K", "v", false, &[], &[]).is_ok());
    // Secreto sin material: ilegal.
    assert!(EnvVar::validate_shape("K", "", true, &[], &[]).is_err());
    // Secreto con material: legal.
    assert!(EnvVar::validate_shape("K", "", true, &[0u8; 12], &[9, 9]).is_ok());
    // Ambas formas a la vez: ilegal en cualquier dirección.
    assert!(EnvVar::validate_shape("K", "v", true, &[0u8; 12], &[9]).is_err());
    assert!(EnvVar::validate_shape("K", "v", false, &[0u8; 12], &[9]).is_err());
}

#[test]
fn certify_closed_status_catalogs() {
    assert!(DomainStatus::parse("pending").is_some());
    assert!(DomainStatus::parse("bogus").is_none());

    assert!(Role::parse("admin").is_some());
    assert!(Role::parse("root").is_none());
}

#[test]
fn certify_rbac_lattice() {
    assert!(Role::Admin.can_access(Role::Viewer));
    assert!(Role::Deployer.can_access(Role::Viewer));
    assert!(!Role::Viewer.can_access(Role::Deployer));
    assert!(!Role::Deployer.can_access(Role::Admin));
    assert!(Role::Admin.can_issue_tokens());
    assert!(!Role::Deployer.can_issue_tokens());
}
