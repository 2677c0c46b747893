// [tests/mirror/libs/shared/pharos/pharos_integrity.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE OBSERVABILIDAD (V2.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L6-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE LA IGNICIÓN DEL TRAZADO PHAROS
 * =================================================================
 */

use helmsman_shared_pharos::init_tracing;

/// La ignición del suscriptor global y del hook de pánico es única por
/// proceso; este certificado vive solo en su propio binario de prueba.
#[test]
fn certify_tracing_ignition_is_clean() {
    init_tracing("helmsman_pharos_proving_grounds");

    // Emisión post-ignición: no debe colapsar el proceso.
    tracing::info!("🧪 [PROVING_GROUNDS]: Pharos emission check.");
    tracing::debug!("🧪 [PROVING_GROUNDS]: Debug strata emission check.");
}
