// [libs/infra/search/src/sanitize.rs]
/*!
 * =================================================================
 * APARATO: FTS QUERY SANITIZER (V2.4 - INJECTION SHIELD)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TRADUCCIÓN SEGURA DE ENTRADA LIBRE A SINTAXIS MATCH
 *
 * # Mathematical Proof (Escape Totality):
 * Cada término viaja entre comillas dobles con las comillas internas
 * duplicadas; ninguna entrada del operador puede alterar la gramática
 * MATCH del motor FTS5.
 * =================================================================
 */

/**
 * Traduce la entrada libre del operador a una expresión MATCH de FTS5.
 *
 * - Las comillas embebidas se escapan duplicándolas.
 * - Cada término separado por espacios se convierte en token de prefijo
 *   (`"term"*`) y los términos se combinan con OR.
 * - Entrada vacía retorna None: el llamador lista sin cláusula MATCH
 *   (comportamiento match-all).
 */
pub fn sanitize_match_query(raw_query: &str) -> Option<String> {
    let terms: Vec<String> = raw_query
        .split_whitespace()
        .map(|term| format!("\"{}\"*", term.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" OR "))
}
