// [libs/infra/search/src/score.rs]
/*!
 * =================================================================
 * APARATO: BASIC MODE SCORING ENGINE (V2.2 - WEIGHTED LADDER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: PUNTUACIÓN PONDERADA PARA EL MODO SIN FTS
 *
 * Escalera de pesos (insensible a mayúsculas):
 *   título prefijo exacto = 3, título frontera de palabra = 2,
 *   título contiene = 2, subtítulo contiene = 1.5,
 *   cuerpo contiene = 1, etiquetas contienen = 0.5.
 * =================================================================
 */

/// Campos puntuables de un documento del índice.
#[derive(Debug, Clone)]
pub struct ScorableDoc<'a> {
    pub title: &'a str,
    pub subtitle: &'a str,
    pub body: &'a str,
    pub tags: &'a str,
}

/**
 * Puntúa un documento contra la consulta en modo básico.
 * Retorna 0.0 cuando ningún campo contiene la consulta.
 */
pub fn score_basic(document: &ScorableDoc<'_>, raw_query: &str) -> f64 {
    let query = raw_query.trim().to_lowercase();
    if query.is_empty() {
        return 0.0;
    }

    let title = document.title.to_lowercase();
    let subtitle = document.subtitle.to_lowercase();
    let body = document.body.to_lowercase();
    let tags = document.tags.to_lowercase();

    let mut score = 0.0;

    if title.starts_with(&query) {
        score += 3.0;
    } else if title_word_boundary(&title, &query) {
        score += 2.0;
    } else if title.contains(&query) {
        score += 2.0;
    }

    if subtitle.contains(&query) {
        score += 1.5;
    }
    if body.contains(&query) {
        score += 1.0;
    }
    if tags.contains(&query) {
        score += 0.5;
    }
    score
}

/// Coincidencia anclada al inicio de una palabra del título.
fn title_word_boundary(title: &str, query: &str) -> bool {
    title
        .split(|symbol: char| !symbol.is_alphanumeric())
        .any(|word| word.starts_with(query))
}
