// [libs/infra/search/src/catalog.rs]
/*!
 * =================================================================
 * APARATO: EMBEDDED CATALOG ENGINE (V3.1 - STATIC STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: PÁGINAS, OPERACIONES Y AYUDA EMBEBIDAS EN EL BINARIO
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. IN-BINARY TRUTH: Las páginas estáticas y el catálogo de operaciones
 *    viven como const; la ayuda viaja como manifiesto + markdown.
 * 2. MARKDOWN DISTILLATION: El extractor despoja front-matter, cabeceras,
 *    sintaxis de enlaces (conservando el texto), código inline y énfasis;
 *    conserva los primeros 3 párrafos.
 * =================================================================
 */

use serde::Deserialize;

/// Entrada estática proyectable al índice.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub entity_id: i64,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub body: String,
    pub tags: String,
    pub url_path: &'static str,
}

/// Catálogo de páginas del dashboard (title, subtitle, url_path, tags).
const STATIC_PAGES: &[(&str, &str, &str, &str)] = &[
    ("Dashboard", "Overview of the platform", "/app/", "page"),
    ("Projects", "Projects and their services", "/app/projects", "page projects"),
    ("Services", "Container services", "/app/services", "page services"),
    ("Routes", "External routes and TLS", "/app/routes", "page routes"),
    ("Domains", "Domain ownership and verification", "/app/domains", "page domains"),
    ("Certificates", "X.509 material", "/app/certificates", "page certificates tls"),
    ("Registries", "Private image registries", "/app/registries", "page registries"),
    ("Settings", "Platform configuration", "/app/settings", "page settings"),
    ("Administration", "Tokens, users and roles", "/app/administration", "page admin"),
    ("Metrics", "Historical host metrics", "/app/metrics", "page metrics"),
    ("Audit Log", "Append-only audit trail", "/app/audit", "page audit"),
];

/// Catálogo de operaciones administrativas navegables.
const OPERATIONS: &[(&str, &str, &str, &str)] = &[
    ("Restart service", "Stop and start a service container", "/app/services", "operation admin"),
    ("Unlock service", "Release a crash-looping service", "/app/services", "operation admin crash-loop"),
    ("Reindex search", "Rebuild the search projection", "/app/settings", "operation admin search"),
    ("Rotate proxy config", "Render and activate a proxy snapshot", "/app/routes", "operation admin proxy"),
    ("Issue certificate", "Request ACME material for a domain", "/app/certificates", "operation admin tls"),
    ("Verify domain", "Run the ownership challenge", "/app/domains", "operation admin domains"),
];

/// Manifiesto embebido de documentos de ayuda.
const HELP_MANIFEST: &str = include_str!("../assets/help_manifest.json");

/// Cuerpos markdown embebidos, alineados con el manifiesto por nombre.
const HELP_BODIES: &[(&str, &str)] = &[
    ("getting-started.md", include_str!("../assets/help/getting-started.md")),
    ("routes-and-tls.md", include_str!("../assets/help/routes-and-tls.md")),
    ("crash-loops.md", include_str!("../assets/help/crash-loops.md")),
    ("search.md", include_str!("../assets/help/search.md")),
];

#[derive(Debug, Deserialize)]
struct HelpManifest {
    documents: Vec<HelpManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct HelpManifestEntry {
    slug: String,
    title: String,
    file: String,
    tags: String,
}

/// Páginas estáticas listas para proyección (entity_id estable por posición).
pub fn static_pages() -> Vec<CatalogEntry> {
    STATIC_PAGES
        .iter()
        .enumerate()
        .map(|(position, (title, subtitle, url_path, tags))| CatalogEntry {
            entity_id: (position + 1) as i64,
            title,
            subtitle,
            body: subtitle.to_string(),
            tags: tags.to_string(),
            url_path,
        })
        .collect()
}

/// Operaciones administrativas listas para proyección.
pub fn operations() -> Vec<CatalogEntry> {
    OPERATIONS
        .iter()
        .enumerate()
        .map(|(position, (title, subtitle, url_path, tags))| CatalogEntry {
            entity_id: (position + 1) as i64,
            title,
            subtitle,
            body: subtitle.to_string(),
            tags: tags.to_string(),
            url_path,
        })
        .collect()
}

/// Documento de ayuda destilado desde el manifiesto embebido.
#[derive(Debug, Clone)]
pub struct HelpEntry {
    pub entity_id: i64,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub tags: String,
}

/// Documentos de ayuda con los cuerpos markdown ya destilados.
pub fn help_documents() -> Vec<HelpEntry> {
    let manifest: HelpManifest = match serde_json::from_str(HELP_MANIFEST) {
        Ok(parsed) => parsed,
        Err(_) => return Vec::new(),
    };

    manifest
        .documents
        .into_iter()
        .enumerate()
        .filter_map(|(position, entry)| {
            let raw_body = HELP_BODIES
                .iter()
                .find(|(file_name, _)| *file_name == entry.file)
                .map(|(_, body)| *body)?;

            Some(HelpEntry {
                entity_id: (position + 1) as i64,
                slug: entry.slug,
                title: entry.title,
                body: distill_markdown(raw_body, 3),
                tags: entry.tags,
            })
        })
        .collect()
}

/**
 * Destila un cuerpo markdown a texto plano.
 *
 * Despoja: front-matter (--- ... ---), cabeceras (#), sintaxis de enlaces
 * [texto](url) conservando el texto, código inline (`x`) y énfasis (*_).
 * Conserva los primeros `paragraph_budget` párrafos.
 */
pub fn distill_markdown(raw_markdown: &str, paragraph_budget: usize) -> String {
    // 1. DESPOJO DE FRONT-MATTER
    let without_front_matter = strip_front_matter(raw_markdown);

    // 2. DESTILACIÓN LÍNEA A LÍNEA
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current_paragraph = String::new();

    for line in without_front_matter.lines() {
        let trimmed = line.trim();

        // Cabeceras fuera; el texto del título ya vive en el manifiesto.
        if trimmed.starts_with('#') {
            continue;
        }

        if trimmed.is_empty() {
            if !current_paragraph.is_empty() {
                paragraphs.push(current_paragraph.clone());
                current_paragraph.clear();
                if paragraphs.len() >= paragraph_budget {
                    break;
                }
            }
            continue;
        }

        let distilled_line = strip_inline_markup(trimmed);
        if !current_paragraph.is_empty() {
            current_paragraph.push(' ');
        }
        current_paragraph.push_str(&distilled_line);
    }

    if !current_paragraph.is_empty() && paragraphs.len() < paragraph_budget {
        paragraphs.push(current_paragraph);
    }

    paragraphs.join("\n\n")
}

fn strip_front_matter(raw_markdown: &str) -> &str {
    let trimmed = raw_markdown.trim_start();
    if let Some(after_open) = trimmed.strip_prefix("---") {
        if let Some(close_position) = after_open.find("\n---") {
            let after_close = &after_open[close_position + 4..];
            return after_close.trim_start_matches('\n');
        }
    }
    raw_markdown
}

/// Despoja enlaces, código inline y énfasis de una línea.
fn strip_inline_markup(line: &str) -> String {
    let mut distilled = String::with_capacity(line.len());
    let mut characters = line.chars().peekable();

    while let Some(symbol) = characters.next() {
        match symbol {
            // [texto](url) -> texto
            '[' => {
                let mut link_text = String::new();
                for inner in characters.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    link_text.push(inner);
                }
                if characters.peek() == Some(&'(') {
                    characters.next();
                    for inner in characters.by_ref() {
                        if inner == ')' {
                            break;
                        }
                    }
                }
                distilled.push_str(&link_text);
            }
            '`' | '*' | '_' => {}
            other => distilled.push(other),
        }
    }
    distilled
}
