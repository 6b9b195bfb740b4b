//! Text normalization and the legal vocabulary used for triggering.
//!
//! Everything here works on *normalized* text: NFD-decomposed, combining marks
//! dropped, lowercased. "Constitución", "CONSTITUCION" and "constitucion" all
//! normalize to the same string, and "19.628" is tokenized as `19628`.
//!
//! Word lists are plain `const` slices so each rule in [`crate::trigger`] can
//! be read (and tested) against the exact vocabulary it uses.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

// ── Regex patterns ──────────────────────────────────────────────────────

/// "idNorma 172986", "id norma: 172986", "norma N° 242302", "idNorma=172986".
static RE_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:id\s*norma|norma)\s*(?:(?:n[°º]?|nro|num|numero)\.?\s*)?[:=#]?\s*(\d{1,10})\b",
    )
    .unwrap()
});

/// Thousands separator inside a number, as in "19.628".
static RE_THOUSANDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)\.(\d{3})\b").unwrap());

// ── Vocabulary ──────────────────────────────────────────────────────────

/// Spanish legal terms. Without a foreign cue these are read as Chilean law,
/// which is the only legislation this crate serves.
pub const SPANISH_LEGAL_TERMS: &[&str] = &[
    "ley",
    "leyes",
    "decreto",
    "decretos",
    "dfl",
    "constitucion",
    "constitucional",
    "norma",
    "normas",
    "normativa",
    "idnorma",
    "reglamento",
    "reglamentos",
    "legislacion",
    "proyecto",
    "proyectos",
    "boletin",
    "articulo",
    "articulos",
    "inciso",
];

/// "codigo" is legal vocabulary unless the request is about programming.
pub const CODE_TERMS: &[&str] = &["codigo", "codigos"];

/// General legal terms in English. These carry no jurisdiction on their own.
pub const ENGLISH_LEGAL_TERMS: &[&str] = &[
    "law",
    "laws",
    "legal",
    "legislation",
    "statute",
    "statutes",
    "code",
    "codes",
    "contract",
    "contracts",
    "tort",
    "torts",
    "habeas",
    "constitution",
    "constitutional",
    "decree",
    "decrees",
    "regulation",
    "regulations",
    "court",
    "courts",
    "lawsuit",
    "attorney",
    "lawyer",
    "jurisprudence",
];

/// Words that place a request in Chile.
pub const CHILE_CUES: &[&str] = &[
    "chile",
    "chileno",
    "chilena",
    "chilenos",
    "chilenas",
    "chilean",
    "bcn",
    "leychile",
];

/// Single-token foreign jurisdiction cues (normalized).
pub const FOREIGN_CUES: &[&str] = &[
    "argentina",
    "argentino",
    "argentinos",
    "argentinas",
    "argentine",
    "mexico",
    "mexicano",
    "mexicana",
    "mexicanos",
    "mexicanas",
    "mexican",
    "peru",
    "peruano",
    "peruana",
    "peruvian",
    "bolivia",
    "boliviano",
    "boliviana",
    "bolivian",
    "colombia",
    "colombiano",
    "colombiana",
    "colombian",
    "venezuela",
    "venezolano",
    "venezolana",
    "venezuelan",
    "ecuador",
    "ecuatoriano",
    "ecuatoriana",
    "uruguay",
    "uruguayo",
    "uruguaya",
    "paraguay",
    "paraguayo",
    "paraguaya",
    "brasil",
    "brazil",
    "brasileno",
    "brasilena",
    "brazilian",
    "espana",
    "spain",
    "american",
    "estadounidense",
    "eeuu",
    "canada",
    "canadian",
    "francia",
    "france",
    "alemania",
    "germany",
    "aleman",
    "alemana",
    "alemanes",
    "italia",
    "italy",
    "italian",
    "inglaterra",
    "england",
    "british",
    "europea",
    "european",
];

/// Multi-word foreign jurisdiction cues (normalized).
pub const FOREIGN_PHRASES: &[&str] = &[
    "united states",
    "estados unidos",
    "united kingdom",
    "reino unido",
    "union europea",
    "new york",
    "nueva york",
];

/// Case-sensitive abbreviations; lowercase "us" is an English pronoun.
const FOREIGN_ABBREVIATIONS: &[&str] = &["US", "U.S", "U.S.A", "USA", "UK", "EEUU", "EE.UU"];

/// Cues for tasks that are clearly not legal research.
pub const UNRELATED_TASK_CUES: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "java",
    "rust",
    "sql",
    "html",
    "programa",
    "programar",
    "programming",
    "function",
    "funcion",
    "script",
    "compile",
    "debug",
    "summarize",
    "summary",
    "resume",
    "curriculum",
    "cv",
    "translate",
    "traduce",
    "traducir",
    "recipe",
    "receta",
    "email",
];

/// Function words dropped from keywords (Spanish and English).
const STOPWORDS: &[&str] = &[
    "el", "la", "los", "las", "de", "del", "en", "y", "e", "o", "u", "a", "al", "un", "una",
    "unos", "unas", "que", "con", "por", "para", "sobre", "se", "su", "sus", "lo", "es", "son",
    "cual", "cuales", "como", "donde", "cuando", "me", "mi", "mis", "le", "les", "nos", "hay",
    "the", "an", "of", "on", "in", "for", "about", "what", "which", "is", "are", "does", "do",
    "to", "with", "my", "this", "that", "and", "or", "it", "its", "be", "any",
];

/// Request verbs and conversational filler dropped from keywords.
const FILLER: &[&str] = &[
    "busca", "buscar", "busque", "buscame", "muestrame", "muestra", "mostrar", "dime", "dice",
    "dicen", "decir", "necesito", "quiero", "informacion", "info", "regulan", "regula",
    "establece", "establecen", "trata", "habla", "encuentra", "encontrar", "ver", "sabes",
    "explica", "explicame", "vigente", "vigentes", "actual", "search", "find", "show", "tell",
    "say", "says", "explain", "define", "please", "favor",
];

/// English words mapped to the Spanish terms used in BCN titles.
const GLOSSARY: &[(&str, &str)] = &[
    ("law", "ley"),
    ("laws", "leyes"),
    ("code", "codigo"),
    ("constitution", "constitucion"),
    ("decree", "decreto"),
    ("decrees", "decretos"),
    ("labor", "trabajo"),
    ("labour", "trabajo"),
    ("work", "trabajo"),
    ("criminal", "penal"),
    ("commercial", "comercio"),
    ("commerce", "comercio"),
    ("tax", "tributario"),
    ("water", "aguas"),
    ("bill", "proyecto"),
    ("bills", "proyectos"),
    ("data", "datos"),
    ("privacy", "privada"),
    ("environment", "ambiente"),
];

// ── Normalization ───────────────────────────────────────────────────────

/// Lowercase and strip diacritics.
pub fn normalize(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Normalize and split into alphanumeric tokens. Dotted numbers such as
/// "19.628" or "1.143.741" become a single digit token.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut normalized = normalize(text);
    loop {
        let collapsed = RE_THOUSANDS.replace_all(&normalized, "$1$2").into_owned();
        if collapsed == normalized {
            break;
        }
        normalized = collapsed;
    }
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether any token appears in `terms`.
pub fn contains_any(tokens: &[String], terms: &[&str]) -> bool {
    tokens.iter().any(|t| terms.contains(&t.as_str()))
}

// ── Extraction ──────────────────────────────────────────────────────────

/// Extract an explicit norm identifier ("idNorma 172986", "norma 242302").
pub fn find_identifier(text: &str) -> Option<u64> {
    let normalized = normalize(text);
    let caps = RE_IDENTIFIER.captures(&normalized)?;
    let id: u64 = caps.get(1)?.as_str().parse().ok()?;
    (id > 0).then_some(id)
}

/// Return the first foreign-jurisdiction cue in `text`, if any.
pub fn find_foreign_cue(text: &str) -> Option<String> {
    for word in text.split_whitespace() {
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
        if FOREIGN_ABBREVIATIONS.contains(&trimmed) {
            return Some(trimmed.to_string());
        }
    }

    let tokens = tokenize(text);
    if let Some(cue) = tokens.iter().find(|t| FOREIGN_CUES.contains(&t.as_str())) {
        return Some(cue.clone());
    }

    let padded = format!(" {} ", tokens.join(" "));
    FOREIGN_PHRASES
        .iter()
        .find(|phrase| padded.contains(&format!(" {phrase} ")))
        .map(|phrase| phrase.to_string())
}

/// Whether `text` names Chile explicitly.
pub fn has_chile_cue(text: &str) -> bool {
    contains_any(&tokenize(text), CHILE_CUES)
}

/// Content keywords of `text`, in order of appearance and deduplicated.
///
/// Stopwords, request verbs and jurisdiction cues are dropped; English legal
/// words are mapped to their Spanish equivalents. Legal class words ("ley",
/// "proyectos") and numbers are kept: the query builder interprets them.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for token in tokenize(text) {
        if STOPWORDS.contains(&token.as_str())
            || FILLER.contains(&token.as_str())
            || CHILE_CUES.contains(&token.as_str())
        {
            continue;
        }
        if token.len() == 1 && !token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let token = GLOSSARY
            .iter()
            .find(|(en, _)| *en == token)
            .map(|(_, es)| es.to_string())
            .unwrap_or(token);
        if !keywords.contains(&token) {
            keywords.push(token);
        }
    }
    keywords
}

/// Regex source matching `keyword` regardless of accents, for SPARQL `REGEX`.
///
/// Vowels and `n` become character classes with their accented forms; long
/// numbers accept an optional thousands dot ("19628" matches "19.628").
pub fn accent_insensitive_pattern(keyword: &str) -> String {
    if keyword.len() > 3 && keyword.chars().all(|c| c.is_ascii_digit()) {
        let (head, tail) = keyword.split_at(keyword.len() - 3);
        return format!("{head}\\.?{tail}");
    }
    let mut pattern = String::with_capacity(keyword.len() * 3);
    for c in keyword.chars() {
        match c {
            'a' => pattern.push_str("[aá]"),
            'e' => pattern.push_str("[eé]"),
            'i' => pattern.push_str("[ií]"),
            'o' => pattern.push_str("[oó]"),
            'u' => pattern.push_str("[uúü]"),
            'n' => pattern.push_str("[nñ]"),
            c if c.is_alphanumeric() => pattern.push(c),
            _ => {}
        }
    }
    pattern
}
