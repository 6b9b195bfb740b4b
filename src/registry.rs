//! Known entity registry: well-known Chilean norms keyed by idNorma.
//!
//! The [`KnownEntityRegistry`] is an arena of [`LegalNorm`] records with three
//! indexes into it: by identifier, by normalized common name and by law
//! number. It is built once (from the bundled table plus an optional
//! user-supplied file) and is read-only afterwards, so it can be shared
//! across requests behind an `Arc` without locking.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};
use crate::lexicon;

/// Norm table compiled into the binary.
const BUNDLED_NORMS: &str = include_str!("../data/norms.toml");

/// The kind of a legal norm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormKind {
    Constitution,
    Code,
    Law,
    Decree,
    /// A bill ("proyecto de ley"), not yet enacted.
    BillOfLaw,
}

impl std::fmt::Display for NormKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constitution => write!(f, "Constitución"),
            Self::Code => write!(f, "Código"),
            Self::Law => write!(f, "Ley"),
            Self::Decree => write!(f, "Decreto"),
            Self::BillOfLaw => write!(f, "Proyecto de ley"),
        }
    }
}

/// One piece of legislation with a stable LeyChile identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalNorm {
    /// LeyChile idNorma. Never 0.
    pub identifier: u64,
    /// Names users refer to the norm by. The first one is used for display.
    pub common_names: Vec<String>,
    pub kind: NormKind,
    /// Official law number without separators ("19628"), if it has one.
    #[serde(default)]
    pub law_number: Option<String>,
}

impl LegalNorm {
    /// Display name of the norm.
    pub fn name(&self) -> &str {
        self.common_names.first().map(String::as_str).unwrap_or_default()
    }
}

/// Outcome of resolving request keywords against the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// Exactly one norm matches best.
    Unique(&'a LegalNorm),
    /// Several norms match equally well.
    Ambiguous(Vec<&'a LegalNorm>),
    /// No norm matches.
    Unresolved,
}

#[derive(Debug, Deserialize)]
struct NormTable {
    #[serde(default)]
    norms: Vec<LegalNorm>,
}

/// Immutable table of well-known norms.
#[derive(Debug, Clone)]
pub struct KnownEntityRegistry {
    norms: Vec<LegalNorm>,
    by_id: HashMap<u64, usize>,
    by_name: HashMap<String, usize>,
    by_law_number: HashMap<String, usize>,
    /// (norm index, keyword tokens of one common name)
    name_tokens: Vec<(usize, Vec<String>)>,
}

impl KnownEntityRegistry {
    /// Build a registry, checking every invariant of the table.
    pub fn from_norms(norms: Vec<LegalNorm>) -> RegistryResult<Self> {
        let mut by_id = HashMap::with_capacity(norms.len());
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut by_law_number: HashMap<String, usize> = HashMap::new();
        let mut name_tokens = Vec::new();

        for (idx, norm) in norms.iter().enumerate() {
            if norm.identifier == 0 {
                return Err(RegistryError::InvalidIdentifier {
                    name: norm.name().to_string(),
                });
            }
            if norm.common_names.iter().all(|n| n.trim().is_empty()) {
                return Err(RegistryError::MissingName {
                    identifier: norm.identifier,
                });
            }
            if by_id.insert(norm.identifier, idx).is_some() {
                return Err(RegistryError::DuplicateIdentifier {
                    identifier: norm.identifier,
                });
            }
            for name in norm.common_names.iter().filter(|n| !n.trim().is_empty()) {
                let key = lexicon::normalize(name.trim());
                if let Some(&existing) = by_name.get(&key) {
                    if existing != idx {
                        return Err(RegistryError::DuplicateName {
                            name: name.clone(),
                            existing: norms[existing].identifier,
                            identifier: norm.identifier,
                        });
                    }
                    continue;
                }
                by_name.insert(key, idx);
                let tokens = lexicon::extract_keywords(name);
                if !tokens.is_empty() {
                    name_tokens.push((idx, tokens));
                }
            }
            if let Some(number) = &norm.law_number {
                let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
                if digits.is_empty() {
                    continue;
                }
                if let Some(&existing) = by_law_number.get(&digits) {
                    return Err(RegistryError::DuplicateLawNumber {
                        number: number.clone(),
                        existing: norms[existing].identifier,
                        identifier: norm.identifier,
                    });
                }
                by_law_number.insert(digits, idx);
            }
        }

        Ok(Self {
            norms,
            by_id,
            by_name,
            by_law_number,
            name_tokens,
        })
    }

    /// Parse a TOML norm table (`[[norms]]` entries).
    pub fn from_toml(source: &str) -> RegistryResult<Self> {
        Self::from_norms(parse_table(source)?)
    }

    /// The registry compiled into the binary.
    pub fn bundled() -> RegistryResult<Self> {
        Self::from_toml(BUNDLED_NORMS)
    }

    /// The bundled registry extended with the norms in `path`.
    pub fn bundled_with_file(path: &Path) -> RegistryResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RegistryError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut norms = parse_table(BUNDLED_NORMS)?;
        norms.extend(parse_table(&content)?);
        Self::from_norms(norms)
    }

    /// Look up a norm by identifier.
    pub fn get(&self, identifier: u64) -> Option<&LegalNorm> {
        self.by_id.get(&identifier).map(|&idx| &self.norms[idx])
    }

    /// Whether `identifier` is a known norm.
    pub fn contains(&self, identifier: u64) -> bool {
        self.by_id.contains_key(&identifier)
    }

    /// Look up a norm by one of its common names (case- and accent-insensitive).
    pub fn lookup_name(&self, name: &str) -> Option<&LegalNorm> {
        let key = lexicon::normalize(name.trim());
        self.by_name.get(&key).map(|&idx| &self.norms[idx])
    }

    /// Look up a norm by law number; separators are ignored ("19.628").
    pub fn lookup_law_number(&self, number: &str) -> Option<&LegalNorm> {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        self.by_law_number.get(&digits).map(|&idx| &self.norms[idx])
    }

    /// Resolve request keywords to a norm.
    ///
    /// A law number right after "ley" wins outright. Otherwise a norm matches
    /// when every keyword of one of its common names is present, and it scores
    /// the number of keywords in that name. The highest score wins; a tie
    /// between different norms is reported as [`Resolution::Ambiguous`].
    pub fn resolve_keywords(&self, keywords: &[String]) -> Resolution<'_> {
        for pair in keywords.windows(2) {
            if matches!(pair[0].as_str(), "ley" | "leyes")
                && pair[1].chars().all(|c| c.is_ascii_digit())
            {
                if let Some(norm) = self.lookup_law_number(&pair[1]) {
                    return Resolution::Unique(norm);
                }
            }
        }

        let mut best_score = 0usize;
        let mut best: Vec<usize> = Vec::new();
        for (idx, tokens) in &self.name_tokens {
            if !tokens.iter().all(|t| keywords.contains(t)) {
                continue;
            }
            let score = tokens.len();
            if score > best_score {
                best_score = score;
                best.clear();
            }
            if score == best_score && !best.contains(idx) {
                best.push(*idx);
            }
        }

        match best.as_slice() {
            [] => Resolution::Unresolved,
            [idx] => Resolution::Unique(&self.norms[*idx]),
            many => Resolution::Ambiguous(many.iter().map(|&i| &self.norms[i]).collect()),
        }
    }

    /// All norms, in table order.
    pub fn norms(&self) -> &[LegalNorm] {
        &self.norms
    }

    /// Number of registered norms.
    pub fn len(&self) -> usize {
        self.norms.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.norms.is_empty()
    }
}

fn parse_table(source: &str) -> RegistryResult<Vec<LegalNorm>> {
    let table: NormTable = toml::from_str(source).map_err(|e| RegistryError::Parse {
        message: e.to_string(),
    })?;
    Ok(table.norms)
}
