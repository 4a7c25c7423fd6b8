//! Identifier generation.
//!
//! Identifiers are filesystem-safe slugs derived from an entity's seed fields.
//! Collisions get a numeric suffix (`-2`, `-3`, ...); once the numbered budget
//! is spent a few random petname suffixes are tried before giving up.

use crate::config::RepositorySettings;
use crate::error::{StoreError, StoreResult};
use heck::ToKebabCase;
use petname::{Generator, Petnames};
use tracing::debug;

/// Slug used when every seed field is empty.
pub const FALLBACK_SLUG: &str = "untitled";

/// Random suffixes tried after the numbered candidates run out.
const RANDOM_FALLBACKS: usize = 3;

/// Turn free text into a lowercase, dash-separated slug.
///
/// Punctuation is dropped rather than turned into separators, so
/// `"McDonald's"` becomes `mcdonalds`.
pub fn slugify(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();
    cleaned
        .to_kebab_case()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect()
}

/// Derives unique identifiers for new entities.
#[derive(Debug, Clone)]
pub struct IdentifierGenerator {
    max_attempts: usize,
    max_len: usize,
}

impl Default for IdentifierGenerator {
    fn default() -> Self {
        Self::new(100, 64)
    }
}

impl IdentifierGenerator {
    pub fn new(max_attempts: usize, max_len: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            max_len: max_len.max(1),
        }
    }

    pub fn from_settings(settings: &RepositorySettings) -> Self {
        Self::new(settings.max_identifier_attempts, settings.max_identifier_len)
    }

    /// The base slug for a set of seed fields, before collision handling.
    pub fn base_slug<S: AsRef<str>>(&self, seeds: &[S]) -> String {
        let joined = seeds
            .iter()
            .map(|s| slugify(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");

        let truncated: String = joined.chars().take(self.max_len).collect();
        let trimmed = truncated.trim_matches('-');
        if trimmed.is_empty() {
            FALLBACK_SLUG.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Generate an identifier not accepted by `is_taken`.
    pub fn generate<S, F>(&self, seeds: &[S], is_taken: F) -> StoreResult<String>
    where
        S: AsRef<str>,
        F: Fn(&str) -> bool,
    {
        let base = self.base_slug(seeds);
        if !is_taken(&base) {
            return Ok(base);
        }

        for n in 2..=self.max_attempts {
            let candidate = format!("{}-{}", base, n);
            if !is_taken(&candidate) {
                return Ok(candidate);
            }
        }

        debug!(base = %base, attempts = self.max_attempts, "Numbered identifiers exhausted, trying random suffixes");
        let names = Petnames::medium();
        for _ in 0..RANDOM_FALLBACKS {
            let Some(suffix) = names.generate_one(2, "-") else {
                continue;
            };
            let candidate = format!("{}-{}", base, suffix);
            if !is_taken(&candidate) {
                return Ok(candidate);
            }
        }

        Err(StoreError::GenerationExhausted {
            base,
            attempts: self.max_attempts + RANDOM_FALLBACKS,
        })
    }
}

/// Whether `identifier` could have been produced by the generator.
///
/// Rejects anything that could escape the entity directory.
pub fn is_valid_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && !identifier.starts_with('-')
        && identifier.chars().all(|c| c.is_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Engineer"), "engineer");
        assert_eq!(slugify("Senior Rust Engineer"), "senior-rust-engineer");
        assert_eq!(slugify("Acme, Inc."), "acme-inc");
        assert_eq!(slugify("McDonald's"), "mcdonalds");
        assert_eq!(slugify("  spaced   out  "), "spaced-out");
        assert_eq!(slugify("a/b\\c"), "abc");
    }

    #[test]
    fn test_base_slug_joins_seeds() {
        let ids = IdentifierGenerator::default();
        assert_eq!(ids.base_slug(&["Engineer", "Acme"]), "engineer-acme");
        assert_eq!(ids.base_slug(&["Engineer", ""]), "engineer");
        assert_eq!(ids.base_slug(&["", "!!!"]), FALLBACK_SLUG);
    }

    #[test]
    fn test_base_slug_truncates() {
        let ids = IdentifierGenerator::new(10, 8);
        assert_eq!(ids.base_slug(&["Engineer", "Acme"]), "engineer");
        let ids = IdentifierGenerator::new(10, 9);
        assert_eq!(ids.base_slug(&["Engineer", "Acme"]), "engineer");
    }

    #[test]
    fn test_generate_free_base() {
        let ids = IdentifierGenerator::default();
        let id = ids.generate(&["Engineer", "Acme"], |_| false).unwrap();
        assert_eq!(id, "engineer-acme");
    }

    #[test]
    fn test_generate_appends_disambiguator() {
        let ids = IdentifierGenerator::default();
        let taken: HashSet<&str> = ["engineer-acme", "engineer-acme-2"].into_iter().collect();
        let id = ids
            .generate(&["Engineer", "Acme"], |c| taken.contains(c))
            .unwrap();
        assert_eq!(id, "engineer-acme-3");
    }

    #[test]
    fn test_generate_falls_back_to_random_suffix() {
        let ids = IdentifierGenerator::new(3, 64);
        let taken: HashSet<&str> = ["x", "x-2", "x-3"].into_iter().collect();
        let id = ids.generate(&["x"], |c| taken.contains(c)).unwrap();
        assert!(id.starts_with("x-"));
        assert!(!taken.contains(id.as_str()));
        assert!(is_valid_identifier(&id));
    }

    #[test]
    fn test_generate_exhausted() {
        let ids = IdentifierGenerator::new(5, 64);
        let err = ids.generate(&["x"], |_| true).unwrap_err();
        assert!(matches!(err, StoreError::GenerationExhausted { ref base, attempts: 8 } if base == "x"));
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("engineer-acme-2"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("../etc"));
        assert!(!is_valid_identifier("a/b"));
        assert!(!is_valid_identifier("-x"));
    }
}
