//! Identifier policy and deterministic name ordering.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;

/// Fixed suffix appended to every derived class name.
pub const TYPE_SUFFIX: &str = "Type";

static NON_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("static regex"));

/// Policy turning raw JSON keys into emitted identifiers.
///
/// Leading reserved characters are stripped, anything that would break an
/// identifier is rewritten to `_`, and whenever the result differs from the
/// source key the original is kept as an alias so serialization can map back.
/// The reserved set is pluggable per target serialization convention.
#[derive(Debug, Clone)]
pub struct IdentPolicy {
    reserved: Vec<char>,
}

impl Default for IdentPolicy {
    fn default() -> Self {
        Self { reserved: vec!['_'] }
    }
}

impl IdentPolicy {
    pub fn new(reserved: impl IntoIterator<Item = char>) -> Self {
        Self { reserved: reserved.into_iter().collect() }
    }

    /// Emitted identifier for a key, plus the alias back to the source key
    /// when the two differ.
    pub fn emit_ident(&self, key: &str) -> (String, Option<String>) {
        let stripped = key.trim_start_matches(|c| self.reserved.contains(&c));
        let mut ident = NON_IDENT.replace_all(stripped, "_").into_owned();
        if ident.is_empty() {
            ident = "field".to_string();
        }
        if ident.starts_with(|c: char| c.is_ascii_digit()) {
            ident.insert(0, 'f');
        }
        let alias = (ident != key).then(|| key.to_string());
        (ident, alias)
    }

    /// Base class name for a key: sanitized identifier, first letter
    /// capitalized, plus the fixed type suffix.
    pub fn base_name(&self, key: &str) -> String {
        let (ident, _) = self.emit_ident(key);
        let mut chars = ident.chars();
        match chars.next() {
            Some(head) => format!(
                "{}{}{TYPE_SUFFIX}",
                head.to_ascii_uppercase(),
                chars.as_str()
            ),
            None => TYPE_SUFFIX.to_string(),
        }
    }
}

/// Numeric-aware sort key: alphabetic base plus trailing collision index
/// (absent index = 1). Ensures `Type, Type2, ..., Type10` order numerically
/// and keeps output stable regardless of upstream iteration order.
pub fn sort_key(name: &str) -> (&str, u64) {
    let digits = name.chars().rev().take_while(|c| c.is_ascii_digit()).count();
    let (base, suffix) = name.split_at(name.len() - digits);
    (base, suffix.parse().unwrap_or(1))
}

pub fn cmp_names(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}
