//! Definition text blocks and their structural signatures.

use serde::Serialize;
use sha2::{Digest, Sha256};

pub const INDENT: &str = "    ";

/// One emitted field of a composite definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldLine {
    /// Emitted identifier (source key after the identifier policy ran).
    pub ident: String,
    /// Resolved type name of the field value.
    pub type_name: String,
    /// Original source key, when it differs from `ident`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl FieldLine {
    /// Canonical text form; this is what gets hashed and displayed.
    pub fn render(&self) -> String {
        match &self.alias {
            Some(orig) => format!("{}: {} (alias \"{orig}\")", self.ident, self.type_name),
            None => format!("{}: {}", self.ident, self.type_name),
        }
    }
}

/// A named composite type definition, in emission order form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
    pub name: String,
    pub lines: Vec<FieldLine>,
}

impl Definition {
    pub fn body_text(&self) -> String {
        self.lines
            .iter()
            .map(FieldLine::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Header plus indented body, as shown to a human reviewing a merge.
    pub fn text(&self) -> String {
        if self.lines.is_empty() {
            return format!("{}:", self.name);
        }
        let body = self
            .lines
            .iter()
            .map(|l| format!("{INDENT}{}", l.render()))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}:\n{body}", self.name)
    }

    pub fn uses_alias(&self) -> bool {
        self.lines.iter().any(|l| l.alias.is_some())
    }
}

/// Structural signature: content hash of the canonical body text.
///
/// Two objects with identical field-name/type-name sequences (aliases
/// included) produce the same signature and dedup to one canonical name.
pub fn signature(lines: &[FieldLine]) -> [u8; 32] {
    let body = lines
        .iter()
        .map(FieldLine::render)
        .collect::<Vec<_>>()
        .join("\n");
    Sha256::digest(body.as_bytes()).into()
}
