//! Error types for model inference.

use thiserror::Error;

/// Errors surfaced by the inference engine.
///
/// Any error aborts the whole run: a partially emitted definition stream may
/// reference types that were never defined, so it is never returned.
#[derive(Debug, Clone, Error)]
pub enum InferError {
    /// The classifier met a JSON value it cannot assign a type to.
    #[error("unsupported JSON value under key `{key}`: {detail}")]
    UnsupportedValue { key: String, detail: String },
}
