//! Infer named, deduplicated model definitions from JSON samples.
//!
//! Feed one parsed JSON value in, get an ordered sequence of composite type
//! definitions out: inner types are named before the outer types that
//! reference them, structurally identical objects collapse to one canonical
//! name, and near-duplicate siblings can be merged through an injected
//! confirmation callback. Rendering to pydantic source is a separate,
//! replaceable boundary.

pub mod cli;
pub mod error;
pub mod infer;
pub mod render;
