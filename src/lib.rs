//! Colored structured identifiers for plain-text documents
//!
//! Identifiers such as `A2.b-c/D` are written in bold (`**A2.b-c/D**`) in a
//! markdown document. This crate parses them, assigns each element a color
//! and rewrites every occurrence into a colored anchor or link.

pub mod domain;
pub use domain::{Config, Parser, Term, Thesis};

/// Identifier discovery, rendering and substitution over whole documents.
pub mod document;
pub use document::{Document, Registry};
