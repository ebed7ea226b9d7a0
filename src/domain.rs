//! Domain models for structured identifiers.
//!
//! This module contains the identifier syntax tree, the grammar parser, the
//! color palettes and the configuration that ties them together.

/// Syntax tree of parsed identifiers.
pub mod thesis;
pub use thesis::{Span, Term, Thesis};

/// Recursive-descent parser for the identifier grammar.
pub mod parser;
pub use parser::{ParseError, Parser};

mod config;
pub use config::{Bounds, Config, Error as ConfigError, Grammar, Strategy, VersionsMode};

pub mod palette;
pub use palette::{Color, DigestPalette, OrdinalPalette, Palette};
