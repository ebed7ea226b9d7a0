pub mod registry;
/// Segment coloring and HTML rendering of single identifiers.
pub mod render;
mod substitute;

pub use registry::{Occurrence, Registry};
pub use render::{Anchor, Colored, Segment, Style};
pub use substitute::Document;

use crate::domain::{ConfigError, ParseError, palette};

/// Errors raised while processing a document.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A bold span in the document is not a valid identifier.
    #[error("failed to parse identifier '{identifier}'")]
    Parse {
        /// The offending bold payload.
        identifier: String,
        /// Why it was rejected.
        #[source]
        source: ParseError,
    },

    /// No color could be assigned.
    #[error(transparent)]
    Palette(#[from] palette::Error),

    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An identifier is linked to but never defined.
    #[error("identifier '{0}' is referenced but never defined")]
    MissingDefinition(String),
}
