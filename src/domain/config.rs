use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for parsing and coloring identifiers.
///
/// Holds the grammar's delimiters, the choice of coloring strategy and the
/// tunables of each strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Versions", into = "Versions")]
pub struct Config {
    /// Delimiters and brackets of the identifier notation.
    pub grammar: Grammar,

    /// Which backend assigns colors.
    pub strategy: Strategy,

    /// How version colorspaces are pooled by the ordinal strategy.
    pub versions: VersionsMode,

    /// Saturation factor applied once per level of clarification.
    decay: f64,

    /// Salt appended to every value hashed by the digest strategy.
    pub salt: String,

    /// Saturation window of the digest strategy.
    saturation: Bounds,

    /// Value (brightness) window of the digest strategy.
    value: Bounds,

    /// Number of spaces added on each side of a rendered identifier.
    pub padding: usize,

    /// Whether links to identifiers that are never defined are rendered
    /// instead of rejected.
    pub allow_undefined: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grammar: Grammar::default(),
            strategy: Strategy::default(),
            versions: VersionsMode::default(),
            decay: default_decay(),
            salt: String::new(),
            saturation: Bounds::DEFAULT_SATURATION,
            value: Bounds::DEFAULT_VALUE,
            padding: default_padding(),
            allow_undefined: false,
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, if the TOML content is
    /// invalid, or if a value is out of range.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Returns the clarification saturation decay.
    #[must_use]
    pub const fn decay(&self) -> f64 {
        self.decay
    }

    /// Sets the clarification saturation decay.
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 < decay <= 1`.
    pub fn set_decay(&mut self, decay: f64) -> Result<(), Error> {
        self.decay = check_decay(decay)?;
        Ok(())
    }

    /// Returns the digest strategy's saturation window.
    #[must_use]
    pub const fn saturation(&self) -> Bounds {
        self.saturation
    }

    /// Returns the digest strategy's value window.
    #[must_use]
    pub const fn value(&self) -> Bounds {
        self.value
    }

    /// Sets the digest strategy's saturation window.
    pub const fn set_saturation(&mut self, bounds: Bounds) {
        self.saturation = bounds;
    }

    /// Sets the digest strategy's value window.
    pub const fn set_value(&mut self, bounds: Bounds) {
        self.value = bounds;
    }
}

/// Delimiters and brackets of the identifier notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Grammar {
    /// Joins refinements to their base, `.` by default.
    pub clarification: char,
    /// Joins version steps to their base, `-` by default.
    pub version: char,
    /// Joins alternatives, `/` by default.
    pub answer: char,
    /// Opens a group, `(` by default.
    pub open: char,
    /// Closes a group, `)` by default.
    pub close: char,
}

impl Default for Grammar {
    fn default() -> Self {
        Self {
            clarification: '.',
            version: '-',
            answer: '/',
            open: '(',
            close: ')',
        }
    }
}

impl Grammar {
    /// All five symbols, in declaration order.
    #[must_use]
    pub const fn symbols(&self) -> [char; 5] {
        [
            self.clarification,
            self.version,
            self.answer,
            self.open,
            self.close,
        ]
    }

    /// Characters of the bold marker syntax, `**payload**` with an optional
    /// trailing `:`.
    pub const RESERVED: [char; 2] = ['*', ':'];

    /// Checks that the symbols are distinct ASCII punctuation outside
    /// [`Self::RESERVED`].
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending symbol.
    pub fn validate(&self) -> Result<(), Error> {
        let symbols = self.symbols();
        for (i, symbol) in symbols.iter().enumerate() {
            if !symbol.is_ascii_punctuation() {
                return Err(Error::Symbol(*symbol));
            }
            if Self::RESERVED.contains(symbol) {
                return Err(Error::ReservedSymbol(*symbol));
            }
            if symbols[..i].contains(symbol) {
                return Err(Error::DuplicateSymbol(*symbol));
            }
        }
        Ok(())
    }
}

/// Available coloring strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Hues are ordinals within colorspaces derived from the whole document.
    #[default]
    Ordinal,
    /// Colors are derived from a SHA-256 digest of each value.
    Digest,
}

/// How the ordinal strategy pools the trailing elements of versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionsMode {
    /// One colorspace per distinct prefix.
    #[default]
    Many,
    /// One colorspace per leading root, whatever the rest of the prefix.
    One,
    /// A single colorspace for every version step in the document.
    Shared,
}

/// A closed, non-degenerate sub-range of `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    min: f64,
    max: f64,
}

impl Bounds {
    const DEFAULT_SATURATION: Self = Self {
        min: 0.25,
        max: 0.7,
    };
    const DEFAULT_VALUE: Self = Self {
        min: 0.6,
        max: 0.95,
    };

    /// Creates a window from `min` to `max`.
    ///
    /// # Errors
    ///
    /// Returns an error if either end lies outside `[0, 1]` or if
    /// `min >= max`.
    pub fn new(min: f64, max: f64) -> Result<Self, Error> {
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) || min >= max {
            return Err(Error::Bounds { min, max });
        }
        Ok(Self { min, max })
    }

    /// Lower end.
    #[must_use]
    pub const fn min(self) -> f64 {
        self.min
    }

    /// Upper end.
    #[must_use]
    pub const fn max(self) -> f64 {
        self.max
    }

    /// Maps `fraction` in `[0, 1]` linearly onto the window.
    #[must_use]
    pub fn lerp(self, fraction: f64) -> f64 {
        fraction.mul_add(self.max - self.min, self.min)
    }
}

/// A structurally invalid configuration.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A delimiter or bracket is not ASCII punctuation.
    #[error("invalid grammar symbol '{0}': must be ASCII punctuation")]
    Symbol(char),

    /// The same character is configured for two roles.
    #[error("grammar symbol '{0}' is used more than once")]
    DuplicateSymbol(char),

    /// A symbol is part of the document marker syntax.
    #[error("grammar symbol '{0}' is reserved for identifier markers")]
    ReservedSymbol(char),

    /// A color window is empty or leaves `[0, 1]`.
    #[error("invalid color bounds [{min}, {max}]: need 0 <= min < max <= 1")]
    Bounds {
        /// Configured lower end.
        min: f64,
        /// Configured upper end.
        max: f64,
    },

    /// The clarification decay is outside `(0, 1]`.
    #[error("invalid clarification decay {0}: need 0 < decay <= 1")]
    Decay(f64),
}

fn check_decay(decay: f64) -> Result<f64, Error> {
    if decay > 0.0 && decay <= 1.0 {
        Ok(decay)
    } else {
        Err(Error::Decay(decay))
    }
}

const fn default_decay() -> f64 {
    0.57
}

const fn default_padding() -> usize {
    1
}

const fn default_saturation() -> (f64, f64) {
    (Bounds::DEFAULT_SATURATION.min, Bounds::DEFAULT_SATURATION.max)
}

const fn default_value() -> (f64, f64) {
    (Bounds::DEFAULT_VALUE.min, Bounds::DEFAULT_VALUE.max)
}

fn default_grammar() -> Grammar {
    Grammar::default()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        strategy: Strategy,

        #[serde(default)]
        versions: VersionsMode,

        #[serde(default = "default_decay")]
        decay: f64,

        #[serde(default, skip_serializing_if = "String::is_empty")]
        salt: String,

        /// `[min, max]` saturation of the digest strategy.
        #[serde(default = "default_saturation")]
        saturation: (f64, f64),

        /// `[min, max]` value of the digest strategy.
        #[serde(default = "default_value")]
        value: (f64, f64),

        #[serde(default = "default_padding")]
        padding: usize,

        #[serde(default)]
        allow_undefined: bool,

        #[serde(default = "default_grammar")]
        grammar: Grammar,
    },
}

impl TryFrom<Versions> for Config {
    type Error = Error;

    fn try_from(versions: Versions) -> Result<Self, Self::Error> {
        match versions {
            Versions::V1 {
                grammar,
                strategy,
                versions,
                decay,
                salt,
                saturation,
                value,
                padding,
                allow_undefined,
            } => {
                grammar.validate()?;
                Ok(Self {
                    grammar,
                    strategy,
                    versions,
                    decay: check_decay(decay)?,
                    salt,
                    saturation: Bounds::new(saturation.0, saturation.1)?,
                    value: Bounds::new(value.0, value.1)?,
                    padding,
                    allow_undefined,
                })
            }
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            grammar: config.grammar,
            strategy: config.strategy,
            versions: config.versions,
            decay: config.decay,
            salt: config.salt,
            saturation: (config.saturation.min, config.saturation.max),
            value: (config.value.min, config.value.max),
            padding: config.padding,
            allow_undefined: config.allow_undefined,
        }
    }
}
