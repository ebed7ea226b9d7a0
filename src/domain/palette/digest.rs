use sha2::{Digest as _, Sha256};

use super::{Color, Error, Palette, Target, refine};
use crate::domain::config::{Bounds, Config};

/// `2^32`, so that hues stay below one.
const HUE_RANGE: f64 = 4_294_967_296.0;

/// Colors elements by hashing their canonical value.
///
/// The color of an element never depends on the rest of the document, so it
/// survives edits elsewhere. Hue covers the whole circle; saturation and
/// value are mapped into configured windows.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestPalette {
    salt: String,
    saturation: Bounds,
    value: Bounds,
    decay: f64,
}

impl DigestPalette {
    /// Creates a palette from its tunables.
    #[must_use]
    pub const fn new(salt: String, saturation: Bounds, value: Bounds, decay: f64) -> Self {
        Self {
            salt,
            saturation,
            value,
            decay,
        }
    }

    /// Creates a palette from the digest settings of `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.salt.clone(),
            config.saturation(),
            config.value(),
            config.decay(),
        )
    }

    /// The color of an arbitrary canonical value.
    #[must_use]
    pub fn digest(&self, value: &str) -> Color {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        hasher.update(self.salt.as_bytes());
        let hash = hasher.finalize();

        let word = |offset: usize| {
            u32::from_be_bytes([
                hash[offset],
                hash[offset + 1],
                hash[offset + 2],
                hash[offset + 3],
            ])
        };
        let hue = f64::from(word(0)) / HUE_RANGE;
        let saturation = self.saturation.lerp(f64::from(word(4)) / f64::from(u32::MAX));
        let value = self.value.lerp(f64::from(word(8)) / f64::from(u32::MAX));
        Color::new(hue, saturation, value)
    }
}

impl Palette for DigestPalette {
    fn color(&self, target: Target<'_>) -> Result<Color, Error> {
        match target {
            Target::Base(term) => Ok(self.digest(&term.leading_root())),
            Target::VersionStep { version, index } => {
                if index >= version.other().len() {
                    return Err(Error::Uncolored {
                        member: format!("step {index}"),
                        colorspace: version.to_string(),
                    });
                }
                Ok(self.digest(&version.prefix(index + 1)))
            }
            Target::Refinement { base, depth } => Ok(refine(base, self.decay, depth)),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::{parser::Parser, thesis::Term};

    fn palette(salt: &str) -> DigestPalette {
        let mut config = Config::default();
        config.salt = salt.to_string();
        DigestPalette::from_config(&config)
    }

    #[test]
    fn same_value_same_color() {
        assert_eq!(palette("").digest("ABC"), palette("").digest("ABC"));
        assert_ne!(palette("").digest("ABC"), palette("").digest("ABD"));
    }

    #[test]
    fn salt_changes_colors() {
        let plain = palette("");
        let salted = palette("pepper");
        let values = ["A", "B", "C", "R-r", "ABC"];
        assert!(
            values
                .iter()
                .any(|value| plain.digest(value) != salted.digest(value))
        );
    }

    #[test_case("A")]
    #[test_case("XYZ")]
    #[test_case("R-r-1")]
    #[test_case("(A/B)-x")]
    fn colors_stay_in_bounds(value: &str) {
        let palette = palette("salt");
        let color = palette.digest(value);
        assert!((0.0..1.0).contains(&color.hue));
        assert!((0.25..=0.7).contains(&color.saturation));
        assert!((0.6..=0.95).contains(&color.value));
        assert!((color.alpha - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn custom_windows_are_respected() {
        let palette = DigestPalette::new(
            String::new(),
            Bounds::new(0.1, 0.2).unwrap(),
            Bounds::new(0.3, 0.4).unwrap(),
            0.57,
        );
        for value in ["a", "b", "c", "d", "e"] {
            let color = palette.digest(value);
            assert!((0.1..=0.2).contains(&color.saturation));
            assert!((0.3..=0.4).contains(&color.value));
        }
    }

    #[test]
    fn bases_hash_their_root() {
        let parser = Parser::default();
        let palette = palette("");
        let thesis = parser.parse("ABC12").unwrap();
        assert_eq!(
            palette.color(Target::Base(thesis.value())).unwrap(),
            palette.digest("ABC")
        );
    }

    #[test]
    fn version_steps_hash_their_prefix() {
        let parser = Parser::default();
        let palette = palette("");
        let thesis = parser.parse("R-a-b").unwrap();
        let Term::Version(version) = thesis.value() else {
            panic!("expected a version");
        };
        assert_eq!(
            palette
                .color(Target::VersionStep {
                    version,
                    index: 0
                })
                .unwrap(),
            palette.digest("R-a")
        );
        assert_eq!(
            palette
                .color(Target::VersionStep {
                    version,
                    index: 1
                })
                .unwrap(),
            palette.digest("R-a-b")
        );
        assert!(
            palette
                .color(Target::VersionStep {
                    version,
                    index: 2
                })
                .is_err()
        );
    }
}
