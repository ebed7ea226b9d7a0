//! Color assignment for the elements of an identifier.
//!
//! A [`Palette`] answers one question: what color does a given element of a
//! parsed identifier get? Two interchangeable backends implement it:
//!
//! - [`OrdinalPalette`] spreads hues evenly over colorspaces gathered from the
//!   whole document, so the colors present are as far apart as possible.
//! - [`DigestPalette`] derives each color from a SHA-256 digest of the
//!   element's value, so colors never depend on the rest of the document.

use std::fmt;

mod digest;
mod ordinal;

pub use digest::DigestPalette;
pub use ordinal::{Colorspace, OrdinalPalette};

use crate::domain::thesis::{Term, Version};

/// A color in HSV space with an alpha channel, every component in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Hue, in `[0, 1)`.
    pub hue: f64,
    /// Saturation.
    pub saturation: f64,
    /// Value (brightness).
    pub value: f64,
    /// Opacity.
    pub alpha: f64,
}

impl Color {
    /// Creates an opaque color.
    #[must_use]
    pub const fn new(hue: f64, saturation: f64, value: f64) -> Self {
        Self {
            hue,
            saturation,
            value,
            alpha: 1.0,
        }
    }

    /// The same color with its saturation multiplied by `factor`.
    #[must_use]
    pub fn saturated(self, factor: f64) -> Self {
        Self {
            saturation: self.saturation * factor,
            ..self
        }
    }

    /// The color as 8-bit RGB channels. Channels are truncated, not rounded.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::many_single_char_names
    )]
    pub fn rgb(self) -> [u8; 3] {
        let Self {
            hue: h,
            saturation: s,
            value: v,
            ..
        } = self;
        let (r, g, b) = if s == 0.0 {
            (v, v, v)
        } else {
            let sector = (h * 6.0).floor();
            let f = h.mul_add(6.0, -sector);
            let p = v * (1.0 - s);
            let q = v * s.mul_add(-f, 1.0);
            let t = v * s.mul_add(f - 1.0, 1.0);
            match (sector as i64).rem_euclid(6) {
                0 => (v, t, p),
                1 => (q, v, p),
                2 => (p, v, t),
                3 => (p, q, v),
                4 => (t, p, v),
                _ => (v, p, q),
            }
        };
        [r, g, b].map(|channel| (255.0 * channel) as u8)
    }

    /// The color as a CSS `rgba(..)` expression.
    #[must_use]
    pub fn css(self) -> String {
        let [r, g, b] = self.rgb();
        format!("rgba({r}, {g}, {b}, {})", self.alpha)
    }
}

/// An element of a parsed identifier that needs a color.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// A leaf used as a base: a fundamental atom or a lowercase root.
    Base(&'a Term),
    /// The trailing element at `index` of a version chain.
    VersionStep {
        /// The version containing the step.
        version: &'a Version,
        /// Zero-based position within the version's trailing elements.
        index: usize,
    },
    /// The refinement at `depth` (counting from one) of a clarification
    /// whose base is colored `base`.
    Refinement {
        /// Color of the last segment of the clarification's base.
        base: Color,
        /// One for the first refinement, two for the second, and so on.
        depth: usize,
    },
}

/// Assigns colors to the elements of parsed identifiers.
pub trait Palette: fmt::Debug + Send + Sync {
    /// Returns the color of `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the palette has no color for the target.
    fn color(&self, target: Target<'_>) -> Result<Color, Error>;
}

/// Errors raised while assigning colors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// A colorspace has no members, so ordinal hues are undefined.
    #[error("colorspace '{0}' has no members")]
    EmptyColorspace(String),

    /// A value is missing from the colorspace that should contain it.
    #[error("'{member}' is not a member of colorspace '{colorspace}'")]
    Uncolored {
        /// The value that was looked up.
        member: String,
        /// Description of the colorspace.
        colorspace: String,
    },
}

/// Saturation decay shared by both backends: each refinement stays close to
/// its base, and deeper refinements fade further.
fn refine(base: Color, decay: f64, depth: usize) -> Color {
    let exponent = i32::try_from(depth).unwrap_or(i32::MAX);
    base.saturated(decay.powi(exponent))
}
