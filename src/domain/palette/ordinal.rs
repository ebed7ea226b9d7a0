use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use tracing::debug;

use super::{Color, Error, Palette, Target, refine};
use crate::domain::{
    config::VersionsMode,
    thesis::{Part, Version},
};

/// A finite, sorted set of members, each mapped to an evenly spaced hue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colorspace<T> {
    members: Vec<T>,
}

impl<T: Ord> Colorspace<T> {
    /// Collects the distinct members, in ascending order.
    #[must_use]
    pub fn new(members: impl IntoIterator<Item = T>) -> Self {
        Self {
            members: members
                .into_iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        }
    }

    /// Number of distinct members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The members in ascending order.
    #[must_use]
    pub fn members(&self) -> &[T] {
        &self.members
    }

    /// `index / len` for the member's position, or `None` for non-members.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hue(&self, member: &T) -> Option<f64> {
        let index = self.members.binary_search(member).ok()?;
        Some(index as f64 / self.members.len() as f64)
    }
}

/// Which version steps share a colorspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Prefix(String),
    Root(String),
    Shared,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Prefix(prefix) => write!(f, "versions of {prefix}"),
            Self::Root(root) => write!(f, "versions under {root}"),
            Self::Shared => write!(f, "all versions"),
        }
    }
}

/// Number of leading steps of a version that share the colorspace of its
/// base in [`VersionsMode::Many`].
const POOLED_STEPS: usize = 2;

/// Canonical form of the context that a version's step at `index` extends.
///
/// The first [`POOLED_STEPS`] steps extend the base itself, so they are
/// ranked against each other; later steps extend everything before them.
fn context(version: &Version, index: usize) -> String {
    if index < POOLED_STEPS {
        version.prefix(0)
    } else {
        version.prefix(index)
    }
}

/// One trailing element of a version, with the context it extends.
#[derive(Debug, Clone)]
struct Step {
    /// See [`context`].
    prefix: String,
    /// Leftmost root of the version.
    root: String,
    tail: Part,
}

/// Colors elements by their rank among everything of the same kind in the
/// document.
///
/// Bases (fundamental atoms and lowercase roots) are ranked by their root's
/// letters among all such roots. A version step is ranked among the steps
/// that share its colorspace, as selected by [`VersionsMode`]. Refinements
/// keep their base's hue and lose saturation with depth.
pub struct OrdinalPalette {
    bases: Colorspace<String>,
    steps: Vec<Step>,
    mode: VersionsMode,
    decay: f64,
    versions: Mutex<HashMap<Key, Arc<Colorspace<Part>>>>,
}

impl OrdinalPalette {
    /// Saturation of every ordinal color.
    pub const SATURATION: f64 = 0.35;
    /// Value (brightness) of every ordinal color.
    pub const VALUE: f64 = 0.78;

    /// Builds the palette from the document's base roots and versions.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no base roots.
    pub fn new<'v>(
        bases: impl IntoIterator<Item = String>,
        versions: impl IntoIterator<Item = &'v Version>,
        mode: VersionsMode,
        decay: f64,
    ) -> Result<Self, Error> {
        let bases = Colorspace::new(bases);
        if bases.is_empty() {
            return Err(Error::EmptyColorspace("roots".to_string()));
        }
        let steps: Vec<Step> = versions
            .into_iter()
            .flat_map(|version| {
                let root = version.first().leading_root();
                version
                    .other()
                    .iter()
                    .enumerate()
                    .map(move |(index, tail)| Step {
                        prefix: context(version, index),
                        root: root.clone(),
                        tail: tail.clone(),
                    })
            })
            .collect();
        debug!(
            roots = bases.len(),
            steps = steps.len(),
            ?mode,
            "built ordinal palette"
        );
        Ok(Self {
            bases,
            steps,
            mode,
            decay,
            versions: Mutex::default(),
        })
    }

    /// The colorspace of base roots.
    #[must_use]
    pub const fn bases(&self) -> &Colorspace<String> {
        &self.bases
    }

    fn key(&self, prefix: &str, root: &str) -> Key {
        match self.mode {
            VersionsMode::Many => Key::Prefix(prefix.to_string()),
            VersionsMode::One => Key::Root(root.to_string()),
            VersionsMode::Shared => Key::Shared,
        }
    }

    /// The colorspace for `key`, computed on first use.
    fn colorspace(&self, key: &Key) -> Result<Arc<Colorspace<Part>>, Error> {
        let mut cache = self.versions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(space) = cache.get(key) {
            return Ok(Arc::clone(space));
        }
        let space = Colorspace::new(
            self.steps
                .iter()
                .filter(|step| &self.key(&step.prefix, &step.root) == key)
                .map(|step| step.tail.clone()),
        );
        if space.is_empty() {
            return Err(Error::EmptyColorspace(key.to_string()));
        }
        let space = Arc::new(space);
        cache.insert(key.clone(), Arc::clone(&space));
        Ok(space)
    }
}

impl fmt::Debug for OrdinalPalette {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("OrdinalPalette")
            .field("bases", &self.bases)
            .field("steps", &self.steps.len())
            .field("mode", &self.mode)
            .field("decay", &self.decay)
            .finish_non_exhaustive()
    }
}

impl Palette for OrdinalPalette {
    fn color(&self, target: Target<'_>) -> Result<Color, Error> {
        match target {
            Target::Base(term) => {
                let root = term.leading_root();
                let hue = self.bases.hue(&root).ok_or_else(|| Error::Uncolored {
                    member: root.clone(),
                    colorspace: "roots".to_string(),
                })?;
                Ok(Color::new(hue, Self::SATURATION, Self::VALUE))
            }
            Target::VersionStep { version, index } => {
                let tail = version.other().get(index).ok_or_else(|| Error::Uncolored {
                    member: format!("step {index}"),
                    colorspace: version.to_string(),
                })?;
                let key = self.key(&context(version, index), &version.first().leading_root());
                let space = self.colorspace(&key)?;
                let hue = space.hue(tail).ok_or_else(|| Error::Uncolored {
                    member: tail.to_string(),
                    colorspace: key.to_string(),
                })?;
                Ok(Color::new(hue, Self::SATURATION, Self::VALUE))
            }
            Target::Refinement { base, depth } => Ok(refine(base, self.decay, depth)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        parser::Parser,
        thesis::{Term, Thesis},
    };

    fn version(thesis: &Thesis) -> &Version {
        match thesis.value() {
            Term::Version(version) => version.as_ref(),
            other => panic!("expected a version, got {other}"),
        }
    }

    fn hue(palette: &OrdinalPalette, target: Target<'_>) -> f64 {
        palette.color(target).unwrap().hue
    }

    #[test]
    fn hues_are_evenly_spaced_in_lexical_order() {
        let parser = Parser::default();
        let palette = OrdinalPalette::new(
            ["C", "A", "B"].map(String::from),
            [],
            VersionsMode::Many,
            0.57,
        )
        .unwrap();

        for (name, expected) in [("A", 0.0), ("B", 1.0 / 3.0), ("C", 2.0 / 3.0)] {
            let thesis = parser.parse(name).unwrap();
            let actual = hue(&palette, Target::Base(thesis.value()));
            assert!((actual - expected).abs() < 1e-12, "{name}: {actual}");
        }
    }

    #[test]
    fn hues_are_distinct_and_below_one() {
        let space = Colorspace::new((0..17).map(|i| format!("R{i:02}")));
        let hues: Vec<f64> = space
            .members()
            .iter()
            .map(|m| space.hue(m).unwrap())
            .collect();
        assert!(hues.iter().all(|h| (0.0..1.0).contains(h)));
        assert!(hues.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn atoms_share_their_roots_hue() {
        let parser = Parser::default();
        let palette =
            OrdinalPalette::new(["A", "B"].map(String::from), [], VersionsMode::Many, 0.57)
                .unwrap();
        let a1 = parser.parse("A1").unwrap();
        let a2 = parser.parse("A2").unwrap();
        assert_eq!(
            palette.color(Target::Base(a1.value())),
            palette.color(Target::Base(a2.value()))
        );
    }

    #[test]
    fn empty_roots_are_rejected() {
        let result = OrdinalPalette::new(Vec::new(), [], VersionsMode::Many, 0.57);
        assert!(matches!(result, Err(Error::EmptyColorspace(_))));
    }

    #[test]
    fn unknown_root_is_uncolored() {
        let parser = Parser::default();
        let palette =
            OrdinalPalette::new(["A"].map(String::from), [], VersionsMode::Many, 0.57).unwrap();
        let thesis = parser.parse("Z").unwrap();
        assert!(matches!(
            palette.color(Target::Base(thesis.value())),
            Err(Error::Uncolored { .. })
        ));
    }

    fn corpus(parser: &Parser) -> Vec<Arc<Thesis>> {
        ["R-a", "R-b", "R-a-x", "S-c"]
            .into_iter()
            .map(|text| parser.parse(text).unwrap())
            .collect()
    }

    fn palette(theses: &[Arc<Thesis>], mode: VersionsMode) -> OrdinalPalette {
        OrdinalPalette::new(
            ["R", "S"].map(String::from),
            theses.iter().flat_map(|thesis| thesis.value().versions()),
            mode,
            0.57,
        )
        .unwrap()
    }

    #[test]
    fn many_mode_pools_the_first_steps_by_base() {
        let parser = Parser::default();
        let theses = corpus(&parser);
        let palette = palette(&theses, VersionsMode::Many);

        let rb = version(&theses[1]);
        let b = hue(&palette, Target::VersionStep { version: rb, index: 0 });
        assert!((b - 1.0 / 3.0).abs() < 1e-12, "{b}");

        let rax = version(&theses[2]);
        assert!(hue(&palette, Target::VersionStep { version: rax, index: 0 }).abs() < 1e-12);
        let x = hue(&palette, Target::VersionStep { version: rax, index: 1 });
        assert!((x - 2.0 / 3.0).abs() < 1e-12, "{x}");
    }

    #[test]
    fn chained_steps_of_a_lone_version_differ() {
        let parser = Parser::default();
        let theses = vec![parser.parse("A1-x-y").unwrap()];
        let palette = OrdinalPalette::new(
            ["A"].map(String::from),
            theses.iter().flat_map(|thesis| thesis.value().versions()),
            VersionsMode::Many,
            0.57,
        )
        .unwrap();
        let axy = version(&theses[0]);
        let x = palette.color(Target::VersionStep { version: axy, index: 0 }).unwrap();
        let y = palette.color(Target::VersionStep { version: axy, index: 1 }).unwrap();
        assert_ne!(x, y);
    }

    #[test]
    fn later_steps_are_keyed_by_their_full_prefix() {
        let parser = Parser::default();
        let theses: Vec<_> = ["A1-x-y-z", "A1-x-y-w", "A1-q-y-v"]
            .into_iter()
            .map(|text| parser.parse(text).unwrap())
            .collect();
        let palette = OrdinalPalette::new(
            ["A"].map(String::from),
            theses.iter().flat_map(|thesis| thesis.value().versions()),
            VersionsMode::Many,
            0.57,
        )
        .unwrap();

        let z = hue(&palette, Target::VersionStep { version: version(&theses[0]), index: 2 });
        assert!((z - 0.5).abs() < 1e-12, "{z}");
        let v = hue(&palette, Target::VersionStep { version: version(&theses[2]), index: 2 });
        assert!(v.abs() < 1e-12, "{v}");
    }

    #[test]
    fn version_colorspaces_are_built_once() {
        let parser = Parser::default();
        let theses = corpus(&parser);
        let palette = palette(&theses, VersionsMode::Many);

        let rb = version(&theses[1]);
        let rax = version(&theses[2]);
        palette.color(Target::VersionStep { version: rb, index: 0 }).unwrap();
        palette.color(Target::VersionStep { version: rax, index: 1 }).unwrap();

        let key = Key::Prefix("R".to_string());
        let first = palette.colorspace(&key).unwrap();
        let second = palette.colorspace(&key).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(palette.versions.lock().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_lookups_share_one_colorspace() {
        let parser = Parser::default();
        let theses = corpus(&parser);
        let palette = palette(&theses, VersionsMode::One);
        let key = Key::Root("R".to_string());

        let spaces: Vec<Arc<Colorspace<Part>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| palette.colorspace(&key).unwrap()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });
        assert!(spaces.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(spaces[0].len(), 3);
    }

    #[test]
    fn one_mode_pools_by_leading_root() {
        let parser = Parser::default();
        let theses = corpus(&parser);
        let palette = palette(&theses, VersionsMode::One);

        let rax = version(&theses[2]);
        let x = hue(&palette, Target::VersionStep { version: rax, index: 1 });
        assert!((x - 2.0 / 3.0).abs() < 1e-12, "{x}");

        let sc = version(&theses[3]);
        assert!(hue(&palette, Target::VersionStep { version: sc, index: 0 }).abs() < 1e-12);
    }

    #[test]
    fn shared_mode_pools_everything() {
        let parser = Parser::default();
        let theses = corpus(&parser);
        let palette = palette(&theses, VersionsMode::Shared);

        let sc = version(&theses[3]);
        let c = hue(&palette, Target::VersionStep { version: sc, index: 0 });
        assert!((c - 0.5).abs() < 1e-12, "{c}");
    }

    #[test]
    fn step_outside_corpus_is_rejected() {
        let parser = Parser::default();
        let theses = corpus(&parser);
        let palette = palette(&theses, VersionsMode::Many);
        let stranger = parser.parse("T-q").unwrap();
        assert!(matches!(
            palette.color(Target::VersionStep {
                version: version(&stranger),
                index: 0
            }),
            Err(Error::EmptyColorspace(_))
        ));
    }

    #[test]
    fn refinements_fade() {
        let palette =
            OrdinalPalette::new(["A"].map(String::from), [], VersionsMode::Many, 0.5).unwrap();
        let base = Color::new(0.25, OrdinalPalette::SATURATION, OrdinalPalette::VALUE);
        let refined = palette
            .color(Target::Refinement { base, depth: 2 })
            .unwrap();
        assert!((refined.saturation - OrdinalPalette::SATURATION / 4.0).abs() < 1e-12);
        assert!((refined.hue - 0.25).abs() < f64::EPSILON);
    }
}
