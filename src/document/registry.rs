//! Identifiers discovered in a document
//!
//! An identifier is any bold span (`**...**`) on a single line whose payload
//! contains no Cyrillic letters. A trailing `:` makes the occurrence the
//! identifier's definition; every other occurrence is a link to it.

use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Range,
    sync::{Arc, LazyLock},
};

use regex::Regex;
use tracing::debug;

use super::Error;
use crate::domain::{Parser, Thesis, thesis::Version};

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*([^\p{Cyrillic}]+?)\*\*(:)?").expect("marker pattern is valid")
});

/// One bold identifier in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence<'a> {
    /// Zero-based line number.
    pub line: usize,
    /// Byte range of the whole marker within its line, including the
    /// trailing `:` of a definition.
    pub range: Range<usize>,
    /// The bold payload.
    pub identifier: &'a str,
    /// Whether the marker is followed by `:`.
    pub definition: bool,
}

/// Every identifier occurrence in `text`, line by line.
pub fn occurrences(text: &str) -> impl Iterator<Item = Occurrence<'_>> {
    text.split('\n')
        .enumerate()
        .flat_map(|(index, line)| line_occurrences(index, line))
}

/// The identifier occurrences in a single line.
pub(crate) fn line_occurrences(index: usize, line: &str) -> impl Iterator<Item = Occurrence<'_>> {
    MARKER.captures_iter(line).filter_map(move |captures| {
        let whole = captures.get(0)?;
        let identifier = captures.get(1)?.as_str();
        Some(Occurrence {
            line: index,
            range: whole.range(),
            identifier,
            definition: captures.get(2).is_some(),
        })
    })
}

/// The distinct identifier strings in `text`.
#[must_use]
pub fn extract(text: &str) -> BTreeSet<String> {
    occurrences(text)
        .map(|occurrence| occurrence.identifier.to_string())
        .collect()
}

#[derive(Debug)]
struct Entry {
    ordinal: usize,
    thesis: Arc<Thesis>,
    defined: bool,
}

/// The parsed identifiers of a document, each with a stable ordinal.
///
/// Identifiers are keyed by their literal string: two spellings of the same
/// structure are two identifiers. Ordinals follow the lexical order of the
/// strings.
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<String, Entry>,
}

impl Registry {
    /// Parses every identifier in `text`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first identifier that fails to parse.
    pub fn from_text(text: &str, parser: &Parser) -> Result<Self, Error> {
        let mut defined = BTreeSet::new();
        let mut theses = BTreeMap::new();
        for occurrence in occurrences(text) {
            if occurrence.definition {
                defined.insert(occurrence.identifier);
            }
            if theses.contains_key(occurrence.identifier) {
                continue;
            }
            let thesis = parser
                .parse(occurrence.identifier)
                .map_err(|source| Error::Parse {
                    identifier: occurrence.identifier.to_string(),
                    source,
                })?;
            theses.insert(occurrence.identifier, thesis);
        }

        let entries: BTreeMap<_, _> = theses
            .into_iter()
            .enumerate()
            .map(|(ordinal, (identifier, thesis))| {
                let entry = Entry {
                    ordinal,
                    thesis,
                    defined: defined.contains(identifier),
                };
                (identifier.to_string(), entry)
            })
            .collect();

        debug!(
            identifiers = entries.len(),
            definitions = defined.len(),
            "built registry"
        );
        Ok(Self { entries })
    }

    /// Number of distinct identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the document contains no identifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The parsed form of `identifier`.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&Thesis> {
        self.entries.get(identifier).map(|entry| entry.thesis.as_ref())
    }

    /// The stable ordinal of `identifier`.
    #[must_use]
    pub fn ordinal(&self, identifier: &str) -> Option<usize> {
        self.entries.get(identifier).map(|entry| entry.ordinal)
    }

    /// The CSS class and anchor id of `identifier`, `i` followed by its
    /// ordinal.
    #[must_use]
    pub fn class(&self, identifier: &str) -> Option<String> {
        self.ordinal(identifier).map(|ordinal| format!("i{ordinal}"))
    }

    /// Whether `identifier` has a definition occurrence.
    #[must_use]
    pub fn is_defined(&self, identifier: &str) -> bool {
        self.entries
            .get(identifier)
            .is_some_and(|entry| entry.defined)
    }

    /// Identifiers with their parsed form, in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Thesis)> {
        self.entries
            .iter()
            .map(|(identifier, entry)| (identifier.as_str(), entry.thesis.as_ref()))
    }

    /// Every fundamental root used by any identifier.
    #[must_use]
    pub fn fundamental_roots(&self) -> BTreeSet<&str> {
        self.iter()
            .flat_map(|(_, thesis)| thesis.value().fundamental_roots())
            .collect()
    }

    /// Every lowercase root used as a base or an alternative.
    #[must_use]
    pub fn base_roots(&self) -> BTreeSet<&str> {
        self.iter()
            .flat_map(|(_, thesis)| thesis.value().base_roots())
            .collect()
    }

    /// Every version node of every identifier.
    #[must_use]
    pub fn versions(&self) -> Vec<&Version> {
        self.iter()
            .flat_map(|(_, thesis)| thesis.value().versions())
            .collect()
    }
}
