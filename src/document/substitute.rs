//! Rewriting of bold identifiers into colored anchors

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, PoisonError},
};

use tracing::{debug, instrument};

use super::{
    Error,
    registry::{Registry, line_occurrences},
    render::{Anchor, Colored, Style, segments},
};
use crate::domain::{
    Config, DigestPalette, Grammar, OrdinalPalette, Palette, Parser, Strategy,
    palette::Error as PaletteError,
};

/// A markdown document together with everything needed to color its
/// identifiers.
#[derive(Debug)]
pub struct Document {
    text: String,
    registry: Registry,
    /// `None` only when the document contains no identifiers.
    palette: Option<Box<dyn Palette>>,
    grammar: Grammar,
    padding: usize,
    allow_undefined: bool,
    rendered: Mutex<HashMap<String, Arc<Colored>>>,
}

impl Document {
    /// Parses the identifiers of `text` and prepares the configured palette.
    ///
    /// # Errors
    ///
    /// Returns an error if the grammar is invalid, if an identifier fails to
    /// parse, or if the palette cannot be built.
    #[instrument(level = "debug", skip_all)]
    pub fn new(text: impl Into<String>, config: &Config) -> Result<Self, Error> {
        let text = text.into();
        let parser = Parser::new(config.grammar)?;
        let registry = Registry::from_text(&text, &parser)?;
        let palette = if registry.is_empty() {
            None
        } else {
            Some(palette(&registry, config)?)
        };
        debug!(identifiers = registry.len(), strategy = ?config.strategy, "loaded document");
        Ok(Self {
            text,
            registry,
            palette,
            grammar: config.grammar,
            padding: config.padding,
            allow_undefined: config.allow_undefined,
            rendered: Mutex::default(),
        })
    }

    /// The identifiers found in the document.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The colored rendering of `identifier`, computed once per document.
    ///
    /// # Errors
    ///
    /// Returns an error if `identifier` does not occur in the document or
    /// cannot be colored.
    pub fn colored(&self, identifier: &str) -> Result<Arc<Colored>, Error> {
        let mut rendered = self
            .rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(colored) = rendered.get(identifier) {
            return Ok(Arc::clone(colored));
        }
        let thesis = self
            .registry
            .get(identifier)
            .ok_or_else(|| Error::MissingDefinition(identifier.to_string()))?;
        let palette = self
            .palette
            .as_deref()
            .ok_or_else(|| PaletteError::EmptyColorspace("roots".to_string()))?;
        let colored = Arc::new(Colored::new(
            identifier,
            segments(thesis.value(), palette)?,
            self.padding,
            &self.grammar,
        ));
        rendered.insert(identifier.to_string(), Arc::clone(&colored));
        Ok(colored)
    }

    /// The document with every identifier replaced by its anchor markup.
    ///
    /// Definitions keep their trailing `:` after the markup. Only the first
    /// definition of an identifier becomes its anchor; repeated definitions
    /// link to it. Everything outside the markers, line breaks included, is
    /// left as is.
    ///
    /// # Errors
    ///
    /// Returns an error if an identifier cannot be colored, or if a link
    /// points at an identifier that is never defined and undefined links
    /// are not allowed.
    #[instrument(level = "debug", skip_all)]
    pub fn substitute(&self) -> Result<String, Error> {
        let mut anchored = HashSet::new();
        let lines = self
            .text
            .split('\n')
            .enumerate()
            .map(|(index, line)| self.substitute_line(index, line, &mut anchored))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines.join("\n"))
    }

    fn substitute_line<'a>(
        &self,
        index: usize,
        line: &'a str,
        anchored: &mut HashSet<&'a str>,
    ) -> Result<String, Error> {
        let mut out = String::with_capacity(line.len());
        let mut copied = 0;
        for occurrence in line_occurrences(index, line) {
            let identifier = occurrence.identifier;
            let anchor = if occurrence.definition && anchored.insert(identifier) {
                Anchor::Definition
            } else if occurrence.definition {
                debug!(identifier, line = index, "repeated definition rendered as a link");
                Anchor::Link
            } else {
                if !self.allow_undefined && !self.registry.is_defined(identifier) {
                    return Err(Error::MissingDefinition(identifier.to_string()));
                }
                Anchor::Link
            };
            let class = self
                .registry
                .class(identifier)
                .ok_or_else(|| Error::MissingDefinition(identifier.to_string()))?;

            out.push_str(&line[copied..occurrence.range.start]);
            out.push_str(&self.colored(identifier)?.html(&class, anchor));
            if occurrence.definition {
                out.push(':');
            }
            copied = occurrence.range.end;
        }
        out.push_str(&line[copied..]);
        Ok(out)
    }

    /// One style entry per identifier, in ordinal order.
    ///
    /// # Errors
    ///
    /// Returns an error if an identifier cannot be colored.
    pub fn styles(&self) -> Result<Vec<Style>, Error> {
        self.registry
            .iter()
            .map(|(identifier, _)| {
                Ok(Style {
                    class: self
                        .registry
                        .class(identifier)
                        .ok_or_else(|| Error::MissingDefinition(identifier.to_string()))?,
                    background: self.colored(identifier)?.background(),
                })
            })
            .collect()
    }
}

fn palette(registry: &Registry, config: &Config) -> Result<Box<dyn Palette>, PaletteError> {
    Ok(match config.strategy {
        Strategy::Ordinal => {
            let bases = registry
                .fundamental_roots()
                .into_iter()
                .chain(registry.base_roots())
                .map(str::to_string);
            Box::new(OrdinalPalette::new(
                bases,
                registry.versions(),
                config.versions,
                config.decay(),
            )?)
        }
        Strategy::Digest => Box::new(DigestPalette::from_config(config)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bounds, VersionsMode};

    const SCENARIO: &str = "**DEF**: lalala\nlololo **DEF** lululu";

    #[test]
    fn definitions_and_links_share_a_color() {
        let document = Document::new(SCENARIO, &Config::default()).unwrap();
        assert_eq!(
            document.substitute().unwrap(),
            "<a class='link i0' id='i0'>&nbsp;DEF&nbsp;</a>: lalala\n\
             lololo <a class='link i0' href='#i0'>&nbsp;DEF&nbsp;</a> lululu"
        );
        assert_eq!(
            document.styles().unwrap(),
            vec![Style {
                class: "i0".to_string(),
                background: "rgba(198, 129, 129, 1)".to_string(),
            }]
        );
    }

    #[test]
    fn text_without_identifiers_is_untouched() {
        let text = "# Title\n\nsome *emphasis* and **Важно**\n";
        let document = Document::new(text, &Config::default()).unwrap();
        assert_eq!(document.substitute().unwrap(), text);
        assert!(document.styles().unwrap().is_empty());
    }

    #[test]
    fn line_structure_is_preserved() {
        let text = "\n**A1**: one\n\n  **B2**: two  \n**A1** and **B2**\n";
        let document = Document::new(text, &Config::default()).unwrap();
        let output = document.substitute().unwrap();
        assert_eq!(output.split('\n').count(), text.split('\n').count());
        assert!(output.starts_with('\n'));
        assert!(output.ends_with('\n'));
        assert!(output.contains("  <a class='link i1' id='i1'>&nbsp;B2&nbsp;</a>: two  \n"));
    }

    #[test]
    fn repeated_definitions_link_to_the_first() {
        let text = "**A1**: first\n**A1**: again";
        let output = Document::new(text, &Config::default())
            .unwrap()
            .substitute()
            .unwrap();
        assert_eq!(
            output,
            "<a class='link i0' id='i0'>&nbsp;A1&nbsp;</a>: first\n\
             <a class='link i0' href='#i0'>&nbsp;A1&nbsp;</a>: again"
        );
        assert_eq!(output.matches("id='i0'").count(), 1);
    }

    #[test]
    fn undefined_links_are_rejected() {
        let text = "**A1**: defined\nsee **B2**";
        let error = Document::new(text, &Config::default())
            .unwrap()
            .substitute()
            .unwrap_err();
        assert_eq!(error, Error::MissingDefinition("B2".to_string()));
    }

    #[test]
    fn undefined_links_can_be_allowed() {
        let text = "see **B2**";
        let mut config = Config::default();
        config.allow_undefined = true;
        let output = Document::new(text, &config).unwrap().substitute().unwrap();
        assert_eq!(
            output,
            "see <a class='link i0' href='#i0'>&nbsp;B2&nbsp;</a>"
        );
    }

    #[test]
    fn invalid_identifiers_fail_the_document() {
        let error = Document::new("**A1.**: oops", &Config::default()).unwrap_err();
        assert!(matches!(error, Error::Parse { identifier, .. } if identifier == "A1."));
    }

    #[test]
    fn styles_follow_ordinals() {
        let text = "**C1**: c\n**A1**: a\n**B1-x**: b";
        let document = Document::new(text, &Config::default()).unwrap();
        let classes: Vec<String> = document
            .styles()
            .unwrap()
            .into_iter()
            .map(|style| style.class)
            .collect();
        assert_eq!(classes, vec!["i0", "i1", "i2"]);
        assert!(
            document
                .colored("B1-x")
                .unwrap()
                .background()
                .starts_with("linear-gradient(90deg, ")
        );
    }

    #[test]
    fn renderings_are_memoized() {
        let document = Document::new(SCENARIO, &Config::default()).unwrap();
        let first = document.colored("DEF").unwrap();
        let second = document.colored("DEF").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn digest_strategy_is_independent_of_the_corpus() {
        let mut config = Config::default();
        config.strategy = Strategy::Digest;
        config.set_saturation(Bounds::new(0.3, 0.6).unwrap());

        let alone = Document::new("**A1-x**: a", &config).unwrap();
        let crowded = Document::new("**A1-x**: a\n**B2**: b\n**A1-y**: c", &config).unwrap();
        assert_eq!(
            alone.colored("A1-x").unwrap().background(),
            crowded.colored("A1-x").unwrap().background()
        );
    }

    #[test]
    fn ordinal_strategy_depends_on_the_corpus() {
        let alone = Document::new("**A1-x**: a", &Config::default()).unwrap();
        let crowded =
            Document::new("**A1-x**: a\n**A1-w**: b", &Config::default()).unwrap();
        assert_ne!(
            alone.colored("A1-x").unwrap().background(),
            crowded.colored("A1-x").unwrap().background()
        );
    }

    #[test]
    fn shared_versions_pool_every_tail() {
        let text = "**A1-x**: a\n**B1-y**: b";
        let mut config = Config::default();
        let many = Document::new(text, &config).unwrap();
        config.versions = VersionsMode::Shared;
        let shared = Document::new(text, &config).unwrap();
        assert_ne!(
            many.colored("B1-y").unwrap().segments()[1].color,
            shared.colored("B1-y").unwrap().segments()[1].color
        );
    }

    #[test]
    fn unknown_identifiers_are_reported() {
        let document = Document::new(SCENARIO, &Config::default()).unwrap();
        assert_eq!(
            document.colored("XYZ").unwrap_err(),
            Error::MissingDefinition("XYZ".to_string())
        );
    }
}
