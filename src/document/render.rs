use serde::Serialize;

use crate::domain::{
    Grammar, Span, Term,
    palette::{self, Color, Palette, Target},
};

/// A colored stretch of an identifier's source text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Byte range within the identifier.
    pub span: Span,
    /// Fill color.
    pub color: Color,
}

/// Colors every element of `term`, left to right.
///
/// The segments tile the term's span exactly: delimiters and brackets take
/// the color of the element after them, and closing brackets at the end take
/// the color of the last element.
///
/// # Errors
///
/// Returns an error if the palette cannot color an element.
pub fn segments(term: &Term, palette: &dyn Palette) -> Result<Vec<Segment>, palette::Error> {
    let mut raw = Vec::new();
    collect(term, palette, &mut raw)?;
    Ok(stretch(raw, term.span()))
}

/// Pushes the segments of `term` and returns the color of the last one.
fn collect(
    term: &Term,
    palette: &dyn Palette,
    out: &mut Vec<Segment>,
) -> Result<Color, palette::Error> {
    match term {
        Term::Number(_) | Term::Root(_) | Term::Atom(_) => {
            let color = palette.color(Target::Base(term))?;
            out.push(Segment {
                span: term.span(),
                color,
            });
            Ok(color)
        }
        Term::Clarification(clarification) => {
            let base = collect(clarification.first(), palette, out)?;
            let mut last = base;
            for (index, part) in clarification.other().iter().enumerate() {
                last = palette.color(Target::Refinement {
                    base,
                    depth: index + 1,
                })?;
                out.push(Segment {
                    span: part.span(),
                    color: last,
                });
            }
            Ok(last)
        }
        Term::Version(version) => {
            let mut last = collect(version.first(), palette, out)?;
            for (index, part) in version.other().iter().enumerate() {
                last = palette.color(Target::VersionStep { version, index })?;
                out.push(Segment {
                    span: part.span(),
                    color: last,
                });
            }
            Ok(last)
        }
        Term::Answer(answer) => {
            let mut last = collect(answer.first(), palette, out)?;
            for alternative in answer.other().iter() {
                last = collect(alternative, palette, out)?;
            }
            Ok(last)
        }
    }
}

/// Widens element segments so they cover `span` without gaps.
fn stretch(raw: Vec<Segment>, span: Span) -> Vec<Segment> {
    let count = raw.len();
    let mut start = span.start;
    raw.into_iter()
        .enumerate()
        .map(|(index, segment)| {
            let end = if index + 1 == count {
                span.end
            } else {
                segment.span.end
            };
            let stretched = Segment {
                span: Span::new(start, end),
                color: segment.color,
            };
            start = end;
            stretched
        })
        .collect()
}

/// How a rendered identifier relates to its definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// The occurrence is the definition and is the target of links.
    Definition,
    /// The occurrence links to the definition.
    Link,
}

/// An identifier ready to be drawn: its text and the colors over it.
#[derive(Debug, Clone, PartialEq)]
pub struct Colored {
    text: String,
    segments: Vec<Segment>,
    padding: usize,
    open: char,
    close: char,
}

impl Colored {
    /// Pairs `text` with its `segments`.
    #[must_use]
    pub fn new(text: &str, segments: Vec<Segment>, padding: usize, grammar: &Grammar) -> Self {
        Self {
            text: text.to_string(),
            segments,
            padding,
            open: grammar.open,
            close: grammar.close,
        }
    }

    /// The source text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The segments over the source text.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The text as drawn: leading open brackets dropped, other brackets
    /// blanked, padded with spaces on both sides.
    #[must_use]
    pub fn display_text(&self) -> String {
        let pad = " ".repeat(self.padding);
        let body: String = self
            .text
            .trim_start_matches(self.open)
            .chars()
            .map(|c| if c == self.open || c == self.close { ' ' } else { c })
            .collect();
        format!("{pad}{body}{pad}")
    }

    fn stripped(&self) -> usize {
        self.text.len() - self.text.trim_start_matches(self.open).len()
    }

    /// Position of a source offset as a percentage of the display width,
    /// rounded to two decimals.
    #[allow(clippy::cast_precision_loss)]
    fn percent(&self, offset: usize) -> f64 {
        let width = self.display_text().chars().count();
        let shifted = (offset + self.padding).saturating_sub(self.stripped());
        let percent = shifted as f64 / width as f64 * 100.0;
        (percent * 100.0).round() / 100.0
    }

    /// The start and end percentage of each segment. The first segment
    /// starts at 0% and the last ends at 100%.
    #[must_use]
    pub fn stops(&self) -> Vec<(f64, f64)> {
        let last = self.segments.len().saturating_sub(1);
        self.segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                let start = if index == 0 {
                    0.0
                } else {
                    self.percent(segment.span.start)
                };
                let end = if index == last {
                    100.0
                } else {
                    self.percent(segment.span.end)
                };
                (start, end)
            })
            .collect()
    }

    /// The CSS background: a solid color for one segment, otherwise a
    /// horizontal gradient with hard stops between segments.
    #[must_use]
    pub fn background(&self) -> String {
        if let [segment] = self.segments.as_slice() {
            return segment.color.css();
        }
        let stops: Vec<String> = self
            .segments
            .iter()
            .zip(self.stops())
            .map(|(segment, (start, end))| {
                let css = segment.color.css();
                format!("{css} {start}%, {css} {end}%")
            })
            .collect();
        format!("linear-gradient(90deg, {})", stops.join(", "))
    }

    /// The identifier as an HTML anchor with the given class.
    ///
    /// Definitions carry the class as their `id`; links point at it.
    #[must_use]
    pub fn html(&self, class: &str, anchor: Anchor) -> String {
        let target = match anchor {
            Anchor::Definition => format!("id='{class}'"),
            Anchor::Link => format!("href='#{class}'"),
        };
        let text = escape(&self.display_text()).replace(' ', "&nbsp;");
        format!("<a class='link {class}' {target}>{text}</a>")
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A stylesheet entry: the background of one identifier class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Style {
    /// The identifier's class, `i` followed by its ordinal.
    pub class: String,
    /// CSS background value.
    pub background: String,
}
