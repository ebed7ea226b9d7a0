//! Abstract syntax tree of structured identifiers.
//!
//! A structured identifier (a *thesis*) is a small nested notation such as
//! `A2.b-c/D` or `(R-r).1`. Every node is an immutable value carrying the
//! [`Span`] it was parsed from. Spans exist for the renderer only: equality
//! and hashing are structural and ignore them.

use std::{
    cmp::Ordering,
    collections::BTreeSet,
    fmt,
    hash::{Hash, Hasher},
};

use non_empty_string::NonEmptyString;
use nonempty::NonEmpty;

/// A half-open byte range `[start, end)` within the parsed string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Offset of the first byte.
    pub start: usize,
    /// Offset one past the last byte.
    pub end: usize,
}

impl Span {
    /// Creates a span covering `start..end`.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered.
    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    /// Whether the span covers nothing.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }
}

/// Implements `PartialEq`, `Eq` and `Hash` over the listed fields only, so
/// that the `span` field never takes part in comparisons.
macro_rules! structural {
    ($ty:ident { $($field:ident),+ }) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                true $(&& self.$field == other.$field)+
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                $(self.$field.hash(state);)+
            }
        }
    };
}

/// A non-negative integer, e.g. the `2` in `A2`.
#[derive(Debug, Clone)]
pub struct Number {
    value: u64,
    span: Span,
}

structural!(Number { value });

impl Number {
    /// Creates a number node.
    #[must_use]
    pub const fn new(value: u64, span: Span) -> Self {
        Self { value, span }
    }

    /// The integer value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// The source span.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }
}

/// One or more uppercase letters opening a fundamental atom.
#[derive(Debug, Clone)]
pub struct FundamentalRoot {
    value: NonEmptyString,
    span: Span,
}

structural!(FundamentalRoot { value });

impl FundamentalRoot {
    /// Creates a fundamental root node.
    #[must_use]
    pub const fn new(value: NonEmptyString, span: Span) -> Self {
        Self { value, span }
    }

    /// The letters of the root.
    #[must_use]
    pub fn value(&self) -> &str {
        self.value.as_str()
    }

    /// The source span.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }
}

/// One or more lowercase letters.
#[derive(Debug, Clone)]
pub struct Root {
    value: NonEmptyString,
    span: Span,
}

structural!(Root { value });

impl Root {
    /// Creates a root node.
    #[must_use]
    pub const fn new(value: NonEmptyString, span: Span) -> Self {
        Self { value, span }
    }

    /// The letters of the root.
    #[must_use]
    pub fn value(&self) -> &str {
        self.value.as_str()
    }

    /// The source span.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }
}

/// A fundamental root with an optional numeric suffix, e.g. `ABC1234`.
#[derive(Debug, Clone)]
pub struct FundamentalAtom {
    root: FundamentalRoot,
    number: Option<Number>,
    span: Span,
}

structural!(FundamentalAtom { root, number });

impl FundamentalAtom {
    /// Creates an atom node.
    #[must_use]
    pub const fn new(root: FundamentalRoot, number: Option<Number>, span: Span) -> Self {
        Self { root, number, span }
    }

    /// The uppercase root.
    #[must_use]
    pub const fn root(&self) -> &FundamentalRoot {
        &self.root
    }

    /// The numeric suffix, if any.
    #[must_use]
    pub const fn number(&self) -> Option<&Number> {
        self.number.as_ref()
    }

    /// The source span.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }
}

/// A trailing element of a clarification or version chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Part {
    /// A lowercase root, e.g. the `b` in `A.b`.
    Root(Root),
    /// A number, e.g. the `1` in `A.1`.
    Number(Number),
}

impl Part {
    /// The source span.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Root(root) => root.span(),
            Self::Number(number) => number.span(),
        }
    }
}

/// Numbers sort before roots, numbers numerically and roots lexically.
impl Ord for Part {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.value().cmp(&b.value()),
            (Self::Root(a), Self::Root(b)) => a.value().cmp(b.value()),
            (Self::Number(_), Self::Root(_)) => Ordering::Less,
            (Self::Root(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Part {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A refinement chain appended to a base with `.`, e.g. `A2.b.1`.
#[derive(Debug, Clone)]
pub struct Clarification {
    first: Term,
    other: NonEmpty<Part>,
    span: Span,
}

structural!(Clarification { first, other });

impl Clarification {
    /// Creates a clarification node.
    #[must_use]
    pub const fn new(first: Term, other: NonEmpty<Part>, span: Span) -> Self {
        Self { first, other, span }
    }

    /// The refined base.
    #[must_use]
    pub const fn first(&self) -> &Term {
        &self.first
    }

    /// The refinements, in source order.
    #[must_use]
    pub const fn other(&self) -> &NonEmpty<Part> {
        &self.other
    }

    /// The source span.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }
}

/// A variant chain appended to a base with `-`, e.g. `R-r`.
#[derive(Debug, Clone)]
pub struct Version {
    first: Term,
    other: NonEmpty<Part>,
    span: Span,
}

structural!(Version { first, other });

impl Version {
    /// Creates a version node.
    #[must_use]
    pub const fn new(first: Term, other: NonEmpty<Part>, span: Span) -> Self {
        Self { first, other, span }
    }

    /// The versioned base.
    #[must_use]
    pub const fn first(&self) -> &Term {
        &self.first
    }

    /// The version steps, in source order.
    #[must_use]
    pub const fn other(&self) -> &NonEmpty<Part> {
        &self.other
    }

    /// The source span.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    /// Canonical form of the version truncated to its first `steps` trailing
    /// elements. With `steps == 0` this is the base alone.
    #[must_use]
    pub fn prefix(&self, steps: usize) -> String {
        let mut out = self.first.to_string();
        if matches!(self.first, Term::Answer(_)) {
            out = format!("({out})");
        }
        for part in self.other.iter().take(steps) {
            out.push('-');
            out.push_str(&part.to_string());
        }
        out
    }
}

/// Two or more alternatives joined by `/`, e.g. `A/(B.1)`.
#[derive(Debug, Clone)]
pub struct Answer {
    first: Term,
    other: NonEmpty<Term>,
    span: Span,
}

structural!(Answer { first, other });

impl Answer {
    /// Creates an answer node.
    #[must_use]
    pub const fn new(first: Term, other: NonEmpty<Term>, span: Span) -> Self {
        Self { first, other, span }
    }

    /// The first alternative.
    #[must_use]
    pub const fn first(&self) -> &Term {
        &self.first
    }

    /// The remaining alternatives (at least one).
    #[must_use]
    pub const fn other(&self) -> &NonEmpty<Term> {
        &self.other
    }

    /// All alternatives in source order.
    pub fn alternatives(&self) -> impl Iterator<Item = &Term> {
        std::iter::once(&self.first).chain(self.other.iter())
    }

    /// The source span.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }
}

/// Any node of the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A bare number.
    Number(Number),
    /// A lowercase root.
    Root(Root),
    /// A fundamental atom.
    Atom(FundamentalAtom),
    /// A clarification chain.
    Clarification(Box<Clarification>),
    /// A version chain.
    Version(Box<Version>),
    /// An enumeration of alternatives.
    Answer(Box<Answer>),
}

impl Term {
    /// The source span.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Number(number) => number.span(),
            Self::Root(root) => root.span(),
            Self::Atom(atom) => atom.span(),
            Self::Clarification(clarification) => clarification.span(),
            Self::Version(version) => version.span(),
            Self::Answer(answer) => answer.span(),
        }
    }

    /// The literal of the leftmost root, descending through bases and first
    /// alternatives. Numbers yield their decimal form.
    #[must_use]
    pub fn leading_root(&self) -> String {
        match self {
            Self::Number(number) => number.value().to_string(),
            Self::Root(root) => root.value().to_string(),
            Self::Atom(atom) => atom.root().value().to_string(),
            Self::Clarification(clarification) => clarification.first().leading_root(),
            Self::Version(version) => version.first().leading_root(),
            Self::Answer(answer) => answer.first().leading_root(),
        }
    }

    /// Every fundamental root reachable from this term.
    #[must_use]
    pub fn fundamental_roots(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_fundamental_roots(&mut out);
        out
    }

    fn collect_fundamental_roots<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::Number(_) | Self::Root(_) => {}
            Self::Atom(atom) => {
                out.insert(atom.root().value());
            }
            Self::Clarification(clarification) => {
                clarification.first().collect_fundamental_roots(out);
            }
            Self::Version(version) => version.first().collect_fundamental_roots(out),
            Self::Answer(answer) => {
                for alternative in answer.alternatives() {
                    alternative.collect_fundamental_roots(out);
                }
            }
        }
    }

    /// Lowercase roots used as the base of a chain or as an alternative.
    #[must_use]
    pub fn base_roots(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_base_roots(&mut out);
        out
    }

    fn collect_base_roots<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::Number(_) | Self::Atom(_) => {}
            Self::Root(root) => {
                out.insert(root.value());
            }
            Self::Clarification(clarification) => clarification.first().collect_base_roots(out),
            Self::Version(version) => version.first().collect_base_roots(out),
            Self::Answer(answer) => {
                for alternative in answer.alternatives() {
                    alternative.collect_base_roots(out);
                }
            }
        }
    }

    /// Every version node reachable from this term, outermost first.
    #[must_use]
    pub fn versions(&self) -> Vec<&Version> {
        let mut out = Vec::new();
        self.collect_versions(&mut out);
        out
    }

    fn collect_versions<'a>(&'a self, out: &mut Vec<&'a Version>) {
        match self {
            Self::Number(_) | Self::Root(_) | Self::Atom(_) => {}
            Self::Clarification(clarification) => clarification.first().collect_versions(out),
            Self::Version(version) => {
                out.push(version);
                version.first().collect_versions(out);
            }
            Self::Answer(answer) => {
                for alternative in answer.alternatives() {
                    alternative.collect_versions(out);
                }
            }
        }
    }
}

/// The top-level parsed identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Thesis {
    value: Term,
}

impl Thesis {
    /// Wraps a term as a thesis.
    #[must_use]
    pub const fn new(value: Term) -> Self {
        Self { value }
    }

    /// The wrapped term.
    #[must_use]
    pub const fn value(&self) -> &Term {
        &self.value
    }

    /// The source span of the whole identifier.
    #[must_use]
    pub fn span(&self) -> Span {
        self.value.span()
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl fmt::Display for FundamentalAtom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.root.value())?;
        if let Some(number) = &self.number {
            write!(f, "{number}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Root(root) => write!(f, "{}", root.value()),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

fn write_chain(f: &mut fmt::Formatter, delimiter: char, other: &NonEmpty<Part>) -> fmt::Result {
    for part in other.iter() {
        write!(f, "{delimiter}{part}")?;
    }
    Ok(())
}

impl fmt::Display for Clarification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.first {
            Term::Version(_) | Term::Answer(_) => write!(f, "({})", self.first)?,
            first => write!(f, "{first}")?,
        }
        write_chain(f, '.', &self.other)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.first {
            Term::Answer(_) => write!(f, "({})", self.first)?,
            first => write!(f, "{first}")?,
        }
        write_chain(f, '-', &self.other)
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut alternatives = self.alternatives();
        if let Some(first) = alternatives.next() {
            write!(f, "{first}")?;
        }
        for alternative in alternatives {
            write!(f, "/{alternative}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Root(root) => write!(f, "{}", root.value()),
            Self::Atom(atom) => write!(f, "{atom}"),
            Self::Clarification(clarification) => write!(f, "{clarification}"),
            Self::Version(version) => write!(f, "{version}"),
            Self::Answer(answer) => write!(f, "{answer}"),
        }
    }
}

impl fmt::Display for Thesis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}


#[cfg(test)]
mod tests {
    use super::{build::*, *};

    #[test]
    fn equality_ignores_spans() {
        let left = Number::new(3, Span::new(0, 1));
        let right = Number::new(3, Span::new(5, 6));
        assert_eq!(left, right);
        assert_ne!(left, Number::new(4, Span::new(0, 1)));
    }

    #[test]
    fn parts_sort_numbers_first() {
        let mut parts = vec![pr("b"), pn(10), pr("a"), pn(2)];
        parts.sort();
        assert_eq!(parts, vec![pn(2), pn(10), pr("a"), pr("b")]);
    }

    #[test]
    fn canonical_form_brackets_only_where_needed() {
        let term = c(
            ans(
                c(a("A", Some(1)), vec![pn(1), pn(2)]),
                vec![v(a("R", None), vec![pr("r")])],
            ),
            vec![pn(1)],
        );
        assert_eq!(term.to_string(), "(A1.1.2/R-r).1");

        let term = v(c(a("A", Some(2)), vec![pr("b")]), vec![pr("c")]);
        assert_eq!(term.to_string(), "A2.b-c");

        let term = c(v(a("R", None), vec![pr("r")]), vec![pn(1)]);
        assert_eq!(term.to_string(), "(R-r).1");
    }

    #[test]
    fn fundamental_roots_descend_everywhere() {
        let term = ans(
            v(c(a("A", Some(2)), vec![pr("b")]), vec![pr("c")]),
            vec![a("D", None), c(a("A", None), vec![pn(1)])],
        );
        let roots: Vec<_> = term.fundamental_roots().into_iter().collect();
        assert_eq!(roots, vec!["A", "D"]);
    }

    #[test]
    fn versions_include_nested() {
        let inner = v(a("R", None), vec![pr("r")]);
        let term = ans(c(inner.clone(), vec![pn(1)]), vec![v(inner, vec![pr("s")])]);
        let versions: Vec<String> = term.versions().iter().map(ToString::to_string).collect();
        assert_eq!(versions, vec!["R-r", "R-r-s", "R-r"]);
    }

    #[test]
    fn version_prefix() {
        let Term::Version(version) = v(a("R", Some(1)), vec![pr("a"), pn(2)]) else {
            unreachable!()
        };
        assert_eq!(version.prefix(0), "R1");
        assert_eq!(version.prefix(1), "R1-a");
        assert_eq!(version.prefix(2), "R1-a-2");
    }

    #[test]
    fn leading_root_follows_first() {
        let term = v(
            ans(c(a("Q", Some(3)), vec![pn(1)]), vec![a("B", None)]),
            vec![pr("x")],
        );
        assert_eq!(term.leading_root(), "Q");
    }
}
