//! Recursive-descent parser for structured identifiers.
//!
//! Precedence, from loosest to tightest binding, is answer (`/`), version
//! (`-`), clarification (`.`). Brackets let a looser construct act as the
//! base of a tighter one:
//!
//! ```text
//! clarification := (bracketed(answer | version) | root | atom) ('.' part)+
//! version       := (clarification | bracketed(answer | clarification) | root | atom) ('-' part)+
//! answer        := element ('/' element)+
//! element       := version | clarification | bracketed(version | clarification) | atom | root
//! thesis        := (answer | version | clarification | atom) EOF
//! atom          := upper+ digit*
//! part          := lower+ | digit+
//! ```
//!
//! Alternatives are tried in order with backtracking. The productions are
//! mutually recursive through brackets; they refer to each other through
//! function-pointer rule handles and results are memoized per
//! (rule, position).

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, PoisonError},
};

use non_empty_string::NonEmptyString;
use nonempty::NonEmpty;
use tracing::trace;

use crate::domain::{
    config::{Error as ConfigError, Grammar},
    thesis::{
        Answer, Clarification, FundamentalAtom, FundamentalRoot, Number, Part, Root, Span, Term,
        Thesis, Version,
    },
};

/// The input is not a structured identifier.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{message} at position {position}")]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// Byte offset at which parsing could not continue.
    pub position: usize,
}

/// Parses identifiers written in a given [`Grammar`].
///
/// Parsing is a pure function of the input, so every successful result is
/// cached and shared; repeated identifiers in a document are parsed once.
#[derive(Debug)]
pub struct Parser {
    grammar: Grammar,
    cache: Mutex<HashMap<String, Arc<Thesis>>>,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            grammar: Grammar::default(),
            cache: Mutex::default(),
        }
    }
}

impl Parser {
    /// Creates a parser for the given grammar.
    ///
    /// # Errors
    ///
    /// Returns an error if the grammar's symbols are not distinct ASCII
    /// punctuation.
    pub fn new(grammar: Grammar) -> Result<Self, ConfigError> {
        grammar.validate()?;
        Ok(Self {
            grammar,
            cache: Mutex::default(),
        })
    }

    /// The grammar this parser accepts.
    #[must_use]
    pub const fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Parses `text` as a complete identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` contains characters other than ASCII
    /// letters, digits and the grammar's symbols, or if the grammar does not
    /// consume all of it.
    pub fn parse(&self, text: &str) -> Result<Arc<Thesis>, ParseError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(thesis) = cache.get(text) {
            return Ok(Arc::clone(thesis));
        }
        let thesis = Arc::new(self.parse_uncached(text)?);
        trace!(identifier = text, "parsed");
        cache.insert(text.to_string(), Arc::clone(&thesis));
        Ok(thesis)
    }

    fn parse_uncached(&self, text: &str) -> Result<Thesis, ParseError> {
        let symbols = self.grammar.symbols();
        if let Some((position, c)) = text
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphanumeric() && !symbols.contains(c))
        {
            return Err(ParseError {
                message: format!("unexpected character '{c}'"),
                position,
            });
        }
        Scanner::new(&self.grammar, text).thesis()
    }
}

/// A production of the grammar.
type Rule<'a> = fn(&mut Scanner<'a>) -> Option<Term>;

/// Productions whose results are memoized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Memo {
    Clarification,
    Version,
    Answer,
}

struct Scanner<'a> {
    grammar: &'a Grammar,
    src: &'a [u8],
    pos: usize,
    /// Furthest position at which a token was expected, and what was.
    furthest: usize,
    expected: BTreeSet<String>,
    /// A failure that no alternative can recover from.
    fatal: Option<ParseError>,
    memo: HashMap<(Memo, usize), Option<(Term, usize)>>,
}

impl<'a> Scanner<'a> {
    fn new(grammar: &'a Grammar, text: &'a str) -> Self {
        Self {
            grammar,
            src: text.as_bytes(),
            pos: 0,
            furthest: 0,
            expected: BTreeSet::new(),
            fatal: None,
            memo: HashMap::new(),
        }
    }

    fn thesis(mut self) -> Result<Thesis, ParseError> {
        let rules: [Rule<'a>; 4] = [Self::answer, Self::version, Self::clarification, Self::atom];
        for rule in rules {
            self.pos = 0;
            if let Some(term) = rule(&mut self) {
                if self.pos == self.src.len() {
                    return Ok(Thesis::new(term));
                }
                self.expect("end of input");
            }
            if let Some(fatal) = self.fatal.take() {
                return Err(fatal);
            }
        }
        Err(self.error())
    }

    fn error(&self) -> ParseError {
        let found = self
            .src
            .get(self.furthest)
            .map_or_else(|| "end of input".to_string(), |b| format!("'{}'", char::from(*b)));
        let expected = self
            .expected
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        ParseError {
            message: format!("expected one of {expected}; found {found}"),
            position: self.furthest,
        }
    }

    fn expect(&mut self, what: &str) {
        if self.pos > self.furthest {
            self.furthest = self.pos;
            self.expected.clear();
        }
        if self.pos == self.furthest {
            self.expected.insert(what.to_string());
        }
    }

    fn eat(&mut self, symbol: char) -> bool {
        if self.src.get(self.pos).is_some_and(|b| char::from(*b) == symbol) {
            self.pos += 1;
            true
        } else {
            self.expect(&format!("'{symbol}'"));
            false
        }
    }

    /// Consumes a non-empty run of bytes matching `pred`.
    fn run(&mut self, pred: fn(&u8) -> bool, what: &str) -> Option<Span> {
        let start = self.pos;
        let len = self.src[start..].iter().take_while(|&b| pred(b)).count();
        if len == 0 {
            self.expect(what);
            return None;
        }
        self.pos += len;
        Some(Span::new(start, self.pos))
    }

    fn text(&self, span: Span) -> String {
        String::from_utf8_lossy(&self.src[span.start..span.end]).into_owned()
    }

    fn name(&self, span: Span) -> Option<NonEmptyString> {
        NonEmptyString::new(self.text(span)).ok()
    }

    fn number(&mut self) -> Option<Number> {
        let span = self.run(u8::is_ascii_digit, "digit")?;
        if let Ok(value) = self.text(span).parse() {
            Some(Number::new(value, span))
        } else {
            if self.fatal.is_none() {
                self.fatal = Some(ParseError {
                    message: "number does not fit in 64 bits".to_string(),
                    position: span.start,
                });
            }
            None
        }
    }

    fn root(&mut self) -> Option<Root> {
        let span = self.run(u8::is_ascii_lowercase, "lowercase letter")?;
        Some(Root::new(self.name(span)?, span))
    }

    fn part(&mut self) -> Option<Part> {
        if let Some(root) = self.root() {
            return Some(Part::Root(root));
        }
        self.number().map(Part::Number)
    }

    fn root_term(&mut self) -> Option<Term> {
        self.root().map(Term::Root)
    }

    fn atom(&mut self) -> Option<Term> {
        let start = self.pos;
        let span = self.run(u8::is_ascii_uppercase, "uppercase letter")?;
        let root = FundamentalRoot::new(self.name(span)?, span);
        let number = if self.src.get(self.pos).is_some_and(u8::is_ascii_digit) {
            Some(self.number()?)
        } else {
            self.expect("digit");
            None
        };
        Some(Term::Atom(FundamentalAtom::new(
            root,
            number,
            Span::new(start, self.pos),
        )))
    }

    /// Tries each rule in order from the current position.
    fn first_of(&mut self, rules: &[Rule<'a>]) -> Option<Term> {
        let start = self.pos;
        for rule in rules {
            if let Some(term) = rule(self) {
                return Some(term);
            }
            self.pos = start;
        }
        None
    }

    /// An opening bracket, the first rule that is directly followed by a
    /// closing bracket, then that bracket.
    fn bracketed(&mut self, rules: &[Rule<'a>]) -> Option<Term> {
        let start = self.pos;
        if !self.eat(self.grammar.open) {
            return None;
        }
        let inner = self.pos;
        for rule in rules {
            if let Some(term) = rule(self) {
                if self.eat(self.grammar.close) {
                    return Some(term);
                }
            }
            self.pos = inner;
        }
        self.pos = start;
        None
    }

    /// One or more `delimiter part` pairs. A trailing delimiter without a part
    /// is left unconsumed.
    fn chain(&mut self, delimiter: char) -> Option<NonEmpty<Part>> {
        let mut parts: Option<NonEmpty<Part>> = None;
        loop {
            let save = self.pos;
            if !self.eat(delimiter) {
                break;
            }
            let Some(part) = self.part() else {
                self.pos = save;
                break;
            };
            match parts.as_mut() {
                Some(parts) => parts.push(part),
                None => parts = Some(NonEmpty::new(part)),
            }
        }
        parts
    }

    fn memoized(&mut self, key: Memo, rule: Rule<'a>) -> Option<Term> {
        let start = self.pos;
        if let Some(cached) = self.memo.get(&(key, start)) {
            return cached.clone().map(|(term, end)| {
                self.pos = end;
                term
            });
        }
        let result = rule(self);
        if result.is_none() {
            self.pos = start;
        }
        let entry = result.clone().map(|term| (term, self.pos));
        self.memo.insert((key, start), entry);
        result
    }

    fn clarification(&mut self) -> Option<Term> {
        self.memoized(Memo::Clarification, |s| {
            let start = s.pos;
            let first = s.first_of(&[
                |s| s.bracketed(&[Self::answer, Self::version]),
                Self::root_term,
                Self::atom,
            ])?;
            let other = s.chain(s.grammar.clarification)?;
            Some(Term::Clarification(Box::new(Clarification::new(
                first,
                other,
                Span::new(start, s.pos),
            ))))
        })
    }

    fn version(&mut self) -> Option<Term> {
        self.memoized(Memo::Version, |s| {
            let start = s.pos;
            let first = s.first_of(&[
                Self::clarification,
                |s| s.bracketed(&[Self::answer, Self::clarification]),
                Self::root_term,
                Self::atom,
            ])?;
            let other = s.chain(s.grammar.version)?;
            Some(Term::Version(Box::new(Version::new(
                first,
                other,
                Span::new(start, s.pos),
            ))))
        })
    }

    fn answer_element(&mut self) -> Option<Term> {
        self.first_of(&[
            Self::version,
            Self::clarification,
            |s| s.bracketed(&[Self::version, Self::clarification]),
            Self::atom,
            Self::root_term,
        ])
    }

    fn answer(&mut self) -> Option<Term> {
        self.memoized(Memo::Answer, |s| {
            let start = s.pos;
            let first = s.answer_element()?;
            let mut other: Option<NonEmpty<Term>> = None;
            loop {
                let save = s.pos;
                if !s.eat(s.grammar.answer) {
                    break;
                }
                let Some(element) = s.answer_element() else {
                    s.pos = save;
                    break;
                };
                match other.as_mut() {
                    Some(other) => other.push(element),
                    None => other = Some(NonEmpty::new(element)),
                }
            }
            Some(Term::Answer(Box::new(Answer::new(
                first,
                other?,
                Span::new(start, s.pos),
            ))))
        })
    }
}
