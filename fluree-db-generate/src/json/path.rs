//! JSONPath subset: compilation and evaluation
//!
//! A compiled path is a list of segments. Each segment is a selector applied
//! to the children of the current node, either directly (`.name`, `[0]`) or
//! to every descendant (`..name`, `..[0]`).
//!
//! Evaluation tracks a set of *states* (indices into the segment list) per
//! node, so the same matcher drives both the in-memory evaluator and the
//! streaming scanner:
//!
//! - at the root the state set is `{0}`
//! - stepping into a child with key `k`, state `s` moves to `s + 1` when
//!   segment `s` selects `k`; a descendant segment also stays at `s`
//! - a node whose state set contains `len` is a match
//! - a node with no states cannot lead to a match and is skipped

use crate::error::{GenerateError, Result};
use serde_json::Value;
use std::fmt;
use std::ops::ControlFlow;

/// A union member (`['a', 'b']`, `[0, 2]`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Name(String),
    Index(i64),
}

/// What a segment selects among the children of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// `*`
    Wildcard,
    /// One or more names or indices
    Keys(Vec<Key>),
    /// `[start:end]`, end exclusive
    Slice { start: Option<i64>, end: Option<i64> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub selector: Selector,
    /// `..` recursive descent
    pub descendant: bool,
}

/// One step from a node to a child
#[derive(Debug, Clone, Copy)]
pub(crate) enum Step<'a> {
    Field(&'a str),
    /// Array element; the array length is known only in memory
    Index { index: usize, len: Option<usize> },
}

pub(crate) type States = Vec<usize>;

/// Resolve a possibly negative array index
fn resolve_index(i: i64, len: Option<usize>) -> Option<usize> {
    if i >= 0 {
        return usize::try_from(i).ok();
    }
    let len = i64::try_from(len?).ok()?;
    usize::try_from(len + i).ok()
}

impl Selector {
    fn selects(&self, step: Step<'_>) -> bool {
        match (self, step) {
            (Selector::Wildcard, _) => true,
            (Selector::Keys(keys), Step::Field(name)) => keys
                .iter()
                .any(|k| matches!(k, Key::Name(n) if n == name)),
            (Selector::Keys(keys), Step::Index { index, len }) => keys.iter().any(|k| match k {
                Key::Index(i) => resolve_index(*i, len) == Some(index),
                Key::Name(_) => false,
            }),
            (Selector::Slice { start, end }, Step::Index { index, len }) => {
                let lower = match start {
                    Some(s) => match resolve_index(*s, len) {
                        Some(v) => v,
                        // negative bound before the array start
                        None if *s < 0 && len.is_some() => 0,
                        None => return false,
                    },
                    None => 0,
                };
                let upper = match end {
                    Some(e) => match resolve_index(*e, len) {
                        Some(v) => Some(v),
                        None if *e < 0 && len.is_some() => Some(0),
                        None => return false,
                    },
                    None => None,
                };
                index >= lower && upper.map_or(true, |u| index < u)
            }
            (Selector::Slice { .. }, Step::Field(_)) => false,
        }
    }

    /// Whether the selector needs the array length to be evaluated
    fn needs_length(&self) -> bool {
        match self {
            Selector::Wildcard => false,
            Selector::Keys(keys) => keys.iter().any(|k| matches!(k, Key::Index(i) if *i < 0)),
            Selector::Slice { start, end } => {
                start.is_some_and(|s| s < 0) || end.is_some_and(|e| e < 0)
            }
        }
    }
}

/// A compiled JSONPath expression
///
/// Supported syntax: `$`, `.name`, `['name']`, `["name"]`, `[n]`, `[*]`,
/// `.*`, unions `[a,b]`, slices `[start:end]`, and recursive descent `..`.
/// A path that does not start with `$` is relative to the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    source: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Compile a path expression
    pub fn compile(path: &str) -> Result<Self> {
        let segments = Parser::new(path).parse()?;
        Ok(Self {
            source: path.to_string(),
            segments,
        })
    }

    /// Compile a path that must be evaluable in a single forward scan
    pub fn compile_streaming(path: &str) -> Result<Self> {
        let compiled = Self::compile(path)?;
        if !compiled.is_streamable() {
            return Err(GenerateError::InvalidPath {
                path: path.to_string(),
                message: "negative indices need the array length and cannot be streamed"
                    .to_string(),
            });
        }
        Ok(compiled)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether every segment can be decided without knowing array lengths
    pub fn is_streamable(&self) -> bool {
        self.segments.iter().all(|s| !s.selector.needs_length())
    }

    /// All matches in document pre-order
    pub fn select<'v>(&self, value: &'v Value) -> Vec<&'v Value> {
        let mut out = Vec::new();
        let _ = self.walk(value, &self.initial_states(), &mut |v| {
            out.push(v);
            ControlFlow::Continue(())
        });
        out
    }

    /// The first match in document pre-order
    pub fn first<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        let mut found = None;
        let _ = self.walk(value, &self.initial_states(), &mut |v| {
            found = Some(v);
            ControlFlow::Break(())
        });
        found
    }

    pub(crate) fn initial_states(&self) -> States {
        vec![0]
    }

    pub(crate) fn is_match(&self, states: &[usize]) -> bool {
        states.contains(&self.segments.len())
    }

    /// States that can still lead to a match below this node
    pub(crate) fn live(&self, states: &[usize]) -> States {
        states
            .iter()
            .copied()
            .filter(|s| *s < self.segments.len())
            .collect()
    }

    pub(crate) fn advance(&self, states: &[usize], step: Step<'_>) -> States {
        let mut next = States::new();
        for &s in states {
            let Some(segment) = self.segments.get(s) else {
                continue;
            };
            if segment.descendant {
                push_unique(&mut next, s);
            }
            if segment.selector.selects(step) {
                push_unique(&mut next, s + 1);
            }
        }
        next
    }

    /// Visit matches at and below `value` given its states, in pre-order
    pub(crate) fn walk<'v>(
        &self,
        value: &'v Value,
        states: &[usize],
        visit: &mut dyn FnMut(&'v Value) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        if self.is_match(states) {
            visit(value)?;
        }
        let live = self.live(states);
        if live.is_empty() {
            return ControlFlow::Continue(());
        }
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let next = self.advance(&live, Step::Field(key));
                    if !next.is_empty() {
                        self.walk(child, &next, visit)?;
                    }
                }
            }
            Value::Array(items) => {
                let len = Some(items.len());
                for (index, child) in items.iter().enumerate() {
                    let next = self.advance(&live, Step::Index { index, len });
                    if !next.is_empty() {
                        self.walk(child, &next, visit)?;
                    }
                }
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

fn push_unique(states: &mut States, s: usize) {
    if !states.contains(&s) {
        states.push(s);
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.trim().chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> GenerateError {
        GenerateError::InvalidPath {
            path: self.source.to_string(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn parse(mut self) -> Result<Vec<Segment>> {
        if self.chars.is_empty() {
            return Err(self.error("empty path"));
        }
        let mut segments = Vec::new();
        match self.peek() {
            Some('$') => self.pos += 1,
            Some('.') | Some('[') => {}
            // relative path: leading bare name
            Some(_) => segments.push(Segment {
                selector: self.name_or_wildcard()?,
                descendant: false,
            }),
            None => {}
        }

        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.pos += 1;
                    let descendant = self.peek() == Some('.');
                    if descendant {
                        self.pos += 1;
                    }
                    let selector = if self.peek() == Some('[') {
                        if !descendant {
                            return Err(self.error(format!("unexpected '[' after '.' at {}", self.pos)));
                        }
                        self.bracket()?
                    } else {
                        self.name_or_wildcard()?
                    };
                    segments.push(Segment {
                        selector,
                        descendant,
                    });
                }
                '[' => {
                    let selector = self.bracket()?;
                    segments.push(Segment {
                        selector,
                        descendant: false,
                    });
                }
                other => {
                    return Err(self.error(format!(
                        "unexpected character '{other}' at {}",
                        self.pos
                    )))
                }
            }
        }
        Ok(segments)
    }

    /// `*` or a bare member name, up to the next `.` or `[`
    fn name_or_wildcard(&mut self) -> Result<Selector> {
        if self.peek() == Some('*') {
            self.pos += 1;
            return Ok(Selector::Wildcard);
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '.' || c == '[' {
                break;
            }
            if c.is_whitespace() || c == ']' || c == '\'' || c == '"' {
                return Err(self.error(format!("unexpected character '{c}' in name")));
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error(format!("missing member name at {start}")));
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        Ok(Selector::Keys(vec![Key::Name(name)]))
    }

    /// `[...]`: wildcard, union of names/indices, or slice
    fn bracket(&mut self) -> Result<Selector> {
        self.pos += 1;
        self.skip_ws();
        if self.peek() == Some('*') {
            self.pos += 1;
            self.skip_ws();
            self.expect(']')?;
            return Ok(Selector::Wildcard);
        }

        let mut keys = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('\'') | Some('"') => keys.push(Key::Name(self.quoted()?)),
                Some(c) if c == '-' || c.is_ascii_digit() || c == ':' => {
                    let start = self.integer()?;
                    self.skip_ws();
                    if self.peek() == Some(':') {
                        if !keys.is_empty() {
                            return Err(self.error("slices cannot appear in a union"));
                        }
                        self.pos += 1;
                        self.skip_ws();
                        let end = self.integer()?;
                        self.skip_ws();
                        if self.peek() == Some(':') {
                            return Err(self.error("slice steps are not supported"));
                        }
                        self.expect(']')?;
                        return Ok(Selector::Slice { start, end });
                    }
                    match start {
                        Some(i) => keys.push(Key::Index(i)),
                        None => return Err(self.error("missing index")),
                    }
                }
                Some(c) => return Err(self.error(format!("unexpected character '{c}' in brackets"))),
                None => return Err(self.error("unterminated '['")),
            }
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(Selector::Keys(keys));
                }
                Some(c) => return Err(self.error(format!("expected ',' or ']', found '{c}'"))),
                None => return Err(self.error("unterminated '['")),
            }
        }
    }

    /// Optional signed integer
    fn integer(&mut self) -> Result<Option<i64>> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Ok(None);
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map(Some)
            .map_err(|_| self.error(format!("invalid index '{text}'")))
    }

    fn quoted(&mut self) -> Result<String> {
        let Some(quote) = self.peek() else {
            return Err(self.error("expected quoted name"));
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => out.push(c),
                        None => return Err(self.error("unterminated escape")),
                    }
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated quoted name")),
            }
            self.pos += 1;
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}' at {}", self.pos)))
        }
    }
}
