//! RDF terms and variables
//!
//! `Term` is the value type flowing through bindings, rows and function
//! results. It is cheap to clone (Arc-backed strings).

use fluree_vocab::{media_types, xsd};
use std::fmt;
use std::sync::Arc;

/// A query variable (`?name`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(Arc<str>);

impl Var {
    /// Create a variable; a leading `?` or `$` is stripped
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let name = name
            .strip_prefix('?')
            .or_else(|| name.strip_prefix('$'))
            .unwrap_or(name);
        Var(Arc::from(name))
    }

    /// Variable name without the `?` sigil
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// An RDF term
///
/// # Invariants
///
/// - A `Literal` with `datatype: None` is a plain `xsd:string`
/// - Terms are immutable once built
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    /// An IRI
    Iri(Arc<str>),
    /// A literal with its lexical form and optional datatype IRI
    Literal {
        lexical: Arc<str>,
        datatype: Option<Arc<str>>,
    },
    /// A blank node with local identifier
    Blank(Arc<str>),
}

impl Term {
    /// Create an IRI term
    pub fn iri(iri: impl Into<Arc<str>>) -> Self {
        Term::Iri(iri.into())
    }

    /// Create a plain string literal
    pub fn string(value: impl Into<Arc<str>>) -> Self {
        Term::Literal {
            lexical: value.into(),
            datatype: None,
        }
    }

    /// Create a typed literal
    pub fn typed(value: impl Into<Arc<str>>, datatype: impl Into<Arc<str>>) -> Self {
        Term::Literal {
            lexical: value.into(),
            datatype: Some(datatype.into()),
        }
    }

    /// Create an `xsd:integer` literal
    pub fn integer(value: i64) -> Self {
        Term::typed(value.to_string(), xsd::INTEGER)
    }

    /// Create an `xsd:boolean` literal
    pub fn boolean(value: bool) -> Self {
        Term::typed(if value { "true" } else { "false" }, xsd::BOOLEAN)
    }

    /// Create a blank node term
    pub fn blank(id: impl Into<Arc<str>>) -> Self {
        Term::Blank(id.into())
    }

    /// Check if this is an IRI
    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    /// Check if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal { .. })
    }

    /// Check if this is a blank node
    pub fn is_blank(&self) -> bool {
        matches!(self, Term::Blank(_))
    }

    /// Get as IRI string if this is an IRI
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Effective datatype IRI of a literal (`xsd:string` when untyped)
    pub fn datatype(&self) -> Option<&str> {
        match self {
            Term::Literal { datatype, .. } => Some(datatype.as_deref().unwrap_or(xsd::STRING)),
            _ => None,
        }
    }

    /// Lexical form if this is a literal
    pub fn lexical(&self) -> Option<&str> {
        match self {
            Term::Literal { lexical, .. } => Some(lexical),
            _ => None,
        }
    }

    /// The value of a plain or `xsd:string` literal
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Term::Literal { lexical, datatype } => match datatype.as_deref() {
                None | Some(xsd::STRING) => Some(lexical),
                Some(_) => None,
            },
            _ => None,
        }
    }

    /// Integer value of an integer-family literal
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Term::Literal {
                lexical,
                datatype: Some(dt),
            } if xsd::is_integer_family(dt) => lexical.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether this literal carries a fetched document (IANA media type datatype)
    pub fn is_document(&self) -> bool {
        matches!(
            self,
            Term::Literal { datatype: Some(dt), .. } if media_types::is_media_type_iri(dt)
        )
    }

    /// Unquoted textual form: lexical form, IRI string, or `_:id`
    pub fn to_unquoted_string(&self) -> String {
        match self {
            Term::Iri(iri) => iri.to_string(),
            Term::Literal { lexical, .. } => lexical.to_string(),
            Term::Blank(id) => format!("_:{id}"),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::Blank(id) => write!(f, "_:{id}"),
            Term::Literal { lexical, datatype } => {
                write!(f, "\"")?;
                for c in lexical.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\r' => write!(f, "\\r")?,
                        _ => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")?;
                match datatype.as_deref() {
                    None | Some(xsd::STRING) => Ok(()),
                    Some(dt) => write!(f, "^^<{dt}>"),
                }
            }
        }
    }
}

/// A constant term or a variable, as written in a clause or triple template
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TermPattern {
    Const(Term),
    Var(Var),
}

impl TermPattern {
    /// Variable pattern
    pub fn var(name: impl AsRef<str>) -> Self {
        TermPattern::Var(Var::new(name))
    }

    /// Resolve against a binding; `None` when the variable is unbound or absent
    pub fn resolve<'a>(&'a self, binding: &'a crate::binding::Binding) -> Option<&'a Term> {
        match self {
            TermPattern::Const(term) => Some(term),
            TermPattern::Var(var) => binding.get(var),
        }
    }
}

impl From<Term> for TermPattern {
    fn from(term: Term) -> Self {
        TermPattern::Const(term)
    }
}

impl From<Var> for TermPattern {
    fn from(var: Var) -> Self {
        TermPattern::Var(var)
    }
}

impl fmt::Display for TermPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermPattern::Const(term) => write!(f, "{term}"),
            TermPattern::Var(var) => write!(f, "{var}"),
        }
    }
}

/// Map a document content type to a literal datatype IRI
///
/// `Some("application/json")` maps to
/// `https://www.iana.org/assignments/media-types/application/json`; an
/// undeclared content type maps to `xsd:string`. Unknown content types still
/// produce a (possibly unregistered) IANA IRI.
pub fn media_type_datatype(content_type: Option<&str>) -> Arc<str> {
    match content_type.map(str::trim).filter(|ct| !ct.is_empty()) {
        Some(ct) => Arc::from(format!("{}{}", media_types::IANA_PREFIX, ct)),
        None => Arc::from(xsd::STRING),
    }
}
