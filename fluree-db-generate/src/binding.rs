//! Binding types for generation plans
//!
//! This module contains:
//! - `Binding`: An immutable solution mapping, extended one variable at a time
//! - `Row`: One iterator result (primary value + auxiliary values)
//! - `Batch`: A non-empty group of rows delivered together

use crate::term::{Term, Var};
use std::fmt;
use std::sync::Arc;

/// One entry of a binding chain
#[derive(Debug)]
struct Entry {
    var: Var,
    value: Option<Term>,
    parent: Option<Arc<Entry>>,
    len: usize,
}

/// An immutable mapping from variables to terms - cheap to clone
///
/// `extend` returns a new binding that shares every existing entry with its
/// parent. An entry may record an *absent* value: the variable was
/// considered by a clause but left unbound.
///
/// # Invariants
///
/// - Entries keep insertion order
/// - When a variable is extended twice, the most recent entry wins on lookup
#[derive(Clone, Default)]
pub struct Binding {
    head: Option<Arc<Entry>>,
}

impl Binding {
    /// The empty binding
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend with one more entry (`None` records an absent value)
    pub fn extend(&self, var: Var, value: Option<Term>) -> Self {
        let len = self.len() + 1;
        Binding {
            head: Some(Arc::new(Entry {
                var,
                value,
                parent: self.head.clone(),
                len,
            })),
        }
    }

    /// Extend with a bound value
    pub fn bind(&self, var: Var, value: Term) -> Self {
        self.extend(var, Some(value))
    }

    /// Build a binding from `(var, term)` pairs, in order
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Var, Term)>,
    {
        pairs
            .into_iter()
            .fold(Binding::new(), |b, (var, term)| b.bind(var, term))
    }

    /// Number of entries (absent entries included)
    pub fn len(&self) -> usize {
        self.head.as_ref().map(|e| e.len).unwrap_or(0)
    }

    /// Whether the binding has no entries
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn entry(&self, var: &Var) -> Option<&Entry> {
        let mut cur = self.head.as_deref();
        while let Some(entry) = cur {
            if &entry.var == var {
                return Some(entry);
            }
            cur = entry.parent.as_deref();
        }
        None
    }

    /// Value bound to `var`, if any
    pub fn get(&self, var: &Var) -> Option<&Term> {
        self.entry(var).and_then(|e| e.value.as_ref())
    }

    /// Whether `var` has an entry (bound or absent)
    pub fn contains(&self, var: &Var) -> bool {
        self.entry(var).is_some()
    }

    /// Whether `var` is bound to a value
    pub fn is_bound(&self, var: &Var) -> bool {
        self.get(var).is_some()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> Vec<(&Var, Option<&Term>)> {
        let mut out = Vec::with_capacity(self.len());
        let mut cur = self.head.as_deref();
        while let Some(entry) = cur {
            out.push((&entry.var, entry.value.as_ref()));
            cur = entry.parent.as_deref();
        }
        out.reverse();
        out
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.entries() == other.entries()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (var, value)) in self.entries().into_iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match value {
                Some(term) => write!(f, "({var} {term})")?,
                None => write!(f, "({var} UNDEF)")?,
            }
        }
        write!(f, ")")
    }
}

/// One iterator result: the primary value followed by auxiliary values
///
/// `None` marks an extraction that produced nothing.
pub type Row = Vec<Option<Term>>;

/// A non-empty, ordered group of rows
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    rows: Vec<Row>,
}

impl Batch {
    /// Create a batch; returns `None` for an empty row list
    pub fn new(rows: Vec<Row>) -> Option<Self> {
        if rows.is_empty() {
            None
        } else {
            Some(Self { rows })
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false; batches are never empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in scan order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Take ownership of the rows
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_shares_parent() {
        let x = Var::new("x");
        let y = Var::new("y");
        let base = Binding::new().bind(x.clone(), Term::string("a"));
        let extended = base.extend(y.clone(), None);

        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended.get(&x), Some(&Term::string("a")));
        assert!(extended.contains(&y));
        assert!(!extended.is_bound(&y));
        assert!(!base.contains(&y));
    }

    #[test]
    fn test_latest_entry_wins() {
        let x = Var::new("x");
        let b = Binding::new()
            .bind(x.clone(), Term::integer(1))
            .bind(x.clone(), Term::integer(2));
        assert_eq!(b.get(&x), Some(&Term::integer(2)));
    }

    #[test]
    fn test_entries_in_insertion_order() {
        let b = Binding::from_pairs([
            (Var::new("a"), Term::integer(1)),
            (Var::new("b"), Term::integer(2)),
        ]);
        let names: Vec<_> = b.entries().iter().map(|(v, _)| v.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(b.to_string(), format!("((?a {}) (?b {}))", Term::integer(1), Term::integer(2)));
    }

    #[test]
    fn test_batch_rejects_empty() {
        assert!(Batch::new(vec![]).is_none());
        let batch = Batch::new(vec![vec![Some(Term::integer(1))]]).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(!batch.is_empty());
    }
}
