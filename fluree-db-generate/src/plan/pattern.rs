//! Triple templates for GENERATE plans

use crate::binding::Binding;
use crate::term::{Term, TermPattern};
use std::fmt;

/// A generated RDF triple
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for Triple {
    /// N-Triples line (without the trailing newline)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// A triple template
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: TermPattern,
    pub predicate: TermPattern,
    pub object: TermPattern,
}

impl TriplePattern {
    pub fn new(
        subject: impl Into<TermPattern>,
        predicate: impl Into<TermPattern>,
        object: impl Into<TermPattern>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Instantiate against a binding
    ///
    /// `None` when a variable is unbound, the subject is a literal, or the
    /// predicate is not an IRI.
    pub fn instantiate(&self, binding: &Binding) -> Option<Triple> {
        let subject = self.subject.resolve(binding)?;
        let predicate = self.predicate.resolve(binding)?;
        let object = self.object.resolve(binding)?;
        if subject.is_literal() || !predicate.is_iri() {
            return None;
        }
        Some(Triple::new(subject.clone(), predicate.clone(), object.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Var;

    #[test]
    fn test_instantiate() {
        let pattern = TriplePattern::new(
            Var::new("s"),
            Term::iri("http://ex.org/p"),
            Var::new("o"),
        );
        let binding = Binding::new()
            .bind(Var::new("s"), Term::iri("http://ex.org/a"))
            .bind(Var::new("o"), Term::integer(1));
        let triple = pattern.instantiate(&binding).unwrap();
        assert_eq!(
            triple.to_string(),
            "<http://ex.org/a> <http://ex.org/p> \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> ."
        );
    }

    #[test]
    fn test_skips_unbound_and_ill_formed() {
        let pattern = TriplePattern::new(
            Var::new("s"),
            Term::iri("http://ex.org/p"),
            Var::new("o"),
        );
        let partial = Binding::new()
            .bind(Var::new("s"), Term::iri("http://ex.org/a"))
            .extend(Var::new("o"), None);
        assert!(pattern.instantiate(&partial).is_none());

        let literal_subject = Binding::new()
            .bind(Var::new("s"), Term::string("x"))
            .bind(Var::new("o"), Term::integer(1));
        assert!(pattern.instantiate(&literal_subject).is_none());
    }
}
