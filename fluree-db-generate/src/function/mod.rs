//! Template functions
//!
//! Functions are looked up by IRI in a `FunctionRegistry`. Each function is
//! checked once at build time (`build`, typically arity) and then evaluated
//! per binding (`exec`). Functions receive their argument *expressions*, not
//! values, so that they can decide how to handle a failing argument.
//!
//! Built-in functions:
//! - `st:format` ([`FormatFunction`]) - positional string formatting
//! - `st:incr` / `st:decr` ([`IndentFunction`]) - template indentation control

mod format;
mod indent;

pub use format::{format_positional, FormatFunction};
pub use indent::IndentFunction;

use crate::binding::Binding;
use crate::context::ExecutionContext;
use crate::error::{GenerateError, Result};
use crate::expr::Expr;
use crate::term::Term;
use async_trait::async_trait;
use fluree_vocab::st;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// A function callable from generation plan expressions
#[async_trait]
pub trait Function: Debug + Send + Sync {
    /// Build-time check of the argument list
    fn build(&self, args: &[Expr]) -> Result<()>;

    /// Evaluate the call for one binding
    async fn exec(&self, binding: &Binding, args: &[Expr], ctx: &ExecutionContext<'_>)
        -> Result<Term>;
}

/// Functions by IRI
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `st:format`, `st:incr` and `st:decr`
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(st::FORMAT, Arc::new(FormatFunction));
        registry.register(st::INCR, Arc::new(IndentFunction::incr()));
        registry.register(st::DECR, Arc::new(IndentFunction::decr()));
        registry
    }

    /// Register (or replace) a function
    pub fn register(&mut self, iri: impl Into<String>, function: Arc<dyn Function>) {
        self.functions.insert(iri.into(), function);
    }

    /// Look up a function
    pub fn get(&self, iri: &str) -> Result<Arc<dyn Function>> {
        self.functions
            .get(iri)
            .cloned()
            .ok_or_else(|| GenerateError::UnknownFunction(iri.to_string()))
    }

    pub fn contains(&self, iri: &str) -> bool {
        self.functions.contains_key(iri)
    }
}

/// Compact name for diagnostics (`st:format` rather than the full IRI)
pub(crate) fn display_name(iri: &str) -> String {
    match iri.strip_prefix(st::NS) {
        Some(local) => format!("st:{local}"),
        None => format!("<{iri}>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let registry = FunctionRegistry::with_defaults();
        assert!(registry.contains(st::FORMAT));
        assert!(registry.contains(st::INCR));
        assert!(registry.contains(st::DECR));
        assert!(matches!(
            registry.get("http://ex.org/f"),
            Err(GenerateError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(st::FORMAT), "st:format");
        assert_eq!(display_name("http://ex.org/f"), "<http://ex.org/f>");
    }
}
