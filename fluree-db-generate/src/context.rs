//! Execution context for generation plans
//!
//! The `ExecutionContext` is threaded by reference through every clause,
//! function and iterator of a run. It provides:
//! - the document fetcher shared by SOURCE clauses, iterators and `st:format`
//! - the function and iterator registries
//! - the run options (debug mode, indentation unit)
//! - the active `TemplateContext`, when inside a TEMPLATE-type run
//! - a cooperative cancel flag observed by streaming iterators

use crate::fetch::DocumentFetcher;
use crate::function::FunctionRegistry;
use crate::iterator::IteratorRegistry;
use crate::options::GenerateOptions;
use crate::template::TemplateContext;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a run and its producers
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every producer observing this flag to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Execution context providing access to run-scoped services and state
pub struct ExecutionContext<'a> {
    /// Document fetcher (shared, safe for concurrent use)
    pub fetcher: &'a dyn DocumentFetcher,
    /// Registered functions (`st:format`, `st:incr`, ...)
    pub functions: &'a FunctionRegistry,
    /// Registered iterator functions (`iter:JSONSurfer`, ...)
    pub iterators: &'a IteratorRegistry,
    /// Run options
    pub options: &'a GenerateOptions,
    /// Active template state, if this is (nested in) a TEMPLATE run
    template: Option<TemplateContext>,
    /// Cancellation flag for this run
    cancel: CancelFlag,
}

impl<'a> ExecutionContext<'a> {
    /// Create a top-level context (no active template)
    pub fn new(
        fetcher: &'a dyn DocumentFetcher,
        functions: &'a FunctionRegistry,
        iterators: &'a IteratorRegistry,
        options: &'a GenerateOptions,
    ) -> Self {
        Self {
            fetcher,
            functions,
            iterators,
            options,
            template: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Use an externally owned cancel flag
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Derive a context for a nested run with the given template state
    ///
    /// Services, options and the cancel flag are shared with the parent.
    pub fn with_template(&self, template: Option<TemplateContext>) -> ExecutionContext<'a> {
        ExecutionContext {
            fetcher: self.fetcher,
            functions: self.functions,
            iterators: self.iterators,
            options: self.options,
            template,
            cancel: self.cancel.clone(),
        }
    }

    /// Active template state
    pub fn template(&self) -> Option<&TemplateContext> {
        self.template.as_ref()
    }

    /// Whether failing `st:format` arguments degrade to inline diagnostics
    pub fn debug_template(&self) -> bool {
        self.options.debug_template
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::NoOpFetcher;

    #[test]
    fn test_with_template_shares_cancel_flag() {
        let functions = FunctionRegistry::with_defaults();
        let iterators = IteratorRegistry::with_defaults();
        let options = GenerateOptions::default();
        let ctx = ExecutionContext::new(&NoOpFetcher, &functions, &iterators, &options);
        assert!(ctx.template().is_none());

        let template = TemplateContext::new(2);
        let nested = ctx.with_template(Some(template.clone()));
        assert!(nested.template().unwrap().same_run(&template));

        nested.cancel();
        assert!(ctx.is_cancelled());
    }
}
