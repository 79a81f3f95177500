//! Generation engine: entry point for running plans
//!
//! The engine owns the services shared by every run (fetcher, function and
//! iterator registries, options). Each call to [`GenerateEngine::run`]
//! validates the plan, creates a top-level `ExecutionContext` and runs the
//! plan once for the given initial binding.

use crate::binding::Binding;
use crate::context::{CancelFlag, ExecutionContext};
use crate::error::Result;
use crate::fetch::{DocumentFetcher, FallbackFetcher, LocationMappedFetcher};
use crate::function::{Function, FunctionRegistry};
use crate::iterator::{IteratorFunction, IteratorRegistry};
use crate::options::GenerateOptions;
use crate::plan::{GenerationOutput, GenerationPlan};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runs generation plans against a document fetcher
#[derive(Debug, Clone)]
pub struct GenerateEngine {
    fetcher: Arc<dyn DocumentFetcher>,
    functions: FunctionRegistry,
    iterators: IteratorRegistry,
    options: GenerateOptions,
}

impl GenerateEngine {
    /// Create an engine with the built-in functions and iterators
    pub fn new(fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self {
            fetcher,
            functions: FunctionRegistry::with_defaults(),
            iterators: IteratorRegistry::with_defaults(),
            options: GenerateOptions::default(),
        }
    }

    /// Create an engine fetching from `file://` IRIs, the given location
    /// mappings (`IRI=/path;...`) and, with the `http` feature, the web
    ///
    /// `FLUREE_GENERATE_*` environment variables override `options`.
    pub fn with_default_fetchers(options: GenerateOptions, mappings: Option<&str>) -> Result<Self> {
        let options = options.with_env_overrides();
        let files = match mappings {
            Some(mappings) => LocationMappedFetcher::from_mapping_str(mappings)?,
            None => LocationMappedFetcher::new(),
        };
        #[allow(unused_mut)]
        let mut fetcher = FallbackFetcher::new().with(Arc::new(files));
        #[cfg(feature = "http")]
        {
            let timeout = std::time::Duration::from_millis(options.http_timeout_ms);
            fetcher = fetcher.with(Arc::new(crate::fetch::HttpFetcher::new(timeout)?));
        }
        Ok(Self::new(Arc::new(fetcher)).with_options(options))
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Register (or replace) a function
    pub fn with_function(mut self, iri: impl Into<String>, function: Arc<dyn Function>) -> Self {
        self.functions.register(iri, function);
        self
    }

    /// Register (or replace) an iterator function
    pub fn with_iterator(mut self, iterator: Arc<dyn IteratorFunction>) -> Self {
        self.iterators.register(iterator);
        self
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn iterators(&self) -> &IteratorRegistry {
        &self.iterators
    }

    /// A top-level execution context over this engine's services
    pub fn context(&self) -> ExecutionContext<'_> {
        ExecutionContext::new(
            self.fetcher.as_ref(),
            &self.functions,
            &self.iterators,
            &self.options,
        )
    }

    /// Validate and run a plan once
    pub async fn run(&self, plan: &GenerationPlan, initial: Binding) -> Result<GenerationOutput> {
        self.run_with_cancel(plan, initial, CancelFlag::new()).await
    }

    /// Validate and run a plan, stopping early once `cancel` is set
    ///
    /// A cancelled run returns what was produced before cancellation.
    pub async fn run_with_cancel(
        &self,
        plan: &GenerationPlan,
        initial: Binding,
        cancel: CancelFlag,
    ) -> Result<GenerationOutput> {
        plan.validate(&self.functions, &self.iterators)?;
        let ctx = self.context().with_cancel_flag(cancel);
        let start = Instant::now();
        debug!(plan = plan.name().unwrap_or("<anonymous>"), kind = %plan.kind(), "generation run started");

        let output = plan.run_nested(initial, &ctx).await?;

        if ctx.is_cancelled() {
            info!(
                plan = plan.name().unwrap_or("<anonymous>"),
                triples = output.triples.len(),
                "generation run cancelled"
            );
        }
        debug!(
            triples = output.triples.len(),
            text_bytes = output.text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generation run finished"
        );
        Ok(output)
    }
}
