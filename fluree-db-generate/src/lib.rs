//! Generation plan execution for Fluree DB
//!
//! This crate executes the clauses that pull external semi-structured
//! documents into a query and turn them into generated output:
//!
//! - **SOURCE** ([`SourcePlan`]): fetch a document by location, with content
//!   negotiation, and bind its content as a literal typed by media type
//! - **ITERATOR** ([`IteratorPlan`]): expand a binding into one binding per
//!   value produced by an iterator function, streamed in batches
//! - **BIND** ([`BindPlan`]): bind the value of an expression
//! - **GENERATE / TEMPLATE / PERFORM** ([`GenerationPlan`]): emit triples,
//!   emit indented text, or invoke other plans with arguments
//!
//! # Key Features
//!
//! - **Streaming JSON iteration**: `iter:JSONSurfer` scans a document once,
//!   forward-only, materializing only matched values
//! - **Push-based batches**: producers push bounded batches to a sink that
//!   can stop them at any batch boundary
//! - **Graceful degradation**: a failed lookup leaves a variable absent, a
//!   failed iteration yields no rows for that binding
//! - **Run-scoped template state**: indentation depth lives in the run's
//!   `TemplateContext`, shared by nested template invocations
//!
//! # Usage
//!
//! ```ignore
//! let fetcher = Arc::new(MemoryFetcher::new().with_document(
//!     "http://ex.org/people.json",
//!     r#"[{"name":"Alice"},{"name":"Bob"}]"#,
//!     Some("application/json"),
//! ));
//! let plan = GenerationPlan::template(
//!     TemplateBody::new(vec![Expr::var("name").into()]).with_separator(", "),
//! )
//! .with_clause(IteratorPlan::new(
//!     iter::JSON_SURFER,
//!     vec![Expr::iri("http://ex.org/people.json"), Expr::string("$[*].name")],
//!     vec![Var::new("name")],
//! ));
//! let output = GenerateEngine::new(fetcher).run(&plan, Binding::new()).await?;
//! assert_eq!(output.text, "Alice, Bob");
//! ```

pub mod binding;
pub mod context;
pub mod engine;
pub mod error;
pub mod expr;
pub mod fetch;
pub mod function;
pub mod iterator;
pub mod json;
pub mod options;
pub mod plan;
pub mod source;
pub mod template;
pub mod term;

pub use binding::{Batch, Binding, Row};
pub use context::{CancelFlag, ExecutionContext};
pub use engine::GenerateEngine;
pub use error::{GenerateError, Result};
pub use expr::Expr;
pub use fetch::{
    DocumentFetcher, FallbackFetcher, LocationMappedFetcher, LookUpRequest, MemoryFetcher,
    NoOpFetcher, TypedStream,
};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use function::{Function, FunctionRegistry};
pub use iterator::{
    BatchProducer, BatchSink, BatchStream, CollectSink, IterationOutcome, IterationStatus,
    IteratorFunction, IteratorRegistry, SinkControl,
};
pub use json::{value_to_term, JsonPath, JsonSurferIterator};
pub use options::GenerateOptions;
pub use plan::{
    BindPlan, ClausePlan, GenerationOutput, GenerationPlan, IteratorPlan, PerformPlan, PlanBody,
    PlanKind, TemplateBody, TemplateItem, Triple, TriplePattern,
};
pub use source::SourcePlan;
pub use template::TemplateContext;
pub use term::{media_type_datatype, Term, TermPattern, Var};
