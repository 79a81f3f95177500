//! Generation plans
//!
//! A `GenerationPlan` is a list of clauses followed by a body:
//!
//! ```text
//! GENERATE | TEMPLATE | PERFORM-type plan (params...)
//!   SOURCE  <loc> ACCEPT <type> AS ?doc        -- augments the binding
//!   ITERATOR <iter>(args) AS ?v1 ?v2           -- expands the binding
//!   BIND(expr AS ?v)                           -- augments the binding
//! body: triple templates | template items | PERFORMs
//! ```
//!
//! Clauses are processed depth-first, one binding at a time. Each binding
//! that reaches the end of the clause list is handed to the body.
//!
//! ## Template state
//!
//! A TEMPLATE-type plan writes into the `TemplateContext` of its run. When
//! it is performed from within another template run it shares the caller's
//! context, so indentation nests and text lands in invocation order; in
//! every other case it starts a fresh context and returns its text in
//! [`GenerationOutput::text`].

mod bind;
mod iterator;
mod pattern;
mod perform;

pub use bind::BindPlan;
pub use iterator::IteratorPlan;
pub use pattern::{Triple, TriplePattern};
pub use perform::PerformPlan;

use crate::binding::Binding;
use crate::context::ExecutionContext;
use crate::error::{GenerateError, Result};
use crate::expr::Expr;
use crate::function::FunctionRegistry;
use crate::iterator::IteratorRegistry;
use crate::source::SourcePlan;
use crate::template::TemplateContext;
use crate::term::Var;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use tracing::{trace, warn, Instrument};

/// What a plan produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// RDF triples
    Generate,
    /// Text
    Template,
    /// Nothing of its own; invokes other plans
    Perform,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlanKind::Generate => "GENERATE",
            PlanKind::Template => "TEMPLATE",
            PlanKind::Perform => "PERFORM",
        })
    }
}

/// A SOURCE, ITERATOR or BIND clause
#[derive(Debug, Clone)]
pub enum ClausePlan {
    Source(SourcePlan),
    Iterator(IteratorPlan),
    Bind(BindPlan),
}

impl From<SourcePlan> for ClausePlan {
    fn from(plan: SourcePlan) -> Self {
        ClausePlan::Source(plan)
    }
}

impl From<IteratorPlan> for ClausePlan {
    fn from(plan: IteratorPlan) -> Self {
        ClausePlan::Iterator(plan)
    }
}

impl From<BindPlan> for ClausePlan {
    fn from(plan: BindPlan) -> Self {
        ClausePlan::Bind(plan)
    }
}

/// One element of a template body
#[derive(Debug, Clone)]
pub enum TemplateItem {
    /// Text of the evaluated expression; nothing when it does not evaluate
    Expr(Expr),
    /// Output of a performed plan, inline
    Perform(PerformPlan),
}

impl From<Expr> for TemplateItem {
    fn from(expr: Expr) -> Self {
        TemplateItem::Expr(expr)
    }
}

impl From<PerformPlan> for TemplateItem {
    fn from(plan: PerformPlan) -> Self {
        TemplateItem::Perform(plan)
    }
}

/// `TEMPLATE { before? items... ; separator = "..." ; after? }`
#[derive(Debug, Clone, Default)]
pub struct TemplateBody {
    pub items: Vec<TemplateItem>,
    /// Written once, before the first binding
    pub before: Option<String>,
    /// Written between the output of consecutive bindings
    pub separator: Option<String>,
    /// Written once, after the last binding
    pub after: Option<String>,
}

impl TemplateBody {
    pub fn new(items: Vec<TemplateItem>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn with_before(mut self, text: impl Into<String>) -> Self {
        self.before = Some(text.into());
        self
    }

    pub fn with_separator(mut self, text: impl Into<String>) -> Self {
        self.separator = Some(text.into());
        self
    }

    pub fn with_after(mut self, text: impl Into<String>) -> Self {
        self.after = Some(text.into());
        self
    }
}

/// The body run for each binding that reaches the end of the clauses
#[derive(Debug, Clone)]
pub enum PlanBody {
    Generate(Vec<TriplePattern>),
    Template(TemplateBody),
    Perform(Vec<PerformPlan>),
}

/// Triples and text produced by a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOutput {
    pub triples: Vec<Triple>,
    pub text: String,
}

impl GenerationOutput {
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty() && self.text.is_empty()
    }

    /// Append another output after this one
    pub fn merge(&mut self, other: GenerationOutput) {
        self.triples.extend(other.triples);
        self.text.push_str(&other.text);
    }

    /// Triples as an N-Triples document
    pub fn to_ntriples(&self) -> String {
        let mut out = String::new();
        for triple in &self.triples {
            out.push_str(&triple.to_string());
            out.push('\n');
        }
        out
    }
}

/// Accumulators for one plan run
#[derive(Default)]
struct RunState {
    output: GenerationOutput,
    /// Bindings that reached the body
    solutions: usize,
}

impl RunState {
    /// Text goes to the active template writer when there is one
    fn emit_text(&mut self, ctx: &ExecutionContext<'_>, text: &str) {
        if text.is_empty() {
            return;
        }
        match ctx.template() {
            Some(template) => template.write(text),
            None => self.output.text.push_str(text),
        }
    }

    fn absorb(&mut self, nested: GenerationOutput, ctx: &ExecutionContext<'_>) {
        self.output.triples.extend(nested.triples);
        self.emit_text(ctx, &nested.text);
    }
}

/// A GENERATE, TEMPLATE or PERFORM-type plan
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    name: Option<String>,
    params: Vec<Var>,
    clauses: Vec<ClausePlan>,
    body: PlanBody,
}

impl GenerationPlan {
    fn with_body(body: PlanBody) -> Self {
        Self {
            name: None,
            params: Vec::new(),
            clauses: Vec::new(),
            body,
        }
    }

    /// A plan producing triples
    pub fn generate(triples: Vec<TriplePattern>) -> Self {
        Self::with_body(PlanBody::Generate(triples))
    }

    /// A plan producing text
    pub fn template(body: TemplateBody) -> Self {
        Self::with_body(PlanBody::Template(body))
    }

    /// A plan invoking other plans
    pub fn perform(calls: Vec<PerformPlan>) -> Self {
        Self::with_body(PlanBody::Perform(calls))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declared parameters, bound positionally by PERFORM
    pub fn with_params(mut self, params: Vec<Var>) -> Self {
        self.params = params;
        self
    }

    /// Append a clause
    pub fn with_clause(mut self, clause: impl Into<ClausePlan>) -> Self {
        self.clauses.push(clause.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn display_name(&self) -> String {
        match &self.name {
            Some(name) => format!("<{name}>"),
            None => "<anonymous>".to_string(),
        }
    }

    pub fn kind(&self) -> PlanKind {
        match self.body {
            PlanBody::Generate(_) => PlanKind::Generate,
            PlanBody::Template(_) => PlanKind::Template,
            PlanBody::Perform(_) => PlanKind::Perform,
        }
    }

    pub fn params(&self) -> &[Var] {
        &self.params
    }

    pub fn clauses(&self) -> &[ClausePlan] {
        &self.clauses
    }

    pub fn body(&self) -> &PlanBody {
        &self.body
    }

    /// Build every function and iterator call, recursively through PERFORMs
    pub fn validate(&self, functions: &FunctionRegistry, iterators: &IteratorRegistry) -> Result<()> {
        for clause in &self.clauses {
            match clause {
                ClausePlan::Source(_) => {}
                ClausePlan::Iterator(plan) => plan.validate(functions, iterators)?,
                ClausePlan::Bind(plan) => plan.expr().validate(functions)?,
            }
        }
        match &self.body {
            PlanBody::Generate(_) => Ok(()),
            PlanBody::Template(body) => body.items.iter().try_for_each(|item| match item {
                TemplateItem::Expr(expr) => expr.validate(functions),
                TemplateItem::Perform(call) => call.validate(functions, iterators),
            }),
            PlanBody::Perform(calls) => calls
                .iter()
                .try_for_each(|call| call.validate(functions, iterators)),
        }
    }

    /// Run as an independent invocation from `caller`
    ///
    /// A TEMPLATE-type plan shares the caller's template context when there
    /// is one; otherwise each run gets its own.
    pub(crate) async fn run_nested(
        &self,
        initial: Binding,
        caller: &ExecutionContext<'_>,
    ) -> Result<GenerationOutput> {
        match (self.kind(), caller.template()) {
            (PlanKind::Template, Some(template)) => {
                let ctx = caller.with_template(Some(template.clone()));
                self.execute(initial, &ctx).await
            }
            (PlanKind::Template, None) => {
                let template = TemplateContext::new(caller.options.indent_unit);
                let ctx = caller.with_template(Some(template.clone()));
                let mut output = self.execute(initial, &ctx).await?;
                output.text.push_str(&template.take_output());
                Ok(output)
            }
            _ => {
                let ctx = caller.with_template(None);
                self.execute(initial, &ctx).await
            }
        }
    }

    async fn execute(&self, initial: Binding, ctx: &ExecutionContext<'_>) -> Result<GenerationOutput> {
        let span = tracing::debug_span!(
            "generation_plan",
            plan = %self.display_name(),
            kind = %self.kind(),
            solutions = tracing::field::Empty,
        );
        let state = async {
            let mut state = RunState::default();
            let template = match &self.body {
                PlanBody::Template(body) => Some(body),
                _ => None,
            };
            if let Some(before) = template.and_then(|t| t.before.as_deref()) {
                state.emit_text(ctx, before);
            }
            self.run_clauses(0, initial, ctx, &mut state).await?;
            if let Some(after) = template.and_then(|t| t.after.as_deref()) {
                state.emit_text(ctx, after);
            }
            Ok::<_, GenerateError>(state)
        }
        .instrument(span.clone())
        .await?;
        span.record("solutions", state.solutions as u64);
        Ok(state.output)
    }

    fn run_clauses<'a>(
        &'a self,
        index: usize,
        binding: Binding,
        ctx: &'a ExecutionContext<'_>,
        state: &'a mut RunState,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if ctx.is_cancelled() {
                return Ok(());
            }
            let Some(clause) = self.clauses.get(index) else {
                return self.run_body(&binding, ctx, state).await;
            };
            match clause {
                ClausePlan::Source(source) => {
                    let next = source.exec(&binding, ctx).await?;
                    self.run_clauses(index + 1, next, ctx, state).await
                }
                ClausePlan::Bind(bind) => {
                    let next = bind.exec(&binding, ctx).await?;
                    self.run_clauses(index + 1, next, ctx, state).await
                }
                ClausePlan::Iterator(iterator) => {
                    let Some(mut stream) = iterator.open(&binding, ctx).await? else {
                        return Ok(());
                    };
                    let mut result = Ok(());
                    'batches: while let Some(batch) = stream.next().await {
                        for row in batch.into_rows() {
                            let next = iterator.bind_row(&binding, row);
                            if let Err(e) = self.run_clauses(index + 1, next, ctx, state).await {
                                result = Err(e);
                                break 'batches;
                            }
                        }
                        if ctx.is_cancelled() {
                            break;
                        }
                    }
                    let outcome = stream.finish().await;
                    if outcome.is_failed() {
                        warn!(
                            iterator = iterator.iterator(),
                            outcome = %outcome,
                            "iteration failed, keeping rows delivered so far"
                        );
                    } else {
                        trace!(iterator = iterator.iterator(), outcome = %outcome, "iteration done");
                    }
                    result
                }
            }
        }
        .boxed()
    }

    async fn run_body(
        &self,
        binding: &Binding,
        ctx: &ExecutionContext<'_>,
        state: &mut RunState,
    ) -> Result<()> {
        match &self.body {
            PlanBody::Generate(triples) => {
                for pattern in triples {
                    match pattern.instantiate(binding) {
                        Some(triple) => state.output.triples.push(triple),
                        None => trace!(binding = %binding, "triple template skipped"),
                    }
                }
            }
            PlanBody::Template(body) => {
                if state.solutions > 0 {
                    if let Some(separator) = &body.separator {
                        state.emit_text(ctx, separator);
                    }
                }
                for item in &body.items {
                    match item {
                        TemplateItem::Expr(expr) => match expr.eval(binding, ctx).await {
                            Ok(value) => state.emit_text(ctx, &value.to_unquoted_string()),
                            Err(GenerateError::Eval(message)) => {
                                trace!(expr = %expr, error = %message, "template expression unbound")
                            }
                            Err(e) => return Err(e),
                        },
                        TemplateItem::Perform(call) => {
                            let nested = call.exec(binding, ctx).await?;
                            state.absorb(nested, ctx);
                        }
                    }
                }
            }
            PlanBody::Perform(calls) => {
                for call in calls {
                    let nested = call.exec(binding, ctx).await?;
                    state.absorb(nested, ctx);
                }
            }
        }
        state.solutions += 1;
        Ok(())
    }
}
