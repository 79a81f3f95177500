//! ITERATOR clause

use crate::binding::{Binding, Row};
use crate::context::ExecutionContext;
use crate::error::{GenerateError, Result};
use crate::expr::Expr;
use crate::function::FunctionRegistry;
use crate::iterator::{BatchStream, IteratorRegistry};
use crate::term::Var;
use std::sync::Arc;
use tracing::{debug, warn};

/// `ITERATOR <iri>(args...) AS ?v1 ?v2 ...`
///
/// Expands one input binding into one binding per produced row. Row values
/// are bound to the declared variables by position.
#[derive(Debug, Clone)]
pub struct IteratorPlan {
    iterator: Arc<str>,
    args: Vec<Expr>,
    vars: Vec<Var>,
}

impl IteratorPlan {
    pub fn new(iterator: impl Into<Arc<str>>, args: Vec<Expr>, vars: Vec<Var>) -> Self {
        Self {
            iterator: iterator.into(),
            args,
            vars,
        }
    }

    pub fn iterator(&self) -> &str {
        &self.iterator
    }

    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// Build-time checks: the iterator exists and accepts the arguments
    pub fn validate(&self, functions: &FunctionRegistry, iterators: &IteratorRegistry) -> Result<()> {
        iterators.get(&self.iterator)?.build(&self.args)?;
        self.args.iter().try_for_each(|a| a.validate(functions))
    }

    /// Start iterating for one input binding
    ///
    /// `None` means this binding produces no rows: an argument did not
    /// evaluate, or the document could not be acquired.
    pub async fn open(&self, binding: &Binding, ctx: &ExecutionContext<'_>) -> Result<Option<BatchStream>> {
        let iterator = ctx.iterators.get(&self.iterator)?;
        let args = match Expr::eval_all(&self.args, binding, ctx).await {
            Ok(args) => args,
            Err(e @ GenerateError::Eval(_)) => {
                debug!(iterator = %self.iterator, error = %e, "iterator argument unbound, no rows");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        match iterator.open(args, ctx).await {
            Ok(producer) => Ok(Some(BatchStream::spawn(producer))),
            Err(e) if e.is_recoverable() => {
                warn!(iterator = %self.iterator, error = %e, "iteration skipped for binding");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Extend `binding` with one row
    ///
    /// Extra values or extra variables beyond the common prefix are ignored.
    pub fn bind_row(&self, binding: &Binding, row: Row) -> Binding {
        self.vars
            .iter()
            .zip(row)
            .fold(binding.clone(), |b, (var, value)| b.extend(var.clone(), value))
    }

    /// Expand one binding into all of its rows
    pub async fn exec(&self, binding: &Binding, ctx: &ExecutionContext<'_>) -> Result<Vec<Binding>> {
        let mut out = Vec::new();
        let Some(mut stream) = self.open(binding, ctx).await? else {
            return Ok(out);
        };
        while let Some(batch) = stream.next().await {
            out.extend(batch.into_rows().into_iter().map(|row| self.bind_row(binding, row)));
        }
        let outcome = stream.finish().await;
        if outcome.is_failed() {
            warn!(iterator = %self.iterator, outcome = %outcome, "iteration failed");
        }
        Ok(out)
    }
}
