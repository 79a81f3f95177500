//! BIND clause

use crate::binding::Binding;
use crate::context::ExecutionContext;
use crate::error::{GenerateError, Result};
use crate::expr::Expr;
use crate::term::Var;

/// `BIND(expr AS ?var)`
///
/// An expression that fails to evaluate leaves the variable absent, as in
/// SPARQL. Configuration and formatting errors still abort the run.
#[derive(Debug, Clone)]
pub struct BindPlan {
    expr: Expr,
    var: Var,
}

impl BindPlan {
    pub fn new(expr: Expr, var: Var) -> Self {
        Self { expr, var }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn var(&self) -> &Var {
        &self.var
    }

    pub async fn exec(&self, binding: &Binding, ctx: &ExecutionContext<'_>) -> Result<Binding> {
        match self.expr.eval(binding, ctx).await {
            Ok(value) => Ok(binding.bind(self.var.clone(), value)),
            Err(e @ GenerateError::Eval(_)) => {
                tracing::trace!(var = %self.var, error = %e, "BIND left variable unbound");
                Ok(binding.extend(self.var.clone(), None))
            }
            Err(e) if e.is_recoverable() => {
                tracing::debug!(var = %self.var, error = %e, "BIND left variable unbound");
                Ok(binding.extend(self.var.clone(), None))
            }
            Err(e) => Err(e),
        }
    }
}
