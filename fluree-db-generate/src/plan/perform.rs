//! PERFORM: invoke another generation plan with arguments

use super::{GenerationOutput, GenerationPlan};
use crate::binding::Binding;
use crate::context::ExecutionContext;
use crate::error::{GenerateError, Result};
use crate::expr::Expr;
use crate::function::FunctionRegistry;
use crate::iterator::IteratorRegistry;
use std::sync::Arc;

/// `PERFORM <plan>(args...)`
///
/// Arguments are bound to the target's parameters by position and the
/// target runs once per calling binding.
#[derive(Debug, Clone)]
pub struct PerformPlan {
    target: Arc<GenerationPlan>,
    args: Vec<Expr>,
}

impl PerformPlan {
    /// The argument count must match the target's parameter count
    pub fn new(target: Arc<GenerationPlan>, args: Vec<Expr>) -> Result<Self> {
        if args.len() != target.params().len() {
            return Err(GenerateError::Configuration(format!(
                "PERFORM {}: expecting {} argument(s), got {}",
                target.display_name(),
                target.params().len(),
                args.len()
            )));
        }
        Ok(Self { target, args })
    }

    pub fn target(&self) -> &GenerationPlan {
        &self.target
    }

    pub(crate) fn validate(
        &self,
        functions: &FunctionRegistry,
        iterators: &IteratorRegistry,
    ) -> Result<()> {
        self.args.iter().try_for_each(|a| a.validate(functions))?;
        self.target.validate(functions, iterators)
    }

    /// Run the target for one calling binding
    ///
    /// An argument that fails to evaluate skips the invocation.
    pub async fn exec(&self, binding: &Binding, ctx: &ExecutionContext<'_>) -> Result<GenerationOutput> {
        let values = match Expr::eval_all(&self.args, binding, ctx).await {
            Ok(values) => values,
            Err(e @ GenerateError::Eval(_)) => {
                tracing::debug!(
                    target = %self.target.display_name(),
                    error = %e,
                    "PERFORM argument did not evaluate, skipping"
                );
                return Ok(GenerationOutput::default());
            }
            Err(e) => return Err(e),
        };
        let initial = Binding::from_pairs(self.target.params().iter().cloned().zip(values));
        self.target.run_nested(initial, ctx).await
    }
}
