//! `st:incr()` / `st:decr()`

use super::{display_name, Function};
use crate::binding::Binding;
use crate::context::ExecutionContext;
use crate::error::{GenerateError, Result};
use crate::expr::Expr;
use crate::term::Term;
use async_trait::async_trait;
use fluree_vocab::st;

/// Adjusts the indentation depth of the active template run by one level
///
/// Evaluates to the empty string so that a call can sit inline in a
/// template body. Outside a template run the call is a logged no-op.
#[derive(Debug, Clone, Copy)]
pub struct IndentFunction {
    delta: i8,
}

impl IndentFunction {
    /// `st:incr()`
    pub fn incr() -> Self {
        Self { delta: 1 }
    }

    /// `st:decr()`
    pub fn decr() -> Self {
        Self { delta: -1 }
    }

    fn iri(&self) -> &'static str {
        if self.delta > 0 {
            st::INCR
        } else {
            st::DECR
        }
    }
}

#[async_trait]
impl Function for IndentFunction {
    fn build(&self, args: &[Expr]) -> Result<()> {
        if !args.is_empty() {
            return Err(GenerateError::arity(
                display_name(self.iri()),
                format!("expecting no argument, got {}", args.len()),
            ));
        }
        Ok(())
    }

    async fn exec(
        &self,
        _binding: &Binding,
        args: &[Expr],
        ctx: &ExecutionContext<'_>,
    ) -> Result<Term> {
        self.build(args)?;
        match ctx.template() {
            Some(template) if self.delta > 0 => template.incr(),
            Some(template) => template.decr(),
            None => tracing::warn!(
                function = %display_name(self.iri()),
                "calling {}() outside TEMPLATE context",
                display_name(self.iri())
            ),
        }
        Ok(Term::string(""))
    }
}
