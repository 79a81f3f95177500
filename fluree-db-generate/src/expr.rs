//! Argument expressions
//!
//! Clause and function arguments are small expression trees: a constant
//! term, a variable, or a call to a registered function. Evaluating an
//! expression against a binding yields a `Term` or an error; an unbound
//! variable is an evaluation error (`GenerateError::Eval`).

use crate::binding::Binding;
use crate::context::ExecutionContext;
use crate::error::{GenerateError, Result};
use crate::function::FunctionRegistry;
use crate::term::{Term, Var};
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;

/// An argument expression
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A constant term
    Const(Term),
    /// A variable reference
    Var(Var),
    /// A call to a registered function
    Call { function: Arc<str>, args: Vec<Expr> },
}

impl Expr {
    /// Constant plain string
    pub fn string(value: impl Into<Arc<str>>) -> Self {
        Expr::Const(Term::string(value))
    }

    /// Constant IRI
    pub fn iri(iri: impl Into<Arc<str>>) -> Self {
        Expr::Const(Term::iri(iri))
    }

    /// Constant `xsd:integer`
    pub fn integer(value: i64) -> Self {
        Expr::Const(Term::integer(value))
    }

    /// Variable reference
    pub fn var(name: impl AsRef<str>) -> Self {
        Expr::Var(Var::new(name))
    }

    /// Function call
    pub fn call(function: impl Into<Arc<str>>, args: Vec<Expr>) -> Self {
        Expr::Call {
            function: function.into(),
            args,
        }
    }

    /// The constant term, if this is a constant
    pub fn as_const(&self) -> Option<&Term> {
        match self {
            Expr::Const(t) => Some(t),
            _ => None,
        }
    }

    /// Build-time validation: every called function exists and accepts its arguments
    pub fn validate(&self, functions: &FunctionRegistry) -> Result<()> {
        match self {
            Expr::Const(_) | Expr::Var(_) => Ok(()),
            Expr::Call { function, args } => {
                functions.get(function)?.build(args)?;
                args.iter().try_for_each(|a| a.validate(functions))
            }
        }
    }

    /// Evaluate against a binding
    pub fn eval<'a>(
        &'a self,
        binding: &'a Binding,
        ctx: &'a ExecutionContext<'_>,
    ) -> BoxFuture<'a, Result<Term>> {
        async move {
            match self {
                Expr::Const(term) => Ok(term.clone()),
                Expr::Var(var) => binding
                    .get(var)
                    .cloned()
                    .ok_or_else(|| GenerateError::Eval(format!("variable {var} is unbound"))),
                Expr::Call { function, args } => {
                    let f = ctx.functions.get(function)?;
                    f.exec(binding, args, ctx).await
                }
            }
        }
        .boxed()
    }

    /// Evaluate every expression in order, stopping at the first error
    pub async fn eval_all(
        exprs: &[Expr],
        binding: &Binding,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Vec<Term>> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(expr.eval(binding, ctx).await?);
        }
        Ok(values)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(term) => write!(f, "{term}"),
            Expr::Var(var) => write!(f, "{var}"),
            Expr::Call { function, args } => {
                write!(f, "<{function}>(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::NoOpFetcher;
    use crate::iterator::IteratorRegistry;
    use crate::options::GenerateOptions;
    use fluree_vocab::st;

    #[tokio::test]
    async fn test_eval_const_and_var() {
        let functions = FunctionRegistry::with_defaults();
        let iterators = IteratorRegistry::with_defaults();
        let options = GenerateOptions::default();
        let ctx = ExecutionContext::new(&NoOpFetcher, &functions, &iterators, &options);

        let binding = Binding::new().bind(Var::new("x"), Term::integer(3));
        assert_eq!(
            Expr::var("x").eval(&binding, &ctx).await.unwrap(),
            Term::integer(3)
        );
        assert_eq!(
            Expr::string("s").eval(&binding, &ctx).await.unwrap(),
            Term::string("s")
        );

        let err = Expr::var("y").eval(&binding, &ctx).await.unwrap_err();
        assert!(matches!(err, GenerateError::Eval(_)));
    }

    #[tokio::test]
    async fn test_eval_unknown_function() {
        let functions = FunctionRegistry::with_defaults();
        let iterators = IteratorRegistry::with_defaults();
        let options = GenerateOptions::default();
        let ctx = ExecutionContext::new(&NoOpFetcher, &functions, &iterators, &options);

        let expr = Expr::call("http://ex.org/nope", vec![]);
        let err = expr.eval(&Binding::new(), &ctx).await.unwrap_err();
        assert!(matches!(err, GenerateError::UnknownFunction(_)));
        assert!(expr.validate(&functions).is_err());
    }

    #[test]
    fn test_validate_checks_arity() {
        let functions = FunctionRegistry::with_defaults();
        assert!(Expr::call(st::INCR, vec![]).validate(&functions).is_ok());
        assert!(Expr::call(st::INCR, vec![Expr::integer(1)])
            .validate(&functions)
            .is_err());
        assert!(Expr::call(st::FORMAT, vec![]).validate(&functions).is_err());
    }

    #[test]
    fn test_display() {
        let expr = Expr::call(st::FORMAT, vec![Expr::string("%s"), Expr::var("x")]);
        assert_eq!(expr.to_string(), format!("<{}>(\"%s\", ?x)", st::FORMAT));
    }
}
