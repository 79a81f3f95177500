//! `iter:JSONSurfer(document, path [, batchSize] [, auxPath...])`
//!
//! Streams the values matching a JSONPath in a JSON document. Each match
//! yields one row: the matched value, then one optional value per auxiliary
//! path evaluated against the match.
//!
//! ```text
//! ITERATOR iter:JSONSurfer(<http://ex.org/people.json>, "$.people[*]", 100, "name", "age")
//!          AS ?person ?name ?age
//! ```

use super::path::JsonPath;
use super::stream::{scan, ScanEnd};
use super::term::value_to_term;
use crate::binding::{Batch, Row};
use crate::context::{CancelFlag, ExecutionContext};
use crate::error::{GenerateError, Result};
use crate::expr::Expr;
use crate::fetch::LookUpRequest;
use crate::iterator::{
    BatchProducer, BatchSink, IterationOutcome, IterationStatus, IteratorFunction, SinkControl,
};
use crate::term::Term;
use async_trait::async_trait;
use fluree_vocab::iter;
use serde_json::Value;
use std::io::{Cursor, Read};
use std::ops::ControlFlow;
use tracing::{debug, warn};

/// The JSON streaming iterator
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSurferIterator;

impl JsonSurferIterator {
    pub fn new() -> Self {
        Self
    }
}

/// Parsed iterator arguments (everything but the document)
#[derive(Debug)]
struct SurferArgs {
    path: JsonPath,
    /// 0 = everything in one batch
    batch_size: usize,
    aux: Vec<JsonPath>,
}

impl SurferArgs {
    fn parse(args: &[Term]) -> Result<Self> {
        if args.len() < 2 {
            return Err(arity_error(args.len()));
        }
        let path = match args[1].as_str() {
            Some(p) => JsonPath::compile_streaming(p)?,
            None => {
                return Err(GenerateError::Configuration(format!(
                    "iter:JSONSurfer: path must be a string, got {}",
                    args[1]
                )))
            }
        };

        let mut rest = &args[2..];
        let mut batch_size = 0;
        if let Some(n) = rest.first().and_then(Term::as_integer) {
            batch_size = usize::try_from(n).unwrap_or(0);
            rest = &rest[1..];
        }

        let aux = rest
            .iter()
            .map(|arg| match arg.as_str() {
                Some(p) => JsonPath::compile(p),
                None => Err(GenerateError::Configuration(format!(
                    "iter:JSONSurfer: auxiliary path must be a string, got {arg}"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            path,
            batch_size,
            aux,
        })
    }
}

fn arity_error(got: usize) -> GenerateError {
    GenerateError::arity(
        "iter:JSONSurfer",
        format!("expecting a document and a path, got {got} argument(s)"),
    )
}

#[async_trait]
impl IteratorFunction for JsonSurferIterator {
    fn name(&self) -> &str {
        iter::JSON_SURFER
    }

    fn build(&self, args: &[Expr]) -> Result<()> {
        if args.len() < 2 {
            return Err(arity_error(args.len()));
        }
        // Constant arguments can be checked before the first binding.
        if let Some(constants) = args
            .iter()
            .map(|a| a.as_const().cloned())
            .collect::<Option<Vec<Term>>>()
        {
            return SurferArgs::parse(&constants).map(|_| ());
        }
        match args[1].as_const() {
            Some(term) => match term.as_str() {
                Some(path) => JsonPath::compile_streaming(path).map(|_| ()),
                None => Err(GenerateError::Configuration(format!(
                    "iter:JSONSurfer: path must be a string, got {term}"
                ))),
            },
            None => Ok(()),
        }
    }

    async fn open(
        &self,
        args: Vec<Term>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Box<dyn BatchProducer>> {
        let parsed = SurferArgs::parse(&args)?;

        let (source, reader): (String, Box<dyn Read + Send>) = match &args[0] {
            Term::Iri(iri) => {
                let request = LookUpRequest::new(iri.to_string(), ctx.options.json_accept.clone());
                let stream = ctx.fetcher.open(&request).await.ok_or_else(|| {
                    GenerateError::Iteration(format!("could not look up document {request}"))
                })?;
                debug!(request = %request, media_type = ?stream.media_type(), "opened JSON document");
                (iri.to_string(), stream.into_reader())
            }
            doc @ Term::Literal { lexical, .. } if doc.as_str().is_some() || doc.is_document() => {
                let reader: Box<dyn Read + Send> = Box::new(Cursor::new(lexical.as_bytes().to_vec()));
                ("<inline>".to_string(), reader)
            }
            other => {
                return Err(GenerateError::Configuration(format!(
                    "iter:JSONSurfer: document must be an IRI or a JSON literal, got {other}"
                )))
            }
        };

        Ok(Box::new(JsonSurferProducer {
            source,
            reader,
            args: parsed,
            cancel: ctx.cancel_flag().clone(),
        }))
    }
}

struct JsonSurferProducer {
    source: String,
    reader: Box<dyn Read + Send>,
    args: SurferArgs,
    cancel: CancelFlag,
}

/// Move the pending rows into a batch and deliver it
fn flush(
    pending: &mut Vec<Row>,
    sink: &mut dyn BatchSink,
    outcome: &mut IterationOutcome,
) -> ControlFlow<()> {
    let Some(batch) = Batch::new(std::mem::take(pending)) else {
        return ControlFlow::Continue(());
    };
    outcome.rows += batch.len();
    outcome.batches += 1;
    match sink.accept(batch) {
        SinkControl::Continue => ControlFlow::Continue(()),
        SinkControl::Stop => ControlFlow::Break(()),
    }
}

impl BatchProducer for JsonSurferProducer {
    fn run(self: Box<Self>, sink: &mut dyn BatchSink) -> IterationOutcome {
        let JsonSurferProducer {
            source,
            reader,
            args,
            cancel,
        } = *self;
        let _span = tracing::debug_span!(
            "json_surfer_scan",
            source = %source,
            path = %args.path,
            batch_size = args.batch_size
        )
        .entered();

        let mut outcome = IterationOutcome::default();
        let mut pending: Vec<Row> = Vec::new();

        let result = {
            let mut on_match = |value: Value| -> ControlFlow<()> {
                if cancel.is_cancelled() {
                    return ControlFlow::Break(());
                }
                let mut row: Row = Vec::with_capacity(1 + args.aux.len());
                row.push(Some(value_to_term(&value)));
                row.extend(args.aux.iter().map(|p| p.first(&value).map(value_to_term)));
                pending.push(row);
                if args.batch_size > 0 && pending.len() >= args.batch_size {
                    flush(&mut pending, &mut *sink, &mut outcome)
                } else {
                    ControlFlow::Continue(())
                }
            };
            scan(reader, &args.path, &mut on_match)
        };

        outcome.status = match result {
            Ok(ScanEnd::Exhausted) if cancel.is_cancelled() => IterationStatus::Stopped,
            Ok(ScanEnd::Exhausted) => {
                let _ = flush(&mut pending, sink, &mut outcome);
                IterationStatus::Completed
            }
            Ok(ScanEnd::Stopped) => IterationStatus::Stopped,
            Err(e) => {
                warn!(
                    source = %source,
                    path = %args.path,
                    rows = outcome.rows,
                    error = %e,
                    "JSON iteration failed"
                );
                IterationStatus::Failed(e.to_string())
            }
        };
        if !pending.is_empty() {
            debug!(discarded = pending.len(), "partial batch not delivered");
        }
        debug!(
            rows = outcome.rows,
            batches = outcome.batches,
            status = ?outcome.status,
            "JSON scan finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{MemoryFetcher, NoOpFetcher};
    use crate::function::FunctionRegistry;
    use crate::iterator::{CollectSink, IteratorRegistry};
    use crate::options::GenerateOptions;
    use fluree_vocab::{media_types, xsd};

    const PEOPLE: &str = r#"[{"a":1},{"a":2},{"a":3}]"#;

    fn primary(rows: &[Row]) -> Vec<Option<Term>> {
        rows.iter().map(|r| r[0].clone()).collect()
    }

    #[tokio::test]
    async fn test_inline_document_with_aux_and_batches() {
        let functions = FunctionRegistry::with_defaults();
        let iterators = IteratorRegistry::with_defaults();
        let options = GenerateOptions::default();
        let ctx = ExecutionContext::new(&NoOpFetcher, &functions, &iterators, &options);

        let args = vec![
            Term::string(PEOPLE),
            Term::string("$[*]"),
            Term::integer(2),
            Term::string("a"),
        ];
        let mut sink = CollectSink::new();
        let outcome = JsonSurferIterator
            .exec(args, &ctx, &mut sink)
            .await
            .unwrap();
        assert!(outcome.is_completed());
        assert_eq!(outcome.rows, 3);
        assert_eq!(outcome.batches, 2);

        let batches = sink.into_batches();
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 1);
        let aux: Vec<Option<Term>> = batches
            .iter()
            .flat_map(|b| b.rows().iter().map(|r| r[1].clone()))
            .collect();
        assert_eq!(
            aux,
            vec![
                Some(Term::integer(1)),
                Some(Term::integer(2)),
                Some(Term::integer(3))
            ]
        );
        let first = batches[0].rows()[0][0].clone().unwrap();
        assert_eq!(first.lexical(), Some(r#"{"a":1}"#));
        assert_eq!(first.datatype(), Some(media_types::APPLICATION_JSON_IRI));
    }

    #[tokio::test]
    async fn test_fetched_document_uses_json_accept() {
        let fetcher = MemoryFetcher::new().with_document(
            "http://ex.org/doc.json",
            r#"{"xs": [1.5, "two", true, null]}"#,
            Some("application/json"),
        );
        let functions = FunctionRegistry::with_defaults();
        let iterators = IteratorRegistry::with_defaults();
        let options = GenerateOptions::default();
        let ctx = ExecutionContext::new(&fetcher, &functions, &iterators, &options);

        let args = vec![Term::iri("http://ex.org/doc.json"), Term::string("$.xs[*]")];
        let mut sink = CollectSink::new();
        let outcome = JsonSurferIterator
            .exec(args, &ctx, &mut sink)
            .await
            .unwrap();
        assert_eq!(outcome.batches, 1);
        let rows = sink.into_batches().remove(0).into_rows();
        assert_eq!(
            primary(&rows),
            vec![
                Some(Term::typed("1.5", xsd::DOUBLE)),
                Some(Term::string("two")),
                Some(Term::boolean(true)),
                Some(Term::typed("null", media_types::APPLICATION_JSON_IRI)),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_document_is_iteration_error() {
        let functions = FunctionRegistry::with_defaults();
        let iterators = IteratorRegistry::with_defaults();
        let options = GenerateOptions::default();
        let ctx = ExecutionContext::new(&NoOpFetcher, &functions, &iterators, &options);

        let args = vec![Term::iri("http://ex.org/missing"), Term::string("$")];
        let err = JsonSurferIterator.open(args, &ctx).await.err().unwrap();
        assert!(matches!(err, GenerateError::Iteration(_)));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_malformed_path_rejected_before_fetch() {
        let functions = FunctionRegistry::with_defaults();
        let iterators = IteratorRegistry::with_defaults();
        let options = GenerateOptions::default();
        // the document does not exist: the path error must win
        let ctx = ExecutionContext::new(&NoOpFetcher, &functions, &iterators, &options);

        let args = vec![Term::iri("http://ex.org/missing"), Term::string("$[")];
        let err = JsonSurferIterator.open(args, &ctx).await.err().unwrap();
        assert!(matches!(err, GenerateError::InvalidPath { .. }));

        let args = vec![Term::string("[]"), Term::string("$[-1]")];
        let err = JsonSurferIterator.open(args, &ctx).await.err().unwrap();
        assert!(matches!(err, GenerateError::InvalidPath { .. }));
    }

    #[tokio::test]
    async fn test_aux_failure_is_absent() {
        let functions = FunctionRegistry::with_defaults();
        let iterators = IteratorRegistry::with_defaults();
        let options = GenerateOptions::default();
        let ctx = ExecutionContext::new(&NoOpFetcher, &functions, &iterators, &options);

        let args = vec![
            Term::string(r#"[{"a":1,"b":"x"},{"a":2}]"#),
            Term::string("$[*]"),
            Term::string("a"),
            Term::string("b"),
        ];
        let mut sink = CollectSink::new();
        JsonSurferIterator.exec(args, &ctx, &mut sink).await.unwrap();
        let rows = sink.into_batches().remove(0).into_rows();
        assert_eq!(rows[0][2], Some(Term::string("x")));
        assert_eq!(rows[1][1], Some(Term::integer(2)));
        assert_eq!(rows[1][2], None);
    }

    #[tokio::test]
    async fn test_malformed_document_fails_after_delivered_batches() {
        let functions = FunctionRegistry::with_defaults();
        let iterators = IteratorRegistry::with_defaults();
        let options = GenerateOptions::default();
        let ctx = ExecutionContext::new(&NoOpFetcher, &functions, &iterators, &options);

        let args = vec![
            Term::string(r#"[1,2,3,oops"#),
            Term::string("$[*]"),
            Term::integer(2),
        ];
        let mut sink = CollectSink::new();
        let outcome = JsonSurferIterator
            .exec(args, &ctx, &mut sink)
            .await
            .unwrap();
        assert!(outcome.is_failed());
        // [1,2] was flushed before the error; 3 was pending and is dropped
        assert_eq!(outcome.rows, 2);
        assert_eq!(sink.row_count(), 2);

        let args = vec![Term::string(r#"[1,2,3,oops"#), Term::string("$[*]")];
        let mut sink = CollectSink::new();
        let outcome = JsonSurferIterator
            .exec(args, &ctx, &mut sink)
            .await
            .unwrap();
        assert!(outcome.is_failed());
        assert_eq!(sink.row_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_and_cancel() {
        let functions = FunctionRegistry::with_defaults();
        let iterators = IteratorRegistry::with_defaults();
        let options = GenerateOptions::default();
        let ctx = ExecutionContext::new(&NoOpFetcher, &functions, &iterators, &options);
        let doc = Term::string("[1,2,3,4,5,6,7]");

        let mut sink = CollectSink::with_limit(1);
        let outcome = JsonSurferIterator
            .exec(vec![doc.clone(), Term::string("$[*]"), Term::integer(2)], &ctx, &mut sink)
            .await
            .unwrap();
        assert_eq!(outcome.status, IterationStatus::Stopped);
        assert_eq!(sink.row_count(), 2);

        ctx.cancel();
        let mut sink = CollectSink::new();
        let outcome = JsonSurferIterator
            .exec(vec![doc, Term::string("$[*]")], &ctx, &mut sink)
            .await
            .unwrap();
        assert_eq!(outcome.status, IterationStatus::Stopped);
        assert_eq!(sink.row_count(), 0);
    }

    #[test]
    fn test_build_checks_constants() {
        let surfer = JsonSurferIterator;
        assert!(surfer.build(&[Expr::string("[]")]).is_err());
        assert!(surfer
            .build(&[Expr::var("doc"), Expr::string("$.a[*]")])
            .is_ok());
        assert!(matches!(
            surfer.build(&[Expr::var("doc"), Expr::string("$..")]),
            Err(GenerateError::InvalidPath { .. })
        ));
        assert!(matches!(
            surfer.build(&[Expr::string("[]"), Expr::string("$"), Expr::integer(3)]),
            Ok(())
        ));
        assert!(matches!(
            surfer.build(&[Expr::string("[]"), Expr::string("$"), Expr::iri("http://x")]),
            Err(GenerateError::Configuration(_))
        ));
        assert!(surfer.build(&[Expr::var("d"), Expr::var("p")]).is_ok());
    }

    #[test]
    fn test_negative_batch_size_is_single_batch() {
        let args = SurferArgs::parse(&[Term::string("[]"), Term::string("$"), Term::integer(-4)])
            .unwrap();
        assert_eq!(args.batch_size, 0);
        assert!(args.aux.is_empty());
    }
}
