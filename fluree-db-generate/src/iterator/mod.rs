//! Iterator functions
//!
//! An iterator function turns one set of evaluated arguments into a stream
//! of rows. Rows are pushed to a [`BatchSink`] in bounded batches; the sink
//! answers each batch with a [`SinkControl`] so the consumer can stop the
//! producer early.
//!
//! # Protocol
//!
//! ```text
//! build(args)            build-time checks on the argument expressions
//! open(values, ctx)      parse arguments, compile paths, acquire the document
//! producer.run(sink)     single forward scan, batches pushed in scan order
//! ```
//!
//! `open` is async (document fetching); `run` is synchronous and may be
//! moved to the blocking pool with [`BatchStream::spawn`].

mod stream;

pub use stream::BatchStream;

use crate::binding::Batch;
use crate::context::ExecutionContext;
use crate::error::{GenerateError, Result};
use crate::expr::Expr;
use crate::json::JsonSurferIterator;
use crate::term::Term;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Consumer answer to a delivered batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkControl {
    /// Keep producing
    Continue,
    /// Stop the scan and release the document
    Stop,
}

/// Receives batches from a producer
pub trait BatchSink: Send {
    fn accept(&mut self, batch: Batch) -> SinkControl;
}

impl<F> BatchSink for F
where
    F: FnMut(Batch) -> SinkControl + Send,
{
    fn accept(&mut self, batch: Batch) -> SinkControl {
        self(batch)
    }
}

/// Sink that keeps every batch, optionally stopping after `limit` batches
#[derive(Debug, Default)]
pub struct CollectSink {
    batches: Vec<Batch>,
    limit: Option<usize>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `Stop` once `limit` batches have been received
    pub fn with_limit(limit: usize) -> Self {
        Self {
            batches: Vec::new(),
            limit: Some(limit),
        }
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn into_batches(self) -> Vec<Batch> {
        self.batches
    }

    /// Total number of rows received
    pub fn row_count(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }
}

impl BatchSink for CollectSink {
    fn accept(&mut self, batch: Batch) -> SinkControl {
        self.batches.push(batch);
        match self.limit {
            Some(limit) if self.batches.len() >= limit => SinkControl::Stop,
            _ => SinkControl::Continue,
        }
    }
}

/// How a scan ended
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IterationStatus {
    /// The document was scanned to the end
    #[default]
    Completed,
    /// The sink or the cancel flag stopped the scan
    Stopped,
    /// The document could not be read or is malformed
    Failed(String),
}

/// Summary of one producer run
///
/// `rows` and `batches` count what was actually delivered to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IterationOutcome {
    pub rows: usize,
    pub batches: usize,
    pub status: IterationStatus,
}

impl IterationOutcome {
    /// A failed run that delivered nothing
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: IterationStatus::Failed(reason.into()),
            ..Default::default()
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == IterationStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, IterationStatus::Failed(_))
    }
}

impl fmt::Display for IterationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            IterationStatus::Completed => write!(f, "completed")?,
            IterationStatus::Stopped => write!(f, "stopped")?,
            IterationStatus::Failed(reason) => write!(f, "failed ({reason})")?,
        }
        write!(f, " after {} row(s) in {} batch(es)", self.rows, self.batches)
    }
}

/// An opened iteration, ready to scan
pub trait BatchProducer: Send {
    /// Scan the document, pushing batches to `sink`
    ///
    /// The document stream is released when this returns, whatever the outcome.
    fn run(self: Box<Self>, sink: &mut dyn BatchSink) -> IterationOutcome;
}

/// An iterator function callable from an ITERATOR clause
#[async_trait]
pub trait IteratorFunction: Debug + Send + Sync {
    /// IRI this function is registered under
    fn name(&self) -> &str;

    /// Build-time check of the argument expressions
    fn build(&self, args: &[Expr]) -> Result<()>;

    /// Parse evaluated arguments and acquire the document
    ///
    /// Malformed configuration is reported before any I/O.
    async fn open(&self, args: Vec<Term>, ctx: &ExecutionContext<'_>)
        -> Result<Box<dyn BatchProducer>>;

    /// Open and scan on the calling thread
    async fn exec(
        &self,
        args: Vec<Term>,
        ctx: &ExecutionContext<'_>,
        sink: &mut dyn BatchSink,
    ) -> Result<IterationOutcome> {
        let producer = self.open(args, ctx).await?;
        Ok(producer.run(sink))
    }
}

/// Iterator functions by IRI
#[derive(Debug, Clone, Default)]
pub struct IteratorRegistry {
    iterators: HashMap<String, Arc<dyn IteratorFunction>>,
}

impl IteratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `iter:JSONSurfer`
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JsonSurferIterator::new()));
        registry
    }

    /// Register (or replace) an iterator under its own name
    pub fn register(&mut self, iterator: Arc<dyn IteratorFunction>) {
        self.iterators.insert(iterator.name().to_string(), iterator);
    }

    pub fn get(&self, iri: &str) -> Result<Arc<dyn IteratorFunction>> {
        self.iterators
            .get(iri)
            .cloned()
            .ok_or_else(|| GenerateError::UnknownIterator(iri.to_string()))
    }

    pub fn contains(&self, iri: &str) -> bool {
        self.iterators.contains_key(iri)
    }
}
