//! Span capture for tests of instrumented plan execution.
//!
//! Records span names and fields, including fields recorded after creation
//! (e.g. `solutions` on `generation_plan`).

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::span::{Attributes, Id, Record};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone)]
pub struct CapturedSpan {
    pub name: &'static str,
    pub fields: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct SpanStore(Arc<Mutex<Vec<(Id, CapturedSpan)>>>);

impl SpanStore {
    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.0.lock().iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn has_span(&self, name: &str) -> bool {
        self.0.lock().iter().any(|(_, s)| s.name == name)
    }

    /// All spans with the given name, in creation order
    pub fn find_spans(&self, name: &str) -> Vec<CapturedSpan> {
        self.0
            .lock()
            .iter()
            .filter(|(_, s)| s.name == name)
            .map(|(_, s)| s.clone())
            .collect()
    }
}

struct SpanCaptureLayer {
    store: SpanStore,
}

struct FieldVisitor<'a>(&'a mut HashMap<String, String>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

impl<S> Layer<S> for SpanCaptureLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        let captured = CapturedSpan {
            name: attrs.metadata().name(),
            fields,
        };
        self.store.0.lock().push((id.clone(), captured));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let mut spans = self.store.0.lock();
        if let Some((_, span)) = spans.iter_mut().rev().find(|(sid, _)| sid == id) {
            values.record(&mut FieldVisitor(&mut span.fields));
        }
    }
}

/// Capture spans on the current thread until the guard is dropped
pub fn init_test_tracing() -> (SpanStore, tracing::subscriber::DefaultGuard) {
    use tracing_subscriber::layer::SubscriberExt;

    let store = SpanStore::default();
    let subscriber = tracing_subscriber::registry().with(SpanCaptureLayer {
        store: store.clone(),
    });
    let guard = tracing::subscriber::set_default(subscriber);
    (store, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_recorded_fields() {
        let (store, _guard) = init_test_tracing();

        let span = tracing::debug_span!("outer", rows = tracing::field::Empty, source = "doc");
        span.record("rows", 3u64);

        let outer = store.find_spans("outer");
        assert_eq!(outer.len(), 1);
        assert_eq!(outer[0].fields.get("source").map(String::as_str), Some("doc"));
        assert_eq!(outer[0].fields.get("rows").map(String::as_str), Some("3"));
    }
}
