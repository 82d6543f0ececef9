//! A `tracing` layer that captures closed spans for assertions.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::dispatcher::{self, DefaultGuard, Dispatch};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone)]
pub(crate) struct CapturedSpan {
    pub name: &'static str,
    pub parent: Option<String>,
    pub fields: HashMap<String, String>,
    pub events: Vec<Level>,
}

impl CapturedSpan {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.field("otel.status_code") == Some("ERROR")
    }

    pub fn error_events(&self) -> usize {
        self.events.iter().filter(|level| **level == Level::ERROR).count()
    }
}

#[derive(Default)]
struct Spans {
    open: HashMap<Id, CapturedSpan>,
    closed: Vec<CapturedSpan>,
}

struct CaptureLayer {
    spans: Arc<Mutex<Spans>>,
}

struct FieldVisitor<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        let parent = ctx
            .span(id)
            .and_then(|span| span.parent())
            .map(|parent| parent.name().to_string());

        let mut spans = self.spans.lock().unwrap();
        spans.open.insert(
            id.clone(),
            CapturedSpan {
                name: attrs.metadata().name(),
                parent,
                fields,
                events: Vec::new(),
            },
        );
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let mut spans = self.spans.lock().unwrap();
        if let Some(span) = spans.open.get_mut(id) {
            values.record(&mut FieldVisitor(&mut span.fields));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.event_span(event) else {
            return;
        };
        let mut spans = self.spans.lock().unwrap();
        if let Some(captured) = spans.open.get_mut(&span.id()) {
            captured.events.push(*event.metadata().level());
        }
    }

    fn on_close(&self, id: Id, _ctx: Context<'_, S>) {
        let mut spans = self.spans.lock().unwrap();
        if let Some(span) = spans.open.remove(&id) {
            spans.closed.push(span);
        }
    }
}

/// A subscriber that keeps every span it sees.
pub(crate) struct SpanCapture {
    dispatch: Dispatch,
    spans: Arc<Mutex<Spans>>,
}

impl SpanCapture {
    pub fn new() -> Self {
        let spans = Arc::new(Mutex::new(Spans::default()));
        let subscriber = tracing_subscriber::registry().with(CaptureLayer {
            spans: spans.clone(),
        });
        Self {
            dispatch: Dispatch::new(subscriber),
            spans,
        }
    }

    /// Run `f` with this subscriber as the default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }

    /// Install this subscriber as the thread default until the guard drops.
    pub fn set_default(&self) -> DefaultGuard {
        dispatcher::set_default(&self.dispatch)
    }

    pub fn closed(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().closed.clone()
    }

    pub fn open(&self) -> usize {
        self.spans.lock().unwrap().open.len()
    }
}
