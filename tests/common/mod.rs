//! Shared utilities for integration tests: a `tracing` layer that keeps every
//! span field and event it sees.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

pub type Fields = BTreeMap<String, String>;

/// What a [`Capture`] layer has seen so far.
#[derive(Clone, Default)]
pub struct Captured {
    spans: Arc<Mutex<BTreeMap<u64, (String, Fields)>>>,
    events: Arc<Mutex<Vec<Fields>>>,
}

impl Captured {
    /// Fields recorded on the span called `name`. Panics unless exactly one
    /// such span was created.
    #[allow(dead_code)]
    pub fn span(&self, name: &str) -> Fields {
        let spans = self.spans.lock().unwrap();
        let mut matching = spans.values().filter(|(n, _)| n == name);
        let (_, fields) = matching.next().unwrap_or_else(|| panic!("no span `{name}`"));
        assert!(matching.next().is_none(), "more than one span `{name}`");
        fields.clone()
    }

    /// The event whose message is `message`. Panics unless exactly one such
    /// event was emitted.
    #[allow(dead_code)]
    pub fn event(&self, message: &str) -> Fields {
        let events = self.events.lock().unwrap();
        let mut matching = events.iter()
            .filter(|e| e.get("message").map(String::as_str) == Some(message));
        let event = matching.next().unwrap_or_else(|| panic!("no event `{message}`"));
        assert!(matching.next().is_none(), "more than one event `{message}`");
        event.clone()
    }
}

struct Capture(Captured);

struct FieldVisitor<'a>(&'a mut Fields);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{value:?}"));
    }
}

impl<S> Layer<S> for Capture
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, _ctx: Context<'_, S>) {
        let mut fields = Fields::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        self.0.spans.lock().unwrap()
            .insert(id.into_u64(), (attrs.metadata().name().to_owned(), fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        if let Some((_, fields)) = self.0.spans.lock().unwrap().get_mut(&id.into_u64()) {
            values.record(&mut FieldVisitor(fields));
        }
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::new();
        event.record(&mut FieldVisitor(&mut fields));
        self.0.events.lock().unwrap().push(fields);
    }
}

/// Installs a capturing subscriber for the current thread until the guard
/// is dropped.
#[allow(dead_code)]
pub fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::registry().with(Capture(captured.clone()));
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}
