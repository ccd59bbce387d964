//! A tracer that stamps a fixed span kind on everything it starts.

use std::borrow::Cow;
use std::fmt;

use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::{SpanBuilder, SpanId, SpanKind, TraceContextExt, TraceId, Tracer as _};
use opentelemetry::{Context, KeyValue};

use crate::provider::default_propagator;

/// Instrumentation scope under which this crate records spans.
pub const SCOPE_NAME: &str = "tracekit";

/// A tracer bound to one [`SpanKind`].
///
/// Typically constructed once per transport role, e.g. a `Server` tracer
/// in an RPC interceptor and a `Client` tracer around outbound calls.
/// Spans record through the globally installed provider; before a
/// [`Tracing`](crate::Tracing) pipeline is built they are no-ops.
pub struct Tracer {
    tracer: BoxedTracer,
    kind: SpanKind,
    propagator: Box<dyn TextMapPropagator + Send + Sync>,
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Tracer {
    /// Create a tracer producing spans of `kind`, propagating context with
    /// the default trace-context + baggage composite.
    pub fn new(kind: SpanKind) -> Self {
        Tracer {
            tracer: global::tracer(SCOPE_NAME),
            kind,
            propagator: Box::new(default_propagator()),
        }
    }

    /// Replace the propagator used by [`inject`](Tracer::inject) and
    /// [`extract`](Tracer::extract).
    pub fn with_propagator(mut self, propagator: impl TextMapPropagator + Send + Sync + 'static) -> Self {
        self.propagator = Box::new(propagator);
        self
    }

    /// The kind stamped on every span this tracer starts.
    pub fn kind(&self) -> SpanKind {
        self.kind.clone()
    }

    /// Start a span named `name`.
    ///
    /// When `cx` carries a span, the new span is its child and shares its
    /// trace id; otherwise a new root with a fresh trace id is started.
    /// Returns the context carrying the new span; end it exactly once via
    /// `cx.span().end()`.
    pub fn start(&self, cx: &Context, name: impl Into<Cow<'static, str>>) -> Context {
        self.build(cx, SpanBuilder::from_name(name))
    }

    /// As [`start`](Tracer::start), attaching initial attributes.
    pub fn start_with_attributes(
        &self,
        cx: &Context,
        name: impl Into<Cow<'static, str>>,
        attributes: Vec<KeyValue>,
    ) -> Context {
        self.build(cx, SpanBuilder::from_name(name).with_attributes(attributes))
    }

    /// Start a span from a caller-assembled builder. The builder's kind,
    /// if any, is overridden by this tracer's kind.
    pub fn build(&self, cx: &Context, builder: SpanBuilder) -> Context {
        let span = self
            .tracer
            .build_with_context(builder.with_kind(self.kind.clone()), cx);
        cx.with_span(span)
    }

    /// Write the span context and baggage carried by `cx` into `injector`.
    /// Does nothing useful when `cx` has no sampled or unsampled span.
    pub fn inject(&self, cx: &Context, injector: &mut dyn Injector) {
        self.propagator.inject_context(cx, injector);
    }

    /// Read a remote span context and baggage out of `extractor`, layered
    /// over `cx`. Missing or malformed entries leave `cx` unchanged, so a
    /// subsequent [`start`](Tracer::start) opens a new root trace.
    pub fn extract(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        self.propagator.extract_with_context(cx, extractor)
    }
}

/// The trace id of the span carried by `cx`, if any.
pub fn trace_id_from_context(cx: &Context) -> Option<TraceId> {
    let span = cx.span();
    let span_context = span.span_context();
    span_context.is_valid().then(|| span_context.trace_id())
}

/// The span id of the span carried by `cx`, if any.
pub fn span_id_from_context(cx: &Context) -> Option<SpanId> {
    let span = cx.span();
    let span_context = span.span_context();
    span_context.is_valid().then(|| span_context.span_id())
}
