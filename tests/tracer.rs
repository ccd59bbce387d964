//! Tracer behavior against an in-memory pipeline: parenting, sampling,
//! and the fixed span kind.
//!
//! These tests install a process-global tracer provider, so everything
//! sharing that state lives in this one binary and asserts on spans by
//! unique name.

use std::sync::OnceLock;

use opentelemetry::global;
use opentelemetry::trace::{
    SpanContext, SpanId, SpanKind, TraceContextExt, TraceFlags, TraceId, TraceState,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::{InMemorySpanExporter, Sampler, SdkTracerProvider, SpanData};
use tracekit::{span_id_from_context, trace_id_from_context, Tracer};

/// Ratio 0.0 means no new root is ever sampled; only spans whose parent
/// was sampled can be recorded.
fn exporter() -> &'static InMemorySpanExporter {
    static EXPORTER: OnceLock<InMemorySpanExporter> = OnceLock::new();
    EXPORTER.get_or_init(|| {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                0.0,
            ))))
            .with_simple_exporter(exporter.clone())
            .build();
        global::set_tracer_provider(provider);
        exporter
    })
}

fn finished(name: &str) -> Vec<SpanData> {
    exporter()
        .get_finished_spans()
        .unwrap()
        .into_iter()
        .filter(|span| span.name == name)
        .collect()
}

fn sampled_remote_parent(trace_id: u128, span_id: u64) -> Context {
    let span_context = SpanContext::new(
        TraceId::from(trace_id),
        SpanId::from(span_id),
        TraceFlags::SAMPLED,
        true,
        TraceState::default(),
    );
    Context::new().with_remote_span_context(span_context)
}

#[test]
fn child_joins_parent_trace_and_carries_the_tracer_kind() {
    exporter();
    let parent = sampled_remote_parent(0xaaaa_bbbb, 0xcccc);

    let tracer = Tracer::new(SpanKind::Server);
    let cx = tracer.start(&parent, "child-joins-parent");

    assert_eq!(trace_id_from_context(&cx), Some(TraceId::from(0xaaaa_bbbb_u128)));
    assert_ne!(span_id_from_context(&cx), Some(SpanId::from(0xcccc_u64)));

    cx.span().end();

    let spans = finished("child-joins-parent");
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].span_kind, SpanKind::Server);
    assert_eq!(spans[0].span_context.trace_id(), TraceId::from(0xaaaa_bbbb_u128));
    assert_eq!(spans[0].parent_span_id, SpanId::from(0xcccc_u64));
}

#[test]
fn sampled_parent_wins_over_zero_ratio() {
    exporter();
    let parent = sampled_remote_parent(0x5e5e, 0x6f6f);

    let tracer = Tracer::new(SpanKind::Client);
    let cx = tracer.start(&parent, "sampled-despite-ratio");
    cx.span().end();

    assert_eq!(finished("sampled-despite-ratio").len(), 1);
}

#[test]
fn zero_ratio_drops_new_roots() {
    exporter();

    let tracer = Tracer::new(SpanKind::Internal);
    let cx = tracer.start(&Context::new(), "unsampled-root");
    cx.span().end();

    assert!(finished("unsampled-root").is_empty());
}

#[test]
fn start_with_attributes_records_them() {
    exporter();
    let parent = sampled_remote_parent(0x7a7a, 0x8b8b);

    let tracer = Tracer::new(SpanKind::Producer);
    let cx = tracer.start_with_attributes(
        &parent,
        "span-with-attributes",
        vec![KeyValue::new("messaging.batch.size", 3)],
    );
    cx.span().end();

    let spans = finished("span-with-attributes");
    assert_eq!(spans.len(), 1);
    assert!(spans[0]
        .attributes
        .iter()
        .any(|kv| kv.key.as_str() == "messaging.batch.size"));
}
