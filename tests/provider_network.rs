//! Network exporter construction is non-blocking: providers build even
//! when no collector is listening, and connectivity failures surface
//! through the error hook at export time.
//!
//! Installs process-global state (provider, error hook), so everything
//! runs inside a single test.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use opentelemetry::trace::{SpanKind, TraceContextExt};
use opentelemetry::Context;
use tracekit::{set_error_handler, ExporterKind, Tracer, Tracing};

#[test]
fn unreachable_collectors_build_and_report_through_the_hook() {
    // The tonic exporter needs a Tokio runtime context at construction;
    // entering a handle provides one without putting the test body on an
    // async worker thread (which the zipkin blocking client forbids).
    let rt = tokio::runtime::Runtime::new().unwrap();
    let _guard = rt.enter();

    // OTLP builders validate configuration only; nothing listens on
    // these ports and construction must still succeed.
    let grpc = Tracing::builder()
        .with_batcher(ExporterKind::OtlpGrpc)
        .with_endpoint("http://127.0.0.1:59317")
        .with_otlp_headers(HashMap::from([(
            "x-honeycomb-team".to_owned(),
            "not-a-real-key".to_owned(),
        )]))
        .build()
        .unwrap();
    drop(grpc);

    let http = Tracing::builder()
        .with_batcher(ExporterKind::OtlpHttp)
        .with_endpoint("http://127.0.0.1:59318")
        .with_otlp_http_path("/v1/traces")
        .build()
        .unwrap();
    drop(http);

    // The zipkin exporter actually posts during shutdown's flush; with
    // nothing listening the failure must reach the installed hook, not
    // the instrumentation call sites.
    let errors: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    set_error_handler(move |err| sink.lock().unwrap().push(err.to_string()));

    let tracing = Tracing::builder()
        .with_service_name("network-test")
        .with_batcher(ExporterKind::Zipkin)
        .with_endpoint("http://127.0.0.1:59319/api/v2/spans")
        .build()
        .unwrap();

    let tracer = Tracer::new(SpanKind::Client);
    let cx = tracer.start(&Context::new(), "doomed-export");
    cx.span().end();

    let result = tracing.shutdown_with_timeout(Duration::from_secs(10));

    let errors = errors.lock().unwrap();
    assert!(
        !errors.is_empty() || result.is_err(),
        "export against a closed port reported no failure"
    );
}
