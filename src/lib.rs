//! Process-wide distributed tracing built on OpenTelemetry.
//!
//! This crate wires the OpenTelemetry SDK into the shape most services
//! need: build a [`Tracing`] pipeline once at startup, pick an exporter
//! by name, and instrument RPC and HTTP traffic with [`Tracer`],
//! the gRPC metadata carriers, and the [`httpconv`] attribute mappers.
//! Trace context crosses process boundaries as W3C `traceparent` and
//! `baggage` entries.
//!
//! ```no_run
//! use opentelemetry::trace::{SpanKind, TraceContextExt};
//! use opentelemetry::Context;
//! use tracekit::{ExporterKind, Tracer, Tracing};
//!
//! fn main() -> Result<(), tracekit::Error> {
//!     let tracing = Tracing::builder()
//!         .with_service_name("checkout")
//!         .with_batcher(ExporterKind::OtlpGrpc)
//!         .with_endpoint("http://localhost:4317")
//!         .build()?;
//!
//!     let tracer = Tracer::new(SpanKind::Server);
//!     let cx = tracer.start(&Context::current(), "handle-order");
//!     // ... handle the request under `cx` ...
//!     cx.span().end();
//!
//!     tracing.shutdown()?;
//!     Ok(())
//! }
//! ```
#![warn(missing_docs, unreachable_pub, missing_debug_implementations)]

mod config;
mod error;
mod export;
pub mod httpconv;
mod metadata;
mod provider;
mod resource;
mod tracer;

pub use config::{Config, ExporterKind};
pub use error::{set_error_handler, Error};
pub use metadata::{
    extract_from_metadata, metadata_from_context, MetadataExtractor, MetadataInjector,
};
pub use provider::{default_propagator, Tracing, TracingBuilder};
pub use resource::{HostResourceDetector, OsResourceDetector, ProcessResourceDetector};
pub use tracer::{span_id_from_context, trace_id_from_context, Tracer, SCOPE_NAME};
