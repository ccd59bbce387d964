//! The process-wide tracing provider: resource assembly, exporter
//! selection, pipeline wiring, global installation, and shutdown.

use std::collections::HashMap;
use std::time::Duration;

use opentelemetry::global;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::KeyValue;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;

use crate::config::{Config, ExporterKind};
use crate::error::Error;
use crate::export::TraceExporter;
use crate::resource::{HostResourceDetector, OsResourceDetector, ProcessResourceDetector};

/// Handle to an installed tracing pipeline.
///
/// Built once near process start via [`Tracing::builder`]. Construction
/// installs the provider and the composite propagator as the
/// process-wide defaults, so instrumentation anywhere in the process can
/// use [`Tracer`](crate::Tracer) without holding this handle. Keep the
/// handle to flush and shut the pipeline down on exit.
#[derive(Debug)]
pub struct Tracing {
    config: Config,
    provider: SdkTracerProvider,
}

impl Tracing {
    /// Start assembling a tracing configuration.
    pub fn builder() -> TracingBuilder {
        TracingBuilder::default()
    }

    fn new(config: Config) -> Result<Self, Error> {
        let exporter = TraceExporter::from_config(&config)?;

        let mut resource = Resource::builder()
            .with_detector(Box::new(OsResourceDetector))
            .with_detector(Box::new(HostResourceDetector))
            .with_detector(Box::new(ProcessResourceDetector))
            .with_attributes(config.attributes.iter().cloned());
        if let Some(service_name) = &config.service_name {
            resource = resource.with_service_name(service_name.clone());
        }

        let provider = SdkTracerProvider::builder()
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                config.sampler,
            ))))
            .with_resource(resource.build())
            .with_batch_exporter(exporter)
            .build();

        global::set_tracer_provider(provider.clone());
        global::set_text_map_propagator(default_propagator());

        Ok(Tracing { config, provider })
    }

    /// The configuration this pipeline was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Export all ended spans that are still buffered, without shutting
    /// the pipeline down.
    pub fn force_flush(&self) -> Result<(), Error> {
        self.provider.force_flush().map_err(Error::from)
    }

    /// Flush buffered spans and shut the pipeline down.
    ///
    /// Spans ended after this call are silently dropped. Returns an error
    /// when the flush fails or the pipeline was already shut down.
    pub fn shutdown(&self) -> Result<(), Error> {
        self.provider.shutdown().map_err(Error::from)
    }

    /// As [`Tracing::shutdown`], bounding the flush wait by `timeout`.
    pub fn shutdown_with_timeout(&self, timeout: Duration) -> Result<(), Error> {
        self.provider
            .shutdown_with_timeout(timeout)
            .map_err(Error::from)
    }
}

/// The propagator installed by [`Tracing`]: W3C `traceparent`/`tracestate`
/// composed with W3C `baggage`. The two write disjoint carrier keys.
pub fn default_propagator() -> TextMapCompositePropagator {
    TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ])
}

/// Builder for [`Tracing`].
///
/// Later calls override earlier ones for scalar options; collection
/// options (`with_otlp_headers`, `with_attributes`) replace wholesale.
#[derive(Debug, Default)]
pub struct TracingBuilder {
    config: Config,
}

impl TracingBuilder {
    /// Logical service name recorded on the resource (`service.name`).
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = Some(name.into());
        self
    }

    /// Collector endpoint for network exporters, or the log file path for
    /// the `file` exporter. Network endpoints are full URLs, e.g.
    /// `http://collector:4317`. Empty uses the backend's default.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Probability in `[0, 1]` that a new root trace is sampled; values
    /// outside the range are clamped. Sampling decisions of remote or
    /// local parents are always honored.
    pub fn with_sampler(mut self, ratio: f64) -> Self {
        self.config.sampler = ratio.clamp(0.0, 1.0);
        self
    }

    /// Exporter backend to batch spans into.
    pub fn with_batcher(mut self, kind: ExporterKind) -> Self {
        self.config.batcher = kind;
        self
    }

    /// Headers attached to every OTLP export request (gRPC metadata or
    /// HTTP headers, depending on the backend).
    pub fn with_otlp_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.config.otlp_headers = headers;
        self
    }

    /// URL path appended to the endpoint by the `otlphttp` exporter,
    /// e.g. `/v1/traces`.
    pub fn with_otlp_http_path(mut self, path: impl Into<String>) -> Self {
        self.config.otlp_http_path = path.into();
        self
    }

    /// Extra resource attributes, recorded alongside the detected
    /// host, OS, and process attributes.
    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = KeyValue>) -> Self {
        self.config.attributes = attributes.into_iter().collect();
        self
    }

    /// Build the exporter and pipeline, and install them process-wide.
    pub fn build(self) -> Result<Tracing, Error> {
        Tracing::new(self.config)
    }
}
