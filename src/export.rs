//! Span exporter backends and the kind-indexed dispatch between them.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use opentelemetry::trace::Status;
use opentelemetry_sdk::error::{OTelSdkError, OTelSdkResult};
use opentelemetry_sdk::trace::{SpanData, SpanExporter};
use opentelemetry_sdk::Resource;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig, WithTonicConfig};
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};

use crate::config::{Config, ExporterKind};
use crate::error::{handle_export_error, Error};

/// The exporter selected at provider construction, one variant per
/// [`ExporterKind`].
///
/// Export failures are reported to the error hook before being handed
/// back to the batch processor.
#[derive(Debug)]
pub(crate) enum TraceExporter {
    Noop(NoopSpanExporter),
    File(FileSpanExporter),
    Stdout(opentelemetry_stdout::SpanExporter),
    Zipkin(opentelemetry_zipkin::ZipkinExporter),
    Otlp(opentelemetry_otlp::SpanExporter),
}

impl TraceExporter {
    /// Build the exporter named by `config.batcher`.
    ///
    /// Network-backed exporters do not connect here; an unreachable
    /// collector surfaces later through the error hook. The file exporter
    /// opens its path eagerly and fails when it cannot.
    pub(crate) fn from_config(config: &Config) -> Result<Self, Error> {
        match config.batcher {
            ExporterKind::Noop => Ok(TraceExporter::Noop(NoopSpanExporter)),
            ExporterKind::File => {
                FileSpanExporter::open(&config.endpoint).map(TraceExporter::File)
            }
            ExporterKind::Stdout => Ok(TraceExporter::Stdout(
                opentelemetry_stdout::SpanExporter::default(),
            )),
            ExporterKind::Zipkin => {
                let mut builder = opentelemetry_zipkin::ZipkinExporter::builder();
                if !config.endpoint.is_empty() {
                    builder = builder.with_collector_endpoint(config.endpoint.clone());
                }
                builder
                    .build()
                    .map(TraceExporter::Zipkin)
                    .map_err(|e| Error::ExporterBuild {
                        kind: ExporterKind::Zipkin.as_str(),
                        message: e.to_string(),
                    })
            }
            ExporterKind::OtlpGrpc => {
                let metadata = grpc_metadata(&config.otlp_headers)?;
                let mut builder = opentelemetry_otlp::SpanExporter::builder()
                    .with_tonic()
                    .with_metadata(metadata);
                if !config.endpoint.is_empty() {
                    builder = builder.with_endpoint(config.endpoint.clone());
                }
                builder
                    .build()
                    .map(TraceExporter::Otlp)
                    .map_err(|e| Error::ExporterBuild {
                        kind: ExporterKind::OtlpGrpc.as_str(),
                        message: e.to_string(),
                    })
            }
            ExporterKind::OtlpHttp => {
                let mut builder = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .with_headers(config.otlp_headers.clone());
                if !config.endpoint.is_empty() {
                    builder = builder
                        .with_endpoint(join_url(&config.endpoint, &config.otlp_http_path));
                }
                builder
                    .build()
                    .map(TraceExporter::Otlp)
                    .map_err(|e| Error::ExporterBuild {
                        kind: ExporterKind::OtlpHttp.as_str(),
                        message: e.to_string(),
                    })
            }
        }
    }
}

impl SpanExporter for TraceExporter {
    async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
        let result = match self {
            TraceExporter::Noop(exporter) => exporter.export(batch).await,
            TraceExporter::File(exporter) => exporter.export(batch).await,
            TraceExporter::Stdout(exporter) => exporter.export(batch).await,
            TraceExporter::Zipkin(exporter) => exporter.export(batch).await,
            TraceExporter::Otlp(exporter) => exporter.export(batch).await,
        };
        if let Err(err) = &result {
            handle_export_error(err);
        }
        result
    }

    fn shutdown_with_timeout(&mut self, timeout: Duration) -> OTelSdkResult {
        match self {
            TraceExporter::Noop(exporter) => exporter.shutdown_with_timeout(timeout),
            TraceExporter::File(exporter) => exporter.shutdown_with_timeout(timeout),
            TraceExporter::Stdout(exporter) => exporter.shutdown_with_timeout(timeout),
            TraceExporter::Zipkin(exporter) => exporter.shutdown_with_timeout(timeout),
            TraceExporter::Otlp(exporter) => exporter.shutdown_with_timeout(timeout),
        }
    }

    fn shutdown(&mut self) -> OTelSdkResult {
        match self {
            TraceExporter::Noop(exporter) => exporter.shutdown(),
            TraceExporter::File(exporter) => exporter.shutdown(),
            TraceExporter::Stdout(exporter) => exporter.shutdown(),
            TraceExporter::Zipkin(exporter) => exporter.shutdown(),
            TraceExporter::Otlp(exporter) => exporter.shutdown(),
        }
    }

    fn force_flush(&mut self) -> OTelSdkResult {
        match self {
            TraceExporter::Noop(exporter) => exporter.force_flush(),
            TraceExporter::File(exporter) => exporter.force_flush(),
            TraceExporter::Stdout(exporter) => exporter.force_flush(),
            TraceExporter::Zipkin(exporter) => exporter.force_flush(),
            TraceExporter::Otlp(exporter) => exporter.force_flush(),
        }
    }

    fn set_resource(&mut self, resource: &Resource) {
        match self {
            TraceExporter::Noop(exporter) => exporter.set_resource(resource),
            TraceExporter::File(exporter) => exporter.set_resource(resource),
            TraceExporter::Stdout(exporter) => exporter.set_resource(resource),
            TraceExporter::Zipkin(exporter) => exporter.set_resource(resource),
            TraceExporter::Otlp(exporter) => exporter.set_resource(resource),
        }
    }
}

fn grpc_metadata(headers: &std::collections::HashMap<String, String>) -> Result<MetadataMap, Error> {
    let mut metadata = MetadataMap::new();
    for (name, value) in headers {
        let key = MetadataKey::from_bytes(name.as_bytes()).map_err(|e| Error::ExporterBuild {
            kind: ExporterKind::OtlpGrpc.as_str(),
            message: format!("invalid header name {name:?}: {e}"),
        })?;
        let value = MetadataValue::try_from(value.as_str()).map_err(|e| Error::ExporterBuild {
            kind: ExporterKind::OtlpGrpc.as_str(),
            message: format!("invalid value for header {name:?}: {e}"),
        })?;
        metadata.insert(key, value);
    }
    Ok(metadata)
}

/// Joins a collector base URL with a signal path, normalizing slashes.
fn join_url(endpoint: &str, path: &str) -> String {
    if path.is_empty() {
        endpoint.to_owned()
    } else {
        format!(
            "{}/{}",
            endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Exporter that drops every batch.
#[derive(Debug, Default)]
pub(crate) struct NoopSpanExporter;

impl SpanExporter for NoopSpanExporter {
    fn export(&self, _batch: Vec<SpanData>) -> impl std::future::Future<Output = OTelSdkResult> + Send {
        std::future::ready(Ok(()))
    }
}

/// Appends one line per finished span to a log file.
///
/// The file is opened in append mode at construction; resource attributes
/// are written once as a header before the first record.
#[derive(Debug)]
pub(crate) struct FileSpanExporter {
    inner: Mutex<FileExporterInner>,
    resource: Resource,
}

#[derive(Debug)]
struct FileExporterInner {
    writer: BufWriter<File>,
    resource_written: bool,
}

impl FileSpanExporter {
    pub(crate) fn open(path: &str) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| Error::FileExporter {
                path: path.to_owned(),
                source,
            })?;
        Ok(FileSpanExporter {
            inner: Mutex::new(FileExporterInner {
                writer: BufWriter::new(file),
                resource_written: false,
            }),
            resource: Resource::builder_empty().build(),
        })
    }

    fn write_batch(&self, batch: Vec<SpanData>) -> OTelSdkResult {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| OTelSdkError::InternalFailure("trace log writer poisoned".into()))?;
        if !inner.resource_written {
            let header = format_resource(&self.resource);
            inner
                .writer
                .write_all(header.as_bytes())
                .map_err(write_failure)?;
            inner.resource_written = true;
        }
        for span in batch {
            let line = format_span(&span);
            inner
                .writer
                .write_all(line.as_bytes())
                .map_err(write_failure)?;
        }
        inner.writer.flush().map_err(write_failure)
    }

    fn flush(&self) -> OTelSdkResult {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| OTelSdkError::InternalFailure("trace log writer poisoned".into()))?;
        inner.writer.flush().map_err(write_failure)
    }
}

impl SpanExporter for FileSpanExporter {
    fn export(&self, batch: Vec<SpanData>) -> impl std::future::Future<Output = OTelSdkResult> + Send {
        std::future::ready(self.write_batch(batch))
    }

    fn shutdown_with_timeout(&mut self, _timeout: Duration) -> OTelSdkResult {
        self.flush()
    }

    fn shutdown(&mut self) -> OTelSdkResult {
        self.flush()
    }

    fn force_flush(&mut self) -> OTelSdkResult {
        self.flush()
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.resource = resource.clone();
    }
}

fn write_failure(err: std::io::Error) -> OTelSdkError {
    OTelSdkError::InternalFailure(format!("trace log write failed: {err}"))
}

fn format_resource(resource: &Resource) -> String {
    let mut out = String::from("resource:");
    for (key, value) in resource.iter() {
        let _ = write!(out, " {}={}", key, value);
    }
    out.push('\n');
    out
}

fn format_span(span: &SpanData) -> String {
    let end: DateTime<Utc> = span.end_time.into();
    let duration = span
        .end_time
        .duration_since(span.start_time)
        .unwrap_or_default();
    let status = match &span.status {
        Status::Unset => String::from("unset"),
        Status::Ok => String::from("ok"),
        Status::Error { description } => format!("error({description})"),
    };

    let mut out = format!(
        "{} trace_id={} span_id={} parent_span_id={} kind={:?} name={:?} duration={:?} status={}",
        end.to_rfc3339_opts(SecondsFormat::Micros, true),
        span.span_context.trace_id(),
        span.span_context.span_id(),
        span.parent_span_id,
        span.span_kind,
        span.name,
        duration,
        status,
    );
    for attribute in &span.attributes {
        let _ = write!(out, " {}={}", attribute.key, attribute.value);
    }
    out.push('\n');
    out
}
