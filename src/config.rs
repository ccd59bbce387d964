//! Provider configuration.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use opentelemetry::KeyValue;

use crate::error::Error;

/// Span exporter backend selection.
///
/// The string form is case-sensitive: `"noop"`, `"file"`, `"stdout"`,
/// `"zipkin"`, `"otlpgrpc"`, `"otlphttp"`. `Display` and `FromStr`
/// round-trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ExporterKind {
    /// Discard every span batch.
    Noop,
    /// Append one human-readable record per span to the file named by the
    /// endpoint.
    File,
    /// Write spans to standard output.
    Stdout,
    /// POST Zipkin v2 JSON to a Zipkin collector.
    Zipkin,
    /// OTLP over gRPC.
    OtlpGrpc,
    /// OTLP over HTTP.
    OtlpHttp,
}

impl ExporterKind {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            ExporterKind::Noop => "noop",
            ExporterKind::File => "file",
            ExporterKind::Stdout => "stdout",
            ExporterKind::Zipkin => "zipkin",
            ExporterKind::OtlpGrpc => "otlpgrpc",
            ExporterKind::OtlpHttp => "otlphttp",
        }
    }
}

impl fmt::Display for ExporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExporterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "noop" => Ok(ExporterKind::Noop),
            "file" => Ok(ExporterKind::File),
            "stdout" => Ok(ExporterKind::Stdout),
            "zipkin" => Ok(ExporterKind::Zipkin),
            "otlpgrpc" => Ok(ExporterKind::OtlpGrpc),
            "otlphttp" => Ok(ExporterKind::OtlpHttp),
            other => Err(Error::UnknownExporterKind(other.to_owned())),
        }
    }
}

/// Resolved tracing configuration.
///
/// Assembled through [`TracingBuilder`](crate::TracingBuilder); the
/// defaults are a 100% sampling ratio and the `stdout` exporter.
#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) service_name: Option<String>,
    pub(crate) endpoint: String,
    pub(crate) sampler: f64,
    pub(crate) batcher: ExporterKind,
    pub(crate) otlp_headers: HashMap<String, String>,
    pub(crate) otlp_http_path: String,
    pub(crate) attributes: Vec<KeyValue>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            service_name: None,
            endpoint: String::new(),
            sampler: 1.0,
            batcher: ExporterKind::Stdout,
            otlp_headers: HashMap::new(),
            otlp_http_path: String::new(),
            attributes: Vec::new(),
        }
    }
}

impl Config {
    /// The configured exporter backend.
    pub fn batcher(&self) -> ExporterKind {
        self.batcher
    }

    /// The configured exporter endpoint. Empty means the backend default.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The configured trace-id-ratio sampling probability, in `[0, 1]`.
    pub fn sampler(&self) -> f64 {
        self.sampler
    }
}
