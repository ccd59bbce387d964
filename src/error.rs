//! Errors surfaced by provider construction and shutdown, plus the
//! process-wide hook for asynchronous export failures.

use std::sync::RwLock;

use opentelemetry_sdk::error::OTelSdkError;
use thiserror::Error;

/// Errors returned synchronously from building or shutting down the
/// tracing pipeline.
///
/// Runtime export failures never surface through instrumentation calls;
/// they are delivered to the hook installed with [`set_error_handler`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The exporter kind string did not name a known backend.
    #[error("unknown exporter kind {0:?}")]
    UnknownExporterKind(String),

    /// The file exporter path could not be opened for appending.
    #[error("cannot open trace log file {path:?}: {source}")]
    FileExporter {
        /// The configured endpoint path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An exporter could not be constructed from its configuration.
    ///
    /// Covers configuration problems only, such as a malformed endpoint
    /// URL or an invalid header name. An unreachable collector does not
    /// fail construction; it reports through the error hook at export time.
    #[error("failed to build {kind} exporter: {message}")]
    ExporterBuild {
        /// The exporter kind being built.
        kind: &'static str,
        /// Description of the configuration problem.
        message: String,
    },

    /// Flushing or shutting down the pipeline failed or timed out.
    #[error(transparent)]
    Shutdown(#[from] OTelSdkError),
}

type ExportErrorHandler = Box<dyn Fn(&OTelSdkError) + Send + Sync>;

static ERROR_HANDLER: RwLock<Option<ExportErrorHandler>> = RwLock::new(None);

/// Install the process-wide handler invoked when a span batch fails to
/// export, e.g. because a collector is unreachable.
///
/// One handler is active at a time; installing a new one replaces the
/// previous. Without a handler, failures are logged at warn level.
pub fn set_error_handler<F>(handler: F)
where
    F: Fn(&OTelSdkError) + Send + Sync + 'static,
{
    if let Ok(mut guard) = ERROR_HANDLER.write() {
        *guard = Some(Box::new(handler));
    }
}

pub(crate) fn handle_export_error(err: &OTelSdkError) {
    if let Ok(guard) = ERROR_HANDLER.read() {
        if let Some(handler) = guard.as_ref() {
            handler(err);
            return;
        }
    }
    tracing::warn!(error = %err, "span export failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn installed_handler_receives_export_errors() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        set_error_handler(move |err| {
            sink.lock().unwrap().push(err.to_string());
        });

        handle_export_error(&OTelSdkError::InternalFailure("collector down".into()));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("collector down"));
    }
}
