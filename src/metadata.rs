//! Carrier adapters over gRPC request metadata.

use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::Context;
use tonic::metadata::{KeyRef, MetadataKey, MetadataMap, MetadataValue};

use crate::provider::default_propagator;

/// [`Injector`] over outbound RPC metadata.
///
/// Entries with names or values the metadata map rejects (non-ASCII,
/// illegal header characters) are skipped; nothing else in the map is
/// touched. Metadata keys are ASCII-lowercased by the map itself.
#[derive(Debug)]
pub struct MetadataInjector<'a>(pub &'a mut MetadataMap);

impl Injector for MetadataInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let Ok(name) = MetadataKey::from_bytes(key.as_bytes()) {
            if let Ok(value) = MetadataValue::try_from(value.as_str()) {
                self.0.insert(name, value);
            }
        }
    }
}

/// [`Extractor`] over inbound RPC metadata.
///
/// Yields the first value recorded under a key; values that are not
/// valid ASCII read as absent.
#[derive(Debug)]
pub struct MetadataExtractor<'a>(pub &'a MetadataMap);

impl Extractor for MetadataExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0
            .keys()
            .map(|key| match key {
                KeyRef::Ascii(key) => key.as_str(),
                KeyRef::Binary(key) => key.as_str(),
            })
            .collect()
    }
}

/// Capture the span context and baggage in `cx` as metadata for an
/// outbound call.
pub fn metadata_from_context(cx: &Context) -> MetadataMap {
    let mut metadata = MetadataMap::new();
    default_propagator().inject_context(cx, &mut MetadataInjector(&mut metadata));
    metadata
}

/// Rebuild a context from inbound RPC metadata, layered over `cx`.
///
/// The result carries the caller's span context as a remote parent when
/// the metadata holds a valid `traceparent`; otherwise `cx` is returned
/// unchanged in content.
pub fn extract_from_metadata(cx: &Context, metadata: &MetadataMap) -> Context {
    default_propagator().extract_with_context(cx, &MetadataExtractor(metadata))
}
