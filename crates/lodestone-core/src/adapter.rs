//! The `FormatAdapter` trait and its registry (spec §4.3, §9 "Polymorphic adapter
//! dispatch"). [`RegistryCoreService`](crate::registry::RegistryCoreService) never
//! branches on format; it looks the adapter up in an [`AdapterRegistry`] and calls
//! through the trait object. Adding a tenth format means registering one more
//! `Box<dyn FormatAdapter>` and nothing else.
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;
use crate::model::Format;
use crate::ports::ByteStream;

/// What an adapter pulls out of a validated upload (spec §4.1 step 1-2).
pub struct ParsedArtifact {
    /// The name embedded in the content itself, when the format carries one (NuGet's
    /// `.nuspec`, npm's `package.json`). `None` for formats that trust the URL (Go, OPA).
    pub embedded_name: Option<String>,
    pub embedded_version: Option<String>,
    pub content_type: String,
    pub metadata: serde_json::Map<String, Value>,
    /// The validated bytes, handed back so the core can stream them into the blob store
    /// without the adapter needing its own store handle. Adapters that only need to peek
    /// at a central directory or header return the stream unconsumed.
    pub body: ByteStream,
}

/// Stateless per-format validation, canonicalization, path derivation and response
/// rendering (spec §4.3). Implementations must be safe to invoke concurrently (spec §4.3
/// "Adapter concurrency").
#[async_trait]
pub trait FormatAdapter: Send + Sync + 'static {
    fn format(&self) -> Format;

    /// Parses and validates `body`, extracting embedded identifiers and metadata (spec
    /// §4.1 step 1). May reject with `InvalidContent` if the container is malformed or
    /// its embedded identifiers cannot be reconciled with the URL-provided ones.
    async fn validate(&self, body: ByteStream) -> Result<ParsedArtifact>;

    /// Reconciles URL-provided and embedded identifiers into the canonical
    /// `(name, version)` pair an Artifact row will be keyed on (spec §4.1 step 1).
    fn canonicalize(
        &self,
        url_name: &str,
        url_version: Option<&str>,
        embedded_name: Option<&str>,
        embedded_version: Option<&str>,
    ) -> Result<(String, String)>;

    /// Deterministic storage path for `(name, version)` (spec §4.4). Direct-artifact
    /// adapters return a path-addressed location; the OCI adapter never calls this for
    /// blobs (those are content-addressed, see [`crate::digest::OciDigest::blob_path`])
    /// but still uses it for manifest-by-tag bookkeeping.
    fn storage_path(&self, name: &str, version: &str) -> String;

    /// Whether anonymous (unauthenticated) reads are permitted for this format. Most
    /// ecosystem tooling expects anonymous `GET`; only the resolved-from-config registry
    /// setting's enabled flag and ownership gate writes (spec §6).
    fn allows_anonymous_reads(&self) -> bool {
        true
    }
}

/// `format -> adapter` lookup table (spec §9). Construction is the one place that lists
/// all nine formats; every other caller goes through [`AdapterRegistry::get`].
pub struct AdapterRegistry {
    adapters: HashMap<Format, Box<dyn FormatAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    pub fn register(&mut self, adapter: Box<dyn FormatAdapter>) -> &mut Self {
        self.adapters.insert(adapter.format(), adapter);
        self
    }

    pub fn get(&self, format: Format) -> Result<&dyn FormatAdapter> {
        self.adapters
            .get(&format)
            .map(|b| b.as_ref())
            .ok_or_else(|| crate::errors::Error::Internal(format!("no adapter registered for {format}")))
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ports::ByteStream;
    use async_trait::async_trait;
    use futures::stream;

    struct StubAdapter;

    #[async_trait]
    impl FormatAdapter for StubAdapter {
        fn format(&self) -> Format {
            Format::Cargo
        }

        async fn validate(&self, body: ByteStream) -> Result<ParsedArtifact> {
            Ok(ParsedArtifact {
                embedded_name: None,
                embedded_version: None,
                content_type: "application/x-tar".into(),
                metadata: serde_json::Map::new(),
                body,
            })
        }

        fn canonicalize(
            &self,
            url_name: &str,
            url_version: Option<&str>,
            _embedded_name: Option<&str>,
            _embedded_version: Option<&str>,
        ) -> Result<(String, String)> {
            Ok((
                url_name.to_string(),
                url_version.unwrap_or_default().to_string(),
            ))
        }

        fn storage_path(&self, name: &str, version: &str) -> String {
            format!("cargo/{name}/{version}/download")
        }
    }

    fn empty_stream() -> ByteStream {
        Box::pin(stream::empty())
    }

    #[tokio::test]
    async fn registry_dispatches_by_format() {
        let mut registry = AdapterRegistry::new();
        registry.register(Box::new(StubAdapter));

        let adapter = registry.get(Format::Cargo).unwrap();
        assert_eq!(adapter.format(), Format::Cargo);
        let parsed = adapter.validate(empty_stream()).await.unwrap();
        assert_eq!(parsed.content_type, "application/x-tar");
    }

    #[tokio::test]
    async fn registry_errors_on_missing_format() {
        let registry = AdapterRegistry::new();
        let err = registry.get(Format::Npm).unwrap_err();
        assert_eq!(err.kind_str(), "internal");
    }
}
