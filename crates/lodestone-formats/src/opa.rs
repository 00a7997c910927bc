//! OPA (spec §4.3 OPA): bundles are an arbitrary gzipped tarball with no mandated inner
//! manifest; OPA resolves a bundle's version from an `X-Bundle-Version` header rather
//! than content, which `lodestone_http` resolves to `url_version` (defaulting to
//! `"latest"`) before calling into the core. There is nothing for this adapter to parse.
use async_trait::async_trait;

use lodestone_core::adapter::{FormatAdapter, ParsedArtifact};
use lodestone_core::model::Format;
use lodestone_core::ports::ByteStream;
use lodestone_core::Result;

pub struct OpaAdapter;

#[async_trait]
impl FormatAdapter for OpaAdapter {
    fn format(&self) -> Format {
        Format::Opa
    }

    async fn validate(&self, body: ByteStream) -> Result<ParsedArtifact> {
        Ok(ParsedArtifact {
            embedded_name: None,
            embedded_version: None,
            content_type: "application/gzip".to_string(),
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
            url_version.unwrap_or("latest").to_string(),
        ))
    }

    fn storage_path(&self, name: &str, version: &str) -> String {
        format!("opa/{name}/{version}/bundle.tar.gz")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn canonicalize_defaults_to_latest() {
        let adapter = OpaAdapter;
        let (name, version) = adapter.canonicalize("policies", None, None, None).unwrap();
        assert_eq!(name, "policies");
        assert_eq!(version, "latest");
    }
}
