//! Go modules (spec §4.3 Go): a module zip is published at `{module}/@v/{version}.zip`
//! and must contain every file nested under a `{module}@{version}/` top-level directory,
//! including `go.mod`. Unlike NuGet/npm there's no separate manifest to trust over the
//! URL — the zip's internal directory naming convention IS the embedded identifier.
use async_trait::async_trait;
use std::io::Cursor;

use lodestone_core::adapter::{FormatAdapter, ParsedArtifact};
use lodestone_core::model::Format;
use lodestone_core::ports::ByteStream;
use lodestone_core::{stream, Error, Result};

use crate::errors::Error as FormatError;
use crate::support::{bytes_body, mismatch};

pub struct GoAdapter;

#[async_trait]
impl FormatAdapter for GoAdapter {
    fn format(&self) -> Format {
        Format::Go
    }

    async fn validate(&self, body: ByteStream) -> Result<ParsedArtifact> {
        let bytes = stream::collect(body).await?;
        let archive = zip::ZipArchive::new(Cursor::new(&bytes[..]))
            .map_err(FormatError::from)
            .map_err(Error::from)?;

        let prefix = archive
            .file_names()
            .find_map(|name| name.split_once('/').map(|(prefix, _)| prefix.to_string()))
            .ok_or_else(|| {
                Error::from(FormatError::MalformedContainer(
                    "module zip has no top-level directory".to_string(),
                ))
            })?;

        let (module, version) = prefix.rsplit_once('@').ok_or_else(|| {
            Error::from(FormatError::MalformedContainer(format!(
                "module zip top-level directory '{prefix}' is not '<module>@<version>'"
            )))
        })?;

        let go_mod_path = format!("{prefix}/go.mod");
        let mut archive = archive;
        let go_mod = archive
            .by_name(&go_mod_path)
            .ok()
            .and_then(|mut f| {
                let mut buf = String::new();
                std::io::Read::read_to_string(&mut f, &mut buf).ok()?;
                Some(buf)
            })
            .ok_or_else(|| {
                Error::from(FormatError::MalformedContainer(format!(
                    "module zip missing {go_mod_path}"
                )))
            })?;

        let mut metadata = serde_json::Map::new();
        metadata.insert("go_mod".into(), go_mod.into());

        Ok(ParsedArtifact {
            embedded_name: Some(module.to_string()),
            embedded_version: Some(version.to_string()),
            content_type: "application/zip".to_string(),
            metadata,
            body: bytes_body(bytes),
        })
    }

    fn canonicalize(
        &self,
        url_name: &str,
        url_version: Option<&str>,
        embedded_name: Option<&str>,
        embedded_version: Option<&str>,
    ) -> Result<(String, String)> {
        if let Some(embedded) = embedded_name {
            if embedded != url_name {
                return Err(mismatch("module path", url_name, embedded).into());
            }
        }
        let url_version = url_version
            .ok_or_else(|| Error::InvalidRequest("missing module version".to_string()))?;
        if let Some(embedded) = embedded_version {
            if embedded != url_version {
                return Err(mismatch("module version", url_version, embedded).into());
            }
        }
        Ok((url_name.to_string(), url_version.to_string()))
    }

    fn storage_path(&self, name: &str, version: &str) -> String {
        format!("go/{name}/@v/{version}.zip")
    }
}

/// `GET {module}/@v/{version}.info` response body.
pub fn render_info(artifact: &lodestone_core::model::Artifact) -> serde_json::Value {
    serde_json::json!({
        "Version": artifact.version,
        "Time": artifact.created_at.to_rfc3339(),
    })
}

/// `GET {module}/@v/{version}.mod` response body.
pub fn render_mod(artifact: &lodestone_core::model::Artifact) -> Option<String> {
    artifact
        .metadata
        .get("go_mod")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn canonicalize_requires_matching_module_path() {
        let adapter = GoAdapter;
        let err = adapter
            .canonicalize(
                "example.com/foo",
                Some("v1.0.0"),
                Some("example.com/bar"),
                Some("v1.0.0"),
            )
            .unwrap_err();
        assert_eq!(err.kind_str(), "invalid_content");
    }

    #[test]
    fn storage_path_uses_at_v_convention() {
        let adapter = GoAdapter;
        assert_eq!(
            adapter.storage_path("example.com/foo", "v1.0.0"),
            "go/example.com/foo/@v/v1.0.0.zip"
        );
    }
}
