//! Cargo (spec §4.3 Cargo): `PUT /api/v1/crates/new` sends a single body shaped as
//! `<u32 LE metadata_len><metadata JSON><u32 LE crate_len><crate bytes>` — no
//! multipart, no separate requests. Parsing this framing is grounded directly on the
//! wire format every `cargo publish`-compatible registry implements (mirrored here from
//! a registry server's own `CrateUploadData::new`).
use async_trait::async_trait;
use serde::Deserialize;

use lodestone_core::adapter::{FormatAdapter, ParsedArtifact};
use lodestone_core::model::Format;
use lodestone_core::ports::ByteStream;
use lodestone_core::{stream, Error, Result};

use crate::errors::Error as FormatError;
use crate::support::{bytes_body, mismatch};

#[derive(Debug, Deserialize)]
struct CrateMetadata {
    name: String,
    vers: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    deps: Vec<serde_json::Value>,
    #[serde(default)]
    features: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    links: Option<String>,
}

pub struct CargoAdapter;

impl CargoAdapter {
    fn split_frame(bytes: &[u8]) -> std::result::Result<(&[u8], &[u8]), FormatError> {
        let read_u32 = |buf: &[u8]| -> std::result::Result<u32, FormatError> {
            let arr: [u8; 4] = buf
                .get(0..4)
                .ok_or_else(|| FormatError::MalformedContainer("truncated length prefix".to_string()))?
                .try_into()
                .expect("slice of length 4");
            Ok(u32::from_le_bytes(arr))
        };

        let metadata_len = read_u32(bytes)? as usize;
        let metadata_start = 4;
        let metadata_end = metadata_start + metadata_len;
        let metadata = bytes.get(metadata_start..metadata_end).ok_or_else(|| {
            FormatError::MalformedContainer("truncated metadata section".to_string())
        })?;

        let crate_len = read_u32(&bytes[metadata_end..])? as usize;
        let crate_start = metadata_end + 4;
        let crate_end = crate_start + crate_len;
        let crate_bytes = bytes.get(crate_start..crate_end).ok_or_else(|| {
            FormatError::MalformedContainer("truncated crate file section".to_string())
        })?;

        Ok((metadata, crate_bytes))
    }
}

#[async_trait]
impl FormatAdapter for CargoAdapter {
    fn format(&self) -> Format {
        Format::Cargo
    }

    async fn validate(&self, body: ByteStream) -> Result<ParsedArtifact> {
        let bytes = stream::collect(body).await?;
        let (metadata_json, crate_bytes) = Self::split_frame(&bytes).map_err(Error::from)?;

        let metadata: CrateMetadata = serde_json::from_slice(metadata_json)
            .map_err(FormatError::Json)
            .map_err(Error::from)?;

        let mut parsed_metadata = serde_json::Map::new();
        if let Some(description) = metadata.description {
            parsed_metadata.insert("description".into(), description.into());
        }
        if let Some(license) = metadata.license {
            parsed_metadata.insert("license".into(), license.into());
        }
        if let Some(links) = metadata.links {
            parsed_metadata.insert("links".into(), links.into());
        }
        parsed_metadata.insert("deps".into(), serde_json::Value::Array(metadata.deps));
        parsed_metadata.insert("features".into(), serde_json::Value::Object(metadata.features));

        Ok(ParsedArtifact {
            embedded_name: Some(metadata.name),
            embedded_version: Some(metadata.vers),
            content_type: "application/x-tar".to_string(),
            metadata: parsed_metadata,
            body: bytes_body(bytes::Bytes::copy_from_slice(crate_bytes)),
        })
    }

    fn canonicalize(
        &self,
        url_name: &str,
        url_version: Option<&str>,
        embedded_name: Option<&str>,
        embedded_version: Option<&str>,
    ) -> Result<(String, String)> {
        let name = match embedded_name {
            Some(embedded) => {
                if !url_name.is_empty() && embedded != url_name {
                    return Err(mismatch("crate name", url_name, embedded).into());
                }
                embedded.to_string()
            }
            None => url_name.to_string(),
        };
        let version = embedded_version
            .or(url_version)
            .ok_or_else(|| Error::InvalidRequest("missing crate version".to_string()))?
            .to_string();
        Ok((name, version))
    }

    fn storage_path(&self, name: &str, version: &str) -> String {
        format!("cargo/{name}/{version}/download")
    }
}

/// Renders one line of a crate's sparse/git index entry (one JSON object per version).
pub fn render_index_entry(artifact: &lodestone_core::model::Artifact) -> serde_json::Value {
    serde_json::json!({
        "name": artifact.name,
        "vers": artifact.version,
        "deps": artifact.metadata.get("deps").cloned().unwrap_or_else(|| serde_json::json!([])),
        "cksum": artifact.sha256,
        "features": artifact.metadata.get("features").cloned().unwrap_or_else(|| serde_json::json!({})),
        "yanked": artifact.yanked,
        "links": artifact.metadata.get("links"),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn frame(metadata: &str, crate_bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
        out.extend_from_slice(metadata.as_bytes());
        out.extend_from_slice(&(crate_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(crate_bytes);
        out
    }

    #[test]
    fn splits_length_prefixed_frame() {
        let bytes = frame(r#"{"name":"foo","vers":"0.1.0"}"#, b"crate contents");
        let (metadata, crate_bytes) = CargoAdapter::split_frame(&bytes).unwrap();
        let metadata: CrateMetadata = serde_json::from_slice(metadata).unwrap();
        assert_eq!(metadata.name, "foo");
        assert_eq!(crate_bytes, b"crate contents");
    }

    #[test]
    fn rejects_truncated_frame() {
        let bytes = vec![10, 0, 0, 0, 1, 2];
        assert!(CargoAdapter::split_frame(&bytes).is_err());
    }
}
