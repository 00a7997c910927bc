//! npm (spec §4.3 npm): `PUT /{package}` carries a single CouchDB-style JSON document —
//! `{name, versions: {<version>: <package.json-like object>}, "_attachments": {<filename>:
//! {data: base64}}}` — rather than a raw tarball. The tarball itself lives base64-encoded
//! inside `_attachments`; everything else is metadata for the one version being published.
use async_trait::async_trait;
use serde_json::Value;
use sha1::{Digest, Sha1};

use lodestone_core::adapter::{FormatAdapter, ParsedArtifact};
use lodestone_core::model::Format;
use lodestone_core::ports::ByteStream;
use lodestone_core::{stream, Error, Result};

use crate::errors::Error as FormatError;
use crate::support::{bytes_body, compare_versions, find_entry, mismatch, read_tar_gz};

pub struct NpmAdapter;

#[async_trait]
impl FormatAdapter for NpmAdapter {
    fn format(&self) -> Format {
        Format::Npm
    }

    async fn validate(&self, body: ByteStream) -> Result<ParsedArtifact> {
        let bytes = stream::collect(body).await?;
        let payload: Value = serde_json::from_slice(&bytes)
            .map_err(FormatError::Json)
            .map_err(Error::from)?;

        let name = payload
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::from(FormatError::MalformedContainer(
                    "publish payload missing 'name'".to_string(),
                ))
            })?
            .to_string();

        let versions = payload.get("versions").and_then(Value::as_object).ok_or_else(|| {
            Error::from(FormatError::MalformedContainer(
                "publish payload missing 'versions'".to_string(),
            ))
        })?;
        let (version, manifest) = versions.iter().next().ok_or_else(|| {
            Error::from(FormatError::MalformedContainer(
                "publish payload has no versions".to_string(),
            ))
        })?;

        let attachments = payload
            .get("_attachments")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                Error::from(FormatError::MalformedContainer(
                    "publish payload missing '_attachments'".to_string(),
                ))
            })?;
        let (_, attachment) = attachments.iter().next().ok_or_else(|| {
            Error::from(FormatError::MalformedContainer(
                "publish payload has no attachments".to_string(),
            ))
        })?;
        let data_b64 = attachment
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::from(FormatError::MalformedContainer(
                    "attachment missing 'data'".to_string(),
                ))
            })?;
        let tarball = {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(data_b64)
                .map_err(|e| Error::from(FormatError::MalformedContainer(e.to_string())))?
        };

        let entries = read_tar_gz(&tarball).map_err(Error::from)?;
        let package_json = find_entry(&entries, "package/package.json").ok_or_else(|| {
            Error::from(FormatError::MalformedContainer(
                "tarball missing package/package.json".to_string(),
            ))
        })?;
        let package_json: Value = serde_json::from_slice(package_json)
            .map_err(FormatError::Json)
            .map_err(Error::from)?;
        if let Some(inner_name) = package_json.get("name").and_then(Value::as_str) {
            if inner_name != name {
                return Err(mismatch("package name", &name, inner_name).into());
            }
        }

        let mut hasher = Sha1::new();
        hasher.update(&tarball);
        let sha1 = format!("{:x}", hasher.finalize());

        let mut metadata = serde_json::Map::new();
        metadata.insert("manifest".into(), manifest.clone());
        metadata.insert("_lodestone_sha1".into(), Value::String(sha1));

        Ok(ParsedArtifact {
            embedded_name: Some(name),
            embedded_version: Some(version.clone()),
            content_type: "application/octet-stream".to_string(),
            metadata,
            body: bytes_body(bytes::Bytes::from(tarball)),
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
                    return Err(mismatch("package name", url_name, embedded).into());
                }
                embedded.to_string()
            }
            None => url_name.to_string(),
        };
        let version = embedded_version
            .or(url_version)
            .ok_or_else(|| Error::InvalidRequest("missing package version".to_string()))?
            .to_string();
        Ok((name, version))
    }

    fn storage_path(&self, name: &str, version: &str) -> String {
        let basename = name.rsplit('/').next().unwrap_or(name);
        format!("npm/{name}/-/{basename}-{version}.tgz")
    }
}

/// Renders a full packument (`GET /{package}`) from every non-yanked version's stored
/// `package.json`-shaped manifest, stitching in `dist` since that's server-computed
/// rather than part of the uploaded manifest.
pub fn render_packument(
    name: &str,
    artifacts: &[lodestone_core::model::Artifact],
    base_url: &str,
) -> Value {
    let mut versions = serde_json::Map::new();
    let mut latest: Option<&lodestone_core::model::Artifact> = None;

    for artifact in artifacts {
        if artifact.yanked {
            continue;
        }
        let mut manifest = artifact
            .metadata
            .get("manifest")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        if let Value::Object(map) = &mut manifest {
            let basename = name.rsplit('/').next().unwrap_or(name);
            map.insert(
                "dist".to_string(),
                serde_json::json!({
                    "shasum": artifact.sha1,
                    "integrity": format!("sha256-{}", artifact.sha256),
                    "tarball": format!("{base_url}/{name}/-/{basename}-{}.tgz", artifact.version),
                }),
            );
        }
        versions.insert(artifact.version.clone(), manifest);
        latest = match latest {
            Some(current) if compare_versions(&current.version, &artifact.version).is_ge() => {
                Some(current)
            }
            _ => Some(artifact),
        };
    }

    let mut dist_tags = serde_json::Map::new();
    if let Some(latest) = latest {
        dist_tags.insert("latest".to_string(), latest.version.clone().into());
    }

    serde_json::json!({
        "_id": name,
        "name": name,
        "dist-tags": dist_tags,
        "versions": versions,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn storage_path_strips_scope_from_filename() {
        let adapter = NpmAdapter;
        assert_eq!(
            adapter.storage_path("@acme/widgets", "1.0.0"),
            "npm/@acme/widgets/-/widgets-1.0.0.tgz"
        );
    }

    #[test]
    fn canonicalize_prefers_embedded_version() {
        let adapter = NpmAdapter;
        let (name, version) = adapter
            .canonicalize("widgets", Some("0.0.0"), Some("widgets"), Some("1.0.0"))
            .unwrap();
        assert_eq!(name, "widgets");
        assert_eq!(version, "1.0.0");
    }
}
