//! Helm (spec §4.3 Helm): a chart `.tgz` is a gzip'd tar carrying `Chart.yaml` at its
//! root, which is the authority for name/version. The upload filename (`{name}-{version}.tgz`)
//! is only used as a fallback when `Chart.yaml` can't be parsed.
use async_trait::async_trait;
use serde::Deserialize;

use lodestone_core::adapter::{FormatAdapter, ParsedArtifact};
use lodestone_core::model::Format;
use lodestone_core::ports::ByteStream;
use lodestone_core::{stream, Error, Result};

use crate::errors::Error as FormatError;
use crate::support::{bytes_body, find_entry, read_tar_gz, split_name_version};

#[derive(Debug, Deserialize)]
struct ChartYaml {
    name: String,
    version: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "appVersion")]
    app_version: Option<String>,
}

pub struct HelmAdapter;

#[async_trait]
impl FormatAdapter for HelmAdapter {
    fn format(&self) -> Format {
        Format::Helm
    }

    async fn validate(&self, body: ByteStream) -> Result<ParsedArtifact> {
        let bytes = stream::collect(body).await?;
        let entries = read_tar_gz(&bytes).map_err(Error::from)?;
        let chart_yaml = find_entry(&entries, "Chart.yaml").ok_or_else(|| {
            Error::from(FormatError::MalformedContainer(
                "chart tarball missing Chart.yaml".to_string(),
            ))
        })?;
        let chart: ChartYaml = serde_yaml::from_slice(chart_yaml)
            .map_err(FormatError::Yaml)
            .map_err(Error::from)?;

        let mut metadata = serde_json::Map::new();
        if let Some(description) = chart.description {
            metadata.insert("description".into(), description.into());
        }
        if let Some(app_version) = chart.app_version {
            metadata.insert("appVersion".into(), app_version.into());
        }

        Ok(ParsedArtifact {
            embedded_name: Some(chart.name),
            embedded_version: Some(chart.version),
            content_type: "application/gzip".to_string(),
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
        if let (Some(name), Some(version)) = (embedded_name, embedded_version) {
            return Ok((name.to_string(), version.to_string()));
        }
        if let Some(version) = url_version {
            return Ok((url_name.to_string(), version.to_string()));
        }
        split_name_version(url_name).ok_or_else(|| {
            Error::InvalidRequest(format!(
                "cannot derive chart name/version from '{url_name}'"
            ))
        })
    }

    fn storage_path(&self, name: &str, version: &str) -> String {
        format!("helm/{name}/{version}/{name}-{version}.tgz")
    }
}

/// Renders `index.yaml` as real YAML (SPEC_FULL §4, Open Question 3 — the distilled
/// spec's instinct to serve `index.yaml` as JSON-with-a-`.yaml`-extension is explicitly
/// flagged wrong there; Helm clients parse it as YAML and reject a bare JSON document
/// whose keys happen to be valid YAML scalars but whose overall shape a strict parser
/// balks at).
pub fn render_index_yaml(
    repository_base_url: &str,
    artifacts: &[lodestone_core::model::Artifact],
) -> Result<String> {
    use std::collections::BTreeMap;

    let mut by_name: BTreeMap<&str, Vec<&lodestone_core::model::Artifact>> = BTreeMap::new();
    for artifact in artifacts {
        if artifact.yanked {
            continue;
        }
        by_name.entry(artifact.name.as_str()).or_default().push(artifact);
    }
    // Each chart's own versions are listed newest-first (Helm convention), semver-ordered
    // rather than by upload time.
    for versions in by_name.values_mut() {
        versions.sort_by(|a, b| crate::support::compare_versions(&b.version, &a.version));
    }

    let mut entries: BTreeMap<String, Vec<serde_yaml::Value>> = BTreeMap::new();
    for artifact in by_name.into_values().flatten() {
        let url = format!(
            "{repository_base_url}/{}/{}/{}-{}.tgz",
            artifact.name, artifact.version, artifact.name, artifact.version
        );
        let mut entry = serde_yaml::Mapping::new();
        entry.insert("name".into(), artifact.name.clone().into());
        entry.insert("version".into(), artifact.version.clone().into());
        entry.insert("urls".into(), vec![url].into());
        entry.insert(
            "digest".into(),
            format!("sha256:{}", artifact.sha256).into(),
        );
        if let Some(description) = artifact.metadata.get("description").and_then(|v| v.as_str()) {
            entry.insert("description".into(), description.into());
        }
        entries
            .entry(artifact.name.clone())
            .or_default()
            .push(serde_yaml::Value::Mapping(entry));
    }

    let mut root = serde_yaml::Mapping::new();
    root.insert("apiVersion".into(), "v1".into());
    root.insert(
        "entries".into(),
        serde_yaml::to_value(entries).map_err(FormatError::Yaml).map_err(Error::from)?,
    );

    serde_yaml::to_string(&serde_yaml::Value::Mapping(root))
        .map_err(FormatError::Yaml)
        .map_err(Error::from)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn canonicalize_falls_back_to_filename_stem() {
        let adapter = HelmAdapter;
        let (name, version) = adapter
            .canonicalize("mychart-1.2.3", None, None, None)
            .unwrap();
        assert_eq!(name, "mychart");
        assert_eq!(version, "1.2.3");
    }

    #[test]
    fn canonicalize_prefers_chart_yaml() {
        let adapter = HelmAdapter;
        let (name, version) = adapter
            .canonicalize("ignored", None, Some("mychart"), Some("1.2.3"))
            .unwrap();
        assert_eq!(name, "mychart");
        assert_eq!(version, "1.2.3");
    }
}
