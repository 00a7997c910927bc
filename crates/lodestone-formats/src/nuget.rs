//! NuGet (spec §4.3 NuGet): a `.nupkg` is a zip archive carrying a single `.nuspec` XML
//! manifest at its root, which is the authority for id/version rather than the URL path
//! (`PUT /v3/package` carries neither in the URL at all).
use std::io::Cursor;

use async_trait::async_trait;
use serde::Deserialize;

use lodestone_core::adapter::{FormatAdapter, ParsedArtifact};
use lodestone_core::model::Format;
use lodestone_core::ports::ByteStream;
use lodestone_core::{stream, Error, Result};

use crate::errors::Error as FormatError;
use crate::support::{bytes_body, mismatch};

#[derive(Debug, Deserialize)]
struct Package {
    metadata: Metadata,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    id: String,
    version: String,
    #[serde(default)]
    authors: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Option<String>,
}

pub struct NugetAdapter;

#[async_trait]
impl FormatAdapter for NugetAdapter {
    fn format(&self) -> Format {
        Format::Nuget
    }

    async fn validate(&self, body: ByteStream) -> Result<ParsedArtifact> {
        let bytes = stream::collect(body).await?;
        let mut archive = zip::ZipArchive::new(Cursor::new(&bytes[..]))
            .map_err(FormatError::from)
            .map_err(Error::from)?;

        let nuspec_index = (0..archive.len())
            .find(|&i| {
                archive
                    .by_index(i)
                    .map(|f| f.name().to_ascii_lowercase().ends_with(".nuspec"))
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                Error::from(FormatError::MalformedContainer(
                    "no .nuspec entry in package".to_string(),
                ))
            })?;

        let mut nuspec = String::new();
        {
            let mut entry = archive
                .by_index(nuspec_index)
                .map_err(FormatError::from)
                .map_err(Error::from)?;
            std::io::Read::read_to_string(&mut entry, &mut nuspec)
                .map_err(FormatError::from)
                .map_err(Error::from)?;
        }

        let package: Package = quick_xml::de::from_str(&nuspec)
            .map_err(FormatError::Xml)
            .map_err(Error::from)?;

        let mut metadata = serde_json::Map::new();
        if let Some(authors) = &package.metadata.authors {
            metadata.insert("authors".into(), authors.clone().into());
        }
        if let Some(description) = &package.metadata.description {
            metadata.insert("description".into(), description.clone().into());
        }
        if let Some(tags) = &package.metadata.tags {
            metadata.insert("tags".into(), tags.clone().into());
        }

        Ok(ParsedArtifact {
            embedded_name: Some(package.metadata.id),
            embedded_version: Some(package.metadata.version),
            content_type: "application/octet-stream".to_string(),
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
        let name = match embedded_name {
            Some(embedded) => {
                if !url_name.is_empty() && !embedded.eq_ignore_ascii_case(url_name) {
                    return Err(mismatch("package id", url_name, embedded).into());
                }
                embedded.to_string()
            }
            None => url_name.to_string(),
        };
        let version = match (embedded_version, url_version) {
            (Some(embedded), Some(url)) if !embedded.eq_ignore_ascii_case(url) => {
                return Err(mismatch("package version", url, embedded).into());
            }
            (Some(embedded), _) => embedded.to_string(),
            (None, Some(url)) => url.to_string(),
            (None, None) => {
                return Err(Error::InvalidRequest("missing package version".to_string()))
            }
        };
        Ok((name, version))
    }

    fn storage_path(&self, name: &str, version: &str) -> String {
        let id = name.to_ascii_lowercase();
        let version = version.to_ascii_lowercase();
        format!("nuget/{id}/{version}/{id}.{version}.nupkg")
    }
}

/// `GET /v3/index.json`: the NuGet v3 client bootstraps every other URL from here.
pub fn render_service_index(base_url: &str) -> serde_json::Value {
    serde_json::json!({
        "version": "3.0.0",
        "resources": [
            { "@id": format!("{base_url}/v3/registrations", ), "@type": "RegistrationsBaseUrl/3.6.0" },
            { "@id": format!("{base_url}/v3-flatcontainer", ), "@type": "PackageBaseAddress/3.0.0" },
            { "@id": format!("{base_url}/v3/package", ), "@type": "PackagePublish/2.0.0" },
            { "@id": format!("{base_url}/v3/query", ), "@type": "SearchQueryService/3.5.0" },
        ],
    })
}

/// `GET /v3/registrations/{id}/index.json`: one page listing every non-yanked version.
pub fn render_registration_page(
    base_url: &str,
    id: &str,
    artifacts: &[lodestone_core::model::Artifact],
) -> serde_json::Value {
    let items: Vec<_> = artifacts
        .iter()
        .filter(|a| !a.yanked)
        .map(|a| {
            serde_json::json!({
                "catalogEntry": {
                    "id": id,
                    "version": a.version,
                    "description": a.metadata.get("description"),
                    "authors": a.metadata.get("authors"),
                    "listed": true,
                },
                "packageContent": format!(
                    "{base_url}/v3-flatcontainer/{}/{}/{}.{}.nupkg",
                    id.to_ascii_lowercase(),
                    a.version.to_ascii_lowercase(),
                    id.to_ascii_lowercase(),
                    a.version.to_ascii_lowercase()
                ),
            })
        })
        .collect();

    serde_json::json!({
        "count": items.len(),
        "items": [{ "count": items.len(), "items": items }],
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_minimal_nuspec() {
        let xml = r#"<?xml version="1.0"?>
            <package>
                <metadata>
                    <id>Newtonsoft.Json</id>
                    <version>13.0.3</version>
                    <authors>James Newton-King</authors>
                </metadata>
            </package>"#;
        let package: Package = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(package.metadata.id, "Newtonsoft.Json");
        assert_eq!(package.metadata.version, "13.0.3");
    }

    #[test]
    fn canonicalize_is_case_insensitive_on_id() {
        let adapter = NugetAdapter;
        let (name, version) = adapter
            .canonicalize("newtonsoft.json", None, Some("Newtonsoft.Json"), Some("13.0.3"))
            .unwrap();
        assert_eq!(name, "Newtonsoft.Json");
        assert_eq!(version, "13.0.3");
    }

    #[test]
    fn storage_path_is_lowercased() {
        let adapter = NugetAdapter;
        assert_eq!(
            adapter.storage_path("Newtonsoft.Json", "13.0.3"),
            "nuget/newtonsoft.json/13.0.3/newtonsoft.json.13.0.3.nupkg"
        );
    }
}
