//! RubyGems (spec §4.3 RubyGems): `POST /api/v1/gems` sends the raw `.gem` file, a plain
//! (non-gzipped) tar containing `metadata.gz` (a gzipped Psych/YAML `Gem::Specification`
//! dump), `data.tar.gz`, and `checksums.yaml.gz`. Full Psych deserialization (custom
//! `!ruby/object:...` tags) isn't worth reproducing here: this adapter regex-scans the
//! decompressed YAML for the `name`/`version` scalars as a best-effort cross-check, and
//! otherwise trusts the upload filename the same way Helm does.
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use lodestone_core::adapter::{FormatAdapter, ParsedArtifact};
use lodestone_core::model::Format;
use lodestone_core::ports::ByteStream;
use lodestone_core::{stream, Error, Result};

use crate::errors::Error as FormatError;
use crate::support::{bytes_body, gunzip, split_name_version};

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^name:\s*(\S+)\s*$").unwrap());
// Requires leading indentation to match the nested `version:` scalar under Psych's
// `!ruby/object:Gem::Version` tag rather than the top-level `version:` key (whose value
// is the tag itself, not the version string).
static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]+version:\s*(\S+)\s*$").unwrap());

pub struct RubygemsAdapter;

impl RubygemsAdapter {
    fn extract_metadata_gz(bytes: &[u8]) -> Option<Vec<u8>> {
        let mut archive = tar::Archive::new(std::io::Cursor::new(bytes));
        let entries = archive.entries().ok()?;
        for entry in entries {
            let mut entry = entry.ok()?;
            let path = entry.path().ok()?.to_string_lossy().into_owned();
            if path == "metadata.gz" {
                let mut buf = Vec::new();
                std::io::Read::read_to_end(&mut entry, &mut buf).ok()?;
                return Some(buf);
            }
        }
        None
    }

    fn sniff_identifiers(bytes: &[u8]) -> Option<(String, String)> {
        let metadata_gz = Self::extract_metadata_gz(bytes)?;
        let yaml = gunzip(&metadata_gz).ok()?;
        let yaml = String::from_utf8_lossy(&yaml);
        let name = NAME_RE.captures(&yaml)?.get(1)?.as_str().to_string();
        let version = VERSION_RE.captures(&yaml)?.get(1)?.as_str().to_string();
        Some((name, version))
    }
}

#[async_trait]
impl FormatAdapter for RubygemsAdapter {
    fn format(&self) -> Format {
        Format::Rubygems
    }

    async fn validate(&self, body: ByteStream) -> Result<ParsedArtifact> {
        let bytes = stream::collect(body).await?;
        let sniffed = Self::sniff_identifiers(&bytes);

        Ok(ParsedArtifact {
            embedded_name: sniffed.as_ref().map(|(n, _)| n.clone()),
            embedded_version: sniffed.as_ref().map(|(_, v)| v.clone()),
            content_type: "application/octet-stream".to_string(),
            metadata: serde_json::Map::new(),
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
            Error::from(FormatError::MalformedContainer(format!(
                "cannot derive gem name/version from '{url_name}'"
            )))
        })
    }

    fn storage_path(&self, name: &str, version: &str) -> String {
        format!("rubygems/gems/{name}-{version}.gem")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn canonicalize_falls_back_to_filename_stem() {
        let adapter = RubygemsAdapter;
        let (name, version) = adapter
            .canonicalize("mygem-1.2.3", None, None, None)
            .unwrap();
        assert_eq!(name, "mygem");
        assert_eq!(version, "1.2.3");
    }

    #[test]
    fn name_regex_matches_psych_dump_scalar() {
        let yaml = "name: mygem\nversion: !ruby/object:Gem::Version\n  version: 1.2.3\n";
        assert_eq!(NAME_RE.captures(yaml).unwrap().get(1).unwrap().as_str(), "mygem");
        assert_eq!(
            VERSION_RE.captures(yaml).unwrap().get(1).unwrap().as_str(),
            "1.2.3"
        );
    }
}
