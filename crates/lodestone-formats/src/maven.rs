//! Maven (spec §4.3 Maven): `PUT` stores whatever bytes arrive (`.jar`, `.pom`, `.asc`,
//! `.md5`, `.sha1`) verbatim — there is no container to parse, and the URL path is the
//! sole source of truth for `groupId`/`artifactId`/`version`/filename.
//!
//! The generic `(format, name, version)` key isn't quite enough on its own: Maven
//! legitimately publishes several distinct files per version (the jar, its pom, their
//! signature/checksum siblings). `lodestone_http` is expected to pass `url_name` as
//! `"{groupId}:{artifactId}"` and `url_version` as `"{version}::{filename}"` so each file
//! gets its own Artifact row while still sharing the unified uniqueness constraint.
use async_trait::async_trait;

use lodestone_core::adapter::{FormatAdapter, ParsedArtifact};
use lodestone_core::model::Format;
use lodestone_core::ports::ByteStream;
use lodestone_core::{Error, Result};

pub struct MavenAdapter;

impl MavenAdapter {
    fn split_version(version: &str) -> Result<(&str, &str)> {
        version
            .split_once("::")
            .ok_or_else(|| Error::InvalidRequest("malformed maven version/filename key".to_string()))
    }

    fn content_type_for(filename: &str) -> &'static str {
        if filename.ends_with(".jar") {
            "application/java-archive"
        } else if filename.ends_with(".pom") {
            "application/xml"
        } else {
            "application/octet-stream"
        }
    }
}

#[async_trait]
impl FormatAdapter for MavenAdapter {
    fn format(&self) -> Format {
        Format::Maven
    }

    async fn validate(&self, body: ByteStream) -> Result<ParsedArtifact> {
        Ok(ParsedArtifact {
            embedded_name: None,
            embedded_version: None,
            content_type: "application/octet-stream".to_string(),
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
        if !url_name.contains(':') {
            return Err(Error::InvalidRequest(
                "maven coordinate must be 'groupId:artifactId'".to_string(),
            ));
        }
        let version = url_version
            .ok_or_else(|| Error::InvalidRequest("missing maven version".to_string()))?;
        Self::split_version(version)?;
        Ok((url_name.to_string(), version.to_string()))
    }

    fn storage_path(&self, name: &str, version: &str) -> String {
        let (version, filename) = Self::split_version(version).unwrap_or((version, "artifact"));
        let (group_id, artifact_id) = name.split_once(':').unwrap_or((name, ""));
        let group_path = group_id.replace('.', "/");
        format!("maven/{group_path}/{artifact_id}/{version}/{filename}")
    }
}

impl MavenAdapter {
    pub fn content_type(filename: &str) -> &'static str {
        Self::content_type_for(filename)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn storage_path_turns_group_id_dots_into_slashes() {
        let adapter = MavenAdapter;
        let path = adapter.storage_path("com.example:mylib", "1.0.0::mylib-1.0.0.jar");
        assert_eq!(path, "maven/com/example/mylib/1.0.0/mylib-1.0.0.jar");
    }

    #[test]
    fn canonicalize_rejects_missing_colon() {
        let adapter = MavenAdapter;
        assert!(adapter
            .canonicalize("mylib", Some("1.0.0::mylib-1.0.0.jar"), None, None)
            .is_err());
    }
}
