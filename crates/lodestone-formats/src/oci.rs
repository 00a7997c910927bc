//! OCI (spec §4.3 OCI): not a [`lodestone_core::adapter::FormatAdapter`] — its push/pull
//! path is handled entirely by `lodestone_core::oci_session::OciSessionManager` (blob
//! chunked uploads) and `lodestone_core::oci_manifest::OciManifestService` (manifest/tag
//! operations), since OCI tags are mutable and its blobs are content-addressed rather
//! than keyed by `(name, version)` like the other eight formats. This module only holds
//! the response-rendering helpers those services' callers (`lodestone_http`) need,
//! grounded on `portfolio_backend_postgres::manifests`' `TagListBuilder` usage and
//! `oci-spec`'s own distribution types.
use oci_spec::distribution::{TagList, TagListBuilder};
use oci_spec::image::MediaType;

/// Sniffs the manifest/index media type from a PUT's `Content-Type` header, falling back
/// to inspecting the JSON body's `mediaType` field when the header is missing or generic
/// (some clients send `application/json` regardless of manifest kind).
pub fn media_type(content_type: &str, body: &[u8]) -> MediaType {
    match content_type {
        "application/vnd.oci.image.manifest.v1+json" => return MediaType::ImageManifest,
        "application/vnd.oci.image.index.v1+json" => return MediaType::ImageIndex,
        "application/vnd.docker.distribution.manifest.v2+json" => {
            return MediaType::ImageManifest
        }
        "application/vnd.docker.distribution.manifest.list.v2+json" => {
            return MediaType::ImageIndex
        }
        _ => {}
    }
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("mediaType").and_then(|m| m.as_str()).map(String::from))
        .and_then(|m| m.parse().ok())
        .unwrap_or(MediaType::ImageManifest)
}

/// `GET /v2/{repo}/tags/list` response body.
pub fn render_tags(repository: &str, tags: Vec<String>) -> TagList {
    TagListBuilder::default()
        .name(repository)
        .tags(tags)
        .build()
        .expect("name and tags are always set")
}

/// `GET /v2/_catalog` response body.
pub fn render_catalog(repositories: Vec<String>) -> serde_json::Value {
    serde_json::json!({ "repositories": repositories })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn media_type_prefers_content_type_header() {
        let mt = media_type("application/vnd.oci.image.index.v1+json", b"{}");
        assert_eq!(mt, MediaType::ImageIndex);
    }

    #[test]
    fn media_type_falls_back_to_body_field() {
        let mt = media_type(
            "application/json",
            br#"{"mediaType":"application/vnd.oci.image.manifest.v1+json"}"#,
        );
        assert_eq!(mt, MediaType::ImageManifest);
    }

    #[test]
    fn render_tags_builds_name_and_list() {
        let list = render_tags("library/alpine", vec!["latest".to_string(), "3.19".to_string()]);
        assert_eq!(list.name(), "library/alpine");
        assert_eq!(list.tags().len(), 2);
    }
}
