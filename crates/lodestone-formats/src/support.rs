//! Helpers shared across adapters: reading a whole tar/tarball entry into memory, and
//! name/version sanity checks that aren't worth repeating per-format.
use std::io::Read;

use bytes::Bytes;
use flate2::read::GzDecoder;
use tar::Archive;

use crate::errors::{Error, Result};

/// Reads every entry of a gzip'd tar stream into memory, keyed by path. Used by `npm`,
/// `cargo`, `rubygems`, and `helm`, all of which need random access to one or two small
/// files (`package.json`, `Cargo.toml`, `metadata.gz`, `Chart.yaml`) inside an otherwise
/// irrelevant tarball, exactly like `NpmRegistry::extract_package`'s
/// `GzDecoder` + `tar::Archive` pairing, minus the disk round-trip.
pub fn read_tar_gz(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let decoder = GzDecoder::new(bytes);
    let mut archive = Archive::new(decoder);
    let mut out = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_string_lossy().into_owned();
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        out.push((path, buf));
    }
    Ok(out)
}

/// Finds the first tar entry whose path ends with `suffix`, ignoring the top-level
/// `{name}-{version}/` directory every one of these formats nests its files under.
pub fn find_entry<'a>(entries: &'a [(String, Vec<u8>)], suffix: &str) -> Option<&'a [u8]> {
    entries
        .iter()
        .find(|(path, _)| path.ends_with(suffix))
        .map(|(_, data)| data.as_slice())
}

pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Splits `"name-1.2.3"` on the last `-` into `("name", "1.2.3")`, rejecting a right-hand
/// side that doesn't start with a digit or `v<digit>` (used by Helm and RubyGems, which
/// both identify artifacts by a single hyphen-joined filename stem rather than separate
/// URL path segments).
pub fn split_name_version(stem: &str) -> Option<(String, String)> {
    let idx = stem.rfind('-')?;
    let (name, rest) = stem.split_at(idx);
    let version = &rest[1..];
    let looks_like_version = version
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == 'v')
        .unwrap_or(false);
    if name.is_empty() || version.is_empty() || !looks_like_version {
        return None;
    }
    Some((name.to_string(), version.to_string()))
}

pub fn mismatch(what: &str, url: &str, embedded: &str) -> Error {
    Error::IdentifierMismatch(format!(
        "{what}: url says '{url}', content says '{embedded}'"
    ))
}

pub fn bytes_body(bytes: Bytes) -> lodestone_core::ports::ByteStream {
    lodestone_core::stream::once(bytes)
}

/// Parses `s` as semver, stripping a single leading `v` first (Go's `v1.2.3` module
/// tags). Used by npm/Cargo/Helm/Go, the four formats whose version strings are semver
/// or near enough.
fn parse_semver(s: &str) -> Option<semver::Version> {
    semver::Version::parse(s.strip_prefix('v').unwrap_or(s)).ok()
}

/// Orders two version strings the way npm/Cargo/Helm/Go's exact-name listings are
/// supposed to (semver order), falling back to a plain string compare when either side
/// doesn't parse so a malformed version is still ordered deterministically rather than
/// panicking or getting dropped.
pub fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    match (parse_semver(a), parse_semver(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        _ => a.cmp(b),
    }
}

/// Sorts artifacts ascending by [`compare_versions`], so the highest version is last.
pub fn sort_by_version(artifacts: &mut [lodestone_core::model::Artifact]) {
    artifacts.sort_by(|a, b| compare_versions(&a.version, &b.version));
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn orders_by_semver_not_by_upload_order() {
        assert_eq!(compare_versions("0.9.0", "1.0.0"), std::cmp::Ordering::Less);
        assert_eq!(compare_versions("1.0.0", "0.9.0"), std::cmp::Ordering::Greater);
    }

    #[test]
    fn strips_a_leading_v_for_go_style_tags() {
        assert_eq!(compare_versions("v1.2.3", "v1.10.0"), std::cmp::Ordering::Less);
    }

    #[test]
    fn falls_back_to_string_order_when_unparseable() {
        assert_eq!(compare_versions("latest", "stable"), "latest".cmp("stable"));
    }
}
