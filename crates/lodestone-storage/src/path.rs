//! Validates blob store paths before they reach a backend. Mirrors
//! `portfolio_objectstore::Key`'s `TryFrom<PathBuf>` validation (reject `..`, absolute
//! paths, and characters outside what's safe for both a filesystem and an S3 key).
use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{Error, Result};

static SAFE_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.\-@]+$").unwrap());

/// Rejects absolute paths, `.`/`..` segments, and segments containing characters outside
/// the conservative subset [safe for S3 object keys][1] (also safe for any filesystem).
///
/// [1]: https://docs.aws.amazon.com/AmazonS3/latest/userguide/object-keys.html
pub fn validate(path: &str) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment
                    .to_str()
                    .ok_or_else(|| Error::InvalidPath(path.to_string()))?;
                if !SAFE_SEGMENT.is_match(segment) {
                    return Err(Error::InvalidPath(path.to_string()));
                }
                out.push(segment);
            }
            _ => return Err(Error::InvalidPath(path.to_string())),
        }
    }
    if out.as_os_str().is_empty() {
        return Err(Error::InvalidPath(path.to_string()));
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_parent_dir_traversal() {
        assert!(validate("blobs/../etc/passwd").is_err());
    }

    #[test]
    fn rejects_absolute_paths() {
        assert!(validate("/etc/passwd").is_err());
    }

    #[test]
    fn accepts_normal_shard_path() {
        let p = validate("blobs/sha256/ab/abcdef").unwrap();
        assert_eq!(p, PathBuf::from("blobs/sha256/ab/abcdef"));
    }
}
