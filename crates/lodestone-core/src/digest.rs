//! Content digests.
//!
//! Two shapes are needed across the nine formats: the plain 64-character lowercase hex
//! SHA-256 stored on every [`crate::model::Artifact`] (spec §3), and OCI's `algo:hex`
//! form used for blob/manifest digests and the `Docker-Content-Digest` header (spec
//! §4.2, §6). [`OciDigest`] also accepts `sha512` since that's a registered OCI digest
//! algorithm, even though Lodestone only ever produces `sha256` digests itself.
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha512};

use crate::errors::DigestError;

/// A bare 64-character lowercase hex SHA-256, as stored on [`crate::model::Artifact::sha256`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Sha256Digest {
    type Error = DigestError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DigestError::Invalid(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

/// OCI's `<algorithm>:<encoded>` digest, per the [descriptor
/// spec](https://github.com/opencontainers/image-spec/blob/main/descriptor.md#digests).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OciDigest {
    algorithm: DigestAlgorithm,
    encoded: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }
}

impl OciDigest {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self {
            algorithm: DigestAlgorithm::Sha256,
            encoded: format!("{:x}", hasher.finalize()),
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// The `{hex[0:2]}/{hex}` shard used for the content-addressed blob layout (spec §4.4).
    pub fn blob_path(&self) -> String {
        format!(
            "blobs/{}/{}/{}",
            self.algorithm.as_str(),
            &self.encoded[0..2],
            self.encoded
        )
    }

    pub fn digester(&self) -> Digester {
        match self.algorithm {
            DigestAlgorithm::Sha256 => Digester::Sha256(Sha256::new()),
            DigestAlgorithm::Sha512 => Digester::Sha512(Sha512::new()),
        }
    }
}

impl std::fmt::Display for OciDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm.as_str(), self.encoded)
    }
}

impl TryFrom<&str> for OciDigest {
    type Error = DigestError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let i = s.find(':').ok_or_else(|| DigestError::Invalid(s.to_string()))?;
        let algo = s
            .get(..i)
            .ok_or_else(|| DigestError::Invalid(s.to_string()))?;
        let encoded = match s.get(i + 1..) {
            Some(e) if !e.is_empty() => e,
            _ => return Err(DigestError::Invalid(s.to_string())),
        };
        let algorithm = match algo {
            "sha256" => DigestAlgorithm::Sha256,
            "sha512" => DigestAlgorithm::Sha512,
            other => return Err(DigestError::UnsupportedAlgorithm(other.to_string())),
        };
        Ok(Self {
            algorithm,
            encoded: encoded.to_string(),
        })
    }
}

impl From<Sha256Digest> for OciDigest {
    fn from(d: Sha256Digest) -> Self {
        Self {
            algorithm: DigestAlgorithm::Sha256,
            encoded: d.0,
        }
    }
}

/// Incremental digest accumulator used by [`crate::stream::DigestBody`] to compute a
/// blob's digest while it streams through to the blob store, without buffering.
pub enum Digester {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Digester {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Digester::Sha256(h) => h.update(data),
            Digester::Sha512(h) => h.update(data),
        }
    }

    pub fn finalize_oci(self) -> OciDigest {
        match self {
            Digester::Sha256(h) => OciDigest {
                algorithm: DigestAlgorithm::Sha256,
                encoded: format!("{:x}", h.finalize()),
            },
            Digester::Sha512(h) => OciDigest {
                algorithm: DigestAlgorithm::Sha512,
                encoded: format!("{:x}", h.finalize()),
            },
        }
    }

    pub fn finalize_sha256(self) -> Sha256Digest {
        match self {
            Digester::Sha256(h) => Sha256Digest(format!("{:x}", h.finalize())),
            Digester::Sha512(_) => unreachable!("finalize_sha256 called on a non-sha256 digester"),
        }
    }
}

impl Default for Digester {
    fn default() -> Self {
        Digester::Sha256(Sha256::new())
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case::sha256("sha256:meow", Ok((DigestAlgorithm::Sha256, "meow")))]
    #[case::sha512("sha512:meow", Ok((DigestAlgorithm::Sha512, "meow")))]
    #[case::bad_algo("sha666:meow", Err(DigestError::UnsupportedAlgorithm("sha666".into())))]
    #[case::no_colon("sha256meow", Err(DigestError::Invalid("sha256meow".into())))]
    #[case::empty_encoded("sha256:", Err(DigestError::Invalid("sha256:".into())))]
    #[case::empty_algo(":meow", Err(DigestError::UnsupportedAlgorithm("".into())))]
    fn parses_oci_digests(
        #[case] input: &str,
        #[case] expected: Result<(DigestAlgorithm, &str), DigestError>,
    ) {
        let actual = OciDigest::try_from(input);
        match (expected, actual) {
            (Ok((algo, enc)), Ok(d)) => {
                assert_eq!(d.algorithm(), algo);
                assert_eq!(d.encoded(), enc);
            }
            (Err(e), Err(a)) => assert_eq!(e, a),
            (exp, act) => panic!("mismatch: expected {exp:?} got {act:?}"),
        }
    }

    #[test]
    fn sha256_digest_rejects_wrong_length() {
        assert!(Sha256Digest::try_from("abcd").is_err());
    }

    #[test]
    fn sha256_digest_from_bytes_round_trips_through_str() {
        let d = Sha256Digest::from_bytes(b"hello world");
        let s = d.as_str();
        let d2 = Sha256Digest::try_from(s).unwrap();
        assert_eq!(d, d2);
    }
}
