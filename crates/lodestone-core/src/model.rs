//! The unified data model (spec §3), persisted by `lodestone_db` behind
//! [`crate::ports::MetadataStore`] and produced/consumed by every [`crate::adapter::FormatAdapter`].
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the nine wire protocols Lodestone speaks, plus the tag used in
/// `(format, name, version)` tuples and storage paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Nuget,
    Npm,
    Maven,
    Go,
    Helm,
    Cargo,
    Rubygems,
    Opa,
    Oci,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Nuget => "nuget",
            Format::Npm => "npm",
            Format::Maven => "maven",
            Format::Go => "go",
            Format::Helm => "helm",
            Format::Cargo => "cargo",
            Format::Rubygems => "rubygems",
            Format::Opa => "opa",
            Format::Oci => "oci",
        }
    }

    pub const ALL: [Format; 9] = [
        Format::Nuget,
        Format::Npm,
        Format::Maven,
        Format::Go,
        Format::Helm,
        Format::Cargo,
        Format::Rubygems,
        Format::Opa,
        Format::Oci,
    ];
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Format {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nuget" => Ok(Format::Nuget),
            "npm" => Ok(Format::Npm),
            "maven" => Ok(Format::Maven),
            "go" => Ok(Format::Go),
            "helm" => Ok(Format::Helm),
            "cargo" => Ok(Format::Cargo),
            "rubygems" => Ok(Format::Rubygems),
            "opa" => Ok(Format::Opa),
            "oci" => Ok(Format::Oci),
            other => Err(crate::errors::Error::InvalidRequest(format!(
                "unknown format '{other}'"
            ))),
        }
    }
}

/// The central entity (spec §3): one immutable published `(format, name, version)` unit.
///
/// `(format, name, version)` is unique. `size`/`sha256` describe the blob at `storage_path`,
/// which is deterministic given `(format, name, version)` per the owning adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub format: Format,
    pub name: String,
    pub version: String,
    pub content_type: String,
    pub size: i64,
    pub sha256: String,
    /// npm's required `dist.shasum`, cached at upload time (SPEC_FULL §4, Open Question 2)
    /// instead of re-reading the blob to hash it on every packument render.
    pub sha1: Option<String>,
    pub storage_path: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub download_count: i64,
    pub published_by: Option<Uuid>,
    pub is_public: bool,
    /// Cargo yank flag (SPEC_FULL §4, Open Question 1). Meaningless outside `Format::Cargo`
    /// but kept on every row rather than a per-format side table, mirroring how the rest of
    /// the model keeps one Artifact shape across all nine formats.
    pub yanked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A filter for [`crate::registry::RegistryCoreService::list`] (spec §4.1 List).
#[derive(Clone, Debug, Default)]
pub struct ArtifactFilter {
    pub format: Option<Format>,
    pub name: Option<String>,
    pub name_exact: bool,
    pub publisher: Option<Uuid>,
    pub is_public: Option<bool>,
    pub include_yanked: bool,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub offset: i64,
    /// `<= 0` (including the derived `Default`) means unbounded: both `MetadataStore`
    /// implementations skip applying a limit rather than returning zero rows.
    pub limit: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Name,
    Created,
    Updated,
    Downloads,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// An authenticated caller. The core only ever sees id + admin flag; issuing and
/// validating the credential that resolves to this value is out of scope (spec §1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

impl Principal {
    pub fn admin(user_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_admin: true,
        }
    }
}

/// A registered user (spec §3). API keys are modeled and persisted by `lodestone_db`
/// (`api_keys` table) but don't participate in the core's in-memory model beyond resolving
/// to a [`Principal`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerRole {
    Owner,
    Maintainer,
    Contributor,
}

impl OwnerRole {
    /// Owners and maintainers may publish new versions or delete versions (spec §3).
    pub fn can_publish(&self) -> bool {
        matches!(self, OwnerRole::Owner | OwnerRole::Maintainer)
    }

    /// Only owners may grant/revoke roles (spec §3).
    pub fn can_grant(&self) -> bool {
        matches!(self, OwnerRole::Owner)
    }
}

/// One row of the `(format, name) -> {(user_id, role)}` relation (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ownership {
    pub format: Format,
    pub name: String,
    pub user_id: Uuid,
    pub role: OwnerRole,
    pub granted_at: DateTime<Utc>,
}

/// OCI-only in-progress chunked upload (spec §4.2). Persisted so a server restart does not
/// lose an in-flight push; the running digest is re-derived by rehashing the tmp blob at
/// completion rather than persisted on every PATCH (spec §4.2 explicitly allows either).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: Uuid,
    pub repository: String,
    pub owner: Uuid,
    pub size: i64,
    pub tmp_path: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

/// Append-only download record (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadEvent {
    pub id: Uuid,
    pub artifact_id: Uuid,
    pub user_id: Option<Uuid>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Per-format enable flag (spec §3). Consulted on every publish/download.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrySetting {
    pub format: Format,
    pub enabled: bool,
    pub description: Option<String>,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn format_round_trips_through_str() {
        for f in Format::ALL {
            let s = f.as_str();
            let parsed: Format = s.parse().unwrap();
            assert_eq!(f, parsed);
        }
    }

    #[test]
    fn unknown_format_is_invalid_request() {
        let err = "dpkg".parse::<Format>().unwrap_err();
        assert_eq!(err.kind_str(), "invalid_request");
    }

    #[test]
    fn owner_role_permissions() {
        assert!(OwnerRole::Owner.can_publish());
        assert!(OwnerRole::Owner.can_grant());
        assert!(OwnerRole::Maintainer.can_publish());
        assert!(!OwnerRole::Maintainer.can_grant());
        assert!(!OwnerRole::Contributor.can_publish());
        assert!(!OwnerRole::Contributor.can_grant());
    }
}
