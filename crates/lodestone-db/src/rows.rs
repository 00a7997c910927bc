//! Row types bridging Postgres columns and `lodestone_core::model` types. Manual
//! `FromRow` impls are needed wherever a column isn't a 1:1 scalar mapping (`format`,
//! `role`, `metadata`), mirroring `portfolio_postgres_s3::metadata::types`'s manual
//! `FromRow` impls for its own enum-carrying columns (`Blob::digest`, `Manifest::digest`).
use std::collections::BTreeMap;
use std::str::FromStr;

use sqlx::postgres::PgRow;
use sqlx::Row;

use lodestone_core::model::{
    Artifact, Format, OwnerRole, Ownership, RegistrySetting, UploadSession, User,
};

use crate::errors::{Error, Result};

pub struct ArtifactRow(pub Artifact);

impl sqlx::FromRow<'_, PgRow> for ArtifactRow {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        let format: String = row.try_get("format")?;
        let format = Format::from_str(&format).map_err(|e| sqlx::Error::ColumnDecode {
            index: "format".to_string(),
            source: e.into(),
        })?;
        let metadata: serde_json::Value = row.try_get("metadata")?;
        let metadata: BTreeMap<String, serde_json::Value> = match metadata {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Ok(Self(Artifact {
            id: row.try_get("id")?,
            format,
            name: row.try_get("name")?,
            version: row.try_get("version")?,
            content_type: row.try_get("content_type")?,
            size: row.try_get("size")?,
            sha256: row.try_get("sha256")?,
            sha1: row.try_get("sha1")?,
            storage_path: row.try_get("storage_path")?,
            metadata,
            download_count: row.try_get("download_count")?,
            published_by: row.try_get("published_by")?,
            is_public: row.try_get("is_public")?,
            yanked: row.try_get("yanked")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

pub struct UserRow(pub User);

impl sqlx::FromRow<'_, PgRow> for UserRow {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        Ok(Self(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            is_active: row.try_get("is_active")?,
            is_admin: row.try_get("is_admin")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

pub struct OwnershipRow(pub Ownership);

impl sqlx::FromRow<'_, PgRow> for OwnershipRow {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        let format: String = row.try_get("format")?;
        let format = Format::from_str(&format).map_err(|e| sqlx::Error::ColumnDecode {
            index: "format".to_string(),
            source: e.into(),
        })?;
        let role: String = row.try_get("role")?;
        let role = role_from_str(&role).map_err(|e| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: e.into(),
        })?;
        Ok(Self(Ownership {
            format,
            name: row.try_get("name")?,
            user_id: row.try_get("user_id")?,
            role,
            granted_at: row.try_get("granted_at")?,
        }))
    }
}

pub struct UploadSessionRow(pub UploadSession);

impl sqlx::FromRow<'_, PgRow> for UploadSessionRow {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        Ok(Self(UploadSession {
            id: row.try_get("id")?,
            repository: row.try_get("repository")?,
            owner: row.try_get("owner")?,
            size: row.try_get("size")?,
            tmp_path: row.try_get("tmp_path")?,
            created_at: row.try_get("created_at")?,
            last_activity_at: row.try_get("last_activity_at")?,
        }))
    }
}

pub struct RegistrySettingRow(pub RegistrySetting);

impl sqlx::FromRow<'_, PgRow> for RegistrySettingRow {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        let format: String = row.try_get("format")?;
        let format = Format::from_str(&format).map_err(|e| sqlx::Error::ColumnDecode {
            index: "format".to_string(),
            source: e.into(),
        })?;
        Ok(Self(RegistrySetting {
            format,
            enabled: row.try_get("enabled")?,
            description: row.try_get("description")?,
            updated_by: row.try_get("updated_by")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

pub fn role_to_str(role: OwnerRole) -> &'static str {
    match role {
        OwnerRole::Owner => "owner",
        OwnerRole::Maintainer => "maintainer",
        OwnerRole::Contributor => "contributor",
    }
}

pub fn role_from_str(s: &str) -> Result<OwnerRole> {
    match s {
        "owner" => Ok(OwnerRole::Owner),
        "maintainer" => Ok(OwnerRole::Maintainer),
        "contributor" => Ok(OwnerRole::Contributor),
        other => Err(Error::InvalidDigest(format!("unknown ownership role '{other}'"))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [OwnerRole::Owner, OwnerRole::Maintainer, OwnerRole::Contributor] {
            assert_eq!(role_from_str(role_to_str(role)).unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(role_from_str("root").is_err());
    }
}
