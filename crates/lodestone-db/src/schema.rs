//! Table/column identifiers for `sea-query`, grounded on
//! `portfolio_postgres-s3::metadata::types`'s `#[derive(Iden)]` pattern.
use sea_query::Iden;

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Username,
    Email,
    IsActive,
    IsAdmin,
    CreatedAt,
}

#[derive(Iden)]
pub enum Artifacts {
    Table,
    Id,
    Format,
    Name,
    Version,
    ContentType,
    Size,
    Sha256,
    Sha1,
    StoragePath,
    Metadata,
    DownloadCount,
    PublishedBy,
    IsPublic,
    Yanked,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum PackageOwnerships {
    Table,
    Format,
    Name,
    UserId,
    Role,
    GrantedAt,
}

#[derive(Iden)]
pub enum UploadSessions {
    Table,
    Id,
    Repository,
    Owner,
    Size,
    TmpPath,
    CreatedAt,
    LastActivityAt,
}

#[derive(Iden)]
pub enum DownloadEvents {
    Table,
    Id,
    ArtifactId,
    UserId,
    Ip,
    UserAgent,
    OccurredAt,
}

#[derive(Iden)]
pub enum RegistrySettings {
    Table,
    Format,
    Enabled,
    Description,
    UpdatedBy,
    UpdatedAt,
}
