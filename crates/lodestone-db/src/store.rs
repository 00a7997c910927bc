//! `PgMetadataStore`: the Postgres-backed [`lodestone_core::ports::MetadataStore`].
//! Grounded on `portfolio_postgres_s3::metadata::postgres`'s `Queries` struct (free
//! functions taking `&mut PgConnection`, shared between the pool-connection and
//! transaction call paths) and `sea_query`/`sea_query_binder` for query building.
use async_trait::async_trait;
use chrono::Utc;
use sea_query::{Expr, Order, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::{PgConnection, Pool, Row, Transaction};
use uuid::Uuid;

use lodestone_core::errors::{Error as CoreError, Result as CoreResult};
use lodestone_core::model::{
    Artifact, ArtifactFilter, DownloadEvent, Format, OwnerRole, Ownership, RegistrySetting,
    SortKey, SortOrder, UploadSession, User,
};
use lodestone_core::ports::{MetadataStore, MetadataTx};

use crate::errors::{Error, Result};
use crate::rows::{role_to_str, ArtifactRow, OwnershipRow, RegistrySettingRow, UploadSessionRow, UserRow};
use crate::schema::{
    Artifacts, DownloadEvents, PackageOwnerships, RegistrySettings, UploadSessions, Users,
};

#[derive(Clone)]
pub struct PgMetadataStore {
    pool: Pool<Postgres>,
}

impl PgMetadataStore {
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().connect(connection_string).await?;
        Ok(Self { pool })
    }

    /// Runs the embedded migrations (spec §1 Out of scope names "migration tooling" as
    /// an external concern, but the workspace still needs one concrete, runnable
    /// instance; `sqlx::migrate!` is the idiomatic choice the teacher's own `sqlx`
    /// dependency already pulls in).
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

async fn insert_artifact_query(executor: &mut PgConnection, artifact: &Artifact) -> Result<()> {
    let metadata_json = serde_json::Value::Object(
        artifact
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    );
    let (sql, values) = Query::insert()
        .into_table(Artifacts::Table)
        .columns([
            Artifacts::Id,
            Artifacts::Format,
            Artifacts::Name,
            Artifacts::Version,
            Artifacts::ContentType,
            Artifacts::Size,
            Artifacts::Sha256,
            Artifacts::Sha1,
            Artifacts::StoragePath,
            Artifacts::Metadata,
            Artifacts::DownloadCount,
            Artifacts::PublishedBy,
            Artifacts::IsPublic,
            Artifacts::Yanked,
            Artifacts::CreatedAt,
            Artifacts::UpdatedAt,
        ])
        .values([
            artifact.id.into(),
            artifact.format.as_str().into(),
            artifact.name.clone().into(),
            artifact.version.clone().into(),
            artifact.content_type.clone().into(),
            artifact.size.into(),
            artifact.sha256.clone().into(),
            artifact.sha1.clone().into(),
            artifact.storage_path.clone().into(),
            metadata_json.into(),
            artifact.download_count.into(),
            artifact.published_by.into(),
            artifact.is_public.into(),
            artifact.yanked.into(),
            artifact.created_at.into(),
            artifact.updated_at.into(),
        ])?
        .build_sqlx(PostgresQueryBuilder);

    match sqlx::query_with(&sql, values).execute(executor).await {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(dberr)) if dberr.code().as_deref() == Some("23505") => {
            Err(Error::AlreadyExists)
        }
        Err(e) => Err(e.into()),
    }
}

async fn delete_artifact_query(executor: &mut PgConnection, id: Uuid) -> Result<()> {
    let (sql, values) = Query::delete()
        .from_table(Artifacts::Table)
        .and_where(Expr::col(Artifacts::Id).eq(id))
        .build_sqlx(PostgresQueryBuilder);
    sqlx::query_with(&sql, values).execute(executor).await?;
    Ok(())
}

async fn get_ownership_query(
    executor: &mut PgConnection,
    format: Format,
    name: &str,
) -> Result<Vec<Ownership>> {
    let (sql, values) = Query::select()
        .from(PackageOwnerships::Table)
        .columns([
            PackageOwnerships::Format,
            PackageOwnerships::Name,
            PackageOwnerships::UserId,
            PackageOwnerships::Role,
            PackageOwnerships::GrantedAt,
        ])
        .and_where(Expr::col(PackageOwnerships::Format).eq(format.as_str()))
        .and_where(Expr::col(PackageOwnerships::Name).eq(name))
        .build_sqlx(PostgresQueryBuilder);

    let rows = sqlx::query_as_with::<_, OwnershipRow, _>(&sql, values)
        .fetch_all(executor)
        .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

async fn insert_ownership_query(executor: &mut PgConnection, ownership: &Ownership) -> Result<()> {
    let (sql, values) = Query::insert()
        .into_table(PackageOwnerships::Table)
        .columns([
            PackageOwnerships::Format,
            PackageOwnerships::Name,
            PackageOwnerships::UserId,
            PackageOwnerships::Role,
            PackageOwnerships::GrantedAt,
        ])
        .values([
            ownership.format.as_str().into(),
            ownership.name.clone().into(),
            ownership.user_id.into(),
            role_to_str(ownership.role).into(),
            ownership.granted_at.into(),
        ])?
        .build_sqlx(PostgresQueryBuilder);
    sqlx::query_with(&sql, values).execute(executor).await?;
    Ok(())
}

async fn remove_ownership_query(
    executor: &mut PgConnection,
    format: Format,
    name: &str,
    user_id: Uuid,
) -> Result<()> {
    let (sql, values) = Query::delete()
        .from_table(PackageOwnerships::Table)
        .and_where(Expr::col(PackageOwnerships::Format).eq(format.as_str()))
        .and_where(Expr::col(PackageOwnerships::Name).eq(name))
        .and_where(Expr::col(PackageOwnerships::UserId).eq(user_id))
        .build_sqlx(PostgresQueryBuilder);
    sqlx::query_with(&sql, values).execute(executor).await?;
    Ok(())
}

/// One atomic unit of work over a `sqlx` transaction (spec §4.1 step 4, §5 Ordering
/// guarantees). `tx` is `Some` until `commit`/`rollback` consumes it, mirroring
/// `portfolio_backend_postgres`'s `PostgresMetadataTxInactive` guard.
pub struct PgMetadataTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgMetadataTx {
    fn conn(&mut self) -> Result<&mut PgConnection> {
        Ok(self.tx.as_mut().ok_or(Error::TransactionInactive)?.as_mut())
    }
}

#[async_trait]
impl MetadataTx for PgMetadataTx {
    async fn insert_artifact(&mut self, artifact: &Artifact) -> CoreResult<()> {
        insert_artifact_query(self.conn().map_err(CoreError::from)?, artifact)
            .await
            .map_err(CoreError::from)
    }

    async fn delete_artifact(&mut self, id: Uuid) -> CoreResult<()> {
        delete_artifact_query(self.conn().map_err(CoreError::from)?, id)
            .await
            .map_err(CoreError::from)
    }

    async fn get_ownership(&mut self, format: Format, name: &str) -> CoreResult<Vec<Ownership>> {
        get_ownership_query(self.conn().map_err(CoreError::from)?, format, name)
            .await
            .map_err(CoreError::from)
    }

    async fn insert_ownership(&mut self, ownership: &Ownership) -> CoreResult<()> {
        insert_ownership_query(self.conn().map_err(CoreError::from)?, ownership)
            .await
            .map_err(CoreError::from)
    }

    async fn remove_ownership(&mut self, format: Format, name: &str, user_id: Uuid) -> CoreResult<()> {
        remove_ownership_query(self.conn().map_err(CoreError::from)?, format, name, user_id)
            .await
            .map_err(CoreError::from)
    }

    async fn commit(mut self: Box<Self>) -> CoreResult<()> {
        let tx = self.tx.take().ok_or(Error::TransactionInactive).map_err(CoreError::from)?;
        tx.commit().await.map_err(Error::from).map_err(CoreError::from)
    }

    async fn rollback(mut self: Box<Self>) -> CoreResult<()> {
        let tx = self.tx.take().ok_or(Error::TransactionInactive).map_err(CoreError::from)?;
        tx.rollback().await.map_err(Error::from).map_err(CoreError::from)
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn begin(&self) -> CoreResult<Box<dyn MetadataTx>> {
        let tx = self.pool.begin().await.map_err(Error::from).map_err(CoreError::from)?;
        Ok(Box::new(PgMetadataTx { tx: Some(tx) }))
    }

    async fn get_artifact(&self, format: Format, name: &str, version: &str) -> CoreResult<Option<Artifact>> {
        let (sql, values) = Query::select()
            .from(Artifacts::Table)
            .columns(artifact_columns())
            .and_where(Expr::col(Artifacts::Format).eq(format.as_str()))
            .and_where(Expr::col(Artifacts::Name).eq(name))
            .and_where(Expr::col(Artifacts::Version).eq(version))
            .build_sqlx(PostgresQueryBuilder);

        let row = sqlx::query_as_with::<_, ArtifactRow, _>(&sql, values)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        Ok(row.map(|r| r.0))
    }

    async fn get_artifact_by_id(&self, id: Uuid) -> CoreResult<Option<Artifact>> {
        let (sql, values) = Query::select()
            .from(Artifacts::Table)
            .columns(artifact_columns())
            .and_where(Expr::col(Artifacts::Id).eq(id))
            .build_sqlx(PostgresQueryBuilder);

        let row = sqlx::query_as_with::<_, ArtifactRow, _>(&sql, values)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        Ok(row.map(|r| r.0))
    }

    async fn list_artifacts(&self, filter: &ArtifactFilter) -> CoreResult<(Vec<Artifact>, i64)> {
        let mut select = Query::select();
        select.from(Artifacts::Table).columns(artifact_columns());
        apply_filter(&mut select, filter);

        let (sort_col, order) = sort_column(filter);
        select.order_by(sort_col, order);
        // `limit <= 0` means "unbounded" (ArtifactFilter's derived Default has limit: 0,
        // and index/packument endpoints build a filter without ever setting it).
        if filter.limit > 0 {
            select.limit(filter.limit as u64);
        }
        select.offset(filter.offset.max(0) as u64);

        let (sql, values) = select.build_sqlx(PostgresQueryBuilder);
        let rows = sqlx::query_as_with::<_, ArtifactRow, _>(&sql, values)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;

        let mut count_select = Query::select();
        count_select
            .from(Artifacts::Table)
            .expr_as(Expr::col(Artifacts::Id).count(), sea_query::Alias::new("total"));
        apply_filter(&mut count_select, filter);
        let (count_sql, count_values) = count_select.build_sqlx(PostgresQueryBuilder);
        let count_row = sqlx::query_with(&count_sql, count_values)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        let total: i64 = count_row.try_get("total").map_err(Error::from).map_err(CoreError::from)?;

        Ok((rows.into_iter().map(|r| r.0).collect(), total))
    }

    async fn set_yanked(&self, format: Format, name: &str, version: &str, yanked: bool) -> CoreResult<()> {
        let (sql, values) = Query::update()
            .table(Artifacts::Table)
            .value(Artifacts::Yanked, yanked)
            .value(Artifacts::UpdatedAt, Utc::now())
            .and_where(Expr::col(Artifacts::Format).eq(format.as_str()))
            .and_where(Expr::col(Artifacts::Name).eq(name))
            .and_where(Expr::col(Artifacts::Version).eq(version))
            .build_sqlx(PostgresQueryBuilder);
        sqlx::query_with(&sql, values)
            .execute(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        Ok(())
    }

    async fn increment_download_count(&self, artifact_id: Uuid) -> CoreResult<()> {
        let (sql, values) = Query::update()
            .table(Artifacts::Table)
            .value(
                Artifacts::DownloadCount,
                Expr::col(Artifacts::DownloadCount).add(1),
            )
            .and_where(Expr::col(Artifacts::Id).eq(artifact_id))
            .build_sqlx(PostgresQueryBuilder);
        sqlx::query_with(&sql, values)
            .execute(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        Ok(())
    }

    async fn record_download_event(&self, event: &DownloadEvent) -> CoreResult<()> {
        let (sql, values) = Query::insert()
            .into_table(DownloadEvents::Table)
            .columns([
                DownloadEvents::Id,
                DownloadEvents::ArtifactId,
                DownloadEvents::UserId,
                DownloadEvents::Ip,
                DownloadEvents::UserAgent,
                DownloadEvents::OccurredAt,
            ])
            .values([
                event.id.into(),
                event.artifact_id.into(),
                event.user_id.into(),
                event.ip.clone().into(),
                event.user_agent.clone().into(),
                event.occurred_at.into(),
            ])?
            .build_sqlx(PostgresQueryBuilder);
        sqlx::query_with(&sql, values)
            .execute(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        Ok(())
    }

    async fn get_ownership(&self, format: Format, name: &str) -> CoreResult<Vec<Ownership>> {
        let pool = self.pool.clone();
        let mut conn = pool.acquire().await.map_err(Error::from).map_err(CoreError::from)?;
        get_ownership_query(&mut conn, format, name)
            .await
            .map_err(CoreError::from)
    }

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let (sql, values) = Query::select()
            .from(Users::Table)
            .columns([
                Users::Id,
                Users::Username,
                Users::Email,
                Users::IsActive,
                Users::IsAdmin,
                Users::CreatedAt,
            ])
            .and_where(Expr::col(Users::Id).eq(id))
            .build_sqlx(PostgresQueryBuilder);
        let row = sqlx::query_as_with::<_, UserRow, _>(&sql, values)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        Ok(row.map(|r| r.0))
    }

    async fn get_setting(&self, format: Format) -> CoreResult<RegistrySetting> {
        let (sql, values) = Query::select()
            .from(RegistrySettings::Table)
            .columns([
                RegistrySettings::Format,
                RegistrySettings::Enabled,
                RegistrySettings::Description,
                RegistrySettings::UpdatedBy,
                RegistrySettings::UpdatedAt,
            ])
            .and_where(Expr::col(RegistrySettings::Format).eq(format.as_str()))
            .build_sqlx(PostgresQueryBuilder);
        let row = sqlx::query_as_with::<_, RegistrySettingRow, _>(&sql, values)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        // Every format has a seeded row (see the init migration); absence means the
        // setting was somehow deleted, which we treat as "disabled" rather than panic.
        Ok(row.map(|r| r.0).unwrap_or(RegistrySetting {
            format,
            enabled: false,
            description: None,
            updated_by: None,
            updated_at: Utc::now(),
        }))
    }

    async fn set_setting(&self, setting: &RegistrySetting) -> CoreResult<()> {
        let (sql, values) = Query::insert()
            .into_table(RegistrySettings::Table)
            .columns([
                RegistrySettings::Format,
                RegistrySettings::Enabled,
                RegistrySettings::Description,
                RegistrySettings::UpdatedBy,
                RegistrySettings::UpdatedAt,
            ])
            .values([
                setting.format.as_str().into(),
                setting.enabled.into(),
                setting.description.clone().into(),
                setting.updated_by.into(),
                setting.updated_at.into(),
            ])?
            .on_conflict(
                sea_query::OnConflict::column(RegistrySettings::Format)
                    .update_columns([
                        RegistrySettings::Enabled,
                        RegistrySettings::Description,
                        RegistrySettings::UpdatedBy,
                        RegistrySettings::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .build_sqlx(PostgresQueryBuilder);
        sqlx::query_with(&sql, values)
            .execute(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        Ok(())
    }

    async fn list_settings(&self) -> CoreResult<Vec<RegistrySetting>> {
        let (sql, values) = Query::select()
            .from(RegistrySettings::Table)
            .columns([
                RegistrySettings::Format,
                RegistrySettings::Enabled,
                RegistrySettings::Description,
                RegistrySettings::UpdatedBy,
                RegistrySettings::UpdatedAt,
            ])
            .build_sqlx(PostgresQueryBuilder);
        let rows = sqlx::query_as_with::<_, RegistrySettingRow, _>(&sql, values)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn insert_upload_session(&self, session: &UploadSession) -> CoreResult<()> {
        let (sql, values) = Query::insert()
            .into_table(UploadSessions::Table)
            .columns([
                UploadSessions::Id,
                UploadSessions::Repository,
                UploadSessions::Owner,
                UploadSessions::Size,
                UploadSessions::TmpPath,
                UploadSessions::CreatedAt,
                UploadSessions::LastActivityAt,
            ])
            .values([
                session.id.into(),
                session.repository.clone().into(),
                session.owner.into(),
                session.size.into(),
                session.tmp_path.clone().into(),
                session.created_at.into(),
                session.last_activity_at.into(),
            ])?
            .build_sqlx(PostgresQueryBuilder);
        sqlx::query_with(&sql, values)
            .execute(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        Ok(())
    }

    async fn get_upload_session(&self, id: Uuid) -> CoreResult<Option<UploadSession>> {
        let (sql, values) = Query::select()
            .from(UploadSessions::Table)
            .columns(upload_session_columns())
            .and_where(Expr::col(UploadSessions::Id).eq(id))
            .build_sqlx(PostgresQueryBuilder);
        let row = sqlx::query_as_with::<_, UploadSessionRow, _>(&sql, values)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        Ok(row.map(|r| r.0))
    }

    async fn update_upload_session(&self, session: &UploadSession) -> CoreResult<()> {
        let (sql, values) = Query::update()
            .table(UploadSessions::Table)
            .value(UploadSessions::Size, session.size)
            .value(UploadSessions::LastActivityAt, session.last_activity_at)
            .and_where(Expr::col(UploadSessions::Id).eq(session.id))
            .build_sqlx(PostgresQueryBuilder);
        sqlx::query_with(&sql, values)
            .execute(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        Ok(())
    }

    async fn delete_upload_session(&self, id: Uuid) -> CoreResult<()> {
        let (sql, values) = Query::delete()
            .from_table(UploadSessions::Table)
            .and_where(Expr::col(UploadSessions::Id).eq(id))
            .build_sqlx(PostgresQueryBuilder);
        sqlx::query_with(&sql, values)
            .execute(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        Ok(())
    }

    async fn list_expired_upload_sessions(&self, idle_threshold_secs: i64) -> CoreResult<Vec<UploadSession>> {
        let cutoff = Utc::now() - chrono::Duration::seconds(idle_threshold_secs);
        let (sql, values) = Query::select()
            .from(UploadSessions::Table)
            .columns(upload_session_columns())
            .and_where(Expr::col(UploadSessions::LastActivityAt).lt(cutoff))
            .build_sqlx(PostgresQueryBuilder);
        let rows = sqlx::query_as_with::<_, UploadSessionRow, _>(&sql, values)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn list_oci_tags(&self, repository: &str) -> CoreResult<Vec<String>> {
        let (sql, values) = Query::select()
            .from(Artifacts::Table)
            .column(Artifacts::Version)
            .and_where(Expr::col(Artifacts::Format).eq(Format::Oci.as_str()))
            .and_where(Expr::col(Artifacts::Name).eq(repository))
            .order_by(Artifacts::Version, Order::Asc)
            .build_sqlx(PostgresQueryBuilder);
        let rows = sqlx::query_with(&sql, values)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        rows.into_iter()
            .map(|r| r.try_get::<String, _>("version").map_err(|e| CoreError::from(Error::from(e))))
            .collect()
    }

    async fn list_oci_repositories(&self) -> CoreResult<Vec<String>> {
        let (sql, values) = Query::select()
            .from(Artifacts::Table)
            .column(Artifacts::Name)
            .distinct()
            .and_where(Expr::col(Artifacts::Format).eq(Format::Oci.as_str()))
            .order_by(Artifacts::Name, Order::Asc)
            .build_sqlx(PostgresQueryBuilder);
        let rows = sqlx::query_with(&sql, values)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::from)
            .map_err(CoreError::from)?;
        rows.into_iter()
            .map(|r| r.try_get::<String, _>("name").map_err(|e| CoreError::from(Error::from(e))))
            .collect()
    }
}

fn artifact_columns() -> [Artifacts; 16] {
    [
        Artifacts::Id,
        Artifacts::Format,
        Artifacts::Name,
        Artifacts::Version,
        Artifacts::ContentType,
        Artifacts::Size,
        Artifacts::Sha256,
        Artifacts::Sha1,
        Artifacts::StoragePath,
        Artifacts::Metadata,
        Artifacts::DownloadCount,
        Artifacts::PublishedBy,
        Artifacts::IsPublic,
        Artifacts::Yanked,
        Artifacts::CreatedAt,
        Artifacts::UpdatedAt,
    ]
}

fn upload_session_columns() -> [UploadSessions; 7] {
    [
        UploadSessions::Id,
        UploadSessions::Repository,
        UploadSessions::Owner,
        UploadSessions::Size,
        UploadSessions::TmpPath,
        UploadSessions::CreatedAt,
        UploadSessions::LastActivityAt,
    ]
}

fn apply_filter(select: &mut sea_query::SelectStatement, filter: &ArtifactFilter) {
    if let Some(format) = filter.format {
        select.and_where(Expr::col(Artifacts::Format).eq(format.as_str()));
    }
    if let Some(name) = &filter.name {
        if filter.name_exact {
            select.and_where(Expr::col(Artifacts::Name).eq(name.as_str()));
        } else {
            select.and_where(Expr::col(Artifacts::Name).ilike(format!("%{name}%")));
        }
    }
    if let Some(publisher) = filter.publisher {
        select.and_where(Expr::col(Artifacts::PublishedBy).eq(publisher));
    }
    if let Some(is_public) = filter.is_public {
        select.and_where(Expr::col(Artifacts::IsPublic).eq(is_public));
    }
    if !filter.include_yanked {
        select.and_where(Expr::col(Artifacts::Yanked).eq(false));
    }
}

fn sort_column(filter: &ArtifactFilter) -> (Artifacts, Order) {
    let col = match filter.sort_key {
        SortKey::Name => Artifacts::Name,
        SortKey::Created => Artifacts::CreatedAt,
        SortKey::Updated => Artifacts::UpdatedAt,
        SortKey::Downloads => Artifacts::DownloadCount,
    };
    let order = match filter.sort_order {
        SortOrder::Ascending => Order::Asc,
        SortOrder::Descending => Order::Desc,
    };
    (col, order)
}
