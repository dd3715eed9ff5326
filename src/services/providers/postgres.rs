use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{ContentProvider, ContentQuery, InteractionProvider, SortField, SortOrder, UserProvider};
use crate::error::{AppError, AppResult};
use crate::models::{Content, Interaction, InteractionType, Role, User};

const CONTENT_COLUMNS: &str = "id, title, content_type, tags, popularity, created_at";
const INTERACTION_COLUMNS: &str =
    "id, user_id, content_id, interaction_type, timestamp, duration_secs, comment, rating";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    role: String,
    preferences: Vec<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| AppError::Internal(format!("user {}: {}", row.id, e)))?;

        Ok(User {
            id: row.id,
            username: row.username,
            role,
            preferences: row.preferences,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    title: String,
    content_type: String,
    tags: Vec<String>,
    popularity: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ContentRow> for Content {
    type Error = AppError;

    fn try_from(row: ContentRow) -> Result<Self, Self::Error> {
        let content_type = row
            .content_type
            .parse()
            .map_err(|e| AppError::Internal(format!("content {}: {}", row.id, e)))?;

        Ok(Content {
            id: row.id,
            title: row.title,
            content_type,
            tags: row.tags,
            popularity: row.popularity,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InteractionRow {
    id: Uuid,
    user_id: Uuid,
    content_id: Uuid,
    interaction_type: String,
    timestamp: DateTime<Utc>,
    duration_secs: Option<i32>,
    comment: Option<String>,
    rating: Option<i16>,
}

impl TryFrom<InteractionRow> for Interaction {
    type Error = AppError;

    fn try_from(row: InteractionRow) -> Result<Self, Self::Error> {
        let interaction_type = row
            .interaction_type
            .parse::<InteractionType>()
            .map_err(|e| AppError::Internal(format!("interaction {}: {}", row.id, e)))?;

        Ok(Interaction {
            id: row.id,
            user_id: row.user_id,
            content_id: row.content_id,
            interaction_type,
            timestamp: row.timestamp,
            duration_secs: row.duration_secs.map(|d| d as u32),
            comment: row.comment,
            rating: row.rating.map(|r| r as u8),
        })
    }
}

/// User records backed by the `users` table.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserProvider for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, role, preferences, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}

/// Content catalog backed by the `content` table.
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the WHERE clauses a [`ContentQuery`] describes. The builder must
/// already carry a `WHERE TRUE` for the clauses to chain onto.
fn push_content_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ContentQuery) {
    if let Some(ids) = &query.id_in {
        builder.push(" AND id = ANY(");
        builder.push_bind(ids.clone());
        builder.push(")");
    }
    if !query.id_not_in.is_empty() {
        builder.push(" AND NOT (id = ANY(");
        builder.push_bind(query.id_not_in.clone());
        builder.push("))");
    }
    if let Some(content_type) = query.content_type {
        builder.push(" AND content_type = ");
        builder.push_bind(content_type.as_str());
    }
    if !query.tags_any_of.is_empty() {
        builder.push(" AND tags && ");
        builder.push_bind(query.tags_any_of.clone());
    }
}

fn push_sort(builder: &mut QueryBuilder<'_, Postgres>, sort: &[(SortField, SortOrder)]) {
    builder.push(" ORDER BY ");
    for (field, order) in sort {
        // Sort keys are closed enums, never user input, so they can land in
        // the statement text directly.
        builder.push(field.as_str());
        builder.push(match order {
            SortOrder::Asc => " ASC",
            SortOrder::Desc => " DESC",
        });
        builder.push(", ");
    }
    builder.push("id");
}

#[async_trait]
impl ContentProvider for PgContentStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Content>> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT {} FROM content WHERE id = $1",
            CONTENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Content::try_from).transpose()
    }

    async fn find_many(&self, query: ContentQuery) -> AppResult<(Vec<Content>, u64)> {
        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM content WHERE TRUE",
            CONTENT_COLUMNS
        ));
        push_content_filters(&mut select, &query);
        push_sort(&mut select, &query.sort);
        if let Some(limit) = query.limit {
            select.push(" LIMIT ");
            select.push_bind(limit as i64);
        }
        if query.skip > 0 {
            select.push(" OFFSET ");
            select.push_bind(query.skip as i64);
        }

        let rows: Vec<ContentRow> = select.build_query_as().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM content WHERE TRUE");
        push_content_filters(&mut count, &query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let items = rows
            .into_iter()
            .map(Content::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, total as u64))
    }

    async fn increment_popularity(&self, id: Uuid, delta: i64) -> AppResult<Option<Content>> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "UPDATE content SET popularity = popularity + $2 WHERE id = $1 RETURNING {}",
            CONTENT_COLUMNS
        ))
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Content::try_from).transpose()
    }
}

/// Interaction log backed by the `interactions` table.
pub struct PgInteractionStore {
    pool: PgPool,
}

impl PgInteractionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_column(
        &self,
        column: &str,
        id: Uuid,
        interaction_type: Option<InteractionType>,
    ) -> AppResult<Vec<Interaction>> {
        let rows = sqlx::query_as::<_, InteractionRow>(&format!(
            "SELECT {} FROM interactions \
             WHERE {} = $1 AND ($2::text IS NULL OR interaction_type = $2) \
             ORDER BY timestamp DESC, id",
            INTERACTION_COLUMNS, column
        ))
        .bind(id)
        .bind(interaction_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Interaction::try_from).collect()
    }
}

#[async_trait]
impl InteractionProvider for PgInteractionStore {
    async fn find_by_user(
        &self,
        user_id: Uuid,
        interaction_type: Option<InteractionType>,
    ) -> AppResult<Vec<Interaction>> {
        self.find_by_column("user_id", user_id, interaction_type)
            .await
    }

    async fn find_by_content(
        &self,
        content_id: Uuid,
        interaction_type: Option<InteractionType>,
    ) -> AppResult<Vec<Interaction>> {
        self.find_by_column("content_id", content_id, interaction_type)
            .await
    }

    async fn insert(&self, interaction: Interaction) -> AppResult<Interaction> {
        let row = sqlx::query_as::<_, InteractionRow>(&format!(
            "INSERT INTO interactions ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {}",
            INTERACTION_COLUMNS, INTERACTION_COLUMNS
        ))
        .bind(interaction.id)
        .bind(interaction.user_id)
        .bind(interaction.content_id)
        .bind(interaction.interaction_type.as_str())
        .bind(interaction.timestamp)
        .bind(interaction.duration_secs.map(|d| d as i32))
        .bind(interaction.comment)
        .bind(interaction.rating.map(i16::from))
        .fetch_one(&self.pool)
        .await?;

        Interaction::try_from(row)
    }
}
