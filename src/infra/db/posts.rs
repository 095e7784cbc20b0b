use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreatePostParams, PostsRepo, RepoError, UpdatePostParams},
    domain::entities::{FeedEntry, GroupRef, PostRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

/// Base select for the denormalized feed shape: post joined with author,
/// left-joined with its optional group.
const FEED_SELECT: &str = "SELECT p.id, p.text, p.image_path, p.created_at, \
    u.id AS author_id, u.username AS author_username, u.display_name AS author_display_name, \
    g.id AS group_id, g.slug AS group_slug, g.title AS group_title \
    FROM posts p \
    INNER JOIN users u ON u.id = p.author_id \
    LEFT JOIN post_groups g ON g.id = p.group_id";

const FEED_ORDER: &str = " ORDER BY p.created_at DESC, p.id DESC";

const POST_COLUMNS: &str = "id, text, author_id, group_id, image_path, created_at";

#[derive(sqlx::FromRow)]
struct FeedRow {
    id: Uuid,
    text: String,
    image_path: Option<String>,
    created_at: OffsetDateTime,
    author_id: Uuid,
    author_username: String,
    author_display_name: String,
    group_id: Option<Uuid>,
    group_slug: Option<String>,
    group_title: Option<String>,
}

impl From<FeedRow> for FeedEntry {
    fn from(row: FeedRow) -> Self {
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(GroupRef { id, slug, title }),
            _ => None,
        };
        Self {
            id: row.id,
            text: row.text,
            image_path: row.image_path,
            created_at: row.created_at,
            author_id: row.author_id,
            author_username: row.author_username,
            author_display_name: row.author_display_name,
            group,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    text: String,
    author_id: Uuid,
    group_id: Option<Uuid>,
    image_path: Option<String>,
    created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            author_id: row.author_id,
            group_id: row.group_id,
            image_path: row.image_path,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_feed(&self) -> Result<Vec<FeedEntry>, RepoError> {
        let rows = sqlx::query_as::<_, FeedRow>(&format!("{FEED_SELECT}{FEED_ORDER}"))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(FeedEntry::from).collect())
    }

    async fn list_by_group(&self, group_id: Uuid) -> Result<Vec<FeedEntry>, RepoError> {
        let rows = sqlx::query_as::<_, FeedRow>(&format!(
            "{FEED_SELECT} WHERE p.group_id = $1{FEED_ORDER}"
        ))
        .bind(group_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(FeedEntry::from).collect())
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<FeedEntry>, RepoError> {
        let rows = sqlx::query_as::<_, FeedRow>(&format!(
            "{FEED_SELECT} WHERE p.author_id = $1{FEED_ORDER}"
        ))
        .bind(author_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(FeedEntry::from).collect())
    }

    async fn list_by_authors(&self, author_ids: &[Uuid]) -> Result<Vec<FeedEntry>, RepoError> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Postgres>::new(FEED_SELECT);
        qb.push(" WHERE p.author_id = ANY(");
        qb.push_bind(author_ids.to_vec());
        qb.push(")");
        qb.push(FEED_ORDER);

        let rows: Vec<FeedRow> = qb
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(FeedEntry::from).collect())
    }

    async fn find_entry(&self, id: Uuid) -> Result<Option<FeedEntry>, RepoError> {
        let row = sqlx::query_as::<_, FeedRow>(&format!("{FEED_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(FeedEntry::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn count_by_author(&self, author_id: Uuid) -> Result<u64, RepoError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM posts WHERE author_id = $1")
                .bind(author_id)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "INSERT INTO posts (id, text, author_id, group_id, image_path, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, text, author_id, group_id, image_path, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&params.text)
        .bind(params.author_id)
        .bind(params.group_id)
        .bind(&params.image_path)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        // `author_id` and `created_at` never change on edit.
        let row = sqlx::query_as::<_, PostRow>(
            "UPDATE posts \
             SET text = $1, group_id = $2, image_path = COALESCE($3, image_path) \
             WHERE id = $4 \
             RETURNING id, text, author_id, group_id, image_path, created_at",
        )
        .bind(&params.text)
        .bind(params.group_id)
        .bind(&params.image_path)
        .bind(params.id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
