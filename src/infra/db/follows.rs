use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{FollowsRepo, RepoError},
    domain::entities::FollowRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct FollowRow {
    id: Uuid,
    user_id: Uuid,
    author_id: Uuid,
    created_at: OffsetDateTime,
}

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let (found,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(found)
    }

    async fn create_follow(
        &self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<FollowRecord, RepoError> {
        let row = sqlx::query_as::<_, FollowRow>(
            "INSERT INTO follows (id, user_id, author_id, created_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, author_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(author_id)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(FollowRecord {
            id: row.id,
            user_id: row.user_id,
            author_id: row.author_id,
            created_at: row.created_at,
        })
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn authors_followed_by(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT author_id FROM follows WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
