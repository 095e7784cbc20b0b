//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    CommentEntry, CommentRecord, FeedEntry, FollowRecord, GroupRecord, PostRecord, UserRecord,
};
use crate::domain::error::DomainError;
use crate::domain::slug;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct CreateGroupParams {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl CreateGroupParams {
    /// Validate editor input, deriving the slug from the title when no
    /// explicit slug is supplied.
    pub fn new(
        title: impl Into<String>,
        explicit_slug: Option<&str>,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("group title is required"));
        }
        let slug = slug::resolve_slug(explicit_slug, &title)?;
        Ok(Self {
            title,
            slug,
            description: description.into(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub text: String,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    /// `Some` replaces the stored image reference; `None` keeps it.
    pub image_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError>;

    /// All groups ordered by title, for the post form's group selector.
    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// The full unfiltered feed, newest-first, joined with author and group.
    async fn list_feed(&self) -> Result<Vec<FeedEntry>, RepoError>;

    async fn list_by_group(&self, group_id: Uuid) -> Result<Vec<FeedEntry>, RepoError>;

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<FeedEntry>, RepoError>;

    async fn list_by_authors(&self, author_ids: &[Uuid]) -> Result<Vec<FeedEntry>, RepoError>;

    async fn find_entry(&self, id: Uuid) -> Result<Option<FeedEntry>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn count_by_author(&self, author_id: Uuid) -> Result<u64, RepoError>;

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments on a post joined with their authors, newest-first.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentEntry>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    /// Insert a follow edge. No uniqueness constraint backs this: callers
    /// check-then-create, and the duplicate race is an accepted defect.
    async fn create_follow(&self, user_id: Uuid, author_id: Uuid)
    -> Result<FollowRecord, RepoError>;

    /// Delete matching edge(s), returning how many were removed.
    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<u64, RepoError>;

    /// Ids of every author the user follows.
    async fn authors_followed_by(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_params_derive_slug_from_title() {
        let params = CreateGroupParams::new("Test Group", None, "desc").unwrap();
        assert_eq!(params.slug, "test-group");
    }

    #[test]
    fn group_params_keep_explicit_slug() {
        let params = CreateGroupParams::new("Anything", Some("test-slug"), "").unwrap();
        assert_eq!(params.slug, "test-slug");
    }

    #[test]
    fn group_params_reject_blank_title() {
        assert!(CreateGroupParams::new("   ", None, "").is_err());
    }
}
