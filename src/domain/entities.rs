//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub text: String,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub image_path: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// Group fields carried alongside a feed entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRef {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
}

/// Denormalized read model for the feed: a post joined with its author and
/// group. This is the shape the feed cache stores and read handlers render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub id: Uuid,
    pub text: String,
    pub image_path: Option<String>,
    pub created_at: OffsetDateTime,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_display_name: String,
    pub group: Option<GroupRef>,
}

/// A comment joined with its author, newest-first in listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentEntry {
    pub id: Uuid,
    pub text: String,
    pub created_at: OffsetDateTime,
    pub author_username: String,
    pub author_display_name: String,
}
