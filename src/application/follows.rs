//! Follow-graph writes: follow and unfollow toggles.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug)]
pub enum FollowOutcome {
    Followed(UserRecord),
    /// An edge already exists; nothing was created.
    AlreadyFollowing(UserRecord),
    /// Following oneself is a no-op that still redirects to the profile.
    SelfFollow(UserRecord),
    UnknownAuthor,
}

#[derive(Debug)]
pub enum UnfollowOutcome {
    Removed(UserRecord),
    NotFollowing(UserRecord),
    UnknownAuthor,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    /// Check-then-create. Not atomic: two concurrent requests can slip past
    /// the existence check and insert twice. Accepted at this scale.
    pub async fn follow(
        &self,
        follower_id: Uuid,
        author_username: &str,
    ) -> Result<FollowOutcome, RepoError> {
        let Some(author) = self.users.find_by_username(author_username).await? else {
            return Ok(FollowOutcome::UnknownAuthor);
        };
        if author.id == follower_id {
            return Ok(FollowOutcome::SelfFollow(author));
        }
        if self.follows.exists(follower_id, author.id).await? {
            return Ok(FollowOutcome::AlreadyFollowing(author));
        }
        self.follows.create_follow(follower_id, author.id).await?;
        debug!(
            target = "tertulia::follows",
            follower = %follower_id,
            author = %author.id,
            "follow edge created"
        );
        Ok(FollowOutcome::Followed(author))
    }

    pub async fn unfollow(
        &self,
        follower_id: Uuid,
        author_username: &str,
    ) -> Result<UnfollowOutcome, RepoError> {
        let Some(author) = self.users.find_by_username(author_username).await? else {
            return Ok(UnfollowOutcome::UnknownAuthor);
        };
        let removed = self.follows.delete_follow(follower_id, author.id).await?;
        if removed == 0 {
            return Ok(UnfollowOutcome::NotFollowing(author));
        }
        debug!(
            target = "tertulia::follows",
            follower = %follower_id,
            author = %author.id,
            removed,
            "follow edge removed"
        );
        Ok(UnfollowOutcome::Removed(author))
    }
}
