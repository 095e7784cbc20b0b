//! Write path for posts and comments: validation, ownership, persistence.

use std::sync::Arc;

use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, RepoError,
    UpdatePostParams,
};
use crate::domain::entities::PostRecord;

/// Validated-or-not submission for the post form. `group` is the raw select
/// value; `image_path` is set only after the upload has been stored.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group: Option<String>,
    pub image_path: Option<String>,
}

/// Field errors surfaced back into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFormErrors {
    pub text: Option<&'static str>,
    pub group: Option<&'static str>,
}

impl PostFormErrors {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.group.is_none()
    }
}

#[derive(Debug)]
pub enum CreateOutcome {
    Created(PostRecord),
    Invalid(PostFormErrors),
}

#[derive(Debug)]
pub enum EditOutcome {
    Updated(PostRecord),
    Invalid {
        post: PostRecord,
        errors: PostFormErrors,
    },
    /// The editor is not the author. The HTTP layer redirects to the post
    /// detail page without surfacing an error.
    NotAuthor(PostRecord),
    NotFound,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommentOutcome {
    Created,
    /// Blank text is silently discarded; the handler still redirects to
    /// the post detail page instead of re-rendering the form.
    Dropped,
    NotFound,
}

#[derive(Clone)]
pub struct ComposeService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl ComposeService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            posts,
            groups,
            comments,
        }
    }

    async fn validate(
        &self,
        input: &PostInput,
    ) -> Result<(Option<Uuid>, PostFormErrors), RepoError> {
        let mut errors = PostFormErrors::default();
        if input.text.trim().is_empty() {
            errors.text = Some("Post text is required.");
        }

        let group_id = match input.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match Uuid::parse_str(raw) {
                Ok(id) => {
                    if self.groups.find_by_id(id).await?.is_some() {
                        Some(id)
                    } else {
                        errors.group = Some("Choose an existing group.");
                        None
                    }
                }
                Err(_) => {
                    errors.group = Some("Choose an existing group.");
                    None
                }
            },
        };

        Ok((group_id, errors))
    }

    pub async fn create_post(
        &self,
        author_id: Uuid,
        input: PostInput,
    ) -> Result<CreateOutcome, RepoError> {
        let (group_id, errors) = self.validate(&input).await?;
        if !errors.is_empty() {
            return Ok(CreateOutcome::Invalid(errors));
        }

        let record = self
            .posts
            .create_post(CreatePostParams {
                text: input.text.trim().to_string(),
                author_id,
                group_id,
                image_path: input.image_path,
            })
            .await?;
        Ok(CreateOutcome::Created(record))
    }

    /// `editor` is the signed-in user, if any. Anyone who is not the author,
    /// anonymous visitors included, lands on `NotAuthor`.
    pub async fn edit_post(
        &self,
        editor: Option<Uuid>,
        post_id: Uuid,
        input: PostInput,
    ) -> Result<EditOutcome, RepoError> {
        let Some(post) = self.posts.find_by_id(post_id).await? else {
            return Ok(EditOutcome::NotFound);
        };
        if editor != Some(post.author_id) {
            return Ok(EditOutcome::NotAuthor(post));
        }

        let (group_id, errors) = self.validate(&input).await?;
        if !errors.is_empty() {
            return Ok(EditOutcome::Invalid { post, errors });
        }

        let updated = self
            .posts
            .update_post(UpdatePostParams {
                id: post.id,
                text: input.text.trim().to_string(),
                group_id,
                image_path: input.image_path,
            })
            .await?;
        Ok(EditOutcome::Updated(updated))
    }

    /// Fetch the post a form should be pre-filled from, or establish that the
    /// editor must be bounced to the detail page.
    pub async fn post_for_edit(
        &self,
        editor: Option<Uuid>,
        post_id: Uuid,
    ) -> Result<EditOutcome, RepoError> {
        let Some(post) = self.posts.find_by_id(post_id).await? else {
            return Ok(EditOutcome::NotFound);
        };
        if editor != Some(post.author_id) {
            return Ok(EditOutcome::NotAuthor(post));
        }
        Ok(EditOutcome::Updated(post))
    }

    pub async fn add_comment(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        text: &str,
    ) -> Result<CommentOutcome, RepoError> {
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Ok(CommentOutcome::NotFound);
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(CommentOutcome::Dropped);
        }
        self.comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                text: trimmed.to_string(),
            })
            .await?;
        Ok(CommentOutcome::Created)
    }
}
