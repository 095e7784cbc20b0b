//! Read path: index, group, profile, post detail, and follow feeds.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use uuid::Uuid;

use crate::application::cache::{FEED_INDEX_KEY, FeedCache};
use crate::application::pagination::{PageNumber, Paginator};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{FeedEntry, UserRecord};
use crate::presentation::views::{
    AuthorView, CommentView, FeedPageContext, GroupPageContext, GroupView, PageNav, PostCard,
    PostDetailContext, ProfilePageContext,
};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed target not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    follows: Arc<dyn FollowsRepo>,
    cache: Arc<dyn FeedCache>,
    paginator: Paginator,
    cache_ttl: Duration,
}

impl FeedService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        follows: Arc<dyn FollowsRepo>,
        cache: Arc<dyn FeedCache>,
        paginator: Paginator,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            comments,
            follows,
            cache,
            paginator,
            cache_ttl,
        }
    }

    /// The unfiltered feed, served through the cache. A miss populates the
    /// entry for the configured TTL; writes never invalidate it, so a fresh
    /// post can lag behind the index for up to one TTL window.
    async fn cached_feed(&self) -> Result<Arc<Vec<FeedEntry>>, FeedError> {
        if let Some(entries) = self.cache.get(FEED_INDEX_KEY).await {
            counter!("tertulia_feed_cache_hit_total").increment(1);
            return Ok(entries);
        }
        counter!("tertulia_feed_cache_miss_total").increment(1);

        let entries = Arc::new(self.posts.list_feed().await?);
        self.cache
            .set(FEED_INDEX_KEY, Arc::clone(&entries), self.cache_ttl)
            .await;
        Ok(entries)
    }

    pub async fn index_page(&self, page: Option<&str>) -> Result<FeedPageContext, FeedError> {
        let entries = self.cached_feed().await?;
        let page = self.paginator.page(&entries, PageNumber::parse(page));
        Ok(FeedPageContext {
            posts: page.items.iter().map(entry_to_card).collect(),
            page: PageNav::from_page(&page),
        })
    }

    pub async fn group_page(
        &self,
        slug: &str,
        page: Option<&str>,
    ) -> Result<GroupPageContext, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or(FeedError::NotFound)?;
        let entries = self.posts.list_by_group(group.id).await?;
        let page = self.paginator.page(&entries, PageNumber::parse(page));
        let base_path = format!("/group/{}/", group.slug);
        Ok(GroupPageContext {
            group: GroupView {
                title: group.title,
                slug: group.slug,
                description: group.description,
            },
            posts: page.items.iter().map(entry_to_card).collect(),
            page: PageNav::from_page(&page).with_base(base_path),
        })
    }

    pub async fn profile_page(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        page: Option<&str>,
    ) -> Result<ProfilePageContext, FeedError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(FeedError::NotFound)?;
        let entries = self.posts.list_by_author(author.id).await?;
        let page = self.paginator.page(&entries, PageNumber::parse(page));

        // Anonymous viewers never follow anyone.
        let following = match viewer {
            Some(viewer_id) => self.follows.exists(viewer_id, author.id).await?,
            None => false,
        };

        Ok(ProfilePageContext {
            author: author_view(&author),
            is_self: viewer == Some(author.id),
            following,
            post_count: page.total_count,
            posts: page.items.iter().map(entry_to_card).collect(),
            page: PageNav::from_page(&page).with_base(format!("/profile/{}/", author.username)),
        })
    }

    pub async fn post_detail(&self, id: Uuid) -> Result<PostDetailContext, FeedError> {
        let entry = self.posts.find_entry(id).await?.ok_or(FeedError::NotFound)?;
        let author_post_count = self.posts.count_by_author(entry.author_id).await?;
        let comments = self.comments.list_for_post(entry.id).await?;

        Ok(PostDetailContext {
            post: entry_to_card(&entry),
            author_post_count,
            comments: comments
                .iter()
                .map(|comment| CommentView {
                    author_username: comment.author_username.clone(),
                    author_display_name: comment.author_display_name.clone(),
                    text: comment.text.clone(),
                    published: format_published(comment.created_at),
                })
                .collect(),
        })
    }

    /// Posts by the authors the viewer follows. Auth is enforced at the HTTP
    /// boundary; this layer just needs the viewer id.
    pub async fn follow_page(
        &self,
        viewer: Uuid,
        page: Option<&str>,
    ) -> Result<FeedPageContext, FeedError> {
        let authors = self.follows.authors_followed_by(viewer).await?;
        let entries = if authors.is_empty() {
            Vec::new()
        } else {
            self.posts.list_by_authors(&authors).await?
        };
        let page = self.paginator.page(&entries, PageNumber::parse(page));
        Ok(FeedPageContext {
            posts: page.items.iter().map(entry_to_card).collect(),
            page: PageNav::from_page(&page).with_base("/follow/"),
        })
    }
}

fn author_view(user: &UserRecord) -> AuthorView {
    AuthorView {
        username: user.username.clone(),
        display_name: user.display_name.clone(),
    }
}

pub(crate) fn entry_to_card(entry: &FeedEntry) -> PostCard {
    PostCard {
        id: entry.id,
        text: entry.text.clone(),
        author_username: entry.author_username.clone(),
        author_display_name: entry.author_display_name.clone(),
        group_slug: entry.group.as_ref().map(|group| group.slug.clone()),
        group_title: entry.group.as_ref().map(|group| group.title.clone()),
        image_path: entry.image_path.clone(),
        published: format_published(entry.created_at),
        iso_date: entry
            .created_at
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
    }
}

fn format_published(when: time::OffsetDateTime) -> String {
    const FORMAT: &[time::format_description::BorrowedFormatItem<'_>] =
        time::macros::format_description!("[day padding:none] [month repr:short] [year]");
    when.format(FORMAT).unwrap_or_default()
}
