#![allow(dead_code)]

//! In-memory repository doubles and router wiring for end-to-end tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use tertulia::{
    application::{
        cache::{FeedCache, NoopFeedCache},
        compose::ComposeService,
        feed::FeedService,
        follows::FollowService,
        identity::{IdentityService, SignupOutcome},
        pagination::Paginator,
        repos::{
            CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
            CreateUserParams, FollowsRepo, GroupsRepo, PostsRepo, RepoError, UpdatePostParams,
            UsersRepo,
        },
    },
    domain::entities::{
        CommentEntry, CommentRecord, FeedEntry, FollowRecord, GroupRecord, GroupRef, PostRecord,
        UserRecord,
    },
    infra::{
        http::{HttpState, SessionSigner, build_router},
        images::ImageStore,
    },
};

pub const SECRET: &str = "test-secret";

/// Shared in-memory store backing every repository trait. Timestamps come
/// from a monotonic tick so insertion order is total and deterministic.
#[derive(Default)]
pub struct MemoryRepos {
    clock: AtomicI64,
    users: Mutex<Vec<UserRecord>>,
    groups: Mutex<Vec<GroupRecord>>,
    posts: Mutex<Vec<PostRecord>>,
    comments: Mutex<Vec<CommentRecord>>,
    follows: Mutex<Vec<FollowRecord>>,
}

impl MemoryRepos {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn tick(&self) -> OffsetDateTime {
        let n = self.clock.fetch_add(1, Ordering::SeqCst);
        OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(n)
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.lock().unwrap().len()
    }

    pub fn follow_count(&self) -> usize {
        self.follows.lock().unwrap().len()
    }

    pub fn post_by_text(&self, text: &str) -> Option<PostRecord> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.text == text)
            .cloned()
    }

    fn entry(&self, post: &PostRecord) -> FeedEntry {
        let users = self.users.lock().unwrap();
        let author = users
            .iter()
            .find(|user| user.id == post.author_id)
            .expect("post author exists");
        let groups = self.groups.lock().unwrap();
        let group = post.group_id.and_then(|id| {
            groups.iter().find(|group| group.id == id).map(|group| GroupRef {
                id: group.id,
                slug: group.slug.clone(),
                title: group.title.clone(),
            })
        });
        FeedEntry {
            id: post.id,
            text: post.text.clone(),
            image_path: post.image_path.clone(),
            created_at: post.created_at,
            author_id: author.id,
            author_username: author.username.clone(),
            author_display_name: author.display_name.clone(),
            group,
        }
    }

    fn entries<F>(&self, filter: F) -> Vec<FeedEntry>
    where
        F: Fn(&PostRecord) -> bool,
    {
        let mut posts: Vec<PostRecord> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|post| filter(post))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.iter().map(|post| self.entry(post)).collect()
    }
}

#[async_trait]
impl UsersRepo for MemoryRepos {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            display_name: params.display_name,
            password_hash: params.password_hash,
            created_at: self.tick(),
        };
        self.users.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepos {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let record = GroupRecord {
            id: Uuid::new_v4(),
            title: params.title,
            slug: params.slug,
            description: params.description,
            created_at: self.tick(),
        };
        self.groups.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .find(|group| group.slug == slug)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .find(|group| group.id == id)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.groups.lock().unwrap().clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl PostsRepo for MemoryRepos {
    async fn list_feed(&self) -> Result<Vec<FeedEntry>, RepoError> {
        Ok(self.entries(|_| true))
    }

    async fn list_by_group(&self, group_id: Uuid) -> Result<Vec<FeedEntry>, RepoError> {
        Ok(self.entries(|post| post.group_id == Some(group_id)))
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<FeedEntry>, RepoError> {
        Ok(self.entries(|post| post.author_id == author_id))
    }

    async fn list_by_authors(&self, author_ids: &[Uuid]) -> Result<Vec<FeedEntry>, RepoError> {
        Ok(self.entries(|post| author_ids.contains(&post.author_id)))
    }

    async fn find_entry(&self, id: Uuid) -> Result<Option<FeedEntry>, RepoError> {
        let post = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .cloned();
        Ok(post.map(|post| self.entry(&post)))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .cloned())
    }

    async fn count_by_author(&self, author_id: Uuid) -> Result<u64, RepoError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|post| post.author_id == author_id)
            .count() as u64)
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let record = PostRecord {
            id: Uuid::new_v4(),
            text: params.text,
            author_id: params.author_id,
            group_id: params.group_id,
            image_path: params.image_path,
            created_at: self.tick(),
        };
        self.posts.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        if let Some(image_path) = params.image_path {
            post.image_path = Some(image_path);
        }
        Ok(post.clone())
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepos {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentEntry>, RepoError> {
        let users = self.users.lock().unwrap();
        let mut comments: Vec<CommentRecord> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = users
                    .iter()
                    .find(|user| user.id == comment.author_id)
                    .expect("comment author exists");
                CommentEntry {
                    id: comment.id,
                    text: comment.text,
                    created_at: comment.created_at,
                    author_username: author.username.clone(),
                    author_display_name: author.display_name.clone(),
                }
            })
            .collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let record = CommentRecord {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: self.tick(),
        };
        self.comments.lock().unwrap().push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepos {
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        Ok(self
            .follows
            .lock()
            .unwrap()
            .iter()
            .any(|edge| edge.user_id == user_id && edge.author_id == author_id))
    }

    async fn create_follow(
        &self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<FollowRecord, RepoError> {
        let record = FollowRecord {
            id: Uuid::new_v4(),
            user_id,
            author_id,
            created_at: self.tick(),
        };
        self.follows.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<u64, RepoError> {
        let mut follows = self.follows.lock().unwrap();
        let before = follows.len();
        follows.retain(|edge| !(edge.user_id == user_id && edge.author_id == author_id));
        Ok((before - follows.len()) as u64)
    }

    async fn authors_followed_by(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        Ok(self
            .follows
            .lock()
            .unwrap()
            .iter()
            .filter(|edge| edge.user_id == user_id)
            .map(|edge| edge.author_id)
            .collect())
    }
}

pub struct TestApp {
    pub router: Router,
    pub repos: Arc<MemoryRepos>,
    pub signer: SessionSigner,
    _media: tempfile::TempDir,
}

pub fn build_feed_service(
    repos: &Arc<MemoryRepos>,
    cache: Arc<dyn FeedCache>,
    cache_ttl: Duration,
) -> FeedService {
    FeedService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        cache,
        Paginator::new(10),
        cache_ttl,
    )
}

pub fn test_app() -> TestApp {
    test_app_with_cache(Arc::new(NoopFeedCache))
}

pub fn test_app_with_cache(cache: Arc<dyn FeedCache>) -> TestApp {
    let repos = MemoryRepos::new();
    let media = tempfile::tempdir().expect("media dir");

    let feed = Arc::new(build_feed_service(&repos, cache, Duration::from_secs(20)));
    let compose = Arc::new(ComposeService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
    ));
    let follows = Arc::new(FollowService::new(repos.clone(), repos.clone()));
    let identity = Arc::new(IdentityService::new(repos.clone(), SECRET));
    let images = Arc::new(ImageStore::new(media.path().to_path_buf()).expect("image store"));
    let signer = SessionSigner::new(SECRET);

    let state = HttpState {
        feed,
        compose,
        follows,
        identity,
        groups: repos.clone(),
        images,
        signer: signer.clone(),
        max_upload_bytes: 10 * 1024 * 1024,
    };

    TestApp {
        router: build_router(state),
        repos,
        signer,
        _media: media,
    }
}

impl TestApp {
    pub async fn seed_user(&self, username: &str) -> UserRecord {
        let identity = IdentityService::new(self.repos.clone(), SECRET);
        match identity
            .signup(username, username, "password123")
            .await
            .expect("signup")
        {
            SignupOutcome::Created(user) => user,
            SignupOutcome::Invalid(errors) => panic!("seed user rejected: {errors:?}"),
        }
    }

    pub async fn seed_group(&self, title: &str, slug: &str) -> GroupRecord {
        self.repos
            .create_group(CreateGroupParams {
                title: title.to_string(),
                slug: slug.to_string(),
                description: String::new(),
            })
            .await
            .expect("group")
    }

    pub async fn seed_post(&self, author: &UserRecord, group: Option<Uuid>, text: &str) -> PostRecord {
        self.repos
            .create_post(CreatePostParams {
                text: text.to_string(),
                author_id: author.id,
                group_id: group,
                image_path: None,
            })
            .await
            .expect("post")
    }

    pub fn cookie_for(&self, user: &UserRecord) -> String {
        format!("tertulia_session={}", self.signer.sign(user.id))
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::empty()).expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn post_form(
        &self,
        path: &str,
        cookie: Option<&str>,
        body: &str,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::from(body.to_string())).expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        self.post_multipart_with_file(path, cookie, fields, None).await
    }

    pub async fn post_multipart_with_file(
        &self,
        path: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
    ) -> Response<Body> {
        const BOUNDARY: &str = "test-boundary";
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((name, filename, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                     filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::from(body)).expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}
