mod common;

use std::sync::Arc;
use std::time::Duration;

use tertulia::application::repos::{CreatePostParams, CreateUserParams, PostsRepo, UsersRepo};
use tertulia::domain::entities::UserRecord;
use tertulia::infra::cache::TtlFeedCache;

use common::{MemoryRepos, build_feed_service};

async fn seed_author(repos: &Arc<MemoryRepos>) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            username: "ada".to_string(),
            display_name: "Ada".to_string(),
            password_hash: "unused".to_string(),
        })
        .await
        .expect("user")
}

async fn seed_post(repos: &Arc<MemoryRepos>, author: &UserRecord, text: &str) {
    repos
        .create_post(CreatePostParams {
            text: text.to_string(),
            author_id: author.id,
            group_id: None,
            image_path: None,
        })
        .await
        .expect("post");
}

fn index_texts(page: &tertulia::presentation::views::FeedPageContext) -> Vec<String> {
    page.posts.iter().map(|post| post.text.clone()).collect()
}

#[tokio::test(start_paused = true)]
async fn new_posts_stay_invisible_until_the_entry_expires() {
    let repos = MemoryRepos::new();
    let feed = build_feed_service(
        &repos,
        Arc::new(TtlFeedCache::new()),
        Duration::from_secs(20),
    );
    let author = seed_author(&repos).await;
    seed_post(&repos, &author, "before the snapshot").await;

    let page = feed.index_page(None).await.expect("index");
    assert_eq!(index_texts(&page), vec!["before the snapshot"]);

    seed_post(&repos, &author, "after the snapshot").await;

    // Still inside the entry lifetime, so the index serves the snapshot.
    tokio::time::advance(Duration::from_secs(19)).await;
    let page = feed.index_page(None).await.expect("index");
    assert_eq!(index_texts(&page), vec!["before the snapshot"]);

    tokio::time::advance(Duration::from_secs(2)).await;
    let page = feed.index_page(None).await.expect("index");
    assert_eq!(
        index_texts(&page),
        vec!["after the snapshot", "before the snapshot"]
    );
}

#[tokio::test(start_paused = true)]
async fn profile_pages_bypass_the_index_snapshot() {
    let repos = MemoryRepos::new();
    let feed = build_feed_service(
        &repos,
        Arc::new(TtlFeedCache::new()),
        Duration::from_secs(20),
    );
    let author = seed_author(&repos).await;
    seed_post(&repos, &author, "first").await;

    feed.index_page(None).await.expect("index");
    seed_post(&repos, &author, "second").await;

    let index = feed.index_page(None).await.expect("index");
    assert_eq!(index_texts(&index), vec!["first"]);

    let profile = feed
        .profile_page("ada", None, None)
        .await
        .expect("profile");
    let profile_texts: Vec<&str> = profile.posts.iter().map(|post| post.text.as_str()).collect();
    assert_eq!(profile_texts, vec!["second", "first"]);
}

#[tokio::test(start_paused = true)]
async fn a_read_refreshes_the_entry_only_after_expiry() {
    let repos = MemoryRepos::new();
    let feed = build_feed_service(
        &repos,
        Arc::new(TtlFeedCache::new()),
        Duration::from_secs(20),
    );
    let author = seed_author(&repos).await;

    // Populated while empty: the empty snapshot is what readers get.
    feed.index_page(None).await.expect("index");
    seed_post(&repos, &author, "only post").await;

    let page = feed.index_page(None).await.expect("index");
    assert!(page.posts.is_empty());

    tokio::time::advance(Duration::from_secs(21)).await;
    let page = feed.index_page(None).await.expect("index");
    assert_eq!(index_texts(&page), vec!["only post"]);

    // The refreshed snapshot starts its own lifetime.
    seed_post(&repos, &author, "a later post").await;
    tokio::time::advance(Duration::from_secs(10)).await;
    let page = feed.index_page(None).await.expect("index");
    assert_eq!(index_texts(&page), vec!["only post"]);
}
