use std::{process, sync::Arc};

use tertulia::{
    application::{
        cache::FeedCache,
        compose::ComposeService,
        error::AppError,
        feed::FeedService,
        follows::FollowService,
        identity::IdentityService,
        pagination::Paginator,
        repos::{CommentsRepo, FollowsRepo, GroupsRepo, PostsRepo, UsersRepo},
    },
    config,
    infra::{
        cache::TtlFeedCache,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState, SessionSigner},
        images::ImageStore,
        telemetry,
    },
};
use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings).await?;
    info!(target = "tertulia::migrate", "migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let secret = settings
        .auth
        .secret
        .as_deref()
        .ok_or_else(|| InfraError::configuration("auth secret is not configured"))
        .map_err(AppError::from)?;

    let repositories = init_repositories(&settings).await?;

    let users: Arc<dyn UsersRepo> = repositories.clone();
    let groups: Arc<dyn GroupsRepo> = repositories.clone();
    let posts: Arc<dyn PostsRepo> = repositories.clone();
    let comments: Arc<dyn CommentsRepo> = repositories.clone();
    let follows: Arc<dyn FollowsRepo> = repositories.clone();
    let cache: Arc<dyn FeedCache> = Arc::new(TtlFeedCache::new());

    let paginator = Paginator::new(settings.feed.page_size.get());
    let feed = Arc::new(FeedService::new(
        posts.clone(),
        groups.clone(),
        users.clone(),
        comments.clone(),
        follows.clone(),
        cache,
        paginator,
        settings.feed.cache_ttl,
    ));
    let compose = Arc::new(ComposeService::new(
        posts.clone(),
        groups.clone(),
        comments.clone(),
    ));
    let follow_service = Arc::new(FollowService::new(users.clone(), follows.clone()));
    let identity = Arc::new(IdentityService::new(users.clone(), secret));

    let images = Arc::new(
        ImageStore::new(settings.uploads.directory.clone()).map_err(|err| {
            AppError::from(InfraError::media_storage(
                settings.uploads.directory.clone(),
                err,
            ))
        })?,
    );

    let state = HttpState {
        feed,
        compose,
        follows: follow_service,
        identity,
        groups,
        images,
        signer: SessionSigner::new(secret),
        max_upload_bytes: settings.uploads.max_request_bytes.get() as usize,
    };

    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::listener(settings.server.addr, err)))?;

    info!(
        target = "tertulia::serve",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(grace: std::time::Duration) {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!(
        target = "tertulia::serve",
        grace_seconds = grace.as_secs(),
        "shutdown requested, draining connections"
    );
}
