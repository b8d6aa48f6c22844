use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use curation_service::config::Config;
use curation_service::db::{ClipsRepo, EngagementRepo, QuestionsRepo};
use curation_service::handlers::{
    clips, feed, guard as guard_handlers, moderation, spotlight, ClipHandlerState,
    FeedHandlerState, GuardHandlerState, ModerationHandlerState, SpotlightHandlerState,
};
use curation_service::services::{
    EngagementAggregator, FeedService, ModerationQueue, Notifier, RateGuard, RelevanceService,
    RemixChainService, SpotlightService, TrendingService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,actix_web=warn".into()),
        )
        .with_target(false)
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        service = %config.app.service_name,
        environment = %config.app.env,
        port = config.app.port,
        "Starting curation service"
    );

    let pool = match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!("Running database migrations...");
    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Migration failed: {e}");
        std::process::exit(1);
    }
    tracing::info!("Migrations completed");

    // Redis backs the spotlight cache and the rate guard; both degrade
    // gracefully, so a missing Redis only costs us those features.
    let redis = if config.redis.enabled {
        match redis::Client::open(config.redis.url.clone()) {
            Ok(client) => match client.get_connection_manager().await {
                Ok(manager) => {
                    tracing::info!("Redis connection established");
                    Some(manager)
                }
                Err(e) => {
                    tracing::warn!("Redis unavailable, cache and rate guard disabled: {e}");
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Invalid Redis URL, cache and rate guard disabled: {e}");
                None
            }
        }
    } else {
        tracing::info!("Redis disabled by configuration");
        None
    };

    let notifier = Notifier::new(config.notifier.clone());
    let guard = RateGuard::new(redis.clone(), config.rate_limit.clone());

    let trending = TrendingService::new(pool.clone(), config.ranking.clone());
    let relevance = RelevanceService::new(pool.clone(), config.ranking.clone());
    let feed_service = FeedService::new(pool.clone(), config.ranking.clone(), config.feed.clone());
    let spotlight_service = SpotlightService::new(
        pool.clone(),
        redis.clone(),
        notifier.clone(),
        config.spotlight.clone(),
    );
    let queue = ModerationQueue::new(pool.clone(), notifier.clone(), config.moderation.clone());

    let refresher_trending = trending.clone();
    let refresh_interval = config.feed.refresh_interval_secs;
    tokio::spawn(async move {
        curation_service::jobs::trending_refresh::start_trending_refresher(
            refresher_trending,
            refresh_interval,
        )
        .await;
    });

    let sweeper_queue = queue.clone();
    let sweep_interval = config.moderation.sweep_interval_secs;
    tokio::spawn(async move {
        curation_service::jobs::escalation::start_escalation_sweeper(sweeper_queue, sweep_interval)
            .await;
    });

    let feed_state = web::Data::new(FeedHandlerState { feed: feed_service });
    let clip_state = web::Data::new(ClipHandlerState {
        clips: ClipsRepo::new(pool.clone()),
        engagement: EngagementRepo::new(pool.clone()),
        aggregator: EngagementAggregator::new(pool.clone()),
        trending,
        relevance,
        remix: RemixChainService::new(pool.clone()),
        guard: guard.clone(),
    });
    let spotlight_state = web::Data::new(SpotlightHandlerState {
        spotlight: spotlight_service,
        questions: QuestionsRepo::new(pool.clone()),
        guard: guard.clone(),
    });
    let moderation_state = web::Data::new(ModerationHandlerState { queue });
    let guard_state = web::Data::new(GuardHandlerState { guard });

    let bind_addr = format!("0.0.0.0:{}", config.app.port);
    tracing::info!("HTTP server listening on {bind_addr}");

    HttpServer::new(move || {
        App::new()
            .app_data(feed_state.clone())
            .app_data(clip_state.clone())
            .app_data(spotlight_state.clone())
            .app_data(moderation_state.clone())
            .app_data(guard_state.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            .service(
                web::scope("/api/v1")
                    .service(feed::get_feed)
                    .service(feed::get_trending)
                    .service(clips::record_listen)
                    .service(clips::record_reaction)
                    .service(clips::record_reply)
                    .service(clips::record_remix)
                    .service(clips::set_status)
                    .service(clips::recompute_score)
                    .service(clips::recompute_all_scores)
                    .service(clips::get_relevance)
                    .service(clips::get_engagement)
                    .service(clips::get_remix_chain)
                    .service(spotlight::get_spotlight)
                    .service(spotlight::get_daily_spotlight)
                    .service(spotlight::get_question_score)
                    .service(spotlight::record_upvote)
                    .service(spotlight::record_question_reply)
                    .service(spotlight::set_answered)
                    .service(moderation::create_item)
                    .service(moderation::assign_item)
                    .service(moderation::transition_item)
                    .service(moderation::escalate_items)
                    .service(moderation::get_statistics)
                    .service(guard_handlers::consume_guard),
            )
    })
    .bind(&bind_addr)?
    .run()
    .await
}
