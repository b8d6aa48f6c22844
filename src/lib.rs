pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

pub use services::{
    EngagementAggregator, FeedService, ModerationQueue, Notifier, RateGuard, RelevanceService,
    RemixChainService, SpotlightService, TrendingService,
};
