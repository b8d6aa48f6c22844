pub mod engagement;
pub mod feed;
pub mod moderation_queue;
pub mod notifier;
pub mod rate_guard;
pub mod relevance;
pub mod remix;
pub mod spotlight;
pub mod trending;

pub use engagement::EngagementAggregator;
pub use feed::FeedService;
pub use moderation_queue::ModerationQueue;
pub use notifier::{Notifier, NotifierEvent};
pub use rate_guard::{GuardedAction, RateGuard};
pub use relevance::{RelevanceService, ViewerAffinity};
pub use remix::RemixChainService;
pub use spotlight::SpotlightService;
pub use trending::{TrendingInputs, TrendingService};
