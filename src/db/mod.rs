pub mod clips;
pub mod engagement;
pub mod moderation;
pub mod questions;

pub use clips::ClipsRepo;
pub use engagement::EngagementRepo;
pub use moderation::ModerationRepo;
pub use questions::QuestionsRepo;
