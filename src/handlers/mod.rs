pub mod clips;
pub mod feed;
pub mod guard;
pub mod moderation;
pub mod spotlight;

pub use clips::ClipHandlerState;
pub use feed::FeedHandlerState;
pub use guard::GuardHandlerState;
pub use moderation::ModerationHandlerState;
pub use spotlight::SpotlightHandlerState;

use actix_web::HttpRequest;
use uuid::Uuid;

use crate::error::{AppError, Result};

const VIEWER_HEADER: &str = "x-profile-id";

/// Identity is resolved upstream and handed to us as an optional header;
/// absence means anonymous and is always accepted. A present-but-mangled
/// header is a caller bug and gets rejected.
pub(crate) fn viewer_from(req: &HttpRequest) -> Result<Option<Uuid>> {
    match req.headers().get(VIEWER_HEADER) {
        None => Ok(None),
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| AppError::BadRequest("Invalid X-Profile-Id header".to_string()))?;
            Uuid::parse_str(raw)
                .map(Some)
                .map_err(|_| AppError::BadRequest("Invalid X-Profile-Id header".to_string()))
        }
    }
}
