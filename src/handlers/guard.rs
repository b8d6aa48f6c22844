//! Rate-guard check endpoint
//!
//! Clip uploads and profile edits happen in other services; they consult
//! this endpoint before accepting the write, so the sliding windows and
//! cooldowns live in one place.

use actix_web::{post, web, HttpRequest, HttpResponse};

use crate::error::{AppError, Result};
use crate::handlers::viewer_from;
use crate::services::{GuardedAction, RateGuard};

pub struct GuardHandlerState {
    pub guard: RateGuard,
}

#[post("/guard/{action}")]
pub async fn consume_guard(
    path: web::Path<String>,
    http_req: HttpRequest,
    state: web::Data<GuardHandlerState>,
) -> Result<HttpResponse> {
    let action = match path.as_str() {
        "clip-upload" => GuardedAction::ClipUpload,
        "engagement" => GuardedAction::Engagement,
        "profile-edit" => GuardedAction::ProfileEdit,
        other => {
            return Err(AppError::BadRequest(format!(
                "Unknown guarded action: {other}"
            )))
        }
    };

    let profile_id = viewer_from(&http_req)?.ok_or_else(|| {
        AppError::BadRequest("X-Profile-Id header required for guard checks".to_string())
    })?;

    state.guard.check(action, profile_id).await?;

    Ok(HttpResponse::NoContent().finish())
}
