use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::services::ModerationQueue;

pub struct ModerationHandlerState {
    pub queue: ModerationQueue,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemBody {
    pub target_kind: String,
    pub target_id: Uuid,
    pub source: String,
    #[serde(default)]
    pub priority: i32,
}

#[post("/moderation")]
pub async fn create_item(
    body: web::Json<CreateItemBody>,
    state: web::Data<ModerationHandlerState>,
) -> Result<HttpResponse> {
    let item = state
        .queue
        .create(&body.target_kind, body.target_id, &body.source, body.priority)
        .await?;

    Ok(HttpResponse::Created().json(item))
}

#[derive(Debug, Deserialize)]
pub struct AssignBody {
    pub admin_id: Uuid,
}

#[post("/moderation/{id}/assign")]
pub async fn assign_item(
    path: web::Path<Uuid>,
    body: web::Json<AssignBody>,
    state: web::Data<ModerationHandlerState>,
) -> Result<HttpResponse> {
    let item = state.queue.assign(path.into_inner(), body.admin_id).await?;

    Ok(HttpResponse::Ok().json(item))
}

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    pub state: String,
    pub admin_id: Uuid,
    pub notes: Option<String>,
}

#[post("/moderation/{id}/transition")]
pub async fn transition_item(
    path: web::Path<Uuid>,
    body: web::Json<TransitionBody>,
    state: web::Data<ModerationHandlerState>,
) -> Result<HttpResponse> {
    let item = state
        .queue
        .transition(
            path.into_inner(),
            &body.state,
            body.admin_id,
            body.notes.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(item))
}

#[derive(Debug, Serialize)]
pub struct EscalateResponse {
    pub escalated: u64,
}

#[post("/moderation/escalate")]
pub async fn escalate_items(state: web::Data<ModerationHandlerState>) -> Result<HttpResponse> {
    let escalated = state.queue.auto_escalate().await?;

    Ok(HttpResponse::Ok().json(EscalateResponse { escalated }))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Queue statistics; defaults to the trailing 24 hours.
#[get("/moderation/statistics")]
pub async fn get_statistics(
    query: web::Query<StatsQuery>,
    state: web::Data<ModerationHandlerState>,
) -> Result<HttpResponse> {
    let to = query.to.unwrap_or_else(Utc::now);
    let from = query.from.unwrap_or_else(|| to - Duration::hours(24));
    let stats = state.queue.statistics(from, to).await?;

    Ok(HttpResponse::Ok().json(stats))
}
