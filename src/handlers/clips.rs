//! Write surface for clip engagement plus the score read/recompute
//! endpoints. Each write updates the counters and then recomputes the
//! clip's trending score synchronously, so score inputs never change
//! without the cached score following in the same request.

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{ClipsRepo, EngagementRepo};
use crate::error::{AppError, Result};
use crate::handlers::viewer_from;
use crate::services::{
    EngagementAggregator, GuardedAction, RateGuard, RelevanceService, RemixChainService,
    TrendingService,
};

pub struct ClipHandlerState {
    pub clips: ClipsRepo,
    pub engagement: EngagementRepo,
    pub aggregator: EngagementAggregator,
    pub trending: TrendingService,
    pub relevance: RelevanceService,
    pub remix: RemixChainService,
    pub guard: RateGuard,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub clip_id: Uuid,
    pub score: f64,
}

#[derive(Debug, Deserialize)]
pub struct ListenBody {
    pub completion_pct: Option<f64>,
}

#[post("/clips/{id}/listens")]
pub async fn record_listen(
    path: web::Path<Uuid>,
    body: web::Json<ListenBody>,
    http_req: HttpRequest,
    state: web::Data<ClipHandlerState>,
) -> Result<HttpResponse> {
    let clip_id = path.into_inner();
    let viewer = viewer_from(&http_req)?;

    if let Some(pct) = body.completion_pct {
        if !(0.0..=100.0).contains(&pct) {
            return Err(AppError::BadRequest(format!(
                "completion_pct must be within 0..=100, got {pct}"
            )));
        }
    }

    if let Some(profile_id) = viewer {
        state.guard.check(GuardedAction::Engagement, profile_id).await?;
    }

    if !state.clips.bump_listens(clip_id).await? {
        return Err(AppError::NotFound(format!("Clip {clip_id} not found")));
    }

    state
        .engagement
        .insert_listen(clip_id, viewer, body.completion_pct)
        .await?;

    let score = state.trending.recompute_clip(clip_id).await?;

    Ok(HttpResponse::Ok().json(ScoreResponse { clip_id, score }))
}

#[derive(Debug, Deserialize)]
pub struct ReactionBody {
    pub emoji: String,
}

#[post("/clips/{id}/reactions")]
pub async fn record_reaction(
    path: web::Path<Uuid>,
    body: web::Json<ReactionBody>,
    http_req: HttpRequest,
    state: web::Data<ClipHandlerState>,
) -> Result<HttpResponse> {
    let clip_id = path.into_inner();
    let viewer = viewer_from(&http_req)?;

    if body.emoji.is_empty() || body.emoji.chars().count() > 8 {
        return Err(AppError::BadRequest("Invalid reaction emoji".to_string()));
    }

    if let Some(profile_id) = viewer {
        state.guard.check(GuardedAction::Engagement, profile_id).await?;
    }

    if !state.clips.bump_reaction(clip_id, &body.emoji).await? {
        return Err(AppError::NotFound(format!("Clip {clip_id} not found")));
    }

    let score = state.trending.recompute_clip(clip_id).await?;

    Ok(HttpResponse::Ok().json(ScoreResponse { clip_id, score }))
}

#[post("/clips/{id}/replies")]
pub async fn record_reply(
    path: web::Path<Uuid>,
    http_req: HttpRequest,
    state: web::Data<ClipHandlerState>,
) -> Result<HttpResponse> {
    let clip_id = path.into_inner();

    if let Some(profile_id) = viewer_from(&http_req)? {
        state.guard.check(GuardedAction::Engagement, profile_id).await?;
    }

    if !state.clips.bump_replies(clip_id).await? {
        return Err(AppError::NotFound(format!("Clip {clip_id} not found")));
    }

    let score = state.trending.recompute_clip(clip_id).await?;

    Ok(HttpResponse::Ok().json(ScoreResponse { clip_id, score }))
}

/// A remix counts against the uploader's clip-upload budget, not the
/// lighter engagement budget.
#[post("/clips/{id}/remixes")]
pub async fn record_remix(
    path: web::Path<Uuid>,
    http_req: HttpRequest,
    state: web::Data<ClipHandlerState>,
) -> Result<HttpResponse> {
    let clip_id = path.into_inner();

    if let Some(profile_id) = viewer_from(&http_req)? {
        state.guard.check(GuardedAction::ClipUpload, profile_id).await?;
    }

    if !state.clips.bump_remixes(clip_id).await? {
        return Err(AppError::NotFound(format!("Clip {clip_id} not found")));
    }

    let score = state.trending.recompute_clip(clip_id).await?;

    Ok(HttpResponse::Ok().json(ScoreResponse { clip_id, score }))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// Lifecycle updates come from the content pipeline; the score follows
/// the status in the same request (a clip leaving `live` drops to 0).
#[post("/clips/{id}/status")]
pub async fn set_status(
    path: web::Path<Uuid>,
    body: web::Json<StatusBody>,
    state: web::Data<ClipHandlerState>,
) -> Result<HttpResponse> {
    let clip_id = path.into_inner();

    let status = crate::models::ClipStatus::parse(&body.status)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown clip status: {}", body.status)))?;

    if !state.clips.set_status(clip_id, status.as_str()).await? {
        return Err(AppError::NotFound(format!("Clip {clip_id} not found")));
    }

    let score = state.trending.recompute_clip(clip_id).await?;

    Ok(HttpResponse::Ok().json(ScoreResponse { clip_id, score }))
}

#[post("/clips/{id}/score/recompute")]
pub async fn recompute_score(
    path: web::Path<Uuid>,
    state: web::Data<ClipHandlerState>,
) -> Result<HttpResponse> {
    let clip_id = path.into_inner();
    let score = state.trending.recompute_clip(clip_id).await?;

    Ok(HttpResponse::Ok().json(ScoreResponse { clip_id, score }))
}

#[derive(Debug, Serialize)]
pub struct RecomputeAllResponse {
    pub updated: u64,
}

#[post("/scores/recompute-all")]
pub async fn recompute_all_scores(state: web::Data<ClipHandlerState>) -> Result<HttpResponse> {
    let updated = state.trending.recompute_all().await?;

    Ok(HttpResponse::Ok().json(RecomputeAllResponse { updated }))
}

#[get("/clips/{id}/relevance")]
pub async fn get_relevance(
    path: web::Path<Uuid>,
    http_req: HttpRequest,
    state: web::Data<ClipHandlerState>,
) -> Result<HttpResponse> {
    let clip_id = path.into_inner();
    let viewer = viewer_from(&http_req)?;
    let score = state.relevance.relevance(clip_id, viewer).await?;

    Ok(HttpResponse::Ok().json(ScoreResponse { clip_id, score }))
}

#[derive(Debug, Serialize)]
pub struct EngagementResponse {
    pub clip_id: Uuid,
    pub listens: i64,
    pub reaction_total: i64,
    pub reply_count: i64,
    pub remix_count: i64,
    pub completion_rate: Option<f64>,
}

#[get("/clips/{id}/engagement")]
pub async fn get_engagement(
    path: web::Path<Uuid>,
    state: web::Data<ClipHandlerState>,
) -> Result<HttpResponse> {
    let clip_id = path.into_inner();
    let summary = state.aggregator.summarize(clip_id).await?;

    Ok(HttpResponse::Ok().json(EngagementResponse {
        clip_id,
        listens: summary.listens,
        reaction_total: summary.reaction_total,
        reply_count: summary.reply_count,
        remix_count: summary.remix_count,
        completion_rate: summary.completion_rate,
    }))
}

#[derive(Debug, Serialize)]
pub struct RemixChainResponse {
    pub clip_id: Uuid,
    pub ancestors: Vec<Uuid>,
}

#[get("/clips/{id}/remix-chain")]
pub async fn get_remix_chain(
    path: web::Path<Uuid>,
    state: web::Data<ClipHandlerState>,
) -> Result<HttpResponse> {
    let clip_id = path.into_inner();
    let ancestors = state.remix.ancestry(clip_id).await?;

    Ok(HttpResponse::Ok().json(RemixChainResponse { clip_id, ancestors }))
}
