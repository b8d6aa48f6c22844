//! Spotlight question reads plus the question write surface. Every
//! write recomputes the question's spotlight score before returning,
//! so no caller ever observes a score stale relative to its own
//! mutation.

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::QuestionsRepo;
use crate::error::{AppError, Result};
use crate::handlers::viewer_from;
use crate::models::Question;
use crate::services::{GuardedAction, RateGuard, SpotlightService};

pub struct SpotlightHandlerState {
    pub spotlight: SpotlightService,
    pub questions: QuestionsRepo,
    pub guard: RateGuard,
}

#[derive(Debug, Deserialize)]
pub struct SpotlightQuery {
    pub exclude: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SpotlightResponse {
    pub question: Option<Question>,
}

/// The single highest-scoring eligible question. `null` when nothing
/// qualifies; "no spotlight right now" is a normal state.
#[get("/spotlight")]
pub async fn get_spotlight(
    query: web::Query<SpotlightQuery>,
    state: web::Data<SpotlightHandlerState>,
) -> Result<HttpResponse> {
    let question = state.spotlight.current_spotlight(query.exclude).await?;

    Ok(HttpResponse::Ok().json(SpotlightResponse { question }))
}

/// Daily-rotation variant: picks among the top few by a day-of-year
/// offset so the same question does not win every day.
#[get("/spotlight/daily")]
pub async fn get_daily_spotlight(
    query: web::Query<SpotlightQuery>,
    state: web::Data<SpotlightHandlerState>,
) -> Result<HttpResponse> {
    let question = state.spotlight.daily_spotlight(query.exclude).await?;

    Ok(HttpResponse::Ok().json(SpotlightResponse { question }))
}

#[derive(Debug, Serialize)]
pub struct QuestionScoreResponse {
    pub question_id: Uuid,
    pub score: f64,
}

#[get("/questions/{id}/score")]
pub async fn get_question_score(
    path: web::Path<Uuid>,
    state: web::Data<SpotlightHandlerState>,
) -> Result<HttpResponse> {
    let question_id = path.into_inner();
    let score = state.spotlight.score(question_id).await?;

    Ok(HttpResponse::Ok().json(QuestionScoreResponse { question_id, score }))
}

#[post("/questions/{id}/upvotes")]
pub async fn record_upvote(
    path: web::Path<Uuid>,
    http_req: HttpRequest,
    state: web::Data<SpotlightHandlerState>,
) -> Result<HttpResponse> {
    let question_id = path.into_inner();

    if let Some(profile_id) = viewer_from(&http_req)? {
        state.guard.check(GuardedAction::Engagement, profile_id).await?;
    }

    if !state.questions.bump_upvotes(question_id).await? {
        return Err(AppError::NotFound(format!(
            "Question {question_id} not found"
        )));
    }

    let score = state.spotlight.recompute_question(question_id).await?;

    Ok(HttpResponse::Ok().json(QuestionScoreResponse { question_id, score }))
}

#[post("/questions/{id}/replies")]
pub async fn record_question_reply(
    path: web::Path<Uuid>,
    http_req: HttpRequest,
    state: web::Data<SpotlightHandlerState>,
) -> Result<HttpResponse> {
    let question_id = path.into_inner();

    if let Some(profile_id) = viewer_from(&http_req)? {
        state.guard.check(GuardedAction::Engagement, profile_id).await?;
    }

    if !state.questions.bump_replies(question_id).await? {
        return Err(AppError::NotFound(format!(
            "Question {question_id} not found"
        )));
    }

    let score = state.spotlight.recompute_question(question_id).await?;

    Ok(HttpResponse::Ok().json(QuestionScoreResponse { question_id, score }))
}

#[derive(Debug, Deserialize)]
pub struct AnswerBody {
    pub answered: bool,
}

#[post("/questions/{id}/answer")]
pub async fn set_answered(
    path: web::Path<Uuid>,
    body: web::Json<AnswerBody>,
    state: web::Data<SpotlightHandlerState>,
) -> Result<HttpResponse> {
    let question_id = path.into_inner();

    if !state.questions.set_answered(question_id, body.answered).await? {
        return Err(AppError::NotFound(format!(
            "Question {question_id} not found"
        )));
    }

    let score = state.spotlight.recompute_question(question_id).await?;

    Ok(HttpResponse::Ok().json(QuestionScoreResponse { question_id, score }))
}
