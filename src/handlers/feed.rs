use actix_web::{get, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::handlers::viewer_from;
use crate::models::FeedEntry;
use crate::services::FeedService;

pub struct FeedHandlerState {
    pub feed: FeedService,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub items: Vec<FeedEntry>,
    pub count: usize,
}

/// Personalized (or anonymous) ranked feed. An empty page is a normal
/// response, not an error.
#[get("/feed")]
pub async fn get_feed(
    query: web::Query<FeedQuery>,
    http_req: HttpRequest,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let viewer = viewer_from(&http_req)?;
    let items = state.feed.feed(viewer, query.limit, query.offset).await?;

    Ok(HttpResponse::Ok().json(FeedResponse {
        count: items.len(),
        items,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Global trending clips, no personalization.
#[get("/trending")]
pub async fn get_trending(
    query: web::Query<TrendingQuery>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let items = state.feed.trending(query.limit).await?;

    Ok(HttpResponse::Ok().json(FeedResponse {
        count: items.len(),
        items,
    }))
}
