//! Keyword lookup handler.

use super::UrlsQuery;
use crate::api::AppState;
use crate::error::Result;
use axum::{
    Json,
    extract::{Query, State},
};

/// GET /urls - Look up catalog URLs for a keyword
#[utoipa::path(
    get,
    path = "/api/urls",
    tag = "catalog",
    params(
        ("keyword" = Option<String>, Query, description = "Keyword to look up (case-insensitive substring)")
    ),
    responses(
        (status = 200, description = "Matching URLs in catalog order", body = Vec<String>),
        (status = 400, description = "Keyword missing or blank", body = crate::error::ApiError),
        (status = 404, description = "No keyword matched", body = crate::error::ApiError)
    )
)]
pub async fn lookup_urls(
    State(state): State<AppState>,
    Query(query): Query<UrlsQuery>,
) -> Result<Json<Vec<String>>> {
    let keyword = query.keyword.unwrap_or_default();
    let urls = state.relay.lookup(&keyword)?;
    tracing::debug!(keyword = %keyword, matches = urls.len(), "Keyword lookup");
    Ok(Json(urls))
}
