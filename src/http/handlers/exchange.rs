use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    db::{
        exchange::get::get_exchange_ratings,
        review::get::{clamp_page, list_approved_reviews},
    },
    models::{exchange::ExchangeRatings, review::ReviewWithRatings},
    state::AppState,
};

#[derive(Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn get_exchange_ratings_handler(
    Path(exchange_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ExchangeRatings>, (StatusCode, String)> {
    let ratings = get_exchange_ratings(exchange_id, state.postgres.clone())
        .await
        .map_err(|e| {
            tracing::error!("Error retrieving ratings for exchange {}: {}", exchange_id, e);
            e.to_response()
        })?;

    Ok(Json(ratings))
}

pub async fn list_exchange_reviews_handler(
    Path(exchange_id): Path<i32>,
    Query(page): Query<PageQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ReviewWithRatings>>, (StatusCode, String)> {
    let (limit, offset) = clamp_page(page.limit, page.offset);

    let reviews = list_approved_reviews(exchange_id, limit, offset, state.postgres.clone())
        .await
        .map_err(|e| {
            tracing::error!("Error listing reviews for exchange {}: {}", exchange_id, e);
            e.to_response()
        })?;

    Ok(Json(reviews))
}
