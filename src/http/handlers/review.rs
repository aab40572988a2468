use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    auth::AuthClaims,
    db::review::{get::get_review_with_ratings, patch::vote_review, post::create_review},
    models::review::{NewReview, Review, ReviewWithRatings},
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotePayload {
    pub is_useful: bool,
}

pub async fn create_review_handler(
    Path(exchange_id): Path<i32>,
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Json(payload): Json<NewReview>,
) -> Result<(StatusCode, Json<ReviewWithRatings>), (StatusCode, String)> {
    let user_id = claims.user_id().map_err(|e| {
        tracing::error!("Unauthorized access attempt");
        e.to_response()
    })?;

    let created = create_review(exchange_id, user_id, payload, state.postgres.clone())
        .await
        .map_err(|e| {
            tracing::error!("Error creating review: {}", e);
            e.to_response()
        })?;

    let review = get_review_with_ratings(created.id, &state.postgres)
        .await
        .map_err(|e| {
            tracing::error!("Error loading created review {}: {}", created.id, e);
            e.to_response()
        })?;

    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn vote_review_handler(
    Path(review_id): Path<i32>,
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Json(payload): Json<VotePayload>,
) -> Result<Json<Review>, (StatusCode, String)> {
    let voter_id = claims.user_id().map_err(|e| e.to_response())?;

    match vote_review(review_id, voter_id, payload.is_useful, state.postgres.clone()).await {
        Ok(review) => {
            tracing::info!("User {} voted on review {}", voter_id, review_id);
            Ok(Json(review))
        }
        Err(err) => {
            tracing::error!("Error voting on review {}: {}", review_id, err);
            Err(err.to_response())
        }
    }
}
