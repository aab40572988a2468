use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    aggregation::RecalculationOutcome,
    auth::AdminClaims,
    db::{
        exchange::patch::{ResyncReport, resync_all_exchanges, resync_exchange},
        review::{delete::delete_review, patch::moderate_review},
    },
    models::review::{ModerateReviewPayload, Review},
    state::AppState,
};

pub async fn moderate_review_handler(
    Path(review_id): Path<i32>,
    State(state): State<AppState>,
    AdminClaims(claims): AdminClaims,
    Json(payload): Json<ModerateReviewPayload>,
) -> Result<Json<Review>, (StatusCode, String)> {
    let moderator_id = claims.user_id().map_err(|e| e.to_response())?;

    let review = moderate_review(review_id, payload, moderator_id, state.postgres.clone())
        .await
        .map_err(|e| {
            tracing::error!("Error moderating review {}: {}", review_id, e);
            e.to_response()
        })?;

    Ok(Json(review))
}

pub async fn delete_review_handler(
    Path(review_id): Path<i32>,
    State(state): State<AppState>,
    AdminClaims(_claims): AdminClaims,
) -> Result<StatusCode, (StatusCode, String)> {
    delete_review(review_id, state.postgres.clone())
        .await
        .map_err(|e| {
            tracing::error!("Error deleting review {}: {}", review_id, e);
            e.to_response()
        })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn recalculate_exchange_handler(
    Path(exchange_id): Path<i32>,
    State(state): State<AppState>,
    AdminClaims(_claims): AdminClaims,
) -> Result<Json<RecalculationOutcome>, (StatusCode, String)> {
    let outcome = resync_exchange(exchange_id, &state.postgres)
        .await
        .map_err(|e| {
            tracing::error!("Error recalculating exchange {}: {}", exchange_id, e);
            e.to_response()
        })?;

    Ok(Json(outcome))
}

pub async fn recalculate_all_handler(
    State(state): State<AppState>,
    AdminClaims(_claims): AdminClaims,
) -> Result<Json<ResyncReport>, (StatusCode, String)> {
    let report = resync_all_exchanges(state.postgres.clone())
        .await
        .map_err(|e| {
            tracing::error!("Error recalculating all exchanges: {}", e);
            e.to_response()
        })?;

    Ok(Json(report))
}
