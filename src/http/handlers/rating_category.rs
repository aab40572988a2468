use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    aggregation::RecalculationOutcome,
    auth::AdminClaims,
    db::rating_category::{
        delete::delete_rating_category,
        get::{get_all_rating_categories, get_rating_category_by_id},
        patch::update_rating_category,
        post::create_rating_category,
    },
    models::rating_category::{NewRatingCategory, RatingCategory, UpdateRatingCategory},
    state::AppState,
};

pub async fn get_rating_categories_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<RatingCategory>>, (StatusCode, String)> {
    let categories = get_all_rating_categories(state.postgres).await.map_err(|e| {
        tracing::error!("Failed to get rating categories: {}", e);
        e.to_response()
    })?;

    Ok(Json(categories))
}

pub async fn get_rating_category_handler(
    Path(category_id): Path<i32>,
    State(state): State<AppState>,
    AdminClaims(_claims): AdminClaims,
) -> Result<Json<RatingCategory>, (StatusCode, String)> {
    let category = get_rating_category_by_id(category_id, &state.postgres)
        .await
        .map_err(|e| e.to_response())?;

    Ok(Json(category))
}

pub async fn create_rating_category_handler(
    State(state): State<AppState>,
    AdminClaims(_claims): AdminClaims,
    Json(payload): Json<NewRatingCategory>,
) -> Result<(StatusCode, Json<RatingCategory>), (StatusCode, String)> {
    let category = create_rating_category(payload, state.postgres.clone())
        .await
        .map_err(|e| {
            tracing::error!("Error creating rating category: {}", e);
            e.to_response()
        })?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_rating_category_handler(
    Path(category_id): Path<i32>,
    State(state): State<AppState>,
    AdminClaims(_claims): AdminClaims,
    Json(payload): Json<UpdateRatingCategory>,
) -> Result<Json<RatingCategory>, (StatusCode, String)> {
    let category = update_rating_category(category_id, payload, state.postgres.clone())
        .await
        .map_err(|e| {
            tracing::error!("Error updating rating category {}: {}", category_id, e);
            e.to_response()
        })?;

    Ok(Json(category))
}

pub async fn delete_rating_category_handler(
    Path(category_id): Path<i32>,
    State(state): State<AppState>,
    AdminClaims(_claims): AdminClaims,
) -> Result<Json<Vec<RecalculationOutcome>>, (StatusCode, String)> {
    let outcomes = delete_rating_category(category_id, state.postgres.clone())
        .await
        .map_err(|e| e.to_response())?;

    Ok(Json(outcomes))
}
