use std::collections::HashSet;

use sqlx::PgPool;

use crate::{
    db::review::REVIEW_COLUMNS,
    errors::AppError,
    models::review::{NewReview, Review},
};

pub const MIN_COMMENT_CHARS: usize = 5;
pub const MAX_COMMENT_CHARS: usize = 5000;

const REVIEW_UNIQUE_CONSTRAINT: &str = "uk_review_exchange_user";
const DUPLICATE_REVIEW_MESSAGE: &str = "You have already reviewed this exchange";

pub fn validate_new_review(review: &NewReview) -> Result<(), AppError> {
    // Validate comment length
    let comment_len = review.comment.trim().chars().count();
    if !(MIN_COMMENT_CHARS..=MAX_COMMENT_CHARS).contains(&comment_len) {
        return Err(AppError::BadRequest(format!(
            "Comment must be between {} and {} characters",
            MIN_COMMENT_CHARS, MAX_COMMENT_CHARS
        )));
    }

    if review.ratings.is_empty() {
        return Err(AppError::BadRequest(
            "At least one category rating is required".into(),
        ));
    }

    // Validate values and reject repeated categories
    let mut seen = HashSet::new();
    for rating in &review.ratings {
        if !(1..=5).contains(&rating.rating_value) {
            return Err(AppError::BadRequest(format!(
                "Rating for category {} must be between 1 and 5",
                rating.category_id
            )));
        }
        if !seen.insert(rating.category_id) {
            return Err(AppError::BadRequest(
                "Duplicate rating categories provided".into(),
            ));
        }
    }

    Ok(())
}

pub async fn create_review(
    exchange_id: i32,
    user_id: i32,
    review: NewReview,
    postgres: PgPool,
) -> Result<Review, AppError> {
    validate_new_review(&review)?;

    let mut tx = postgres
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to start transaction: {}", e)))?;

    // Check the exchange exists
    let exchange_exists = sqlx::query_scalar::<_, i32>("SELECT id FROM exchanges WHERE id = $1")
        .bind(exchange_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to query exchange: {}", e)))?;

    if exchange_exists.is_none() {
        return Err(AppError::NotFound(format!(
            "Exchange {} not found",
            exchange_id
        )));
    }

    // Every rated category must exist
    let category_ids: Vec<i32> = review.ratings.iter().map(|r| r.category_id).collect();
    let known_categories = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM rating_categories WHERE id = ANY($1)",
    )
    .bind(&category_ids)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to query rating categories: {}", e)))?;

    if known_categories != category_ids.len() as i64 {
        return Err(AppError::BadRequest(
            "Invalid rating category ID provided".into(),
        ));
    }

    // One review per user and exchange. The unique constraint below still
    // catches two submissions racing past this check
    let existing = sqlx::query_scalar::<_, i32>(
        "SELECT id FROM reviews WHERE exchange_id = $1 AND user_id = $2",
    )
    .bind(exchange_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to query reviews: {}", e)))?;

    if existing.is_some() {
        return Err(AppError::Conflict(DUPLICATE_REVIEW_MESSAGE.into()));
    }

    // Insert as pending, so the exchange ratings are untouched until approval
    let created = sqlx::query_as::<_, Review>(&format!(
        "INSERT INTO reviews (exchange_id, user_id, comment, moderation_status)
        VALUES ($1, $2, $3, 'pending')
        RETURNING {REVIEW_COLUMNS}"
    ))
    .bind(exchange_id)
    .bind(user_id)
    .bind(review.comment.trim())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        AppError::from_write(
            e,
            REVIEW_UNIQUE_CONSTRAINT,
            DUPLICATE_REVIEW_MESSAGE,
            "Failed to create review",
        )
    })?;

    // Insert ratings
    for rating in &review.ratings {
        sqlx::query(
            "INSERT INTO review_ratings (review_id, category_id, rating_value)
            VALUES ($1, $2, $3)",
        )
        .bind(created.id)
        .bind(rating.category_id)
        .bind(rating.rating_value)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to store rating: {}", e)))?;
    }

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to commit review: {}", e)))?;

    tracing::info!(
        "Created review {} for exchange {} by user {}",
        created.id,
        exchange_id,
        user_id
    );

    Ok(created)
}
