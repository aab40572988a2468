use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};

use crate::{
    db::review::REVIEW_COLUMNS,
    errors::AppError,
    models::review::{Review, ReviewRatingView, ReviewWithRatings},
};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

pub fn clamp_page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

pub async fn get_review_for_update(
    review_id: i32,
    conn: &mut PgConnection,
) -> Result<Review, AppError> {
    sqlx::query_as::<_, Review>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1 FOR UPDATE"
    ))
    .bind(review_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to fetch review: {}", e)))?
    .ok_or_else(|| AppError::NotFound(format!("Review {} not found", review_id)))
}

pub async fn get_review_ratings(
    review_ids: &[i32],
    postgres: &PgPool,
) -> Result<HashMap<i32, Vec<ReviewRatingView>>, AppError> {
    if review_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, ReviewRatingView>(
        "SELECT rr.review_id, rr.category_id, rc.name AS category_name, rr.rating_value
        FROM review_ratings rr
        JOIN rating_categories rc ON rc.id = rr.category_id
        WHERE rr.review_id = ANY($1)
        ORDER BY rr.review_id, rc.id",
    )
    .bind(review_ids)
    .fetch_all(postgres)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to fetch review ratings: {}", e)))?;

    let mut by_review: HashMap<i32, Vec<ReviewRatingView>> = HashMap::new();
    for row in rows {
        by_review.entry(row.review_id).or_default().push(row);
    }

    Ok(by_review)
}

pub async fn get_review_with_ratings(
    review_id: i32,
    postgres: &PgPool,
) -> Result<ReviewWithRatings, AppError> {
    let review = sqlx::query_as::<_, Review>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
    ))
    .bind(review_id)
    .fetch_optional(postgres)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to fetch review: {}", e)))?
    .ok_or_else(|| AppError::NotFound(format!("Review {} not found", review_id)))?;

    let ratings = get_review_ratings(&[review.id], postgres)
        .await?
        .remove(&review.id)
        .unwrap_or_default();

    Ok(ReviewWithRatings { review, ratings })
}

pub async fn list_approved_reviews(
    exchange_id: i32,
    limit: i64,
    offset: i64,
    postgres: PgPool,
) -> Result<Vec<ReviewWithRatings>, AppError> {
    let reviews = sqlx::query_as::<_, Review>(&format!(
        "SELECT {REVIEW_COLUMNS}
        FROM reviews
        WHERE exchange_id = $1 AND moderation_status = 'approved'
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3"
    ))
    .bind(exchange_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&postgres)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to list reviews: {}", e)))?;

    let ids: Vec<i32> = reviews.iter().map(|r| r.id).collect();
    let mut ratings = get_review_ratings(&ids, &postgres).await?;

    Ok(reviews
        .into_iter()
        .map(|review| {
            let ratings = ratings.remove(&review.id).unwrap_or_default();
            ReviewWithRatings { review, ratings }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_bounds() {
        assert_eq!(clamp_page(None, None), (DEFAULT_PAGE_SIZE, 0));
        assert_eq!(clamp_page(Some(0), Some(-5)), (1, 0));
        assert_eq!(clamp_page(Some(500), Some(40)), (MAX_PAGE_SIZE, 40));
    }
}
