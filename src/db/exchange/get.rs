use sqlx::PgPool;

use crate::{
    errors::AppError,
    models::exchange::{CategoryRatingView, ExchangeRatings, ExchangeSummary},
};

pub async fn get_exchange_ratings(
    exchange_id: i32,
    postgres: PgPool,
) -> Result<ExchangeRatings, AppError> {
    let exchange = sqlx::query_as::<_, ExchangeSummary>(
        "SELECT id, name, slug, overall_average_rating, total_review_count
        FROM exchanges
        WHERE id = $1",
    )
    .bind(exchange_id)
    .fetch_optional(&postgres)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to fetch exchange: {}", e)))?
    .ok_or_else(|| AppError::NotFound(format!("Exchange {} not found", exchange_id)))?;

    let categories = sqlx::query_as::<_, CategoryRatingView>(
        "SELECT ecr.category_id, rc.name AS category_name, ecr.average_rating,
            ecr.review_count, ecr.last_updated
        FROM exchange_category_ratings ecr
        JOIN rating_categories rc ON rc.id = ecr.category_id
        WHERE ecr.exchange_id = $1
        ORDER BY rc.id",
    )
    .bind(exchange_id)
    .fetch_all(&postgres)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to fetch category ratings: {}", e)))?;

    Ok(ExchangeRatings {
        exchange,
        categories,
    })
}

pub async fn get_all_exchange_ids(postgres: &PgPool) -> Result<Vec<i32>, AppError> {
    sqlx::query_scalar::<_, i32>("SELECT id FROM exchanges ORDER BY id")
        .fetch_all(postgres)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list exchanges: {}", e)))
}
