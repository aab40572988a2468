use sqlx::PgPool;

use crate::{
    aggregation::RecalculationOutcome, db::rating_store::PgRatingStore, errors::AppError,
    moderation::remove_rating_category,
};

pub async fn delete_rating_category(
    category_id: i32,
    postgres: PgPool,
) -> Result<Vec<RecalculationOutcome>, AppError> {
    let mut tx = postgres
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to start transaction: {}", e)))?;

    // Delete and refresh every affected exchange in one unit of work
    let mut store = PgRatingStore::new(&mut tx);
    let outcomes = remove_rating_category(&mut store, category_id)
        .await
        .inspect_err(|e| {
            tracing::error!("Deleting rating category {} failed: {}", category_id, e)
        })?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to commit category deletion: {}", e)))?;

    Ok(outcomes)
}
