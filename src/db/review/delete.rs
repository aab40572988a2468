use sqlx::PgPool;

use crate::{db::rating_store::PgRatingStore, errors::AppError, moderation::remove_review};

pub async fn delete_review(review_id: i32, postgres: PgPool) -> Result<(), AppError> {
    let mut tx = postgres
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to start transaction: {}", e)))?;

    // Approved reviews are recalculated out of the exchange before commit
    let mut store = PgRatingStore::new(&mut tx);
    let recalculation = remove_review(&mut store, review_id).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to commit deletion: {}", e)))?;

    tracing::info!(
        "Deleted review {} (recalculated: {})",
        review_id,
        recalculation.is_some()
    );

    Ok(())
}
