use serde::Serialize;
use sqlx::PgPool;

use crate::{
    aggregation::{RatingAggregator, RecalculationOutcome},
    db::{exchange::get::get_all_exchange_ids, rating_store::PgRatingStore},
    errors::AppError,
};

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResyncReport {
    pub recalculated: usize,
    pub not_found: usize,
    pub failed: Vec<i32>,
}

pub async fn resync_exchange(
    exchange_id: i32,
    postgres: &PgPool,
) -> Result<RecalculationOutcome, AppError> {
    let mut tx = postgres
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to start transaction: {}", e)))?;

    let mut store = PgRatingStore::new(&mut tx);
    let outcome = RatingAggregator::new()
        .recalculate(&mut store, exchange_id)
        .await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to commit recalculation: {}", e)))?;

    Ok(outcome)
}

pub async fn resync_all_exchanges(postgres: PgPool) -> Result<ResyncReport, AppError> {
    let exchange_ids = get_all_exchange_ids(&postgres).await?;
    let mut report = ResyncReport::default();

    // One transaction per exchange, a failure does not stop the rest
    for exchange_id in exchange_ids {
        match resync_exchange(exchange_id, &postgres).await {
            Ok(RecalculationOutcome::Updated { .. }) => report.recalculated += 1,
            Ok(RecalculationOutcome::ExchangeNotFound) => report.not_found += 1,
            Err(e) => {
                tracing::error!("Failed to recalculate exchange {}: {}", exchange_id, e);
                report.failed.push(exchange_id);
            }
        }
    }

    tracing::info!(
        "Rating resync finished: {} recalculated, {} missing, {} failed",
        report.recalculated,
        report.not_found,
        report.failed.len()
    );

    Ok(report)
}
