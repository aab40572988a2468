use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    aggregation::compute::{
        CategoryAggregate, ExchangeAggregates, compute_aggregates, plan_reconciliation,
    },
    errors::AppError,
    models::{exchange::CategoryRatingSnapshot, rating::ApprovedReview},
};

/// Reads and writes the aggregator needs, scoped to one open unit of work.
///
/// Implementations must route every call through the same transaction so the
/// caller can commit or roll back the whole recalculation at once.
#[async_trait]
pub trait RatingStore: Send {
    /// Returns `false` if the exchange does not exist. Implementations backed
    /// by a database should take a row lock here so recalculations of the same
    /// exchange serialize.
    async fn lock_exchange(&mut self, exchange_id: i32) -> Result<bool, AppError>;

    async fn load_category_snapshots(
        &mut self,
        exchange_id: i32,
    ) -> Result<Vec<CategoryRatingSnapshot>, AppError>;

    async fn load_approved_reviews(
        &mut self,
        exchange_id: i32,
    ) -> Result<Vec<ApprovedReview>, AppError>;

    async fn write_exchange_summary(
        &mut self,
        exchange_id: i32,
        overall_average_rating: Decimal,
        total_review_count: i32,
    ) -> Result<(), AppError>;

    async fn upsert_category_snapshot(
        &mut self,
        exchange_id: i32,
        category_id: i32,
        aggregate: &CategoryAggregate,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn delete_category_snapshot(
        &mut self,
        exchange_id: i32,
        category_id: i32,
    ) -> Result<(), AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RecalculationOutcome {
    Updated {
        #[serde(flatten)]
        aggregates: ExchangeAggregates,
        #[serde(rename = "deletedCategories")]
        deleted_categories: Vec<i32>,
    },
    ExchangeNotFound,
}

/// Recomputes an exchange's rating summary from its approved reviews.
///
/// Holds no state; the store passed to [`RatingAggregator::recalculate`]
/// carries the unit of work.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatingAggregator;

impl RatingAggregator {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, store))]
    pub async fn recalculate<S>(
        &self,
        store: &mut S,
        exchange_id: i32,
    ) -> Result<RecalculationOutcome, AppError>
    where
        S: RatingStore + ?Sized,
    {
        if !store.lock_exchange(exchange_id).await? {
            warn!(exchange_id, "Exchange not found, skipping rating recalculation");
            return Ok(RecalculationOutcome::ExchangeNotFound);
        }

        let existing = store.load_category_snapshots(exchange_id).await?;
        let reviews = store.load_approved_reviews(exchange_id).await?;

        let aggregates = compute_aggregates(&reviews);
        let plan = plan_reconciliation(&existing, &aggregates);

        store
            .write_exchange_summary(
                exchange_id,
                aggregates.overall_average_rating,
                aggregates.total_review_count,
            )
            .await?;

        let now = Utc::now();
        for (category_id, aggregate) in &plan.upserts {
            store
                .upsert_category_snapshot(exchange_id, *category_id, aggregate, now)
                .await?;
        }

        for category_id in &plan.deletes {
            store
                .delete_category_snapshot(exchange_id, *category_id)
                .await?;
        }

        info!(
            exchange_id,
            overall = %aggregates.overall_average_rating,
            reviews = aggregates.total_review_count,
            upserted = plan.upserts.len(),
            deleted = plan.deletes.len(),
            "Recalculated exchange ratings"
        );

        Ok(RecalculationOutcome::Updated {
            aggregates,
            deleted_categories: plan.deletes,
        })
    }
}
