use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::{
    aggregation::{RatingAggregator, RatingStore, RecalculationOutcome},
    errors::AppError,
    models::review::{ModerateReviewPayload, ModerationStatus, Review},
};

/// Writes the moderation workflow performs before handing the exchange over
/// to the aggregator. Shares the unit of work of the underlying [`RatingStore`].
#[async_trait]
pub trait ModerationStore: RatingStore {
    async fn lock_review(&mut self, review_id: i32) -> Result<Review, AppError>;

    async fn update_review_moderation(
        &mut self,
        review_id: i32,
        status: ModerationStatus,
        notes: Option<&str>,
        moderator_id: i32,
    ) -> Result<Review, AppError>;

    async fn remove_review(&mut self, review_id: i32) -> Result<(), AppError>;

    /// Deletes the category with its ratings and snapshot rows. Returns the
    /// exchanges that had approved ratings in it, or `None` if it is unknown.
    async fn remove_rating_category(
        &mut self,
        category_id: i32,
    ) -> Result<Option<Vec<i32>>, AppError>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationOutcome {
    pub review: Review,
    pub previous_status: ModerationStatus,
    pub recalculation: Option<RecalculationOutcome>,
}

pub async fn apply_moderation<S>(
    store: &mut S,
    review_id: i32,
    payload: &ModerateReviewPayload,
    moderator_id: i32,
) -> Result<ModerationOutcome, AppError>
where
    S: ModerationStore + ?Sized,
{
    if payload.moderation_status.is_none() && payload.moderator_notes.is_none() {
        return Err(AppError::BadRequest("No moderation data provided".into()));
    }

    let current = store.lock_review(review_id).await?;
    let previous_status = current.moderation_status;
    let next_status = payload.moderation_status.unwrap_or(previous_status);

    // Same status and no notes: nothing to write
    if next_status == previous_status && payload.moderator_notes.is_none() {
        return Ok(ModerationOutcome {
            review: current,
            previous_status,
            recalculation: None,
        });
    }

    let review = store
        .update_review_moderation(
            review_id,
            next_status,
            payload.moderator_notes.as_deref(),
            moderator_id,
        )
        .await?;

    // Only a change to the approved set moves the aggregates
    let crosses = ModerationStatus::crosses_approved_boundary(previous_status, next_status);
    let recalculation = if crosses {
        Some(
            RatingAggregator::new()
                .recalculate(&mut *store, review.exchange_id)
                .await?,
        )
    } else {
        None
    };

    Ok(ModerationOutcome {
        review,
        previous_status,
        recalculation,
    })
}

pub async fn remove_review<S>(
    store: &mut S,
    review_id: i32,
) -> Result<Option<RecalculationOutcome>, AppError>
where
    S: ModerationStore + ?Sized,
{
    let review = store.lock_review(review_id).await?;
    store.remove_review(review_id).await?;

    if !review.moderation_status.is_approved() {
        return Ok(None);
    }

    let outcome = RatingAggregator::new()
        .recalculate(&mut *store, review.exchange_id)
        .await?;
    Ok(Some(outcome))
}

pub async fn remove_rating_category<S>(
    store: &mut S,
    category_id: i32,
) -> Result<Vec<RecalculationOutcome>, AppError>
where
    S: ModerationStore + ?Sized,
{
    let affected = store
        .remove_rating_category(category_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Rating category {} not found", category_id)))?;

    let aggregator = RatingAggregator::new();
    let mut outcomes = Vec::with_capacity(affected.len());
    for exchange_id in &affected {
        outcomes.push(aggregator.recalculate(&mut *store, *exchange_id).await?);
    }

    info!(
        category_id,
        exchanges = affected.len(),
        "Removed rating category and refreshed affected exchanges"
    );

    Ok(outcomes)
}
