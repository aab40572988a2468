use sqlx::PgPool;

use crate::{
    db::{
        rating_store::PgRatingStore,
        review::{REVIEW_COLUMNS, get::get_review_for_update},
    },
    errors::AppError,
    models::review::{ModerateReviewPayload, Review},
    moderation::apply_moderation,
};

pub async fn moderate_review(
    review_id: i32,
    payload: ModerateReviewPayload,
    moderator_id: i32,
    postgres: PgPool,
) -> Result<Review, AppError> {
    let mut tx = postgres
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to start transaction: {}", e)))?;

    // Status write and any recalculation share the transaction
    let mut store = PgRatingStore::new(&mut tx);
    let outcome = apply_moderation(&mut store, review_id, &payload, moderator_id)
        .await
        .inspect_err(|e| tracing::error!("Moderation of review {} failed: {}", review_id, e))?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to commit moderation: {}", e)))?;

    tracing::info!(
        "Review {} moderated by {}: {:?} -> {:?} (recalculated: {})",
        review_id,
        moderator_id,
        outcome.previous_status,
        outcome.review.moderation_status,
        outcome.recalculation.is_some()
    );

    Ok(outcome.review)
}

// (useful, not_useful) counter change; None when the vote repeats
pub fn vote_counter_delta(previous: Option<bool>, is_useful: bool) -> Option<(i32, i32)> {
    match (previous, is_useful) {
        (Some(prev), now) if prev == now => None,
        (Some(_), true) => Some((1, -1)),
        (Some(_), false) => Some((-1, 1)),
        (None, true) => Some((1, 0)),
        (None, false) => Some((0, 1)),
    }
}

pub async fn vote_review(
    review_id: i32,
    voter_id: i32,
    is_useful: bool,
    postgres: PgPool,
) -> Result<Review, AppError> {
    let mut tx = postgres
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to start transaction: {}", e)))?;

    // Only approved reviews can be voted on
    let review = match get_review_for_update(review_id, &mut tx).await {
        Ok(review) if review.moderation_status.is_approved() => review,
        Ok(_) | Err(AppError::NotFound(_)) => {
            return Err(AppError::NotFound("Approved review not found".into()));
        }
        Err(e) => return Err(e),
    };

    if review.user_id == voter_id {
        return Err(AppError::BadRequest(
            "Cannot vote on your own review".into(),
        ));
    }

    // Check for an existing vote by this user
    let previous = sqlx::query_scalar::<_, bool>(
        "SELECT is_useful FROM review_usefulness_votes WHERE review_id = $1 AND user_id = $2",
    )
    .bind(review_id)
    .bind(voter_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to query vote: {}", e)))?;

    let Some((useful_delta, not_useful_delta)) = vote_counter_delta(previous, is_useful) else {
        return Ok(review);
    };

    // Store the vote
    sqlx::query(
        "INSERT INTO review_usefulness_votes (review_id, user_id, is_useful)
        VALUES ($1, $2, $3)
        ON CONFLICT (review_id, user_id) DO UPDATE
        SET is_useful = EXCLUDED.is_useful, voted_at = NOW()",
    )
    .bind(review_id)
    .bind(voter_id)
    .bind(is_useful)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to store vote: {}", e)))?;

    // Update denormalized counters
    let updated = sqlx::query_as::<_, Review>(&format!(
        "UPDATE reviews
        SET useful_votes_count = useful_votes_count + $2,
            not_useful_votes_count = not_useful_votes_count + $3
        WHERE id = $1
        RETURNING {REVIEW_COLUMNS}"
    ))
    .bind(review_id)
    .bind(useful_delta)
    .bind(not_useful_delta)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to update vote counts: {}", e)))?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to commit vote: {}", e)))?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_vote_increments_one_counter() {
        assert_eq!(vote_counter_delta(None, true), Some((1, 0)));
        assert_eq!(vote_counter_delta(None, false), Some((0, 1)));
    }

    #[test]
    fn changed_vote_moves_between_counters() {
        assert_eq!(vote_counter_delta(Some(false), true), Some((1, -1)));
        assert_eq!(vote_counter_delta(Some(true), false), Some((-1, 1)));
    }

    #[test]
    fn repeated_vote_is_a_no_op() {
        assert_eq!(vote_counter_delta(Some(true), true), None);
        assert_eq!(vote_counter_delta(Some(false), false), None);
    }
}
