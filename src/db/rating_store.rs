use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};

use crate::{
    aggregation::{CategoryAggregate, RatingStore},
    db::review::{REVIEW_COLUMNS, get::get_review_for_update},
    errors::AppError,
    models::{
        exchange::CategoryRatingSnapshot,
        rating::{ApprovedReview, RatingEntry},
        review::{ModerationStatus, Review},
    },
    moderation::ModerationStore,
};

/// [`RatingStore`] over a connection borrowed from an open transaction.
pub struct PgRatingStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgRatingStore<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ApprovedRatingRow {
    pub review_id: i32,
    pub category_id: Option<i32>,
    pub category_name: Option<String>,
    pub rating_value: Option<i16>,
}

// Rows arrive ordered by review id; a review without ratings is one row of NULLs
pub(crate) fn group_approved_rows(rows: Vec<ApprovedRatingRow>) -> Vec<ApprovedReview> {
    let mut reviews: Vec<ApprovedReview> = Vec::new();

    for row in rows {
        let needs_new = reviews
            .last()
            .map(|last| last.review_id != row.review_id)
            .unwrap_or(true);
        if needs_new {
            reviews.push(ApprovedReview {
                review_id: row.review_id,
                ratings: Vec::new(),
            });
        }

        let (Some(category_id), Some(value)) = (row.category_id, row.rating_value) else {
            continue;
        };

        if let Some(current) = reviews.last_mut() {
            current.ratings.push(RatingEntry {
                category_id,
                category_name: row.category_name,
                value,
            });
        }
    }

    reviews
}

#[async_trait]
impl RatingStore for PgRatingStore<'_> {
    async fn lock_exchange(&mut self, exchange_id: i32) -> Result<bool, AppError> {
        let row = sqlx::query_scalar::<_, i32>("SELECT id FROM exchanges WHERE id = $1 FOR UPDATE")
            .bind(exchange_id)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to lock exchange: {}", e)))?;

        Ok(row.is_some())
    }

    async fn load_category_snapshots(
        &mut self,
        exchange_id: i32,
    ) -> Result<Vec<CategoryRatingSnapshot>, AppError> {
        sqlx::query_as::<_, CategoryRatingSnapshot>(
            "SELECT exchange_id, category_id, average_rating, review_count, last_updated
            FROM exchange_category_ratings
            WHERE exchange_id = $1
            ORDER BY category_id",
        )
        .bind(exchange_id)
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to load category ratings: {}", e)))
    }

    async fn load_approved_reviews(
        &mut self,
        exchange_id: i32,
    ) -> Result<Vec<ApprovedReview>, AppError> {
        let rows = sqlx::query_as::<_, ApprovedRatingRow>(
            "SELECT r.id AS review_id, rr.category_id, rc.name AS category_name, rr.rating_value
            FROM reviews r
            LEFT JOIN review_ratings rr ON rr.review_id = r.id
            LEFT JOIN rating_categories rc ON rc.id = rr.category_id
            WHERE r.exchange_id = $1 AND r.moderation_status = 'approved'
            ORDER BY r.id, rr.category_id",
        )
        .bind(exchange_id)
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to load approved reviews: {}", e)))?;

        Ok(group_approved_rows(rows))
    }

    async fn write_exchange_summary(
        &mut self,
        exchange_id: i32,
        overall_average_rating: Decimal,
        total_review_count: i32,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE exchanges
            SET overall_average_rating = $2, total_review_count = $3, updated_at = NOW()
            WHERE id = $1",
        )
        .bind(exchange_id)
        .bind(overall_average_rating)
        .bind(total_review_count)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update exchange summary: {}", e)))?;

        if result.rows_affected() != 1 {
            return Err(AppError::DatabaseError(format!(
                "Exchange {} vanished during rating update",
                exchange_id
            )));
        }

        Ok(())
    }

    async fn upsert_category_snapshot(
        &mut self,
        exchange_id: i32,
        category_id: i32,
        aggregate: &CategoryAggregate,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO exchange_category_ratings
                (exchange_id, category_id, average_rating, review_count, last_updated)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (exchange_id, category_id) DO UPDATE
            SET average_rating = EXCLUDED.average_rating,
                review_count = EXCLUDED.review_count,
                last_updated = EXCLUDED.last_updated",
        )
        .bind(exchange_id)
        .bind(category_id)
        .bind(aggregate.average_rating)
        .bind(aggregate.review_count)
        .bind(updated_at)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to upsert category rating: {}", e)))?;

        Ok(())
    }

    async fn delete_category_snapshot(
        &mut self,
        exchange_id: i32,
        category_id: i32,
    ) -> Result<(), AppError> {
        sqlx::query(
            "DELETE FROM exchange_category_ratings WHERE exchange_id = $1 AND category_id = $2",
        )
        .bind(exchange_id)
        .bind(category_id)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to delete category rating: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl ModerationStore for PgRatingStore<'_> {
    async fn lock_review(&mut self, review_id: i32) -> Result<Review, AppError> {
        get_review_for_update(review_id, &mut *self.conn).await
    }

    async fn update_review_moderation(
        &mut self,
        review_id: i32,
        status: ModerationStatus,
        notes: Option<&str>,
        moderator_id: i32,
    ) -> Result<Review, AppError> {
        sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews
            SET moderation_status = $2,
                moderator_notes = COALESCE($3, moderator_notes),
                moderated_by_user_id = $4,
                moderated_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(review_id)
        .bind(status)
        .bind(notes)
        .bind(moderator_id)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update review: {}", e)))
    }

    async fn remove_review(&mut self, review_id: i32) -> Result<(), AppError> {
        // Ratings and votes go with it through ON DELETE CASCADE
        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete review: {}", e)))?;

        Ok(())
    }

    async fn remove_rating_category(
        &mut self,
        category_id: i32,
    ) -> Result<Option<Vec<i32>>, AppError> {
        let found = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM rating_categories WHERE id = $1 FOR UPDATE",
        )
        .bind(category_id)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to lock rating category: {}", e)))?;

        if found.is_none() {
            return Ok(None);
        }

        // Collect affected exchanges before the cascade removes the ratings
        let affected = sqlx::query_scalar::<_, i32>(
            "SELECT DISTINCT r.exchange_id
            FROM review_ratings rr
            JOIN reviews r ON r.id = rr.review_id
            WHERE rr.category_id = $1 AND r.moderation_status = 'approved'
            ORDER BY r.exchange_id",
        )
        .bind(category_id)
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to find affected exchanges: {}", e)))?;

        sqlx::query("DELETE FROM rating_categories WHERE id = $1")
            .bind(category_id)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to delete rating category: {}", e))
            })?;

        Ok(Some(affected))
    }
}
