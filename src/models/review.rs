use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "moderation_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn is_approved(self) -> bool {
        matches!(self, ModerationStatus::Approved)
    }

    /// True when moving from `from` to `to` changes whether the review
    /// contributes to its exchange's ratings.
    pub fn crosses_approved_boundary(from: Self, to: Self) -> bool {
        from.is_approved() != to.is_approved()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i32,
    pub exchange_id: i32,
    pub user_id: i32,
    pub comment: String,
    pub moderation_status: ModerationStatus,
    pub moderator_notes: Option<String>,
    pub moderated_by_user_id: Option<i32>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub useful_votes_count: i32,
    pub not_useful_votes_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRatingView {
    pub review_id: i32,
    pub category_id: i32,
    pub category_name: String,
    pub rating_value: i16,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithRatings {
    #[serde(flatten)]
    pub review: Review,
    pub ratings: Vec<ReviewRatingView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRating {
    pub category_id: i32,
    pub rating_value: i16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub comment: String,
    pub ratings: Vec<NewRating>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerateReviewPayload {
    pub moderation_status: Option<ModerationStatus>,
    pub moderator_notes: Option<String>,
}
