use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRatingSnapshot {
    pub exchange_id: i32,
    pub category_id: i32,
    pub average_rating: Decimal,
    pub review_count: i32,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRatingView {
    pub category_id: i32,
    pub category_name: String,
    pub average_rating: Decimal,
    pub review_count: i32,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeSummary {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub overall_average_rating: Decimal,
    pub total_review_count: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRatings {
    #[serde(flatten)]
    pub exchange: ExchangeSummary,
    pub categories: Vec<CategoryRatingView>,
}
