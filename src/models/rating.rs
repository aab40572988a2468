use serde::{Deserialize, Serialize};

/// One rating value of an approved review, as handed to the aggregator.
///
/// `category_name` is `None` when the referenced category no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub category_id: i32,
    pub category_name: Option<String>,
    pub value: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedReview {
    pub review_id: i32,
    pub ratings: Vec<RatingEntry>,
}

impl RatingEntry {
    pub fn new(category_id: i32, category_name: impl Into<String>, value: i16) -> Self {
        Self {
            category_id,
            category_name: Some(category_name.into()),
            value,
        }
    }

    pub fn orphaned(category_id: i32, value: i16) -> Self {
        Self {
            category_id,
            category_name: None,
            value,
        }
    }
}
