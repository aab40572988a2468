//! Pure rating arithmetic: averages from approved reviews and the diff
//! against the stored category snapshots.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::warn;

use crate::models::{exchange::CategoryRatingSnapshot, rating::ApprovedReview};

pub const RATING_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAggregate {
    pub average_rating: Decimal,
    pub review_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeAggregates {
    pub overall_average_rating: Decimal,
    pub total_review_count: i32,
    pub categories: BTreeMap<i32, CategoryAggregate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub upserts: Vec<(i32, CategoryAggregate)>,
    pub deletes: Vec<i32>,
}

#[derive(Default)]
struct Accumulator {
    sum: Decimal,
    values: u32,
    reviews: BTreeSet<i32>,
}

impl Accumulator {
    fn push(&mut self, review_id: i32, value: i16) {
        self.sum += Decimal::from(value);
        self.values += 1;
        self.reviews.insert(review_id);
    }

    fn mean(&self) -> Decimal {
        if self.values == 0 {
            return zero_rating();
        }
        round_rating(self.sum / Decimal::from(self.values))
    }
}

/// Rounds half-up to two decimal places and pins the scale so that whole
/// averages render as `4.00`.
pub fn round_rating(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(RATING_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(RATING_SCALE);
    rounded
}

pub fn zero_rating() -> Decimal {
    Decimal::new(0, RATING_SCALE)
}

/// Computes the overall and per-category averages for one exchange.
///
/// Ratings whose category has disappeared from the reference data are left
/// out of every average. `total_review_count` still counts their review.
pub fn compute_aggregates(reviews: &[ApprovedReview]) -> ExchangeAggregates {
    let mut overall = Accumulator::default();
    let mut per_category: BTreeMap<i32, Accumulator> = BTreeMap::new();
    let mut distinct_reviews = BTreeSet::new();

    for review in reviews {
        distinct_reviews.insert(review.review_id);

        for rating in &review.ratings {
            if rating.category_name.is_none() {
                warn!(
                    review_id = review.review_id,
                    category_id = rating.category_id,
                    "Skipping rating for unknown category"
                );
                continue;
            }

            overall.push(review.review_id, rating.value);
            per_category
                .entry(rating.category_id)
                .or_default()
                .push(review.review_id, rating.value);
        }
    }

    let categories = per_category
        .into_iter()
        .map(|(category_id, acc)| {
            (
                category_id,
                CategoryAggregate {
                    average_rating: acc.mean(),
                    review_count: acc.reviews.len() as i32,
                },
            )
        })
        .collect();

    ExchangeAggregates {
        overall_average_rating: overall.mean(),
        total_review_count: distinct_reviews.len() as i32,
        categories,
    }
}

/// Every computed category is upserted; every stored snapshot without a
/// computed counterpart is deleted.
pub fn plan_reconciliation(
    existing: &[CategoryRatingSnapshot],
    computed: &ExchangeAggregates,
) -> ReconciliationPlan {
    let upserts = computed
        .categories
        .iter()
        .map(|(category_id, aggregate)| (*category_id, aggregate.clone()))
        .collect();

    let deletes = existing
        .iter()
        .map(|snapshot| snapshot.category_id)
        .filter(|category_id| !computed.categories.contains_key(category_id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    ReconciliationPlan { upserts, deletes }
}
