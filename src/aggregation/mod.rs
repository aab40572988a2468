pub mod compute;
pub mod engine;

pub use compute::{
    CategoryAggregate, ExchangeAggregates, ReconciliationPlan, compute_aggregates,
    plan_reconciliation, round_rating,
};
pub use engine::{RatingAggregator, RatingStore, RecalculationOutcome};
