use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exchange_reviews_be::{
    aggregation::{CategoryAggregate, RatingAggregator, RatingStore, RecalculationOutcome},
    errors::AppError,
    models::{
        exchange::CategoryRatingSnapshot,
        rating::{ApprovedReview, RatingEntry},
        review::{ModerateReviewPayload, ModerationStatus, Review},
    },
    moderation::{self, ModerationStore},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const EXCHANGE: i32 = 10;
const SUPPORT: i32 = 1;
const FEES: i32 = 2;
const SECURITY: i32 = 3;
const MODERATOR: i32 = 42;

#[derive(Debug, Clone)]
struct StoredReview {
    id: i32,
    exchange_id: i32,
    status: ModerationStatus,
    ratings: Vec<(i32, i16)>,
    notes: Option<String>,
    moderated_by: Option<i32>,
}

impl StoredReview {
    fn to_review(&self) -> Review {
        let now = Utc::now();
        Review {
            id: self.id,
            exchange_id: self.exchange_id,
            user_id: 100 + self.id,
            comment: "Fast withdrawals".into(),
            moderation_status: self.status,
            moderator_notes: self.notes.clone(),
            moderated_by_user_id: self.moderated_by,
            moderated_at: self.moderated_by.map(|_| now),
            useful_votes_count: 0,
            not_useful_votes_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Db {
    exchanges: BTreeMap<i32, (Decimal, i32)>,
    categories: BTreeMap<i32, String>,
    reviews: Vec<StoredReview>,
    snapshots: BTreeMap<(i32, i32), CategoryRatingSnapshot>,
}

impl Db {
    fn scenario() -> Self {
        let mut db = Db::default();
        db.exchanges.insert(EXCHANGE, (Decimal::ZERO, 0));
        db.categories.insert(SUPPORT, "Support".into());
        db.categories.insert(FEES, "Fees".into());
        db.add_review(1, ModerationStatus::Approved, &[(SUPPORT, 5), (FEES, 3)]);
        db.add_review(2, ModerationStatus::Approved, &[(SUPPORT, 4)]);
        db
    }

    fn add_review(&mut self, id: i32, status: ModerationStatus, ratings: &[(i32, i16)]) {
        self.reviews.push(StoredReview {
            id,
            exchange_id: EXCHANGE,
            status,
            ratings: ratings.to_vec(),
            notes: None,
            moderated_by: None,
        });
    }

    fn review(&self, id: i32) -> Option<&StoredReview> {
        self.reviews.iter().find(|r| r.id == id)
    }

    fn set_status(&mut self, id: i32, status: ModerationStatus) {
        if let Some(review) = self.reviews.iter_mut().find(|r| r.id == id) {
            review.status = status;
        }
    }

    fn summary(&self) -> (Decimal, i32) {
        self.exchanges[&EXCHANGE]
    }

    fn snapshot(&self, category_id: i32) -> Option<&CategoryRatingSnapshot> {
        self.snapshots.get(&(EXCHANGE, category_id))
    }

    // Work happens on a copy that only replaces the db on commit
    fn begin(&self, fail_on_upsert: bool) -> MemTx {
        MemTx {
            working: self.clone(),
            fail_on_upsert,
            exchange_locks: 0,
        }
    }

    fn commit(&mut self, tx: MemTx) {
        *self = tx.working;
    }

    async fn recalculate(&mut self, exchange_id: i32) -> Result<RecalculationOutcome, AppError> {
        self.recalculate_with(exchange_id, false).await
    }

    async fn recalculate_with(
        &mut self,
        exchange_id: i32,
        fail_on_upsert: bool,
    ) -> Result<RecalculationOutcome, AppError> {
        let mut tx = self.begin(fail_on_upsert);
        let outcome = RatingAggregator::new()
            .recalculate(&mut tx, exchange_id)
            .await?;
        self.commit(tx);
        Ok(outcome)
    }

    async fn moderate(
        &mut self,
        review_id: i32,
        payload: ModerateReviewPayload,
        fail_on_upsert: bool,
    ) -> Result<(moderation::ModerationOutcome, usize), AppError> {
        let mut tx = self.begin(fail_on_upsert);
        let outcome = moderation::apply_moderation(&mut tx, review_id, &payload, MODERATOR).await?;
        let locks = tx.exchange_locks;
        self.commit(tx);
        Ok((outcome, locks))
    }
}

fn set_to(status: ModerationStatus) -> ModerateReviewPayload {
    ModerateReviewPayload {
        moderation_status: Some(status),
        moderator_notes: None,
    }
}

struct MemTx {
    working: Db,
    fail_on_upsert: bool,
    exchange_locks: usize,
}

#[async_trait]
impl RatingStore for MemTx {
    async fn lock_exchange(&mut self, exchange_id: i32) -> Result<bool, AppError> {
        self.exchange_locks += 1;
        Ok(self.working.exchanges.contains_key(&exchange_id))
    }

    async fn load_category_snapshots(
        &mut self,
        exchange_id: i32,
    ) -> Result<Vec<CategoryRatingSnapshot>, AppError> {
        Ok(self
            .working
            .snapshots
            .values()
            .filter(|s| s.exchange_id == exchange_id)
            .cloned()
            .collect())
    }

    async fn load_approved_reviews(
        &mut self,
        exchange_id: i32,
    ) -> Result<Vec<ApprovedReview>, AppError> {
        let categories = &self.working.categories;
        Ok(self
            .working
            .reviews
            .iter()
            .filter(|r| r.exchange_id == exchange_id && r.status.is_approved())
            .map(|r| ApprovedReview {
                review_id: r.id,
                ratings: r
                    .ratings
                    .iter()
                    .map(|(category_id, value)| RatingEntry {
                        category_id: *category_id,
                        category_name: categories.get(category_id).cloned(),
                        value: *value,
                    })
                    .collect(),
            })
            .collect())
    }

    async fn write_exchange_summary(
        &mut self,
        exchange_id: i32,
        overall_average_rating: Decimal,
        total_review_count: i32,
    ) -> Result<(), AppError> {
        self.working
            .exchanges
            .insert(exchange_id, (overall_average_rating, total_review_count));
        Ok(())
    }

    async fn upsert_category_snapshot(
        &mut self,
        exchange_id: i32,
        category_id: i32,
        aggregate: &CategoryAggregate,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if self.fail_on_upsert {
            return Err(AppError::DatabaseError("connection reset".into()));
        }
        self.working.snapshots.insert(
            (exchange_id, category_id),
            CategoryRatingSnapshot {
                exchange_id,
                category_id,
                average_rating: aggregate.average_rating,
                review_count: aggregate.review_count,
                last_updated: Some(updated_at),
            },
        );
        Ok(())
    }

    async fn delete_category_snapshot(
        &mut self,
        exchange_id: i32,
        category_id: i32,
    ) -> Result<(), AppError> {
        self.working.snapshots.remove(&(exchange_id, category_id));
        Ok(())
    }
}

#[async_trait]
impl ModerationStore for MemTx {
    async fn lock_review(&mut self, review_id: i32) -> Result<Review, AppError> {
        self.working
            .review(review_id)
            .map(StoredReview::to_review)
            .ok_or_else(|| AppError::NotFound(format!("Review {} not found", review_id)))
    }

    async fn update_review_moderation(
        &mut self,
        review_id: i32,
        status: ModerationStatus,
        notes: Option<&str>,
        moderator_id: i32,
    ) -> Result<Review, AppError> {
        let review = self
            .working
            .reviews
            .iter_mut()
            .find(|r| r.id == review_id)
            .ok_or_else(|| AppError::NotFound(format!("Review {} not found", review_id)))?;
        review.status = status;
        if let Some(notes) = notes {
            review.notes = Some(notes.to_string());
        }
        review.moderated_by = Some(moderator_id);
        Ok(review.to_review())
    }

    async fn remove_review(&mut self, review_id: i32) -> Result<(), AppError> {
        self.working.reviews.retain(|r| r.id != review_id);
        Ok(())
    }

    async fn remove_rating_category(
        &mut self,
        category_id: i32,
    ) -> Result<Option<Vec<i32>>, AppError> {
        if self.working.categories.remove(&category_id).is_none() {
            return Ok(None);
        }

        let mut affected: Vec<i32> = self
            .working
            .reviews
            .iter()
            .filter(|r| r.status.is_approved() && r.ratings.iter().any(|(c, _)| *c == category_id))
            .map(|r| r.exchange_id)
            .collect();
        affected.sort_unstable();
        affected.dedup();

        // Mirror the ON DELETE CASCADE on ratings and snapshots
        for review in &mut self.working.reviews {
            review.ratings.retain(|(c, _)| *c != category_id);
        }
        self.working.snapshots.retain(|(_, c), _| *c != category_id);

        Ok(Some(affected))
    }
}

#[tokio::test]
async fn test_two_approved_reviews() {
    let mut db = Db::scenario();
    db.recalculate(EXCHANGE).await.unwrap();

    assert_eq!(db.summary(), (dec!(4.00), 2));

    let support = db.snapshot(SUPPORT).expect("support snapshot");
    assert_eq!(support.average_rating, dec!(4.50));
    assert_eq!(support.review_count, 2);

    let fees = db.snapshot(FEES).expect("fees snapshot");
    assert_eq!(fees.average_rating, dec!(3.00));
    assert_eq!(fees.review_count, 1);
}

#[tokio::test]
async fn test_rejecting_a_review_shrinks_aggregates() {
    let mut db = Db::scenario();
    db.recalculate(EXCHANGE).await.unwrap();

    db.set_status(2, ModerationStatus::Rejected);
    db.recalculate(EXCHANGE).await.unwrap();

    assert_eq!(db.summary(), (dec!(4.00), 1));

    let support = db.snapshot(SUPPORT).unwrap();
    assert_eq!(support.average_rating, dec!(5.00));
    assert_eq!(support.review_count, 1);

    let fees = db.snapshot(FEES).unwrap();
    assert_eq!(fees.average_rating, dec!(3.00));
    assert_eq!(fees.review_count, 1);
}

#[tokio::test]
async fn test_no_approved_reviews_clears_everything() {
    let mut db = Db::scenario();
    db.recalculate(EXCHANGE).await.unwrap();
    assert_eq!(db.snapshots.len(), 2);

    db.set_status(1, ModerationStatus::Pending);
    db.set_status(2, ModerationStatus::Rejected);
    db.recalculate(EXCHANGE).await.unwrap();

    let (overall, total) = db.summary();
    assert_eq!(overall.to_string(), "0.00");
    assert_eq!(total, 0);
    assert!(db.snapshots.is_empty());
}

#[tokio::test]
async fn test_deleted_category_is_skipped() {
    let mut db = Db::scenario();
    db.categories.remove(&FEES);

    let outcome = db.recalculate(EXCHANGE).await;
    assert!(outcome.is_ok());

    // Only the two Support ratings (5 and 4) remain
    assert_eq!(db.summary(), (dec!(4.50), 2));
    assert!(db.snapshot(FEES).is_none());
    assert_eq!(db.snapshot(SUPPORT).unwrap().review_count, 2);
}

#[tokio::test]
async fn test_category_without_contributions_is_deleted() {
    let mut db = Db::scenario();
    db.recalculate(EXCHANGE).await.unwrap();
    assert!(db.snapshot(FEES).is_some());

    db.set_status(1, ModerationStatus::Rejected);
    let outcome = db.recalculate(EXCHANGE).await.unwrap();

    assert!(db.snapshot(FEES).is_none());
    assert_eq!(db.snapshot(SUPPORT).unwrap().average_rating, dec!(4.00));
    match outcome {
        RecalculationOutcome::Updated {
            deleted_categories, ..
        } => assert_eq!(deleted_categories, vec![FEES]),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_recalculation_is_idempotent() {
    let mut db = Db::scenario();
    let first = db.recalculate(EXCHANGE).await.unwrap();
    let summary = db.summary();
    let snapshots: Vec<_> = db
        .snapshots
        .values()
        .map(|s| (s.category_id, s.average_rating, s.review_count))
        .collect();

    let second = db.recalculate(EXCHANGE).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(db.summary(), summary);
    let again: Vec<_> = db
        .snapshots
        .values()
        .map(|s| (s.category_id, s.average_rating, s.review_count))
        .collect();
    assert_eq!(again, snapshots);
}

#[tokio::test]
async fn test_pending_reviews_do_not_contribute() {
    let mut db = Db::scenario();
    db.add_review(3, ModerationStatus::Pending, &[(SUPPORT, 1), (FEES, 1)]);
    db.recalculate(EXCHANGE).await.unwrap();

    assert_eq!(db.summary(), (dec!(4.00), 2));
    assert_eq!(db.snapshot(SUPPORT).unwrap().review_count, 2);
}

#[tokio::test]
async fn test_unknown_exchange_is_a_no_op() {
    let mut db = Db::scenario();
    let before = db.snapshots.len();

    let outcome = db.recalculate(999).await.unwrap();

    assert_eq!(outcome, RecalculationOutcome::ExchangeNotFound);
    assert_eq!(db.snapshots.len(), before);
    assert_eq!(db.summary(), (Decimal::ZERO, 0));
}

#[tokio::test]
async fn test_failed_write_leaves_previous_state() {
    let mut db = Db::scenario();
    db.recalculate(EXCHANGE).await.unwrap();

    db.set_status(2, ModerationStatus::Rejected);
    let result = db.recalculate_with(EXCHANGE, true).await;

    assert!(matches!(result, Err(AppError::DatabaseError(_))));
    // Summary write happened inside the failed unit of work and was discarded
    assert_eq!(db.summary(), (dec!(4.00), 2));
    assert_eq!(db.snapshot(SUPPORT).unwrap().average_rating, dec!(4.50));
}

#[tokio::test]
async fn test_approving_a_pending_review_recalculates() {
    let mut db = Db::scenario();
    db.recalculate(EXCHANGE).await.unwrap();
    db.add_review(3, ModerationStatus::Pending, &[(SUPPORT, 3)]);

    let (outcome, locks) = db
        .moderate(3, set_to(ModerationStatus::Approved), false)
        .await
        .unwrap();

    assert_eq!(outcome.previous_status, ModerationStatus::Pending);
    assert_eq!(outcome.review.moderation_status, ModerationStatus::Approved);
    assert_eq!(outcome.review.moderated_by_user_id, Some(MODERATOR));
    assert!(matches!(
        outcome.recalculation,
        Some(RecalculationOutcome::Updated { .. })
    ));
    assert_eq!(locks, 1);

    // 5, 3, 4 and 3 across both categories
    assert_eq!(db.summary(), (dec!(3.75), 3));
    let support = db.snapshot(SUPPORT).unwrap();
    assert_eq!(support.average_rating, dec!(4.00));
    assert_eq!(support.review_count, 3);
}

#[tokio::test]
async fn test_notes_only_update_does_not_recalculate() {
    let mut db = Db::scenario();
    db.recalculate(EXCHANGE).await.unwrap();

    let payload = ModerateReviewPayload {
        moderation_status: None,
        moderator_notes: Some("Checked against KYC records".into()),
    };
    let (outcome, locks) = db.moderate(1, payload, false).await.unwrap();

    assert!(outcome.recalculation.is_none());
    assert_eq!(locks, 0);
    assert_eq!(outcome.review.moderation_status, ModerationStatus::Approved);

    let stored = db.review(1).unwrap();
    assert_eq!(stored.notes.as_deref(), Some("Checked against KYC records"));
    assert_eq!(stored.moderated_by, Some(MODERATOR));
    assert_eq!(db.summary(), (dec!(4.00), 2));
}

#[tokio::test]
async fn test_rejecting_a_pending_review_does_not_recalculate() {
    let mut db = Db::scenario();
    db.add_review(3, ModerationStatus::Pending, &[(SUPPORT, 1)]);

    let (outcome, locks) = db
        .moderate(3, set_to(ModerationStatus::Rejected), false)
        .await
        .unwrap();

    assert!(outcome.recalculation.is_none());
    assert_eq!(locks, 0);
    assert_eq!(db.review(3).unwrap().status, ModerationStatus::Rejected);
    // Summary was never computed, so it stays at the seeded zero
    assert_eq!(db.summary(), (Decimal::ZERO, 0));
}

#[tokio::test]
async fn test_same_status_without_notes_writes_nothing() {
    let mut db = Db::scenario();

    let (outcome, locks) = db
        .moderate(1, set_to(ModerationStatus::Approved), false)
        .await
        .unwrap();

    assert!(outcome.recalculation.is_none());
    assert_eq!(locks, 0);
    assert_eq!(db.review(1).unwrap().moderated_by, None);
}

#[tokio::test]
async fn test_empty_moderation_payload_is_rejected() {
    let mut db = Db::scenario();

    let result = db.moderate(1, ModerateReviewPayload::default(), false).await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn test_moderating_unknown_review_is_not_found() {
    let mut db = Db::scenario();

    let result = db.moderate(77, set_to(ModerationStatus::Approved), false).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_failed_recalculation_keeps_previous_status() {
    let mut db = Db::scenario();
    db.recalculate(EXCHANGE).await.unwrap();
    db.add_review(3, ModerationStatus::Pending, &[(SUPPORT, 1)]);

    let result = db.moderate(3, set_to(ModerationStatus::Approved), true).await;

    assert!(matches!(result, Err(AppError::DatabaseError(_))));
    assert_eq!(db.review(3).unwrap().status, ModerationStatus::Pending);
    assert_eq!(db.summary(), (dec!(4.00), 2));
}

#[tokio::test]
async fn test_deleting_an_approved_review_recalculates() {
    let mut db = Db::scenario();
    db.recalculate(EXCHANGE).await.unwrap();

    let mut tx = db.begin(false);
    let outcome = moderation::remove_review(&mut tx, 2).await.unwrap();
    db.commit(tx);

    assert!(outcome.is_some());
    assert!(db.review(2).is_none());
    assert_eq!(db.summary(), (dec!(4.00), 1));
    assert_eq!(db.snapshot(SUPPORT).unwrap().average_rating, dec!(5.00));
}

#[tokio::test]
async fn test_deleting_a_pending_review_leaves_aggregates() {
    let mut db = Db::scenario();
    db.recalculate(EXCHANGE).await.unwrap();
    db.add_review(3, ModerationStatus::Pending, &[(SUPPORT, 1)]);

    let mut tx = db.begin(false);
    let outcome = moderation::remove_review(&mut tx, 3).await.unwrap();
    let locks = tx.exchange_locks;
    db.commit(tx);

    assert!(outcome.is_none());
    assert_eq!(locks, 0);
    assert!(db.review(3).is_none());
    assert_eq!(db.summary(), (dec!(4.00), 2));
}

#[tokio::test]
async fn test_deleting_a_category_refreshes_affected_exchanges() {
    let mut db = Db::scenario();
    db.recalculate(EXCHANGE).await.unwrap();
    assert!(db.snapshot(FEES).is_some());

    let mut tx = db.begin(false);
    let outcomes = moderation::remove_rating_category(&mut tx, FEES)
        .await
        .unwrap();
    db.commit(tx);

    assert_eq!(outcomes.len(), 1);
    assert!(!db.categories.contains_key(&FEES));
    // Only the two Support ratings (5 and 4) remain
    assert_eq!(db.summary(), (dec!(4.50), 2));
    assert!(db.snapshot(FEES).is_none());
    assert_eq!(db.snapshot(SUPPORT).unwrap().average_rating, dec!(4.50));

    // What the aggregator reads next no longer mentions the category
    let mut tx = db.begin(false);
    let approved = tx.load_approved_reviews(EXCHANGE).await.unwrap();
    let categories: Vec<i32> = approved
        .iter()
        .flat_map(|r| r.ratings.iter().map(|rating| rating.category_id))
        .collect();
    assert_eq!(categories, vec![SUPPORT, SUPPORT]);
}

#[tokio::test]
async fn test_deleting_a_category_without_approved_ratings_skips_recalculation() {
    let mut db = Db::scenario();
    db.recalculate(EXCHANGE).await.unwrap();
    db.categories.insert(SECURITY, "Security".into());
    db.add_review(3, ModerationStatus::Pending, &[(SECURITY, 2)]);

    let mut tx = db.begin(false);
    let outcomes = moderation::remove_rating_category(&mut tx, SECURITY)
        .await
        .unwrap();
    let locks = tx.exchange_locks;
    db.commit(tx);

    assert!(outcomes.is_empty());
    assert_eq!(locks, 0);
    assert!(db.review(3).unwrap().ratings.is_empty());
    assert_eq!(db.summary(), (dec!(4.00), 2));
}

#[tokio::test]
async fn test_deleting_unknown_category_is_not_found() {
    let db = Db::scenario();

    let mut tx = db.begin(false);
    let result = moderation::remove_rating_category(&mut tx, 99).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}
