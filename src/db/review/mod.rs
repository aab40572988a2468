pub mod delete;
pub mod get;
pub mod patch;
pub mod post;

pub(crate) const REVIEW_COLUMNS: &str = "id, exchange_id, user_id, comment, moderation_status, \
    moderator_notes, moderated_by_user_id, moderated_at, useful_votes_count, \
    not_useful_votes_count, created_at, updated_at";
