pub mod exchange;
pub mod rating_category;
pub mod rating_store;
pub mod review;

pub use rating_store::PgRatingStore;
