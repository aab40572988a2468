pub mod admin;
pub mod exchange;
pub mod rating_category;
pub mod review;

pub use admin::{
    delete_review_handler, moderate_review_handler, recalculate_all_handler,
    recalculate_exchange_handler,
};
pub use exchange::{get_exchange_ratings_handler, list_exchange_reviews_handler};
pub use rating_category::{
    create_rating_category_handler, delete_rating_category_handler, get_rating_categories_handler,
    get_rating_category_handler, update_rating_category_handler,
};
pub use review::{create_review_handler, vote_review_handler};
