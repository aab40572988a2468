pub mod exchange;
pub mod rating;
pub mod rating_category;
pub mod review;
pub mod user;

pub use user::Claims;
