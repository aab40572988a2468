pub mod delete;
pub mod get;
pub mod patch;
pub mod post;

pub(crate) const CATEGORY_NAME_CONSTRAINT: &str = "uk_rating_category_name";
pub(crate) const DUPLICATE_CATEGORY_MESSAGE: &str = "A rating category with this name already exists";
