use sqlx::PgPool;

use crate::{
    db::rating_category::{
        CATEGORY_NAME_CONSTRAINT, DUPLICATE_CATEGORY_MESSAGE, get::category_name_taken,
    },
    errors::AppError,
    models::rating_category::{NewRatingCategory, RatingCategory},
};

pub const MIN_CATEGORY_NAME_CHARS: usize = 3;
pub const MAX_CATEGORY_NAME_CHARS: usize = 100;
pub const MAX_CATEGORY_DESCRIPTION_CHARS: usize = 500;

pub fn validate_category_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    let len = name.chars().count();
    if !(MIN_CATEGORY_NAME_CHARS..=MAX_CATEGORY_NAME_CHARS).contains(&len) {
        return Err(AppError::BadRequest(format!(
            "Category name must be between {} and {} characters",
            MIN_CATEGORY_NAME_CHARS, MAX_CATEGORY_NAME_CHARS
        )));
    }
    Ok(name.to_string())
}

pub fn validate_category_description(description: &str) -> Result<(), AppError> {
    if description.chars().count() > MAX_CATEGORY_DESCRIPTION_CHARS {
        return Err(AppError::BadRequest(format!(
            "Category description must be at most {} characters",
            MAX_CATEGORY_DESCRIPTION_CHARS
        )));
    }
    Ok(())
}

pub async fn create_rating_category(
    category: NewRatingCategory,
    postgres: PgPool,
) -> Result<RatingCategory, AppError> {
    let name = validate_category_name(&category.name)?;
    if let Some(description) = &category.description {
        validate_category_description(description)?;
    }

    let mut conn = postgres
        .acquire()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to acquire connection: {}", e)))?;

    if category_name_taken(&name, None, &mut conn).await? {
        return Err(AppError::Conflict(DUPLICATE_CATEGORY_MESSAGE.into()));
    }

    let created = sqlx::query_as::<_, RatingCategory>(
        "INSERT INTO rating_categories (name, description)
        VALUES ($1, $2)
        RETURNING id, name, description",
    )
    .bind(&name)
    .bind(category.description.as_deref())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        AppError::from_write(
            e,
            CATEGORY_NAME_CONSTRAINT,
            DUPLICATE_CATEGORY_MESSAGE,
            "Failed to create rating category",
        )
    })?;

    tracing::info!("Created rating category {} ({})", created.id, created.name);

    Ok(created)
}
