use sqlx::PgPool;

use crate::{
    db::rating_category::{
        CATEGORY_NAME_CONSTRAINT, DUPLICATE_CATEGORY_MESSAGE,
        get::category_name_taken,
        post::{validate_category_description, validate_category_name},
    },
    errors::AppError,
    models::rating_category::{RatingCategory, UpdateRatingCategory},
};

pub fn validate_category_update(
    update: &UpdateRatingCategory,
) -> Result<Option<String>, AppError> {
    if update.name.is_none() && update.description.is_none() {
        return Err(AppError::BadRequest("No category fields provided".into()));
    }

    let name = update.name.as_deref().map(validate_category_name).transpose()?;
    if let Some(description) = &update.description {
        validate_category_description(description)?;
    }

    Ok(name)
}

pub async fn update_rating_category(
    category_id: i32,
    update: UpdateRatingCategory,
    postgres: PgPool,
) -> Result<RatingCategory, AppError> {
    let name = validate_category_update(&update)?;

    let mut conn = postgres
        .acquire()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to acquire connection: {}", e)))?;

    // A rename may not collide with another category
    if let Some(name) = &name {
        if category_name_taken(name, Some(category_id), &mut conn).await? {
            return Err(AppError::Conflict(DUPLICATE_CATEGORY_MESSAGE.into()));
        }
    }

    let updated = sqlx::query_as::<_, RatingCategory>(
        "UPDATE rating_categories
        SET name = COALESCE($2, name),
            description = COALESCE($3, description)
        WHERE id = $1
        RETURNING id, name, description",
    )
    .bind(category_id)
    .bind(name.as_deref())
    .bind(update.description.as_deref())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| {
        AppError::from_write(
            e,
            CATEGORY_NAME_CONSTRAINT,
            DUPLICATE_CATEGORY_MESSAGE,
            "Failed to update rating category",
        )
    })?
    .ok_or_else(|| AppError::NotFound(format!("Rating category {} not found", category_id)))?;

    Ok(updated)
}
