use sqlx::{PgConnection, PgPool};

use crate::{errors::AppError, models::rating_category::RatingCategory};

pub async fn get_all_rating_categories(postgres: PgPool) -> Result<Vec<RatingCategory>, AppError> {
    sqlx::query_as::<_, RatingCategory>(
        "SELECT id, name, description FROM rating_categories ORDER BY id",
    )
    .fetch_all(&postgres)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to fetch rating categories: {}", e)))
}

pub async fn get_rating_category_by_id(
    category_id: i32,
    postgres: &PgPool,
) -> Result<RatingCategory, AppError> {
    sqlx::query_as::<_, RatingCategory>(
        "SELECT id, name, description FROM rating_categories WHERE id = $1",
    )
    .bind(category_id)
    .fetch_optional(postgres)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to fetch rating category: {}", e)))?
    .ok_or_else(|| AppError::NotFound(format!("Rating category {} not found", category_id)))
}

// Case-insensitive, optionally ignoring one id so a rename to itself passes
pub(crate) async fn category_name_taken(
    name: &str,
    except_id: Option<i32>,
    conn: &mut PgConnection,
) -> Result<bool, AppError> {
    let existing = sqlx::query_scalar::<_, i32>(
        "SELECT id FROM rating_categories
        WHERE LOWER(name) = LOWER($1) AND ($2::INTEGER IS NULL OR id <> $2)",
    )
    .bind(name)
    .bind(except_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to check category name: {}", e)))?;

    Ok(existing.is_some())
}
