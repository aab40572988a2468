use axum::{
    Json, Router,
    routing::{delete, get, patch, post},
};
use serde_json::json;

use crate::{
    http::handlers::{
        create_rating_category_handler, create_review_handler, delete_rating_category_handler,
        delete_review_handler, get_exchange_ratings_handler, get_rating_categories_handler,
        get_rating_category_handler, list_exchange_reviews_handler, moderate_review_handler,
        recalculate_all_handler, recalculate_exchange_handler, update_rating_category_handler,
        vote_review_handler,
    },
    state::AppState,
};

pub fn create_http_routes(state: AppState) -> Router {
    let admin = Router::new()
        .route("/reviews/{review_id}/moderate", patch(moderate_review_handler))
        .route("/reviews/{review_id}", delete(delete_review_handler))
        .route("/rating-categories", post(create_rating_category_handler))
        .route(
            "/rating-categories/{category_id}",
            get(get_rating_category_handler)
                .patch(update_rating_category_handler)
                .delete(delete_rating_category_handler),
        )
        .route("/exchanges/recalculate", post(recalculate_all_handler))
        .route(
            "/exchanges/{exchange_id}/recalculate",
            post(recalculate_exchange_handler),
        );

    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/rating-categories", get(get_rating_categories_handler))
        .route(
            "/exchanges/{exchange_id}/ratings",
            get(get_exchange_ratings_handler),
        )
        .route(
            "/exchanges/{exchange_id}/reviews",
            get(list_exchange_reviews_handler).post(create_review_handler),
        )
        .route("/reviews/{review_id}/vote", post(vote_review_handler))
        .nest("/admin", admin)
        .with_state(state)
}
