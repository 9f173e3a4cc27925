//! Route table.
//!
//! Reads and writes sit behind separate rate limit layers, merged per path
//! the same way for every resource.

use crate::handlers::{ai, blogs, comments, replies, users};
use crate::rate_limit::RateLimitLayer;
use crate::state::AppState;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

const BLOG: &str = "/blogs/:blog_id";
const COMMENTS: &str = "/blogs/:blog_id/comments";
const COMMENT: &str = "/blogs/:blog_id/comments/:comment_id";
const REPLIES: &str = "/blogs/:blog_id/comments/:comment_id/replies";
const REPLY: &str = "/blogs/:blog_id/comments/:comment_id/replies/:reply_id";

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": blogmate::VERSION }))
}

async fn no_route() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "no such route" })))
}

fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/blogs", get(blogs::list_blogs))
        .route("/blogs/popular", get(blogs::popular_blogs))
        .route("/blogs/filter", get(blogs::filter_blogs).post(blogs::filter_blogs))
        .route(BLOG, get(blogs::get_blog))
        .route(COMMENTS, get(comments::list_comments))
        .route(COMMENT, get(comments::get_comment))
        .route(REPLIES, get(replies::list_replies))
        .route(REPLY, get(replies::get_reply))
        .route("/users", get(users::list_users))
        .route("/users/", get(users::list_users))
        .route("/users/accountVerification", get(users::verify_account))
        .route("/users/forgetPassword", get(users::forget_password))
        .route("/users/logout", get(users::logout))
        .route("/users/:id", get(users::get_user))
}

fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/blogs", post(blogs::create_blog))
        .route(BLOG, patch(blogs::update_blog).delete(blogs::delete_blog))
        .route("/blogs/:blog_id/interact/:action", post(blogs::interact_blog))
        .route(COMMENTS, post(comments::create_comment))
        .route(
            COMMENT,
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        .route(
            "/blogs/:blog_id/comments/:comment_id/interact/:action",
            post(comments::interact_comment),
        )
        .route(REPLIES, post(replies::create_reply))
        .route(
            REPLY,
            patch(replies::update_reply).delete(replies::delete_reply),
        )
        .route(
            "/blogs/:blog_id/comments/:comment_id/replies/:reply_id/interact/:action",
            post(replies::interact_reply),
        )
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/resetPassword", post(users::reset_password))
        .route("/users/changePassword", put(users::change_password))
        .route("/users/changeEmail", put(users::change_email))
        .route("/users/promote/:username", patch(users::promote))
        .route("/users/demote/:username", patch(users::demote))
        .route("/users/promotebyemail/:email", patch(users::promote_by_email))
        .route("/users/demotebyemail/:email", patch(users::demote_by_email))
        .route("/users/:id/refresh", post(users::refresh))
        .route("/users/:id", delete(users::delete_user))
        .route("/ai/recommend", post(ai::recommend_blogs))
        .route("/ai/recommendTitle", post(ai::recommend_title))
        .route("/ai/recommendContent", post(ai::recommend_content))
        .route("/ai/recommendTags", post(ai::recommend_tags))
        .route("/ai/summarize", post(ai::summarize))
        .route("/ai/refine", post(ai::refine))
        .route("/ai/validate", post(ai::validate))
        .route("/ai/chat", post(ai::chat))
}

/// Builds the full application.
pub fn router(state: AppState, trust_proxy_headers: bool) -> Router {
    let reads = read_routes().layer(RateLimitLayer::for_reads(trust_proxy_headers));
    let writes = write_routes().layer(RateLimitLayer::for_writes(trust_proxy_headers));

    Router::new()
        .merge(reads)
        .merge(writes)
        .fallback(no_route)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
