//! Comment endpoints, nested under `/blogs/{blog_id}/comments`.

use super::blogs::interact;
use super::{message, parse_id, views, CommentView, MessageResponse, NewText, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use blogmate::content::{ContentPatch, EntityRef};
use tracing::instrument;

#[instrument(skip(state, payload))]
pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(blog_id): Path<String>,
    payload: std::result::Result<Json<NewText>, JsonRejection>,
) -> ApiResult<Json<CommentView>> {
    let blog_id = parse_id(&blog_id)?;
    let Json(body) = payload?;
    let comment = state
        .content
        .run(move |store| store.create_comment(&caller, &blog_id, &body.content))
        .await?;
    Ok(Json(comment.into()))
}

#[instrument(skip(state))]
pub async fn list_comments(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(blog_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Vec<CommentView>>> {
    let blog_id = parse_id(&blog_id)?;
    let page = page.pagination();
    let comments = state
        .content
        .run(move |store| store.list_comments(&blog_id, page))
        .await?;
    Ok(Json(views(comments)))
}

#[instrument(skip(state))]
pub async fn get_comment(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path((blog_id, comment_id)): Path<(String, String)>,
) -> ApiResult<Json<CommentView>> {
    let blog_id = parse_id(&blog_id)?;
    let comment_id = parse_id(&comment_id)?;
    let comment = state
        .content
        .run(move |store| store.get_comment(&blog_id, &comment_id))
        .await?;
    Ok(Json(comment.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path((blog_id, comment_id)): Path<(String, String)>,
    payload: std::result::Result<Json<ContentPatch>, JsonRejection>,
) -> ApiResult<Json<CommentView>> {
    let blog_id = parse_id(&blog_id)?;
    let comment_id = parse_id(&comment_id)?;
    let Json(patch) = payload?;
    let comment = state
        .content
        .run(move |store| store.update_comment(&caller, &blog_id, &comment_id, patch))
        .await?;
    Ok(Json(comment.into()))
}

#[instrument(skip(state))]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path((blog_id, comment_id)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    let blog_id = parse_id(&blog_id)?;
    let comment_id = parse_id(&comment_id)?;
    state
        .content
        .run(move |store| store.delete_comment(&caller, &blog_id, &comment_id))
        .await?;
    Ok(message("Comment deleted"))
}

#[instrument(skip(state))]
pub async fn interact_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path((blog_id, comment_id, action)): Path<(String, String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    let target = EntityRef::Comment {
        blog_id: parse_id(&blog_id)?,
        comment_id: parse_id(&comment_id)?,
    };
    interact(&state, target, caller.user_id, &action).await
}
