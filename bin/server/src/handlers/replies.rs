//! Reply endpoints, nested under `/blogs/{blog_id}/comments/{comment_id}/replies`.

use super::blogs::interact;
use super::{message, parse_id, views, MessageResponse, NewText, PageQuery, ReplyView};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use blogmate::content::{ContentPatch, EntityRef};
use tracing::instrument;

#[instrument(skip(state, payload))]
pub async fn create_reply(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path((blog_id, comment_id)): Path<(String, String)>,
    payload: std::result::Result<Json<NewText>, JsonRejection>,
) -> ApiResult<Json<ReplyView>> {
    let blog_id = parse_id(&blog_id)?;
    let comment_id = parse_id(&comment_id)?;
    let Json(body) = payload?;
    let reply = state
        .content
        .run(move |store| store.create_reply(&caller, &blog_id, &comment_id, &body.content))
        .await?;
    Ok(Json(reply.into()))
}

#[instrument(skip(state))]
pub async fn list_replies(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path((blog_id, comment_id)): Path<(String, String)>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Vec<ReplyView>>> {
    let blog_id = parse_id(&blog_id)?;
    let comment_id = parse_id(&comment_id)?;
    let page = page.pagination();
    let replies = state
        .content
        .run(move |store| store.list_replies(&blog_id, &comment_id, page))
        .await?;
    Ok(Json(views(replies)))
}

#[instrument(skip(state))]
pub async fn get_reply(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path((blog_id, comment_id, reply_id)): Path<(String, String, String)>,
) -> ApiResult<Json<ReplyView>> {
    let blog_id = parse_id(&blog_id)?;
    let comment_id = parse_id(&comment_id)?;
    let reply_id = parse_id(&reply_id)?;
    let reply = state
        .content
        .run(move |store| store.get_reply(&blog_id, &comment_id, &reply_id))
        .await?;
    Ok(Json(reply.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_reply(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path((blog_id, comment_id, reply_id)): Path<(String, String, String)>,
    payload: std::result::Result<Json<ContentPatch>, JsonRejection>,
) -> ApiResult<Json<ReplyView>> {
    let blog_id = parse_id(&blog_id)?;
    let comment_id = parse_id(&comment_id)?;
    let reply_id = parse_id(&reply_id)?;
    let Json(patch) = payload?;
    let reply = state
        .content
        .run(move |store| store.update_reply(&caller, &blog_id, &comment_id, &reply_id, patch))
        .await?;
    Ok(Json(reply.into()))
}

#[instrument(skip(state))]
pub async fn delete_reply(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path((blog_id, comment_id, reply_id)): Path<(String, String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    let blog_id = parse_id(&blog_id)?;
    let comment_id = parse_id(&comment_id)?;
    let reply_id = parse_id(&reply_id)?;
    state
        .content
        .run(move |store| store.delete_reply(&caller, &blog_id, &comment_id, &reply_id))
        .await?;
    Ok(message("Reply deleted"))
}

#[instrument(skip(state))]
pub async fn interact_reply(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path((blog_id, comment_id, reply_id, action)): Path<(String, String, String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    let target = EntityRef::Reply {
        blog_id: parse_id(&blog_id)?,
        comment_id: parse_id(&comment_id)?,
        reply_id: parse_id(&reply_id)?,
    };
    interact(&state, target, caller.user_id, &action).await
}
