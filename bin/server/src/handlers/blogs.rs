//! Blog endpoints.

use super::{message, parse_id, views, BlogView, MessageResponse, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use blogmate::content::{BlogFilter, BlogPatch, EntityRef, NewBlog};
use blogmate::interaction::Action;
use blogmate::{BlogError, EntityId, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};

#[instrument(skip(state, payload))]
pub async fn create_blog(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    payload: std::result::Result<Json<NewBlog>, JsonRejection>,
) -> ApiResult<Json<BlogView>> {
    let Json(new) = payload?;
    let blog = state
        .content
        .run(move |store| store.create_blog(&caller, new))
        .await?;
    info!(blog = %blog.blog_id, "Blog created");
    Ok(Json(blog.into()))
}

#[instrument(skip(state))]
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Vec<BlogView>>> {
    let page = page.pagination();
    let blogs = state.content.run(move |store| store.list_blogs(page)).await?;
    Ok(Json(views(blogs)))
}

#[instrument(skip(state))]
pub async fn popular_blogs(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Vec<BlogView>>> {
    let page = page.explicit();
    let blogs = state.content.run(move |store| store.popular_blogs(page)).await?;
    Ok(Json(views(blogs)))
}

/// JSON filter body; ids are hex strings, dates RFC 3339.
#[derive(Debug, Default, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub blog_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FilterRequest {
    fn into_filter(self) -> Result<BlogFilter> {
        let id = |raw: Option<String>| -> Result<Option<EntityId>> {
            raw.filter(|r| !r.trim().is_empty())
                .map(|r| EntityId::parse(r.trim()))
                .transpose()
        };
        Ok(BlogFilter {
            blog_id: id(self.blog_id)?,
            title: self.title.filter(|t| !t.is_empty()),
            author_id: id(self.author_id)?,
            created_at: self.created_at,
            tags: self
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        })
    }
}

/// Served on both GET and POST; an empty body matches every blog.
#[instrument(skip(state, body))]
pub async fn filter_blogs(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    body: Bytes,
) -> ApiResult<Json<Vec<BlogView>>> {
    let request: FilterRequest = if body.iter().all(u8::is_ascii_whitespace) {
        FilterRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| BlogError::validation(e.to_string()))?
    };
    let filter = request.into_filter()?;
    let page = page.pagination();
    let blogs = state
        .content
        .run(move |store| store.query_blogs(&filter, page))
        .await?;
    Ok(Json(views(blogs)))
}

#[instrument(skip(state))]
pub async fn get_blog(
    State(state): State<AppState>,
    Path(blog_id): Path<String>,
) -> ApiResult<Json<BlogView>> {
    let blog_id = parse_id(&blog_id)?;
    let blog = state.content.run(move |store| store.get_blog(&blog_id)).await?;
    Ok(Json(blog.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_blog(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(blog_id): Path<String>,
    payload: std::result::Result<Json<BlogPatch>, JsonRejection>,
) -> ApiResult<Json<BlogView>> {
    let blog_id = parse_id(&blog_id)?;
    let Json(patch) = payload?;
    let blog = state
        .content
        .run(move |store| store.update_blog(&caller, &blog_id, patch))
        .await?;
    Ok(Json(blog.into()))
}

#[instrument(skip(state))]
pub async fn delete_blog(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(blog_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let blog_id = parse_id(&blog_id)?;
    state
        .content
        .run(move |store| store.delete_blog(&caller, &blog_id))
        .await?;
    Ok(message("Blog deleted"))
}

#[instrument(skip(state))]
pub async fn interact_blog(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path((blog_id, action)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    let target = EntityRef::Blog {
        blog_id: parse_id(&blog_id)?,
    };
    interact(&state, target, caller.user_id, &action).await
}

/// Shared by the blog, comment and reply interaction routes.
pub(crate) async fn interact(
    state: &AppState,
    target: EntityRef,
    user_id: EntityId,
    action: &str,
) -> ApiResult<Json<MessageResponse>> {
    let action: Action = action.parse()?;
    let outcome = state
        .content
        .run(move |store| store.interact(target, &user_id, action))
        .await?;
    Ok(message(outcome.message()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_request_conversion() {
        let id = EntityId::new();
        let request = FilterRequest {
            author_id: Some(id.to_hex()),
            tags: vec![" rust ".into(), "".into()],
            ..Default::default()
        };
        let filter = request.into_filter().unwrap();
        assert_eq!(filter.author_id, Some(id));
        assert_eq!(filter.tags.len(), 1);
        assert!(filter.tags.contains("rust"));
    }

    #[test]
    fn test_filter_request_rejects_bad_id() {
        let request = FilterRequest {
            blog_id: Some("not-an-id".into()),
            ..Default::default()
        };
        assert!(matches!(request.into_filter(), Err(BlogError::InvalidId(_))));
    }
}
