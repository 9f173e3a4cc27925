//! AI authoring helpers under `/ai`.
//!
//! Malformed bodies answer 406 `invalid data format`.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use blogmate::ai::{BlogDraft, BlogRecommendation, Validation};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;

type Body<T> = std::result::Result<Json<T>, JsonRejection>;

/// Rejection for AI request bodies.
pub struct InvalidData;

impl IntoResponse for InvalidData {
    fn into_response(self) -> Response {
        (
            StatusCode::NOT_ACCEPTABLE,
            Json(json!({ "error": "invalid data format" })),
        )
            .into_response()
    }
}

fn body<T>(payload: Body<T>) -> std::result::Result<T, InvalidData> {
    payload.map(|Json(value)| value).map_err(|_| InvalidData)
}

fn respond(result: ApiResult<Value>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

#[instrument(skip(state, payload))]
pub async fn recommend_blogs(State(state): State<AppState>, payload: Body<BlogDraft>) -> Response {
    let draft = match body(payload) {
        Ok(draft) => draft,
        Err(rejection) => return rejection.into_response(),
    };
    let result: ApiResult<Vec<BlogRecommendation>> =
        state.ai.recommend_blogs(&draft).await.map_err(ApiError::from);
    match result {
        Ok(blogs) => Json(blogs).into_response(),
        Err(err) => err.into_response(),
    }
}

#[instrument(skip(state, payload))]
pub async fn recommend_title(State(state): State<AppState>, payload: Body<BlogDraft>) -> Response {
    let draft = match body(payload) {
        Ok(draft) => draft,
        Err(rejection) => return rejection.into_response(),
    };
    respond(
        state
            .ai
            .recommend_title(&draft.content, &draft.tags)
            .await
            .map(|title| json!({ "titles": title }))
            .map_err(ApiError::from),
    )
}

#[instrument(skip(state, payload))]
pub async fn recommend_content(State(state): State<AppState>, payload: Body<BlogDraft>) -> Response {
    let draft = match body(payload) {
        Ok(draft) => draft,
        Err(rejection) => return rejection.into_response(),
    };
    respond(
        state
            .ai
            .recommend_content(&draft.title, &draft.tags)
            .await
            .map(|content| json!({ "contents": content }))
            .map_err(ApiError::from),
    )
}

#[instrument(skip(state, payload))]
pub async fn recommend_tags(State(state): State<AppState>, payload: Body<BlogDraft>) -> Response {
    let draft = match body(payload) {
        Ok(draft) => draft,
        Err(rejection) => return rejection.into_response(),
    };
    respond(
        state
            .ai
            .recommend_tags(&draft.title, &draft.content)
            .await
            .map(|tags| json!({ "tags": tags }))
            .map_err(ApiError::from),
    )
}

#[instrument(skip(state, payload))]
pub async fn summarize(State(state): State<AppState>, payload: Body<BlogDraft>) -> Response {
    let draft = match body(payload) {
        Ok(draft) => draft,
        Err(rejection) => return rejection.into_response(),
    };
    respond(
        state
            .ai
            .summarize(&draft)
            .await
            .map(|summary| json!({ "summary": summary }))
            .map_err(ApiError::from),
    )
}

#[instrument(skip(state, payload))]
pub async fn refine(State(state): State<AppState>, payload: Body<ContentRequest>) -> Response {
    let request = match body(payload) {
        Ok(request) => request,
        Err(rejection) => return rejection.into_response(),
    };
    respond(
        state
            .ai
            .refine(&request.content)
            .await
            .map(|refined| json!({ "refined": refined }))
            .map_err(ApiError::from),
    )
}

#[instrument(skip(state, payload))]
pub async fn validate(State(state): State<AppState>, payload: Body<ContentRequest>) -> Response {
    let request = match body(payload) {
        Ok(request) => request,
        Err(rejection) => return rejection.into_response(),
    };
    let result: ApiResult<Validation> = state
        .ai
        .validate(&request.content)
        .await
        .map_err(ApiError::from);
    match result {
        Ok(validation) => Json(validation).into_response(),
        Err(err) => err.into_response(),
    }
}

#[instrument(skip(state, payload))]
pub async fn chat(State(state): State<AppState>, payload: Body<ChatRequest>) -> Response {
    let request = match body(payload) {
        Ok(request) => request,
        Err(rejection) => return rejection.into_response(),
    };
    respond(
        state
            .ai
            .chat(&request.message)
            .await
            .map(|response| json!({ "response": response }))
            .map_err(ApiError::from),
    )
}
