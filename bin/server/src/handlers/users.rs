//! Account endpoints under `/users`.

use super::{message, parse_id, MessageResponse, PageQuery};
use crate::auth::{AuthUser, TokenKind, TokenPair};
use crate::error::ApiResult;
use crate::mail::LinkEmail;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use blogmate::ownership::Role;
use blogmate::users::{NewAccount, UserLookup, UserProfile};
use blogmate::BlogError;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

type Body<T> = std::result::Result<Json<T>, JsonRejection>;

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserProfile,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeEmailRequest {
    pub email: String,
}

async fn deliver(state: &AppState, email: LinkEmail) {
    if let Err(e) = state.mailer.send(&email).await {
        warn!(to = %email.to, "Failed to send account email: {}", e);
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Body<NewAccount>,
) -> ApiResult<Json<RegisterResponse>> {
    let Json(account) = payload?;
    let registration = state.users.run(move |users| users.register(account)).await?;

    deliver(
        &state,
        LinkEmail::verification(
            &registration.user.email,
            &state.public_url,
            &registration.verification_token,
        ),
    )
    .await;
    Ok(Json(RegisterResponse {
        message: "Registered; check your email to verify the account".into(),
        user: registration.user.profile(),
    }))
}

#[instrument(skip(state, query))]
pub async fn verify_account(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .users
        .run(move |users| users.verify_account(&query.token))
        .await?;
    Ok(message("Account verified"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Body<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = payload?;
    let user = state
        .users
        .run(move |users| users.login(&request.identifier, &request.password))
        .await?;
    let tokens = state.tokens.issue(&user)?;
    info!(user = %user.user_id, "Logged in");
    Ok(Json(LoginResponse {
        tokens,
        user: user.profile(),
    }))
}

#[instrument(skip(state))]
pub async fn forget_password(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Json<MessageResponse>> {
    let (user, token) = state
        .users
        .run(move |users| users.forget_password(&query.email))
        .await?;
    deliver(
        &state,
        LinkEmail::password_reset(&user.email, &state.public_url, &token),
    )
    .await;
    Ok(message("Password reset email sent"))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    payload: Body<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = payload?;
    state
        .users
        .run(move |users| users.reset_password(&request.token, &request.password))
        .await?;
    Ok(message("Password reset"))
}

/// Tokens are stateless; the client discards them.
pub async fn logout() -> Json<MessageResponse> {
    message("Logged out")
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Body<RefreshRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user_id = parse_id(&user_id)?;
    let Json(request) = payload?;
    let claims = state.tokens.verify(&request.refresh_token, TokenKind::Refresh)?;
    if claims.sub != user_id.to_hex() {
        return Err(BlogError::InvalidToken.into());
    }

    // Re-read the account so role changes since login take effect.
    let user = state.users.run(move |users| users.get_user(&user_id)).await?;
    Ok(Json(LoginResponse {
        tokens: state.tokens.issue(&user)?,
        user: user.profile(),
    }))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Vec<UserProfile>>> {
    let page = page.pagination();
    let users = state.users.run(move |users| users.list_users(page)).await?;
    Ok(Json(users.iter().map(|u| u.profile()).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    let user_id = parse_id(&user_id)?;
    let user = state.users.run(move |users| users.get_user(&user_id)).await?;
    Ok(Json(user.profile()))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    payload: Body<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = payload?;
    state
        .users
        .run(move |users| {
            users.change_password(&caller.user_id, &request.old_password, &request.new_password)
        })
        .await?;
    Ok(message("Password changed"))
}

#[instrument(skip(state, payload))]
pub async fn change_email(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    payload: Body<ChangeEmailRequest>,
) -> ApiResult<Json<UserProfile>> {
    let Json(request) = payload?;
    let user = state
        .users
        .run(move |users| users.change_email(&caller.user_id, &request.email))
        .await?;
    Ok(Json(user.profile()))
}

async fn set_role(
    state: &AppState,
    caller: blogmate::ownership::Caller,
    target: UserLookup,
    role: Role,
) -> ApiResult<Json<UserProfile>> {
    let user = state
        .users
        .run(move |users| users.set_role(&caller, &target, role))
        .await?;
    Ok(Json(user.profile()))
}

#[instrument(skip(state))]
pub async fn promote(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(username): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    set_role(&state, caller, UserLookup::Username(username), Role::Admin).await
}

#[instrument(skip(state))]
pub async fn demote(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(username): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    set_role(&state, caller, UserLookup::Username(username), Role::User).await
}

#[instrument(skip(state))]
pub async fn promote_by_email(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(email): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    set_role(&state, caller, UserLookup::Email(email), Role::Admin).await
}

#[instrument(skip(state))]
pub async fn demote_by_email(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(email): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    set_role(&state, caller, UserLookup::Email(email), Role::User).await
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let user_id = parse_id(&user_id)?;
    state
        .users
        .run(move |users| users.delete_user(&caller, &user_id))
        .await?;
    Ok(message("User deleted"))
}
