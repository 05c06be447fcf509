//! # Forum Handlers
//!
//! This module coordinates the flow between HTTP requests and the services.
//! Handlers decode the request, call exactly one service operation and pick
//! the status code; all business rules live in `services`.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::{
    Ballot, Insertion, NewForum, NewPost, NewThread, PostUpdate, ThreadRef, ThreadUpdate,
    UserProfile, UserUpdate,
};
use services::Services;

use crate::error::ApiError;
use crate::query::{PostsQuery, RelatedQuery, ThreadsQuery, UsersQuery};

/// State shared across all request workers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self {
            services: Arc::new(services),
        }
    }
}

/// JSON body whose decoding failures answer 400 with an error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

type ApiResult = Result<Response, ApiError>;

/// 201 with the new entity, or 409 with whatever blocked the insert.
fn inserted<T, E>(insertion: Insertion<T, E>) -> Response
where
    T: serde::Serialize,
    E: serde::Serialize,
{
    match insertion {
        Insertion::Created(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Insertion::Existing(existing) => (StatusCode::CONFLICT, Json(existing)).into_response(),
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

pub async fn create_user(
    State(state): State<AppState>,
    ApiPath(nickname): ApiPath<String>,
    ApiJson(profile): ApiJson<UserProfile>,
) -> ApiResult {
    let insertion = state.services.users.create(&nickname, profile).await?;
    Ok(inserted(insertion))
}

pub async fn user_profile(
    State(state): State<AppState>,
    ApiPath(nickname): ApiPath<String>,
) -> ApiResult {
    let user = state.services.users.profile(&nickname).await?;
    Ok(Json(user).into_response())
}

pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(nickname): ApiPath<String>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> ApiResult {
    let user = state.services.users.update(&nickname, &update).await?;
    Ok(Json(user).into_response())
}

// ── Forums ───────────────────────────────────────────────────────────────────

pub async fn create_forum(
    State(state): State<AppState>,
    ApiJson(forum): ApiJson<NewForum>,
) -> ApiResult {
    let insertion = state.services.forums.create(forum).await?;
    Ok(inserted(insertion))
}

pub async fn forum_details(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult {
    let forum = state.services.forums.details(&slug).await?;
    Ok(Json(forum).into_response())
}

pub async fn create_thread(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
    ApiJson(thread): ApiJson<NewThread>,
) -> ApiResult {
    let insertion = state.services.forums.create_thread(&slug, thread).await?;
    Ok(inserted(insertion))
}

pub async fn forum_threads(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
    ApiQuery(query): ApiQuery<ThreadsQuery>,
) -> ApiResult {
    let threads = state.services.forums.threads(&slug, &query.into()).await?;
    Ok(Json(threads).into_response())
}

pub async fn forum_users(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
    ApiQuery(query): ApiQuery<UsersQuery>,
) -> ApiResult {
    let users = state.services.forums.members(&slug, &query.into()).await?;
    Ok(Json(users).into_response())
}

// ── Threads ──────────────────────────────────────────────────────────────────

/// Creates a batch of posts; the whole batch is rejected on any failure.
pub async fn create_posts(
    State(state): State<AppState>,
    ApiPath(thread): ApiPath<String>,
    ApiJson(batch): ApiJson<Vec<NewPost>>,
) -> ApiResult {
    let posts = state
        .services
        .posts
        .create_posts(&ThreadRef::new(thread), batch)
        .await?;
    Ok((StatusCode::CREATED, Json(posts)).into_response())
}

pub async fn thread_details(
    State(state): State<AppState>,
    ApiPath(thread): ApiPath<String>,
) -> ApiResult {
    let thread = state.services.threads.details(&ThreadRef::new(thread)).await?;
    Ok(Json(thread).into_response())
}

pub async fn update_thread(
    State(state): State<AppState>,
    ApiPath(thread): ApiPath<String>,
    ApiJson(update): ApiJson<ThreadUpdate>,
) -> ApiResult {
    let thread = state
        .services
        .threads
        .update(&ThreadRef::new(thread), &update)
        .await?;
    Ok(Json(thread).into_response())
}

pub async fn thread_posts(
    State(state): State<AppState>,
    ApiPath(thread): ApiPath<String>,
    ApiQuery(query): ApiQuery<PostsQuery>,
) -> ApiResult {
    let posts = state
        .services
        .posts
        .list(&ThreadRef::new(thread), &query.into())
        .await?;
    Ok(Json(posts).into_response())
}

pub async fn vote(
    State(state): State<AppState>,
    ApiPath(thread): ApiPath<String>,
    ApiJson(ballot): ApiJson<Ballot>,
) -> ApiResult {
    let thread = state
        .services
        .votes
        .cast(&ThreadRef::new(thread), &ballot)
        .await?;
    Ok(Json(thread).into_response())
}

// ── Posts ────────────────────────────────────────────────────────────────────

pub async fn post_details(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<RelatedQuery>,
) -> ApiResult {
    let details = state
        .services
        .posts
        .details(id, &query.relations())
        .await?;
    Ok(Json(details).into_response())
}

pub async fn update_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<PostUpdate>,
) -> ApiResult {
    let post = state.services.posts.update(id, &update).await?;
    Ok(Json(post).into_response())
}

// ── Service ──────────────────────────────────────────────────────────────────

pub async fn status(State(state): State<AppState>) -> ApiResult {
    let status = state.services.status.status().await?;
    Ok(Json(status).into_response())
}

pub async fn clear(State(state): State<AppState>) -> ApiResult {
    state.services.status.clear().await?;
    Ok(StatusCode::OK.into_response())
}
