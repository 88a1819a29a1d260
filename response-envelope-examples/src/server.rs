//! The users service.
//!
//! Routes:
//! - `GET /users?page=N`: one page of users, OData-style links
//! - `GET /users/delta?since=R`: users changed after revision `R`
//! - `GET /users/{id}`: one user with an `ETag`, or a 404 error body
//! - `DELETE /users/{id}`: 204 with no body, or a 404 error body
//! - `GET /health`: `text/plain`

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use crate::{ApiError, User};

/// Users returned per page.
pub const PAGE_SIZE: usize = 2;

#[derive(Debug)]
struct Record {
    user: User,
    revision: u64,
}

#[derive(Debug, Default)]
struct Store {
    users: BTreeMap<u64, Record>,
    revision: u64,
}

/// Shared in-memory store.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
}

impl AppState {
    /// A store seeded with a handful of users.
    pub fn seeded() -> Self {
        let mut store = Store::default();
        for (id, name) in [(1, "Ada"), (2, "Grace"), (3, "Edsger"), (4, "Barbara"), (5, "Ken")] {
            store.revision += 1;
            let user = User {
                id,
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
            };
            let revision = store.revision;
            store.users.insert(id, Record { user, revision });
        }
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// Insert or replace a user.
    pub async fn upsert(&self, user: User) {
        let mut store = self.store.write().await;
        store.revision += 1;
        let revision = store.revision;
        store.users.insert(user.id, Record { user, revision });
    }
}

/// Build the router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", get(list_users))
        .route("/users/delta", get(delta_users))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<usize>,
}

async fn list_users(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let page = params.page.unwrap_or(1).max(1);
    let store = state.store.read().await;

    let users: Vec<&User> = store
        .users
        .values()
        .skip((page - 1).saturating_mul(PAGE_SIZE))
        .take(PAGE_SIZE)
        .map(|r| &r.user)
        .collect();

    let body = if page.saturating_mul(PAGE_SIZE) < store.users.len() {
        json!({
            "value": users,
            "@odata.nextLink": format!("/users?page={}", page + 1),
        })
    } else {
        json!({
            "value": users,
            "@odata.deltaLink": format!("/users/delta?since={}", store.revision),
        })
    };

    Json(body).into_response()
}

#[derive(Debug, Deserialize)]
struct DeltaParams {
    since: u64,
}

async fn delta_users(State(state): State<AppState>, Query(params): Query<DeltaParams>) -> Response {
    let store = state.store.read().await;
    let users: Vec<&User> = store
        .users
        .values()
        .filter(|r| r.revision > params.since)
        .map(|r| &r.user)
        .collect();

    Json(json!({
        "value": users,
        "@odata.deltaLink": format!("/users/delta?since={}", store.revision),
    }))
    .into_response()
}

async fn get_user(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let store = state.store.read().await;
    match store.users.get(&id) {
        Some(record) => (
            [(header::ETAG, format!("\"{}\"", record.revision))],
            Json(record.user.clone()),
        )
            .into_response(),
        None => not_found(id),
    }
}

async fn delete_user(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut store = state.store.write().await;
    if store.users.remove(&id).is_some() {
        store.revision += 1;
        tracing::info!(id, "user deleted");
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found(id)
    }
}

fn not_found(id: u64) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError {
            code: "not_found".to_string(),
            message: format!("user {id} does not exist"),
        }),
    )
        .into_response()
}
