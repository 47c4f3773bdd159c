//! Local axum server standing in for the DevBoards backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use devboards_core::{Author, Comment, CommentId, JobId, JobPosting, NewComment, Page};
use serde::Deserialize;

#[derive(Default)]
pub struct Backend {
    pub comments: HashMap<String, Vec<Comment>>,
    pub jobs: Vec<JobPosting>,
    /// Every request as `"METHOD path?query"`.
    pub requests: Vec<String>,
    /// `Authorization` header of every request.
    pub auth: Vec<Option<String>>,
    next_id: u64,
}

pub type Shared = Arc<Mutex<Backend>>;

pub struct TestServer {
    pub base_url: String,
    pub state: Shared,
}

impl TestServer {
    pub async fn start(backend: Backend) -> Self {
        let state: Shared = Arc::new(Mutex::new(backend));
        let app = Router::new()
            .route("/api/jobs", get(list_jobs))
            .route(
                "/api/jobs/{job_id}/comments",
                get(list_comments).post(create_comment),
            )
            .route(
                "/api/comments/{id}",
                patch(update_comment).delete(delete_comment),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn auth(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().auth.clone()
    }

    pub fn server_comments(&self, job_id: &str) -> Vec<Comment> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(job_id)
            .cloned()
            .unwrap_or_default()
    }
}

fn record(state: &Shared, headers: &HeaderMap, line: String) {
    let mut backend = state.lock().unwrap();
    backend.requests.push(line);
    backend.auth.push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
}

#[derive(Debug, Deserialize)]
struct JobsParams {
    offset: usize,
    limit: usize,
    search: Option<String>,
    location: Option<String>,
    #[serde(default)]
    remote: bool,
}

async fn list_jobs(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<JobsParams>,
) -> Json<Page<JobPosting>> {
    record(
        &state,
        &headers,
        format!(
            "GET /jobs offset={} limit={} search={:?} location={:?} remote={}",
            params.offset, params.limit, params.search, params.location, params.remote
        ),
    );

    let backend = state.lock().unwrap();
    let matching: Vec<JobPosting> = backend
        .jobs
        .iter()
        .filter(|j| !params.remote || j.remote)
        .filter(|j| match &params.search {
            Some(search) => j.title.to_lowercase().contains(&search.to_lowercase()),
            None => true,
        })
        .cloned()
        .collect();
    let total = matching.len();
    let items: Vec<JobPosting> = matching
        .into_iter()
        .skip(params.offset)
        .take(params.limit)
        .collect();
    let end = params.offset + items.len();
    Json(Page {
        items,
        total: Some(total as u64),
        next_offset: (end < total).then_some(end as u32),
    })
}

async fn list_comments(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response {
    record(&state, &headers, format!("GET /jobs/{job_id}/comments"));
    match job_id.as_str() {
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "database down").into_response(),
        "garbled" => (StatusCode::OK, "{not json").into_response(),
        _ => {
            let backend = state.lock().unwrap();
            Json(backend.comments.get(&job_id).cloned().unwrap_or_default()).into_response()
        }
    }
}

async fn create_comment(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    Json(body): Json<NewComment>,
) -> (StatusCode, Json<Comment>) {
    record(&state, &headers, format!("POST /jobs/{job_id}/comments"));
    let mut backend = state.lock().unwrap();
    backend.next_id += 1;
    let stored = Comment {
        id: CommentId::new(format!("srv-{}", backend.next_id)),
        user_id: Some("u-1".to_string()),
        author: body.author,
        text: body.text,
        date: fixed_date(),
    };
    backend
        .comments
        .entry(job_id)
        .or_default()
        .push(stored.clone());
    (StatusCode::CREATED, Json(stored))
}

#[derive(Debug, Deserialize)]
struct UpdateBody {
    text: String,
}

async fn update_comment(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Response {
    record(&state, &headers, format!("PATCH /comments/{id}"));
    let mut backend = state.lock().unwrap();
    let found = backend
        .comments
        .values_mut()
        .flat_map(|c| c.iter_mut())
        .find(|c| c.id.as_str() == id);
    match found {
        Some(comment) => {
            comment.text = body.text;
            Json(comment.clone()).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no such comment").into_response(),
    }
}

async fn delete_comment(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> StatusCode {
    record(&state, &headers, format!("DELETE /comments/{id}"));
    let mut backend = state.lock().unwrap();
    let mut found = false;
    for comments in backend.comments.values_mut() {
        let before = comments.len();
        comments.retain(|c| c.id.as_str() != id);
        found |= comments.len() != before;
    }
    if found {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub fn fixed_date() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn comment(id: &str, text: &str) -> Comment {
    Comment {
        id: CommentId::from(id),
        user_id: Some("u-1".to_string()),
        author: Author::new("Ann"),
        text: text.to_string(),
        date: fixed_date(),
    }
}

pub fn job(id: &str, title: &str, remote: bool) -> JobPosting {
    JobPosting {
        id: JobId::from(id),
        title: title.to_string(),
        company: "Acme".to_string(),
        location: Some("Berlin".to_string()),
        remote,
        salary: None,
        tags: vec!["rust".to_string()],
        posted_at: fixed_date(),
    }
}
