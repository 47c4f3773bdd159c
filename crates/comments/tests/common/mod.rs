//! In-memory backend shared by the comment store integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use devboards_comments::CommentApi;
use devboards_core::{ApiError, Author, Comment, CommentId, JobId, NewComment};
use tokio::sync::Semaphore;

/// Fake comment backend with call counters, an offline switch, and gates
/// that hold requests until the test releases them.
#[derive(Default)]
pub struct FakeApi {
    threads: Mutex<HashMap<JobId, Vec<Comment>>>,
    next_id: AtomicU64,
    offline: AtomicBool,
    list_gate: Mutex<Option<Arc<Semaphore>>>,
    mutation_gate: Mutex<Option<Arc<Semaphore>>>,
    log: Mutex<Vec<String>>,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(100),
            ..Default::default()
        })
    }

    pub fn seed(&self, job_id: &str, comments: Vec<Comment>) {
        self.threads
            .lock()
            .unwrap()
            .insert(JobId::from(job_id), comments);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make every later `list_comments` call wait for a permit.
    pub fn hold_lists(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.list_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Make every later mutation wait for a permit.
    pub fn hold_mutations(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.mutation_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// What the backend currently stores for `job_id`.
    pub fn server_comments(&self, job_id: &str) -> Vec<Comment> {
        self.threads
            .lock()
            .unwrap()
            .get(&JobId::from(job_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Mutations in the order the backend received them.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn check_online(&self) -> Result<(), ApiError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(ApiError::Transport("network unreachable".into()))
        } else {
            Ok(())
        }
    }

    async fn pass(gate: &Mutex<Option<Arc<Semaphore>>>) {
        let gate = gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
    }

    fn not_found(id: &CommentId) -> ApiError {
        ApiError::Status {
            status: 404,
            body: format!("comment {id} not found"),
        }
    }
}

#[async_trait]
impl CommentApi for FakeApi {
    async fn list_comments(&self, job_id: &JobId) -> Result<Vec<Comment>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.check_online().map(|()| {
            self.threads
                .lock()
                .unwrap()
                .get(job_id)
                .cloned()
                .unwrap_or_default()
        });
        // Snapshot first, then wait: a held fetch returns old data.
        Self::pass(&self.list_gate).await;
        result
    }

    async fn create_comment(
        &self,
        job_id: &JobId,
        comment: &NewComment,
    ) -> Result<Comment, ApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.mutation_gate).await;
        self.check_online()?;

        let id = CommentId::new(format!("c{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        let stored = Comment {
            id,
            user_id: Some("u-ann".into()),
            author: comment.author.clone(),
            text: comment.text.clone(),
            date: chrono::Utc::now(),
        };
        self.threads
            .lock()
            .unwrap()
            .entry(job_id.clone())
            .or_default()
            .push(stored.clone());
        self.log.lock().unwrap().push(format!("create {}", stored.id));
        Ok(stored)
    }

    async fn update_comment(&self, id: &CommentId, text: &str) -> Result<Comment, ApiError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.mutation_gate).await;
        self.check_online()?;

        let mut threads = self.threads.lock().unwrap();
        let comment = threads
            .values_mut()
            .flat_map(|comments| comments.iter_mut())
            .find(|c| &c.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        comment.text = text.to_string();
        let stored = comment.clone();
        drop(threads);
        self.log.lock().unwrap().push(format!("update {id}"));
        Ok(stored)
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<(), ApiError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.mutation_gate).await;
        self.check_online()?;

        let mut threads = self.threads.lock().unwrap();
        let mut found = false;
        for comments in threads.values_mut() {
            let before = comments.len();
            comments.retain(|c| &c.id != id);
            found |= comments.len() != before;
        }
        drop(threads);
        if !found {
            return Err(Self::not_found(id));
        }
        self.log.lock().unwrap().push(format!("delete {id}"));
        Ok(())
    }
}

pub fn comment(id: &str, text: &str) -> Comment {
    Comment {
        id: CommentId::from(id),
        user_id: Some("u-1".into()),
        author: Author::new("Ann"),
        text: text.into(),
        date: chrono::Utc::now(),
    }
}

/// `(id, text)` pairs, for compact assertions.
pub fn ids_and_texts(comments: &[Comment]) -> Vec<(String, String)> {
    comments
        .iter()
        .map(|c| (c.id.to_string(), c.text.clone()))
        .collect()
}

pub fn pair(id: &str, text: &str) -> (String, String) {
    (id.to_string(), text.to_string())
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition().await {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition should eventually hold");
}
