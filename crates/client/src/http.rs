//! REST client for the DevBoards backend.
//!
//! | Operation        | Request                                            |
//! |------------------|----------------------------------------------------|
//! | `list_jobs`      | `GET /jobs?offset&limit&search&location&remote`    |
//! | `list_comments`  | `GET /jobs/{job_id}/comments`                      |
//! | `create_comment` | `POST /jobs/{job_id}/comments`                     |
//! | `update_comment` | `PATCH /comments/{id}`                             |
//! | `delete_comment` | `DELETE /comments/{id}`                            |
//!
//! Bodies are JSON in the shape of the `devboards-core` records.

use async_trait::async_trait;
use devboards_comments::CommentApi;
use devboards_core::{
    ApiError, Comment, CommentId, JobId, JobPosting, NewComment, Page, PageRequest,
};
use devboards_feed::JobSource;
use reqwest::{Method, Url};
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// HTTP implementation of [`JobSource`] and [`CommentApi`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

/// Body of `PATCH /comments/{id}`.
#[derive(Debug, Serialize)]
struct UpdateCommentRequest<'a> {
    text: &'a str,
}

impl HttpBackend {
    /// Build a backend with its own connection pool.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Self::with_client(client, config)
    }

    /// Build a backend reusing an existing [`reqwest::Client`]. The
    /// config's timeout is ignored in favour of the client's own.
    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                url: config.base_url,
                reason: "URL cannot carry a path".to_string(),
            });
        }
        Ok(Self {
            client,
            base_url,
            token: config.token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch one page of the job feed.
    pub async fn list_jobs(&self, request: &PageRequest) -> Result<Page<JobPosting>, ApiError> {
        let mut params: Vec<(&str, String)> = vec![
            ("offset", request.offset.to_string()),
            ("limit", request.limit.to_string()),
        ];
        if let Some(search) = &request.query.search {
            params.push(("search", search.clone()));
        }
        if let Some(location) = &request.query.location {
            params.push(("location", location.clone()));
        }
        if request.query.remote_only {
            params.push(("remote", "true".to_string()));
        }

        let response = self
            .request(Method::GET, &["jobs"])?
            .query(&params)
            .send()
            .await
            .map_err(request_failed)?;

        Self::parse_response(response).await
    }

    pub async fn list_comments(&self, job_id: &JobId) -> Result<Vec<Comment>, ApiError> {
        let response = self
            .request(Method::GET, &["jobs", job_id.as_str(), "comments"])?
            .send()
            .await
            .map_err(request_failed)?;

        Self::parse_response(response).await
    }

    /// Post a new comment; returns the stored record with its server id.
    pub async fn create_comment(
        &self,
        job_id: &JobId,
        comment: &NewComment,
    ) -> Result<Comment, ApiError> {
        let response = self
            .request(Method::POST, &["jobs", job_id.as_str(), "comments"])?
            .json(comment)
            .send()
            .await
            .map_err(request_failed)?;

        Self::parse_response(response).await
    }

    pub async fn update_comment(&self, id: &CommentId, text: &str) -> Result<Comment, ApiError> {
        let response = self
            .request(Method::PATCH, &["comments", id.as_str()])?
            .json(&UpdateCommentRequest { text })
            .send()
            .await
            .map_err(request_failed)?;

        Self::parse_response(response).await
    }

    pub async fn delete_comment(&self, id: &CommentId) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &["comments", id.as_str()])?
            .send()
            .await
            .map_err(request_failed)?;

        Self::check_status(response).await
    }

    // ---- private helpers ----

    /// Start a request to `segments` under the base URL. Segments are
    /// percent-encoded, so ids may contain any character.
    fn request(&self, method: Method, segments: &[&str]) -> Result<reqwest::RequestBuilder, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport(format!("base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        tracing::debug!(method = %method, url = %url, "Backend request");
        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Status`] carrying
    /// the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::debug!(status = status.as_u16(), "Backend returned error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await.map_err(request_failed)?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

fn request_failed(err: reqwest::Error) -> ApiError {
    if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Transport(err.to_string())
    }
}

#[async_trait]
impl JobSource for HttpBackend {
    async fn list_jobs(&self, request: PageRequest) -> Result<Page<JobPosting>, ApiError> {
        HttpBackend::list_jobs(self, &request).await
    }
}

#[async_trait]
impl CommentApi for HttpBackend {
    async fn list_comments(&self, job_id: &JobId) -> Result<Vec<Comment>, ApiError> {
        HttpBackend::list_comments(self, job_id).await
    }

    async fn create_comment(
        &self,
        job_id: &JobId,
        comment: &NewComment,
    ) -> Result<Comment, ApiError> {
        HttpBackend::create_comment(self, job_id, comment).await
    }

    async fn update_comment(&self, id: &CommentId, text: &str) -> Result<Comment, ApiError> {
        HttpBackend::update_comment(self, id, text).await
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<(), ApiError> {
        HttpBackend::delete_comment(self, id).await
    }
}
