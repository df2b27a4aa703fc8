use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use crate::error::Result;
use crate::state::Attachment;

pub const CHAT_PATH: &str = "/user/chat/";
pub const LOGIN_PATH: &str = "/user/login/";
pub const REGISTER_PATH: &str = "/user/api/register/";

/// Status and undecoded body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Multipart chat submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUpload {
    pub message: Option<String>,
    pub files: Vec<Attachment>,
}

/// The server the forms talk to.
///
/// An `Err` means the exchange never completed; any HTTP status, even 5xx,
/// comes back as `Ok`.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse>;

    async fn post_multipart(&self, path: &str, bearer: &str, upload: &ChatUpload) -> Result<RawResponse>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read(response: reqwest::Response) -> Result<RawResponse> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, bytes = body.len(), "Response received");
        Ok(RawResponse { status, body })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await?;

        Self::read(response).await
    }

    async fn post_multipart(&self, path: &str, bearer: &str, upload: &ChatUpload) -> Result<RawResponse> {
        let mut form = Form::new();
        if let Some(message) = &upload.message {
            form = form.text("message", message.clone());
        }
        for file in &upload.files {
            let bytes = tokio::fs::read(&file.path).await?;
            form = form.part("files", Part::bytes(bytes).file_name(file.name.clone()));
        }

        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(bearer)
            .multipart(form)
            .send()
            .await?;

        Self::read(response).await
    }
}
