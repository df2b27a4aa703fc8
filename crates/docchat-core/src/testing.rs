use std::sync::Mutex;
use async_trait::async_trait;
use serde_json::Value;
use crate::backend::{Backend, ChatUpload, RawResponse};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Json { path: String, body: Value },
    Multipart { path: String, bearer: String, upload: ChatUpload },
}

/// Backend that answers every request with one canned reply
pub struct FakeBackend {
    reply: Option<RawResponse>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn replying(status: u16, body: &str) -> Self {
        Self {
            reply: Some(RawResponse { status, body: body.to_string() }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, call: Call) -> Result<RawResponse> {
        self.calls.lock().unwrap().push(call);
        self.reply
            .clone()
            .ok_or_else(|| Error::Transport("connection refused".to_string()))
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse> {
        self.answer(Call::Json {
            path: path.to_string(),
            body: body.clone(),
        })
    }

    async fn post_multipart(&self, path: &str, bearer: &str, upload: &ChatUpload) -> Result<RawResponse> {
        self.answer(Call::Multipart {
            path: path.to_string(),
            bearer: bearer.to_string(),
            upload: upload.clone(),
        })
    }
}
