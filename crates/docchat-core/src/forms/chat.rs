use tracing::{error, info, warn};
use crate::backend::{Backend, ChatUpload, RawResponse, CHAT_PATH};
use crate::error::Result;
use crate::response::{first_message, ResponseClass};
use crate::session;
use crate::state::{Attachment, ChatMessage};
use crate::store::KeyValueStore;

pub const LOGIN_REQUIRED: &str = "Please log in to continue.";
pub const NO_RESPONSE: &str = "No response";
pub const ERROR_OCCURRED: &str = "Error occurred";
pub const CONNECTION_ERROR: &str = "Connection error";

/// Tallest the message box grows before it stops following its content
pub const MAX_INPUT_ROWS: u16 = 6;

/// What a front end should do after `ChatForm::begin`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStep {
    /// Nothing to send, or a request is already in flight
    Ignored,
    /// The message was echoed but there is no token to send it with
    LoginRequired,
    Send(ChatDispatch),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatDispatch {
    pub bearer: String,
    pub upload: ChatUpload,
}

#[derive(Debug, Default)]
pub struct ChatForm {
    pub input: String,
    attachments: Vec<Attachment>,
    transcript: Vec<ChatMessage>,
    sending: bool,
}

impl ChatForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// True while a request is in flight; the send button is disabled
    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn add_attachments(&mut self, files: impl IntoIterator<Item = Attachment>) {
        self.attachments.extend(files);
    }

    pub fn remove_attachment(&mut self, index: usize) -> Option<Attachment> {
        if index < self.attachments.len() {
            Some(self.attachments.remove(index))
        } else {
            None
        }
    }

    /// Rows the message box should occupy for its current content
    pub fn input_rows(&self) -> u16 {
        let lines = self.input.split('\n').count().max(1);
        (lines as u16).clamp(1, MAX_INPUT_ROWS)
    }

    /// Echo the pending message locally, clear the inputs, and hand back the
    /// request to send if there is a token to send it with.
    pub fn begin(&mut self, store: &impl KeyValueStore) -> ChatStep {
        if self.sending {
            return ChatStep::Ignored;
        }

        let message = self.input.trim().to_string();
        if message.is_empty() && self.attachments.is_empty() {
            return ChatStep::Ignored;
        }

        let files = std::mem::take(&mut self.attachments);
        let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();

        let echo = if message.is_empty() {
            format!("Uploaded {} file(s)", files.len())
        } else {
            message.clone()
        };
        self.transcript.push(ChatMessage::user(echo, names));
        self.input.clear();

        let Some(bearer) = session::access_token(store) else {
            info!("Chat submit without a session");
            self.transcript.push(ChatMessage::assistant(LOGIN_REQUIRED));
            return ChatStep::LoginRequired;
        };

        self.sending = true;
        info!(files = files.len(), "Sending chat message");

        ChatStep::Send(ChatDispatch {
            bearer,
            upload: ChatUpload {
                message: (!message.is_empty()).then_some(message),
                files,
            },
        })
    }

    /// Render the outcome of a request started by `begin`
    pub fn finish(&mut self, result: Result<RawResponse>) {
        let reply = match result {
            Ok(response) => match ResponseClass::classify(&response) {
                ResponseClass::Ok(payload) => {
                    first_message(&payload, &["answer"]).unwrap_or_else(|| NO_RESPONSE.to_string())
                }
                ResponseClass::HttpError { status, payload } => {
                    warn!(status, "Chat request rejected");
                    first_message(&payload, &["detail"]).unwrap_or_else(|| ERROR_OCCURRED.to_string())
                }
                other => {
                    error!(status = response.status, "Unreadable chat response: {:?}", other);
                    CONNECTION_ERROR.to_string()
                }
            },
            Err(e) => {
                warn!("Chat request failed: {}", e);
                CONNECTION_ERROR.to_string()
            }
        };

        self.transcript.push(ChatMessage::assistant(reply));
        self.sending = false;
    }

    pub async fn submit(&mut self, backend: &dyn Backend, store: &impl KeyValueStore) -> ChatStep {
        let step = self.begin(store);
        if let ChatStep::Send(dispatch) = &step {
            let result = backend
                .post_multipart(CHAT_PATH, &dispatch.bearer, &dispatch.upload)
                .await;
            self.finish(result);
        }
        step
    }
}
