//! Per-screen form state and submission flows
//!
//! Each form is a plain state object. A submission is split into `begin`
//! (local validation, busy on), the backend call, and `finish` (classify the
//! response, store tokens, busy off) so a front end can run the call on a
//! background task. `submit` chains all three for callers that can simply
//! await.

pub mod chat;
pub mod login;
pub mod register;

use std::time::{Duration, Instant};
use serde_json::{json, Value};

pub use chat::{ChatDispatch, ChatForm, ChatStep};
pub use login::LoginForm;
pub use register::RegisterForm;

pub const LOGIN_ROUTE: &str = "/user/login/";
pub const REGISTER_ROUTE: &str = "/user/register/";
pub const UPLOAD_ROUTE: &str = "/user/upload/";

pub const REDIRECT_DELAY: Duration = Duration::from_millis(1000);
pub const NOTICE_LIFETIME: Duration = Duration::from_secs(5);

pub(crate) const FILL_BOTH_FIELDS: &str = "Please fill in both fields";
pub(crate) const EMPTY_RESPONSE: &str = "Server returned empty response";
pub(crate) const INVALID_FORMAT: &str = "Server error: Invalid response format";
pub(crate) const UNREACHABLE: &str = "Connection error: Unable to reach server";

pub(crate) fn markup_error(status: u16) -> String {
    format!("Server error ({}): Please try again later", status)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient message shown above a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
    pub posted_at: Instant,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: NoticeKind::Success,
            posted_at: Instant::now(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: NoticeKind::Error,
            posted_at: Instant::now(),
        }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.posted_at) < NOTICE_LIFETIME
    }
}

/// A request to move to another screen after a delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub target: String,
    pub delay: Duration,
}

impl Navigation {
    pub fn after(target: impl Into<String>, delay: Duration) -> Self {
        Self { target: target.into(), delay }
    }

    pub fn immediate(target: impl Into<String>) -> Self {
        Self::after(target, Duration::ZERO)
    }
}

/// JSON body for login and registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn to_json(&self) -> Value {
        json!({
            "username": self.username,
            "password": self.password,
        })
    }
}
