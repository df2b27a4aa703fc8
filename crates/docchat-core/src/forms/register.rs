use std::time::Instant;
use tracing::{error, info, warn};
use crate::backend::{Backend, RawResponse, REGISTER_PATH};
use crate::error::Result;
use crate::response::{first_message, string_field, ResponseClass};
use crate::session;
use crate::store::KeyValueStore;
use crate::strength::{PasswordStrength, MIN_PASSWORD_LEN};
use super::{
    markup_error, Credentials, Navigation, Notice, EMPTY_RESPONSE, FILL_BOTH_FIELDS,
    INVALID_FORMAT, REDIRECT_DELAY, UNREACHABLE, UPLOAD_ROUTE,
};

pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters long";
pub const REGISTER_SUCCESS: &str = "Account created successfully! Redirecting...";
pub const REGISTER_FAILED: &str = "Registration failed";

#[derive(Debug, Default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    busy: bool,
    notice: Option<Notice>,
}

impl RegisterForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn visible_notice(&self, now: Instant) -> Option<&Notice> {
        self.notice.as_ref().filter(|n| n.is_visible(now))
    }

    pub fn accepts_enter(&self) -> bool {
        !self.busy
    }

    /// Strength hint for the password as typed, `None` when the field is empty
    pub fn strength(&self) -> Option<PasswordStrength> {
        PasswordStrength::evaluate(&self.password)
    }

    pub fn begin(&mut self) -> Option<Credentials> {
        let username = self.username.trim();
        let password = self.password.trim();

        if username.is_empty() || password.is_empty() {
            self.notice = Some(Notice::error(FILL_BOTH_FIELDS));
            return None;
        }

        if password.chars().count() < MIN_PASSWORD_LEN {
            self.notice = Some(Notice::error(PASSWORD_TOO_SHORT));
            return None;
        }

        self.busy = true;
        self.notice = None;
        info!(username, "Registering account");

        Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn finish(&mut self, result: Result<RawResponse>, store: &mut impl KeyValueStore) -> Option<Navigation> {
        let outcome = interpret(result, store);
        self.busy = false;

        match outcome {
            Ok(navigation) => {
                self.notice = Some(Notice::success(REGISTER_SUCCESS));
                Some(navigation)
            }
            Err(message) => {
                self.notice = Some(Notice::error(message));
                None
            }
        }
    }

    pub async fn submit(&mut self, backend: &dyn Backend, store: &mut impl KeyValueStore) -> Option<Navigation> {
        let credentials = self.begin()?;
        let result = backend.post_json(REGISTER_PATH, &credentials.to_json()).await;
        self.finish(result, store)
    }
}

// Unlike login, any 2xx counts as success; the backend sends no success flag here.
fn interpret(result: Result<RawResponse>, store: &mut impl KeyValueStore) -> std::result::Result<Navigation, String> {
    let response = result.map_err(|e| {
        warn!("Registration request failed: {}", e);
        UNREACHABLE.to_string()
    })?;

    let payload = match ResponseClass::classify(&response) {
        ResponseClass::Markup { status } => {
            error!(status, "Server returned HTML error page");
            return Err(markup_error(status));
        }
        ResponseClass::Empty => return Err(EMPTY_RESPONSE.to_string()),
        ResponseClass::NonJson | ResponseClass::Malformed => {
            error!(status = response.status, "Failed to parse registration response");
            return Err(INVALID_FORMAT.to_string());
        }
        ResponseClass::HttpError { status, payload } => {
            warn!(status, "Registration rejected");
            return Err(first_message(&payload, &["detail", "error"])
                .unwrap_or_else(|| REGISTER_FAILED.to_string()));
        }
        ResponseClass::Ok(payload) => payload,
    };

    let (Some(access), Some(refresh)) = (
        string_field(&payload, "access"),
        string_field(&payload, "refresh"),
    ) else {
        error!("Registration reply is missing tokens");
        return Err(INVALID_FORMAT.to_string());
    };

    session::store_tokens(store, &access, Some(&refresh)).map_err(|e| {
        error!("Could not persist session: {}", e);
        e.to_string()
    })?;

    info!("Registration succeeded");
    Ok(Navigation::after(UPLOAD_ROUTE, REDIRECT_DELAY))
}
