use std::time::Instant;
use tracing::{error, info, warn};
use crate::backend::{Backend, RawResponse, LOGIN_PATH};
use crate::error::Result;
use crate::response::{first_message, flag_field, string_field, ResponseClass};
use crate::session;
use crate::store::KeyValueStore;
use super::{
    markup_error, Credentials, Navigation, Notice, EMPTY_RESPONSE, FILL_BOTH_FIELDS,
    INVALID_FORMAT, REDIRECT_DELAY, UNREACHABLE, UPLOAD_ROUTE,
};

pub const LOGIN_SUCCESS: &str = "Login successful! Redirecting...";
pub const LOGIN_FAILED: &str = "Login failed";

#[derive(Debug, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    busy: bool,
    notice: Option<Notice>,
}

impl LoginForm {
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

    /// Enter submits from anywhere on the screen unless a request is pending
    pub fn accepts_enter(&self) -> bool {
        !self.busy
    }

    /// Validate the fields; on success the form is busy until `finish`
    pub fn begin(&mut self) -> Option<Credentials> {
        let username = self.username.trim();
        let password = self.password.trim();

        if username.is_empty() || password.is_empty() {
            self.notice = Some(Notice::error(FILL_BOTH_FIELDS));
            return None;
        }

        self.busy = true;
        self.notice = None;
        info!(username, "Logging in");

        Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Interpret the login response; returns where to go next on success
    pub fn finish(&mut self, result: Result<RawResponse>, store: &mut impl KeyValueStore) -> Option<Navigation> {
        let outcome = self.interpret(result, store);
        self.busy = false;

        match outcome {
            Ok(navigation) => {
                self.notice = Some(Notice::success(LOGIN_SUCCESS));
                Some(navigation)
            }
            Err(message) => {
                self.notice = Some(Notice::error(message));
                None
            }
        }
    }

    fn interpret(&self, result: Result<RawResponse>, store: &mut impl KeyValueStore) -> std::result::Result<Navigation, String> {
        let response = result.map_err(|e| {
            warn!("Login request failed: {}", e);
            UNREACHABLE.to_string()
        })?;

        let class = ResponseClass::classify(&response);
        let payload = match &class {
            ResponseClass::Markup { status } => {
                error!(status, "Server returned HTML error page");
                return Err(markup_error(*status));
            }
            ResponseClass::Empty => return Err(EMPTY_RESPONSE.to_string()),
            ResponseClass::NonJson | ResponseClass::Malformed => {
                error!(status = response.status, "Failed to parse login response");
                return Err(INVALID_FORMAT.to_string());
            }
            ResponseClass::Ok(payload) | ResponseClass::HttpError { payload, .. } => payload,
        };

        // Fields are read one at a time so an odd type on one never hides the error text
        let accepted = response.is_success() && flag_field(payload, "success");

        match (accepted, string_field(payload, "access")) {
            (true, Some(access)) => {
                let refresh = string_field(payload, "refresh");
                session::store_tokens(store, &access, refresh.as_deref()).map_err(|e| {
                    error!("Could not persist session: {}", e);
                    e.to_string()
                })?;

                let target = string_field(payload, "redirect").unwrap_or_else(|| UPLOAD_ROUTE.to_string());
                info!(redirect = %target, "Login succeeded");
                Ok(Navigation::after(target, REDIRECT_DELAY))
            }
            (true, None) => {
                error!("Login reply is missing the access token");
                Err(INVALID_FORMAT.to_string())
            }
            (false, _) => {
                warn!(status = response.status, "Login rejected");
                Err(first_message(payload, &["error", "detail"]).unwrap_or_else(|| LOGIN_FAILED.to_string()))
            }
        }
    }

    pub async fn submit(&mut self, backend: &dyn Backend, store: &mut impl KeyValueStore) -> Option<Navigation> {
        let credentials = self.begin()?;
        let result = backend.post_json(LOGIN_PATH, &credentials.to_json()).await;
        self.finish(result, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::NoticeKind;
    use crate::session::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
    use crate::store::MemoryStore;
    use crate::testing::{Call, FakeBackend};
    use serde_json::json;

    fn filled() -> LoginForm {
        let mut form = LoginForm::new();
        form.username = "  alice ".to_string();
        form.password = "secret1".to_string();
        form
    }

    fn notice_text(form: &LoginForm) -> &str {
        form.notice().map(|n| n.text.as_str()).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_blank_fields_rejected_locally() {
        let backend = FakeBackend::replying(200, "{}");
        let mut store = MemoryStore::new();
        let mut form = LoginForm::new();
        form.username = "alice".to_string();
        form.password = "   ".to_string();

        let nav = form.submit(&backend, &mut store).await;

        assert_eq!(nav, None);
        assert!(backend.calls().is_empty());
        assert_eq!(notice_text(&form), "Please fill in both fields");
        assert!(!form.is_busy());
    }

    #[tokio::test]
    async fn test_success_stores_access_and_uses_default_redirect() {
        let backend = FakeBackend::replying(200, r#"{"success":true,"access":"A"}"#);
        let mut store = MemoryStore::new();
        store.set(REFRESH_TOKEN_KEY, "keep-me").unwrap();
        let mut form = filled();

        let nav = form.submit(&backend, &mut store).await.unwrap();

        assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("A"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("keep-me"));
        assert_eq!(nav.target, "/user/upload/");
        assert_eq!(nav.delay, REDIRECT_DELAY);
        assert_eq!(form.notice().unwrap().kind, NoticeKind::Success);
        assert_eq!(notice_text(&form), "Login successful! Redirecting...");

        assert_eq!(
            backend.calls(),
            vec![Call::Json {
                path: "/user/login/".to_string(),
                body: json!({"username": "alice", "password": "secret1"}),
            }]
        );
    }

    #[tokio::test]
    async fn test_success_with_refresh_and_redirect() {
        let body = r#"{"success":true,"access":"A","refresh":"R","redirect":"/user/chat-page/"}"#;
        let backend = FakeBackend::replying(200, body);
        let mut store = MemoryStore::new();
        let mut form = filled();

        let nav = form.submit(&backend, &mut store).await.unwrap();

        assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("R"));
        assert_eq!(nav.target, "/user/chat-page/");
    }

    #[tokio::test]
    async fn test_html_error_page_reports_status() {
        let backend = FakeBackend::replying(500, "<!DOCTYPE html><html><body>Server Error</body></html>");
        let mut store = MemoryStore::new();
        let mut form = filled();

        let nav = form.submit(&backend, &mut store).await;

        assert_eq!(nav, None);
        assert!(notice_text(&form).contains("500"));
        assert_eq!(store.get(ACCESS_TOKEN_KEY), None);
        assert!(!form.is_busy());
    }

    #[tokio::test]
    async fn test_empty_and_garbage_bodies() {
        let mut store = MemoryStore::new();

        let backend = FakeBackend::replying(200, "");
        let mut form = filled();
        form.submit(&backend, &mut store).await;
        assert_eq!(notice_text(&form), "Server returned empty response");

        let backend = FakeBackend::replying(200, "{oops");
        let mut form = filled();
        form.submit(&backend, &mut store).await;
        assert_eq!(notice_text(&form), "Server error: Invalid response format");
    }

    #[tokio::test]
    async fn test_rejected_credentials_prefer_error_then_detail() {
        let mut store = MemoryStore::new();

        let backend = FakeBackend::replying(401, r#"{"success":false,"detail":"Invalid username or password"}"#);
        let mut form = filled();
        form.submit(&backend, &mut store).await;
        assert_eq!(notice_text(&form), "Invalid username or password");

        let backend = FakeBackend::replying(400, r#"{"error":"Locked","detail":"ignored"}"#);
        let mut form = filled();
        form.submit(&backend, &mut store).await;
        assert_eq!(notice_text(&form), "Locked");

        let backend = FakeBackend::replying(403, "{}");
        let mut form = filled();
        form.submit(&backend, &mut store).await;
        assert_eq!(notice_text(&form), "Login failed");
    }

    #[tokio::test]
    async fn test_ok_status_without_success_flag_fails() {
        let backend = FakeBackend::replying(200, r#"{"access":"A"}"#);
        let mut store = MemoryStore::new();
        let mut form = filled();

        let nav = form.submit(&backend, &mut store).await;

        assert_eq!(nav, None);
        assert_eq!(store.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(notice_text(&form), "Login failed");
    }

    #[tokio::test]
    async fn test_success_flag_on_error_status_fails() {
        let backend = FakeBackend::replying(500, r#"{"success":true,"access":"A"}"#);
        let mut store = MemoryStore::new();
        let mut form = filled();

        assert_eq!(form.submit(&backend, &mut store).await, None);
        assert_eq!(store.get(ACCESS_TOKEN_KEY), None);
    }

    #[tokio::test]
    async fn test_network_failure_keeps_tokens_and_reenables() {
        let backend = FakeBackend::unreachable();
        let mut store = MemoryStore::new();
        session::store_tokens(&mut store, "old-A", Some("old-R")).unwrap();
        let mut form = filled();

        let nav = form.submit(&backend, &mut store).await;

        assert_eq!(nav, None);
        assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("old-A"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("old-R"));
        assert!(!form.is_busy());
        assert!(form.accepts_enter());
        assert_eq!(notice_text(&form), "Connection error: Unable to reach server");
    }

    #[tokio::test]
    async fn test_rejection_with_odd_field_types_keeps_error_text() {
        let mut store = MemoryStore::new();

        let backend = FakeBackend::replying(401, r#"{"success":null,"error":"Account locked"}"#);
        let mut form = filled();
        assert_eq!(form.submit(&backend, &mut store).await, None);
        assert_eq!(notice_text(&form), "Account locked");

        let backend = FakeBackend::replying(200, r#"{"success":1,"access":42,"detail":"Verify your email"}"#);
        let mut form = filled();
        assert_eq!(form.submit(&backend, &mut store).await, None);
        assert_eq!(notice_text(&form), "Verify your email");
        assert_eq!(store.get(ACCESS_TOKEN_KEY), None);
    }

    #[tokio::test]
    async fn test_non_string_access_on_success_is_invalid_format() {
        let backend = FakeBackend::replying(200, r#"{"success":true,"access":42,"redirect":false}"#);
        let mut store = MemoryStore::new();
        let mut form = filled();

        assert_eq!(form.submit(&backend, &mut store).await, None);
        assert_eq!(notice_text(&form), INVALID_FORMAT);
        assert!(!form.is_busy());
    }

    #[tokio::test]
    async fn test_non_string_redirect_falls_back_to_upload() {
        let backend = FakeBackend::replying(200, r#"{"success":true,"access":"A","refresh":null,"redirect":7}"#);
        let mut store = MemoryStore::new();
        let mut form = filled();

        let nav = form.submit(&backend, &mut store).await.unwrap();

        assert_eq!(nav.target, "/user/upload/");
        assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("A"));
    }

    #[test]
    fn test_enter_ignored_while_busy() {
        let mut form = filled();
        assert!(form.accepts_enter());
        assert!(form.begin().is_some());
        assert!(!form.accepts_enter());
        assert!(form.notice().is_none());
    }
}
