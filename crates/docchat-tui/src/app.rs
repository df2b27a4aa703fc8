use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use docchat_core::backend::{CHAT_PATH, LOGIN_PATH, REGISTER_PATH};
use docchat_core::forms::{LOGIN_ROUTE, REGISTER_ROUTE};
use docchat_core::{
    session, Attachment, Backend, ChatForm, ChatStep, Error, FileStore, LoginForm, Navigation,
    RawResponse, RegisterForm,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Register,
    Chat,
}

impl Screen {
    /// Screen that hosts a backend route; everything past login lands in chat
    pub fn for_route(route: &str) -> Self {
        match route.trim_end_matches('/') {
            r if r == LOGIN_ROUTE.trim_end_matches('/') => Screen::Login,
            r if r == REGISTER_ROUTE.trim_end_matches('/') => Screen::Register,
            _ => Screen::Chat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Username,
    Password,
}

impl CredentialField {
    pub fn toggle(self) -> Self {
        match self {
            CredentialField::Username => CredentialField::Password,
            CredentialField::Password => CredentialField::Username,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatFocus {
    Input,
    Attachments,
}

type Request = JoinHandle<docchat_core::Result<RawResponse>>;

/// In-flight requests, one slot per form; the forms never wait on each other
#[derive(Default)]
struct Pending {
    login: Option<Request>,
    register: Option<Request>,
    chat: Option<Request>,
}

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,

    // Forms, one per screen
    pub login: LoginForm,
    pub register: RegisterForm,
    pub chat: ChatForm,

    // Focus and editing state
    pub credential_field: CredentialField,
    pub chat_focus: ChatFocus,
    pub chat_cursor: usize, // char index into chat.input
    pub attachment_state: ListState,

    // Transcript viewport
    pub transcript_scroll: u16,
    pub transcript_height: u16,
    pub transcript_width: u16,

    // Popups
    pub show_logout_confirm: bool,
    pub show_attach_input: bool,
    pub attach_input: String,
    pub attach_error: Option<String>,

    // Animation state
    pub animation_frame: u8,

    pending: Pending,
    redirect: Option<(String, Instant)>,

    pub store: FileStore,
    backend: Arc<dyn Backend>,
    pub server_url: String,
}

impl App {
    pub fn new(backend: Arc<dyn Backend>, store: FileStore, server_url: String) -> Self {
        // A stored token means the user is already signed in
        let screen = if session::access_token(&store).is_some() {
            Screen::Chat
        } else {
            Screen::Login
        };

        Self {
            should_quit: false,
            screen,

            login: LoginForm::new(),
            register: RegisterForm::new(),
            chat: ChatForm::new(),

            credential_field: CredentialField::Username,
            chat_focus: ChatFocus::Input,
            chat_cursor: 0,
            attachment_state: ListState::default(),

            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,

            show_logout_confirm: false,
            show_attach_input: false,
            attach_input: String::new(),
            attach_error: None,

            animation_frame: 0,

            pending: Pending::default(),
            redirect: None,

            store,
            backend,
            server_url,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.login.is_busy() || self.register.is_busy() || self.chat.is_sending()
    }

    pub fn has_pending_redirect(&self) -> bool {
        self.redirect.is_some()
    }

    pub fn submit_login(&mut self) {
        if !self.login.accepts_enter() {
            return;
        }
        if let Some(credentials) = self.login.begin() {
            let backend = Arc::clone(&self.backend);
            let body = credentials.to_json();
            self.pending.login = Some(tokio::spawn(async move {
                backend.post_json(LOGIN_PATH, &body).await
            }));
        }
    }

    pub fn submit_register(&mut self) {
        if !self.register.accepts_enter() {
            return;
        }
        if let Some(credentials) = self.register.begin() {
            let backend = Arc::clone(&self.backend);
            let body = credentials.to_json();
            self.pending.register = Some(tokio::spawn(async move {
                backend.post_json(REGISTER_PATH, &body).await
            }));
        }
    }

    pub fn submit_chat(&mut self) {
        match self.chat.begin(&self.store) {
            ChatStep::Ignored => return,
            ChatStep::LoginRequired => {}
            ChatStep::Send(dispatch) => {
                let backend = Arc::clone(&self.backend);
                self.pending.chat = Some(tokio::spawn(async move {
                    backend
                        .post_multipart(CHAT_PATH, &dispatch.bearer, &dispatch.upload)
                        .await
                }));
            }
        }

        self.chat_cursor = 0;
        self.chat_focus = ChatFocus::Input;
        self.attachment_state.select(None);
        self.scroll_transcript_to_bottom();
    }

    /// Hand each completed request back to the form that started it
    pub async fn poll_pending(&mut self, now: Instant) {
        if let Some(result) = take_finished(&mut self.pending.login).await {
            if let Some(nav) = self.login.finish(result, &mut self.store) {
                self.schedule(nav, now);
            }
        }

        if let Some(result) = take_finished(&mut self.pending.register).await {
            if let Some(nav) = self.register.finish(result, &mut self.store) {
                self.schedule(nav, now);
            }
        }

        if let Some(result) = take_finished(&mut self.pending.chat).await {
            self.chat.finish(result);
            self.scroll_transcript_to_bottom();
        }
    }

    fn schedule(&mut self, nav: Navigation, now: Instant) {
        if nav.delay.is_zero() {
            self.navigate(&nav.target);
        } else {
            self.redirect = Some((nav.target, now + nav.delay));
        }
    }

    /// Advance animations and fire a due redirect
    pub fn tick(&mut self, now: Instant) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }

        let due = matches!(&self.redirect, Some((_, at)) if now >= *at);
        if due {
            if let Some((target, _)) = self.redirect.take() {
                self.navigate(&target);
            }
        }
    }

    /// Switch screens as a page load would: the destination starts fresh
    pub fn navigate(&mut self, route: &str) {
        let screen = Screen::for_route(route);
        info!(route, ?screen, "Navigating");

        // A fresh form drops whatever its previous incarnation had in flight
        match screen {
            Screen::Login => {
                abort(&mut self.pending.login);
                self.login = LoginForm::new();
            }
            Screen::Register => {
                abort(&mut self.pending.register);
                self.register = RegisterForm::new();
            }
            Screen::Chat => {
                abort(&mut self.pending.chat);
                self.chat = ChatForm::new();
                self.chat_cursor = 0;
                self.chat_focus = ChatFocus::Input;
                self.attachment_state.select(None);
                self.transcript_scroll = 0;
            }
        }

        self.credential_field = CredentialField::Username;
        self.show_logout_confirm = false;
        self.show_attach_input = false;
        self.redirect = None;
        self.screen = screen;
    }

    pub fn confirm_logout(&mut self) {
        self.show_logout_confirm = false;
        match session::logout(&mut self.store) {
            Ok(nav) => self.navigate(&nav.target),
            Err(e) => warn!("Logout failed: {}", e),
        }
    }

    // Attachments

    pub fn open_attach_input(&mut self) {
        self.show_attach_input = true;
        self.attach_input.clear();
        self.attach_error = None;
    }

    /// Add the file named in the attach popup; keeps the popup open on a bad path
    pub fn attach_from_input(&mut self) {
        let raw = self.attach_input.trim().trim_matches(|c| c == '"' || c == '\'');
        if raw.is_empty() {
            self.show_attach_input = false;
            return;
        }

        let path = expand_home(raw);
        if !path.is_file() {
            self.attach_error = Some(format!("Not a file: {}", path.display()));
            return;
        }

        self.chat.add_attachments([Attachment::from_path(&path)]);
        self.show_attach_input = false;
        self.attach_input.clear();
        self.attach_error = None;
    }

    pub fn attachment_nav_down(&mut self) {
        let len = self.chat.attachments().len();
        if len > 0 {
            let i = self.attachment_state.selected().unwrap_or(0);
            self.attachment_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn attachment_nav_up(&mut self) {
        let i = self.attachment_state.selected().unwrap_or(0);
        self.attachment_state.select(Some(i.saturating_sub(1)));
    }

    pub fn focus_attachments(&mut self) {
        if self.chat.attachments().is_empty() {
            return;
        }
        self.chat_focus = ChatFocus::Attachments;
        if self.attachment_state.selected().is_none() {
            self.attachment_state.select(Some(0));
        }
    }

    pub fn remove_selected_attachment(&mut self) {
        if let Some(i) = self.attachment_state.selected() {
            self.chat.remove_attachment(i);
            let len = self.chat.attachments().len();
            if len == 0 {
                self.attachment_state.select(None);
                self.chat_focus = ChatFocus::Input;
            } else if i >= len {
                self.attachment_state.select(Some(len - 1));
            }
        }
    }

    // Transcript scrolling

    pub fn scroll_transcript_down(&mut self, lines: u16) {
        let max = self.transcript_lines().saturating_sub(self.transcript_height);
        self.transcript_scroll = self.transcript_scroll.saturating_add(lines).min(max);
    }

    pub fn scroll_transcript_up(&mut self, lines: u16) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(lines);
    }

    /// Scroll so the newest message (or the "Thinking..." line) is visible
    pub fn scroll_transcript_to_bottom(&mut self) {
        let visible_height = if self.transcript_height > 0 {
            self.transcript_height
        } else {
            20
        };

        let total_lines = self.transcript_lines();
        self.transcript_scroll = total_lines.saturating_sub(visible_height);
    }

    fn transcript_lines(&self) -> u16 {
        let wrap_width = if self.transcript_width > 0 {
            self.transcript_width as usize
        } else {
            50
        };

        let mut total: usize = 0;
        for msg in self.chat.transcript() {
            total += 1; // avatar line
            total += msg.attachments.len();
            for line in msg.content.lines() {
                let chars = line.chars().count();
                total += chars / wrap_width + 1;
            }
            total += 1; // spacer
        }
        if self.chat.is_sending() {
            total += 2;
        }

        total.min(u16::MAX as usize) as u16
    }
}

async fn take_finished(slot: &mut Option<Request>) -> Option<docchat_core::Result<RawResponse>> {
    if !slot.as_ref().is_some_and(|handle| handle.is_finished()) {
        return None;
    }
    let handle = slot.take()?;
    Some(match handle.await {
        Ok(result) => result,
        Err(e) => Err(Error::Transport(format!("request task failed: {}", e))),
    })
}

fn abort(slot: &mut Option<Request>) {
    if let Some(handle) = slot.take() {
        handle.abort();
    }
}

fn expand_home(raw: &str) -> std::path::PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    Path::new(raw).to_path_buf()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::time::Duration;
    use async_trait::async_trait;
    use serde_json::Value;
    use docchat_core::ChatUpload;

    /// Backend with one canned reply per path; unknown paths are unreachable
    pub struct RouteBackend {
        replies: Vec<(&'static str, u16, &'static str)>,
    }

    impl RouteBackend {
        pub fn new(replies: &[(&'static str, u16, &'static str)]) -> Self {
            Self { replies: replies.to_vec() }
        }

        fn reply(&self, path: &str) -> docchat_core::Result<RawResponse> {
            self.replies
                .iter()
                .find(|(route, _, _)| *route == path)
                .map(|(_, status, body)| RawResponse { status: *status, body: body.to_string() })
                .ok_or_else(|| Error::Transport(format!("no route for {}", path)))
        }
    }

    #[async_trait]
    impl Backend for RouteBackend {
        async fn post_json(&self, path: &str, _body: &Value) -> docchat_core::Result<RawResponse> {
            self.reply(path)
        }

        async fn post_multipart(&self, path: &str, _bearer: &str, _upload: &ChatUpload) -> docchat_core::Result<RawResponse> {
            self.reply(path)
        }
    }

    pub fn app_with(dir: &tempfile::TempDir, backend: RouteBackend) -> App {
        let store = FileStore::open(dir.path().join("session.json")).unwrap();
        App::new(Arc::new(backend), store, "http://test".to_string())
    }

    pub fn has_pending_requests(app: &App) -> bool {
        app.pending.login.is_some() || app.pending.register.is_some() || app.pending.chat.is_some()
    }

    /// Poll until every spawned request has been handed back to its form
    pub async fn settle(app: &mut App) {
        for _ in 0..200 {
            app.poll_pending(Instant::now()).await;
            if !has_pending_requests(app) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("requests never finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::{app_with, has_pending_requests, settle, RouteBackend};
    use std::time::Duration;
    use docchat_core::{HttpBackend, KeyValueStore};
    use docchat_core::session::ACCESS_TOKEN_KEY;

    fn app_with_store(dir: &tempfile::TempDir) -> App {
        let store = FileStore::open(dir.path().join("session.json")).unwrap();
        // Port 9 (discard) is never contacted by these tests
        let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new("http://127.0.0.1:9"));
        App::new(backend, store, "http://127.0.0.1:9".to_string())
    }

    #[test]
    fn test_routes_map_to_screens() {
        assert_eq!(Screen::for_route("/user/login/"), Screen::Login);
        assert_eq!(Screen::for_route("/user/login"), Screen::Login);
        assert_eq!(Screen::for_route("/user/register/"), Screen::Register);
        assert_eq!(Screen::for_route("/user/upload/"), Screen::Chat);
        assert_eq!(Screen::for_route("/anything/else/"), Screen::Chat);
    }

    #[test]
    fn test_starts_on_login_without_token() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with_store(&dir);
        assert_eq!(app.screen, Screen::Login);
    }

    #[test]
    fn test_starts_on_chat_with_token() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = FileStore::open(dir.path().join("session.json")).unwrap();
            store.set(ACCESS_TOKEN_KEY, "A").unwrap();
        }
        let app = app_with_store(&dir);
        assert_eq!(app.screen, Screen::Chat);
    }

    #[test]
    fn test_redirect_fires_after_delay() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_store(&dir);
        let start = Instant::now();

        app.schedule(Navigation::after("/user/upload/", Duration::from_millis(1000)), start);
        assert!(app.has_pending_redirect());

        app.tick(start + Duration::from_millis(500));
        assert_eq!(app.screen, Screen::Login);

        app.tick(start + Duration::from_millis(1000));
        assert_eq!(app.screen, Screen::Chat);
        assert!(!app.has_pending_redirect());
    }

    #[test]
    fn test_logout_clears_tokens_and_returns_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_store(&dir);
        app.store.set(ACCESS_TOKEN_KEY, "A").unwrap();
        app.navigate("/user/upload/");
        app.show_logout_confirm = true;

        app.confirm_logout();

        assert_eq!(app.screen, Screen::Login);
        assert!(!app.show_logout_confirm);
        assert_eq!(session::access_token(&app.store), None);
    }

    #[tokio::test]
    async fn test_chat_without_token_stays_local() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_store(&dir);
        app.navigate("/user/upload/");
        app.chat.input = "hello".to_string();

        app.submit_chat();

        assert!(!has_pending_requests(&app));
        let transcript = app.chat.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].content, "Please log in to continue.");
    }

    #[test]
    fn test_attach_rejects_missing_file_and_accepts_real_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_store(&dir);
        app.navigate("/user/upload/");

        app.open_attach_input();
        app.attach_input = dir.path().join("missing.pdf").display().to_string();
        app.attach_from_input();
        assert!(app.show_attach_input);
        assert!(app.attach_error.is_some());

        let real = dir.path().join("notes.txt");
        std::fs::write(&real, "hi").unwrap();
        app.attach_input = real.display().to_string();
        app.attach_from_input();
        assert!(!app.show_attach_input);
        assert_eq!(app.chat.attachments()[0].name, "notes.txt");
    }

    #[test]
    fn test_remove_selected_attachment_moves_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_store(&dir);
        app.chat.add_attachments([
            Attachment::from_path("a.txt"),
            Attachment::from_path("b.txt"),
        ]);

        app.focus_attachments();
        app.attachment_nav_down();
        app.remove_selected_attachment();
        assert_eq!(app.attachment_state.selected(), Some(0));

        app.remove_selected_attachment();
        assert!(app.chat.attachments().is_empty());
        assert_eq!(app.chat_focus, ChatFocus::Input);
    }

    #[tokio::test]
    async fn test_login_and_register_in_flight_together_both_finish() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(&dir, RouteBackend::new(&[
            (LOGIN_PATH, 200, r#"{"success":true,"access":"A"}"#),
            (REGISTER_PATH, 400, r#"{"detail":"Username already exists"}"#),
        ]));

        app.login.username = "alice".to_string();
        app.login.password = "secret1".to_string();
        app.submit_login();
        assert!(app.login.is_busy());

        app.navigate(REGISTER_ROUTE);
        app.register.username = "bob".to_string();
        app.register.password = "Abcdef1!".to_string();
        app.submit_register();
        assert!(app.register.is_busy());

        settle(&mut app).await;

        assert!(!app.login.is_busy());
        assert_eq!(session::access_token(&app.store).as_deref(), Some("A"));
        assert!(!app.register.is_busy());
        assert_eq!(app.register.notice().unwrap().text, "Username already exists");
        assert!(app.has_pending_redirect());
    }

    #[tokio::test]
    async fn test_navigating_to_a_form_drops_its_old_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(&dir, RouteBackend::new(&[
            (LOGIN_PATH, 200, r#"{"success":true,"access":"A"}"#),
        ]));

        app.login.username = "alice".to_string();
        app.login.password = "secret1".to_string();
        app.submit_login();
        app.navigate(LOGIN_ROUTE);

        assert!(!has_pending_requests(&app));
        assert!(!app.login.is_busy());
    }
}
