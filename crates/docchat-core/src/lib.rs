pub mod backend;
pub mod config;
pub mod error;
pub mod forms;
pub mod response;
pub mod session;
pub mod state;
pub mod store;
pub mod strength;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use backend::{Backend, ChatUpload, HttpBackend, RawResponse};
pub use config::Config;
pub use error::{Error, Result};
pub use forms::{ChatForm, ChatStep, LoginForm, Navigation, Notice, NoticeKind, RegisterForm};
pub use response::ResponseClass;
pub use state::{Attachment, ChatMessage, ChatRole};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use strength::{PasswordStrength, StrengthTier};
