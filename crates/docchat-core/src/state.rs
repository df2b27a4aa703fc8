//! UI-agnostic chat state types
//!
//! These are shared by every front end and don't depend on any UI framework.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

/// A transcript entry in the chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Names of the files sent along with a user message
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, attachments: Vec<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            attachments,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            attachments: Vec::new(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A file picked for upload but not sent yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub path: PathBuf,
}

impl Attachment {
    /// Build an attachment from a path, using the final path component as its name
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_name_is_file_name() {
        let attachment = Attachment::from_path("/tmp/reports/q3.pdf");
        assert_eq!(attachment.name, "q3.pdf");
        assert_eq!(attachment.path, PathBuf::from("/tmp/reports/q3.pdf"));
    }

    #[test]
    fn test_assistant_message_has_no_attachments() {
        let msg = ChatMessage::assistant("hi");
        assert_eq!(msg.role, ChatRole::Assistant);
        assert!(msg.attachments.is_empty());
    }
}
