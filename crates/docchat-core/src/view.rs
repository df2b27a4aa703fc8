//! Display descriptions of chat state
//!
//! Front ends draw these instead of reading form state directly, so what a
//! transcript looks like can be tested without a terminal.

use crate::state::{Attachment, ChatMessage, ChatRole};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub role: ChatRole,
    pub avatar: &'static str,
    /// File names shown above the body
    pub files: Vec<String>,
    pub body: String,
    /// Assistant replies that mention an error get error styling
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentChip {
    /// Position to pass back to `ChatForm::remove_attachment`
    pub index: usize,
    pub label: String,
}

pub fn transcript_view(messages: &[ChatMessage]) -> Vec<MessageView> {
    messages.iter().map(message_view).collect()
}

fn message_view(message: &ChatMessage) -> MessageView {
    let avatar = match message.role {
        ChatRole::User => "U",
        ChatRole::Assistant => "AI",
    };

    MessageView {
        role: message.role,
        avatar,
        files: message.attachments.clone(),
        body: message.content.clone(),
        is_error: message.role == ChatRole::Assistant && message.content.contains("error"),
    }
}

pub fn attachment_view(attachments: &[Attachment]) -> Vec<AttachmentChip> {
    attachments
        .iter()
        .enumerate()
        .map(|(index, file)| AttachmentChip {
            index,
            label: file.name.clone(),
        })
        .collect()
}
