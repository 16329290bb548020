//! Structured notification message and its webhook wire shape.

use serde::Serialize;

/// The message the composer builds. This is the exact structure handed to the
/// sink; delivery formatting is the sink's concern.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    /// Optional plain-text line rendered above the embed (e.g. a mention).
    pub content: Option<String>,
    pub title: String,
    pub fields: Vec<Field>,
    pub footer: Option<Footer>,
}

/// Key-value field on the embed; `inline` requests compact rendering.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Run-provenance footer linking the notification back to the automation run
/// that produced it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Footer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Discord webhook payload: one embed carrying the fields and footer.
#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
pub struct Embed {
    pub title: String,
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<Footer>,
}

impl From<&Message> for WebhookPayload {
    fn from(message: &Message) -> Self {
        Self {
            content: message.content.clone(),
            embeds: vec![Embed {
                title: message.title.clone(),
                fields: message.fields.clone(),
                footer: message.footer.clone(),
            }],
        }
    }
}
