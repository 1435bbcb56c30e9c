//! Slack incoming-webhook message body.
//!
//! Wire format:
//! ```json
//! {
//!   "attachments": [{
//!     "color": "#54a158",
//!     "title": "Pipeline: App, Stage: build (2/3), State: Succeeded",
//!     "title_link": "https://console.aws.amazon.com/codepipeline/home?region=us-east-1#/view/app"
//!   }]
//! }
//! ```
//! Unset optional fields are omitted.

use serde::{Serialize, Serializer};

use crate::event::EventTime;

/// Severity color of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Grey,
    Blue,
    Green,
    Red,
    Yellow,
}

impl Color {
    pub fn hex(self) -> &'static str {
        match self {
            Self::Grey => "#d0d0d0",
            Self::Blue => "#67d4e2",
            Self::Green => "#54a158",
            Self::Red => "#c3291c",
            Self::Yellow => "#d5a048",
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.hex())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub attachments: Vec<Attachment>,
}

impl NotificationPayload {
    pub fn single(attachment: Attachment) -> Self {
        Self {
            attachments: vec![attachment],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Attachment fields Slack should render as markdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrkdwn_in: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Field>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<EventTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl Field {
    pub fn short(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short: true,
        }
    }
}
