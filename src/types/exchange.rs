//! Interaction log record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::StreamOutcome;

/// One persisted chat turn. Written once after its stream closes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub session_id: String,
    pub user_message: String,
    pub bot_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_file_content: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_identifier: Option<String>,
    pub outcome: StreamOutcome,
    #[serde(default)]
    pub fragments: usize,
}

impl ChatExchange {
    pub fn new(
        session_id: impl Into<String>,
        user_message: impl Into<String>,
        bot_message: impl Into<String>,
        outcome: StreamOutcome,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_message: user_message.into(),
            bot_message: bot_message.into(),
            attached_file_name: None,
            attached_file_content: None,
            timestamp: Utc::now(),
            model_identifier: None,
            outcome,
            fragments: 0,
        }
    }

    /// Attach the uploaded file. Empty strings are stored as absent.
    pub fn with_attachment(mut self, file_name: &str, file_content: &str) -> Self {
        self.attached_file_name = non_empty(file_name);
        self.attached_file_content = non_empty(file_content);
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model_identifier = non_empty(model);
        self
    }

    pub fn with_fragments(mut self, fragments: usize) -> Self {
        self.fragments = fragments;
        self
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_attachment_is_absent() {
        let record = ChatExchange::new("s", "hi", "hello", StreamOutcome::Completed)
            .with_attachment("", "")
            .with_model("");
        assert_eq!(record.attached_file_name, None);
        assert_eq!(record.attached_file_content, None);
        assert_eq!(record.model_identifier, None);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("attached_file_name").is_none());
        assert_eq!(json["outcome"], "completed");
    }

    #[test]
    fn test_attachment_kept() {
        let record = ChatExchange::new("s", "hi", "", StreamOutcome::ClientAbort)
            .with_attachment("menu.txt", "soup")
            .with_model("llama");
        assert_eq!(record.attached_file_name.as_deref(), Some("menu.txt"));
        assert_eq!(record.attached_file_content.as_deref(), Some("soup"));
        assert_eq!(record.model_identifier.as_deref(), Some("llama"));
    }
}
