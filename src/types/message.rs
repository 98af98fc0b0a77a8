use serde::{Deserialize, Serialize};

use super::errors::ValidationError;

/// Body of `POST /chat`. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_content: String,
}

/// Body of `POST /sets`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddValueRequest {
    #[serde(default)]
    pub value: Option<String>,
}

/// Query string shared by both `/sets` endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetQuery {
    #[serde(default)]
    pub set_name: Option<String>,
}

impl SetQuery {
    pub fn require_set_name(&self) -> Result<&str, ValidationError> {
        match self.set_name.as_deref() {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(ValidationError::MissingSetName),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub message: String,
    pub token: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetValuesResponse {
    pub set_name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Parse an optional JSON body. An empty body yields the type's default.
pub fn parse_optional_body<T>(body: &[u8]) -> Result<T, ValidationError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ValidationError::InvalidBody(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_defaults() {
        let req: ChatRequest = parse_optional_body(b"").unwrap();
        assert_eq!(req, ChatRequest::default());

        let req: ChatRequest = parse_optional_body(br#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.message, "hi");
        assert_eq!(req.file_name, "");
        assert_eq!(req.file_content, "");
    }

    #[test]
    fn test_chat_request_camel_case_fields() {
        let req: ChatRequest = parse_optional_body(
            br#"{"message":"read this","fileName":"plan.txt","fileContent":"oats"}"#,
        )
        .unwrap();
        assert_eq!(req.file_name, "plan.txt");
        assert_eq!(req.file_content, "oats");
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let err = parse_optional_body::<ChatRequest>(b"{not json").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidBody(_)));

        let err = parse_optional_body::<ChatRequest>(br#"{"message":42}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidBody(_)));
    }

    #[test]
    fn test_set_query_requires_name() {
        assert_eq!(
            SetQuery::default().require_set_name(),
            Err(ValidationError::MissingSetName)
        );
        let empty = SetQuery { set_name: Some(String::new()) };
        assert_eq!(empty.require_set_name(), Err(ValidationError::MissingSetName));
        let named = SetQuery { set_name: Some("allergies".into()) };
        assert_eq!(named.require_set_name(), Ok("allergies"));
    }
}
