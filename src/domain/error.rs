use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum KanbanError {
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("rejected by store ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        details: Option<Value>,
    },

    #[error("malformed notification: {0}")]
    MalformedNotification(String),

    #[error("missing precondition: {0}")]
    PreconditionMissing(String),

    #[error("not authenticated")]
    Unauthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl KanbanError {
    pub fn rejected(status: u16, details: Option<Value>) -> Self {
        let message = details
            .as_ref()
            .and_then(Self::detail_message)
            .unwrap_or_else(|| format!("request failed with status {status}"));
        KanbanError::Rejected {
            status,
            message,
            details,
        }
    }

    /// Picks a readable line out of a validation payload. DRF-style bodies use
    /// `detail`, `error`, or a map of field name to a list of messages.
    fn detail_message(details: &Value) -> Option<String> {
        if let Some(s) = details.as_str() {
            return Some(s.to_string());
        }
        for key in ["detail", "error", "message"] {
            if let Some(s) = details.get(key).and_then(Value::as_str) {
                return Some(s.to_string());
            }
        }
        let (field, messages) = details.as_object()?.iter().next()?;
        let first = messages
            .as_array()
            .and_then(|m| m.first())
            .and_then(Value::as_str)
            .or_else(|| messages.as_str())?;
        Some(format!("{field}: {first}"))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, KanbanError::NetworkUnavailable(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, KanbanError::Rejected { .. })
    }

    /// Text shown to the user when an operation fails.
    pub fn notice(&self) -> String {
        match self {
            KanbanError::NetworkUnavailable(_) => "Server unreachable, check your connection".into(),
            KanbanError::Rejected { message, .. } => message.clone(),
            KanbanError::Unauthenticated => "Session expired, please log in again".into(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for KanbanError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return KanbanError::rejected(status.as_u16(), Some(Value::String(err.to_string())));
        }
        KanbanError::NetworkUnavailable(err.to_string())
    }
}
