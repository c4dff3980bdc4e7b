use serde::{Deserialize, Serialize};

/// Body of every `POST /blocks/new` answer.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub accepted: bool,
    pub message: String,
}

impl SubmitResponse {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            message: "Block accepted.".to_string(),
        }
    }

    pub fn rejected(reason: impl std::fmt::Display) -> Self {
        Self {
            accepted: false,
            message: format!("Invalid block. {reason}"),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
