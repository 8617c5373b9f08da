//! Maps free-text generation failures to user-facing guidance.
//!
//! The service reports failures only as message text, so classification is
//! substring matching. Rules are evaluated in order; the first match wins.

use std::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub message: String,
    /// The failure looks like a credential problem; ask the user to pick another key.
    pub reopen_credentials: bool,
}

struct Rule {
    matches: fn(&str) -> bool,
    message: &'static str,
    reopen_credentials: bool,
}

pub const MODEL_NOT_FOUND_MESSAGE: &str = "Model not found. This can be caused by an invalid API key or permission issues. Please check your API key.";

pub const INVALID_KEY_MESSAGE: &str = "Your API key is invalid or lacks permissions. Please select a valid, billing-enabled API key.";

const RULES: &[Rule] = &[
    Rule {
        matches: |text| text.contains("Requested entity was not found."),
        message: MODEL_NOT_FOUND_MESSAGE,
        reopen_credentials: true,
    },
    Rule {
        matches: |text| {
            text.contains("API_KEY_INVALID")
                || text.contains("API key not valid")
                || text.to_lowercase().contains("permission denied")
        },
        message: INVALID_KEY_MESSAGE,
        reopen_credentials: true,
    },
];

pub fn classify(text: &str) -> Classification {
    RULES
        .iter()
        .find(|rule| (rule.matches)(text))
        .map(|rule| Classification {
            message: rule.message.to_string(),
            reopen_credentials: rule.reopen_credentials,
        })
        .unwrap_or_else(|| Classification {
            message: format!("Video generation failed: {}", text),
            reopen_credentials: false,
        })
}

pub fn classify_error(error: &(dyn Error + Send + Sync)) -> Classification {
    classify(&error.to_string())
}
