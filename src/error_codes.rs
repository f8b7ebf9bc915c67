use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

pub const MISSING_PARAMETER: &str = "MISSING_PARAMETER";
pub const INVALID_FORMAT: &str = "INVALID_FORMAT";
pub const INVALID_COLOR: &str = "INVALID_COLOR";
pub const RENDER_FAILED: &str = "RENDER_FAILED";
pub const ENCODE_FAILED: &str = "ENCODE_FAILED";

/// Failures reported across the engine boundary.
///
/// The first three are caller-input errors and map to a 400 at the HTTP
/// shell. `Render` and `Encode` indicate a defect in the engine itself.
#[derive(Debug, Error)]
pub enum CountdownError {
    #[error("required parameter 'end' is missing")]
    MissingParameter,

    #[error("deadline '{input}' is not YYYY-MM-DDTHH:MM[:SS] with an optional UTC offset")]
    InvalidFormat { input: String },

    #[error("invalid color '{value}' for '{field}'")]
    InvalidColor { field: &'static str, value: String },

    #[error("render failed: {0}")]
    Render(String),

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, CountdownError>;

impl CountdownError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingParameter => MISSING_PARAMETER,
            Self::InvalidFormat { .. } => INVALID_FORMAT,
            Self::InvalidColor { .. } => INVALID_COLOR,
            Self::Render(_) => RENDER_FAILED,
            Self::Encode(_) => ENCODE_FAILED,
        }
    }

    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter | Self::InvalidFormat { .. } | Self::InvalidColor { .. }
        )
    }

    pub fn http_status(&self) -> u16 {
        if self.is_caller_error() {
            400
        } else {
            500
        }
    }

    /// Fixed, human-readable text the HTTP shell sends back with the status.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingParameter => {
                "Parâmetro 'end' é obrigatório. Exemplo: ?end=2025-12-31T23:59:59".to_owned()
            }
            Self::InvalidFormat { .. } => "Formato inválido. Use: YYYY-MM-DDTHH:MM:SS".to_owned(),
            Self::InvalidColor { field, .. } => {
                format!("Cor inválida para '{field}'. Use: RRGGBB, #RRGGBB ou um nome de cor")
            }
            Self::Render(_) | Self::Encode(_) => "Erro interno ao gerar a imagem".to_owned(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::MissingParameter => Some(json!({ "parameter": "end" })),
            Self::InvalidFormat { input } => Some(json!({
                "provided": input,
                "accepted": ["YYYY-MM-DDTHH:MM", "YYYY-MM-DDTHH:MM:SS"]
            })),
            Self::InvalidColor { field, value } => Some(json!({
                "parameter": field,
                "provided": value
            })),
            Self::Render(_) | Self::Encode(_) => None,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: self.code().to_owned(),
                message: self.to_string(),
                details: self.details(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub fn find_countdown_error(error: &anyhow::Error) -> Option<&CountdownError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CountdownError>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_map_to_bad_request() {
        assert_eq!(CountdownError::MissingParameter.http_status(), 400);
        assert_eq!(
            CountdownError::InvalidFormat {
                input: "31-12-2025".to_owned()
            }
            .http_status(),
            400
        );
        assert_eq!(CountdownError::Render("boom".to_owned()).http_status(), 500);
    }

    #[test]
    fn missing_and_invalid_deadline_messages_differ() {
        let missing = CountdownError::MissingParameter.user_message();
        let invalid = CountdownError::InvalidFormat {
            input: "x".to_owned(),
        }
        .user_message();
        assert_ne!(missing, invalid);
        assert!(missing.contains("'end'"));
    }

    #[test]
    fn envelope_carries_code_and_details() {
        let error = CountdownError::InvalidColor {
            field: "bg",
            value: "#12".to_owned(),
        };
        let value = serde_json::to_value(error.envelope()).expect("envelope should serialize");
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"]["code"], INVALID_COLOR);
        assert_eq!(value["error"]["details"]["parameter"], "bg");
    }

    #[test]
    fn coded_error_is_found_through_anyhow_context() {
        let error = anyhow::Error::new(CountdownError::MissingParameter).context("while rendering");
        let found = find_countdown_error(&error).expect("countdown error should be in chain");
        assert_eq!(found.code(), MISSING_PARAMETER);
    }
}
