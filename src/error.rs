//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum DotsmithError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Request payload rejected: {details}")]
    PayloadInvalid { details: String },

    #[error("Contract schema did not compile: {details}")]
    SchemaInvalid { details: String },
}

impl FixSuggestion for DotsmithError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            DotsmithError::Io(_) => Some("Check file path and permissions"),
            DotsmithError::JsonParse(_) => {
                Some("Check the request file is valid JSON (try: jq . <file>)")
            }
            DotsmithError::PayloadInvalid { .. } => Some(
                "Match the input contract: {\"command\": \"render_graph\", \"parameters\": {\"nodes\": [...], \"edges\": [...]}}",
            ),
            DotsmithError::SchemaInvalid { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_errors_carry_a_suggestion() {
        let err = DotsmithError::PayloadInvalid {
            details: "missing nodes".into(),
        };
        assert!(err.fix_suggestion().is_some());
        assert!(err.to_string().contains("missing nodes"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: DotsmithError = io.into();
        assert!(matches!(err, DotsmithError::Io(_)));
    }
}
