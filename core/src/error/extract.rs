use thiserror::Error;

/// Closed set of extraction failures.
///
/// The discriminant is stable and machine-readable (`code()`); only
/// `InvalidJson` carries free-form detail, and only as a suffix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("empty")]
    Empty,
    #[error("invalid-json:{0}")]
    InvalidJson(String),
    #[error("json-not-object")]
    JsonNotObject,
    #[error("unsupported-version")]
    UnsupportedVersion,
    #[error("cases-not-array")]
    CasesNotArray,
    #[error("no-json-object")]
    NoJsonObject,
}

impl ExtractError {
    /// Stable code without the detail suffix.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::InvalidJson(_) => "invalid-json",
            Self::JsonNotObject => "json-not-object",
            Self::UnsupportedVersion => "unsupported-version",
            Self::CasesNotArray => "cases-not-array",
            Self::NoJsonObject => "no-json-object",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::InvalidJson(detail) => Some(detail.as_str()),
            _ => None,
        }
    }
}

/// Result of a structured extraction: a pure function of the input text.
pub type ExtractionResult<T> = Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_codes() {
        assert_eq!(ExtractError::Empty.to_string(), "empty");
        assert_eq!(
            ExtractError::InvalidJson("EOF while parsing".into()).to_string(),
            "invalid-json:EOF while parsing"
        );
        assert_eq!(ExtractError::NoJsonObject.to_string(), "no-json-object");
    }

    #[test]
    fn code_strips_detail() {
        let err = ExtractError::InvalidJson("expected value".into());
        assert_eq!(err.code(), "invalid-json");
        assert_eq!(err.detail(), Some("expected value"));
        assert_eq!(ExtractError::CasesNotArray.detail(), None);
    }
}
