//! Errors raised while building story values from authored content.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Content breaks a story rule (missing stage, blank choice text, dangling link)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Blank or otherwise unusable identifier
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Content that could not be decoded at all
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    /// ```ignore
    /// if chapter.choices.iter().any(|c| c.text.is_empty()) {
    ///     return Err(DomainError::validation("choice has no text"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_detail() {
        assert_eq!(
            DomainError::validation("chapter 'cellar' has no exit").to_string(),
            "Validation failed: chapter 'cellar' has no exit"
        );
        assert_eq!(
            DomainError::invalid_id("chapter id cannot be empty").to_string(),
            "Invalid ID format: chapter id cannot be empty"
        );
    }
}
