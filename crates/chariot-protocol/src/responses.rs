//! Response parsing.
//!
//! A decoded response frame starts with a status token followed by a text
//! reason and optional content:
//!
//! - `2.01 CREATED`
//! - `2.05 CONTENT <payload>`
//! - `4.04 NOT_FOUND`
//! - `5.04 TIMEOUT`
//!
//! Any status whose text begins with `2.` is a success.

use std::fmt;

use crate::error::{ProtocolError, ProtocolResult};

/// Header the peer places before returned content.
pub const CONTENT_HEADER: &str = "2.05 CONTENT ";

/// A parsed `major.minor` status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode {
    /// Class digit (2 success, 4 client error, 5 server error).
    pub major: u8,
    /// Detail code within the class.
    pub minor: u8,
}

impl StatusCode {
    /// `2.01 CREATED`
    pub const CREATED: StatusCode = StatusCode { major: 2, minor: 1 };
    /// `2.04 CHANGED`
    pub const CHANGED: StatusCode = StatusCode { major: 2, minor: 4 };
    /// `2.05 CONTENT`
    pub const CONTENT: StatusCode = StatusCode { major: 2, minor: 5 };
    /// `4.04 NOT_FOUND`
    pub const NOT_FOUND: StatusCode = StatusCode { major: 4, minor: 4 };
    /// `5.04 TIMEOUT`
    pub const GATEWAY_TIMEOUT: StatusCode = StatusCode { major: 5, minor: 4 };

    /// Parse a status token such as `2.05`.
    pub fn parse(token: &str) -> ProtocolResult<StatusCode> {
        let invalid = || ProtocolError::InvalidStatus(token.to_string());
        let (major, minor) = token.split_once('.').ok_or_else(invalid)?;
        if major.len() != 1 || minor.is_empty() || minor.len() > 2 {
            return Err(invalid());
        }
        let major: u8 = major.parse().map_err(|_| invalid())?;
        let minor: u8 = minor.parse().map_err(|_| invalid())?;
        Ok(StatusCode { major, minor })
    }

    /// Check if this is a success code.
    pub fn is_success(&self) -> bool {
        self.major == 2
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

/// A decoded response frame.
///
/// The full text is kept so failures can be reported verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    text: String,
}

impl Response {
    /// Wrap decoded frame content. Surrounding whitespace is trimmed.
    pub fn parse(content: &str) -> Response {
        Response {
            text: content.trim().to_string(),
        }
    }

    /// The full response text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the response, returning its text.
    pub fn into_text(self) -> String {
        self.text
    }

    /// First whitespace-delimited token.
    pub fn status_token(&self) -> &str {
        self.text.split_whitespace().next().unwrap_or("")
    }

    /// Parsed status code.
    pub fn status(&self) -> ProtocolResult<StatusCode> {
        StatusCode::parse(self.status_token())
    }

    /// Check if the status token marks success.
    pub fn is_success(&self) -> bool {
        self.status_token().starts_with("2.")
    }

    /// Check if this response carries the given status.
    pub fn has_status(&self, code: StatusCode) -> bool {
        self.status().map(|s| s == code).unwrap_or(false)
    }

    /// Everything after the status token.
    pub fn reason(&self) -> &str {
        let token = self.status_token();
        self.text
            .find(token)
            .map(|at| self.text[at + token.len()..].trim_start())
            .unwrap_or("")
    }

    /// Returned content: the text after a `2.05 CONTENT ` header, or the whole
    /// text when there is no such header.
    pub fn content(&self) -> &str {
        match self.text.find(CONTENT_HEADER) {
            Some(at) => &self.text[at + CONTENT_HEADER.len()..],
            None => &self.text,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_created() {
        let response = Response::parse("2.01 CREATED");
        assert!(response.is_success());
        assert_eq!(response.status().unwrap(), StatusCode::CREATED);
        assert!(response.has_status(StatusCode::CREATED));
        assert_eq!(response.reason(), "CREATED");
    }

    #[test]
    fn test_parse_not_found() {
        let response = Response::parse("4.04 NOT_FOUND");
        assert!(!response.is_success());
        assert_eq!(response.text(), "4.04 NOT_FOUND");
        assert_eq!(response.status().unwrap(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_parse_trims() {
        let response = Response::parse("\r\n2.04 CHANGED\r\n");
        assert_eq!(response.text(), "2.04 CHANGED");
        assert!(response.has_status(StatusCode::CHANGED));
    }

    #[test]
    fn test_content() {
        let response = Response::parse("2.05 CONTENT 21.5C");
        assert_eq!(response.content(), "21.5C");

        let response = Response::parse("2.01 CREATED");
        assert_eq!(response.content(), "2.01 CREATED");
    }

    #[test]
    fn test_invalid_status() {
        let response = Response::parse("Chariot ready");
        assert!(!response.is_success());
        assert!(response.status().is_err());
        assert!(StatusCode::parse("2.").is_err());
        assert!(StatusCode::parse("22.01").is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(StatusCode::GATEWAY_TIMEOUT.to_string(), "5.04");
        assert_eq!(StatusCode::parse("2.5").unwrap(), StatusCode::CONTENT);
    }
}
