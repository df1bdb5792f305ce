//! Response decoding
//!
//! Readings arrive as plain decimal text. When a channel-select
//! acknowledgement and the reading land in the same receive buffer the
//! device prefixes the reading with `>OK\r>`; that marker is stripped
//! before parsing.

use thiserror::Error;

/// Acknowledgement sent for every accepted command
pub const OK_RESPONSE: &str = ">OK";

/// Acknowledgement marker embedded ahead of a reading
const READING_MARKER: &str = ">OK\r>";

/// Failure modes of a reading response
#[derive(Debug, Error, PartialEq)]
pub enum ResponseError {
    /// The read timed out with nothing buffered
    #[error("no response from device")]
    Empty,
    /// The device sent text that does not parse as a number
    #[error("malformed reading: {0:?}")]
    Malformed(String),
}

/// Strip whitespace and the embedded acknowledgement marker
pub fn clean_response(raw: &str) -> String {
    raw.trim().replace(READING_MARKER, "").trim().to_string()
}

/// Parse an activity reading in becquerels
pub fn parse_reading(raw: &str) -> Result<f64, ResponseError> {
    let text = clean_response(raw);
    if text.is_empty() {
        return Err(ResponseError::Empty);
    }
    text.parse::<f64>()
        .map_err(|_| ResponseError::Malformed(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_reading() {
        assert_eq!(parse_reading("3700000"), Ok(3_700_000.0));
        assert_eq!(parse_reading(" 123.4 "), Ok(123.4));
    }

    #[test]
    fn test_parse_strips_ack_marker() {
        assert_eq!(parse_reading(">OK\r>123.4"), Ok(123.4));
    }

    #[test]
    fn test_empty_response_is_distinct() {
        assert_eq!(parse_reading(""), Err(ResponseError::Empty));
        assert_eq!(parse_reading("   "), Err(ResponseError::Empty));
    }

    #[test]
    fn test_malformed_reading() {
        assert_eq!(
            parse_reading(">ERR"),
            Err(ResponseError::Malformed(">ERR".to_string()))
        );
        assert_eq!(
            parse_reading(">OK\r>not-a-number"),
            Err(ResponseError::Malformed("not-a-number".to_string()))
        );
    }
}
