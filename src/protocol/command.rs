//! Command encoding for the calibrator's ASCII protocol
//!
//! Command format: `!<MNEMONIC>\r`. Channel selection appends the channel's
//! calibration code to `!F`; the catalog stores the full command text.

use std::fmt;

/// Commands understood by the calibrator
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Read the current activity in becquerels (`!R`)
    Read,
    /// Enable background subtraction (`!BON`)
    BackgroundOn,
    /// Disable background subtraction (`!BOFF`)
    BackgroundOff,
    /// Start an autozero cycle (`!Z`)
    Autozero,
    /// Fetch the autozero result (`!A`)
    AutozeroResult,
    /// Select a calibration channel; holds the full command text
    /// (e.g. `!F236` for the Tc-99m channel)
    SelectChannel(String),
    /// User-supplied command sent verbatim
    Raw(String),
}

impl Command {
    /// Wire text of the command, without the terminator
    pub fn as_str(&self) -> &str {
        match self {
            Command::Read => "!R",
            Command::BackgroundOn => "!BON",
            Command::BackgroundOff => "!BOFF",
            Command::Autozero => "!Z",
            Command::AutozeroResult => "!A",
            Command::SelectChannel(code) => code,
            Command::Raw(text) => text,
        }
    }

    /// Encode the command with its trailing carriage return
    pub fn encode(&self) -> String {
        format!("{}\r", self.as_str())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Device command reference, as printed by `activimeter commands`
///
/// Mirrors the command set of the VIK-202 service manual, including the
/// introspection commands that are only ever sent as passthrough.
pub const COMMAND_REFERENCE: &[(&str, &str)] = &[
    ("!R", "activity value (Bq)"),
    ("!BON", "background subtraction ON"),
    ("!BOFF", "background subtraction OFF"),
    ("!Z", "autozero"),
    ("!A", "autozero result"),
    ("!V", "HV battery voltage"),
    ("!GQ", "chamber current in amperes"),
    ("!GE1", "bias value"),
    ("!P1XX", "set bias (XX = desired value)"),
    ("!GV", "software version"),
    ("!GP", "preamplifier value"),
    ("!GI", "I-to-UB value"),
    ("!GF", "calibration factor value"),
    ("!GH", "high energy gain"),
    ("!GL", "low energy gain"),
    ("!F889", "high energy gain channel"),
    ("!F380", "low energy gain channel"),
    ("*!FX", "add channel (X = calibration factor)"),
    ("thhmm", "decay-correct readings to hh:mm"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_fixed_commands() {
        assert_eq!(Command::Read.encode(), "!R\r");
        assert_eq!(Command::BackgroundOn.encode(), "!BON\r");
        assert_eq!(Command::BackgroundOff.encode(), "!BOFF\r");
        assert_eq!(Command::Autozero.encode(), "!Z\r");
        assert_eq!(Command::AutozeroResult.encode(), "!A\r");
    }

    #[test]
    fn test_encode_channel_select() {
        let cmd = Command::SelectChannel("!F236".to_string());
        assert_eq!(cmd.encode(), "!F236\r");
        assert_eq!(cmd.to_string(), "!F236");
    }

    #[test]
    fn test_encode_raw_passthrough() {
        let cmd = Command::Raw("!GQ".to_string());
        assert_eq!(cmd.encode(), "!GQ\r");
    }
}
