//! VIK-202 wire protocol
//!
//! The calibrator speaks a line-oriented ASCII protocol: one command per
//! line terminated by a carriage return, one textual response per command.
//! Accepted commands are acknowledged with a `>OK` prefix.

pub mod command;
pub mod response;

pub use command::{Command, COMMAND_REFERENCE};
pub use response::{clean_response, parse_reading, ResponseError, OK_RESPONSE};
