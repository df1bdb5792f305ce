//! Serial link to the dose calibrator
//!
//! This module provides functionality for:
//! - Listing available serial ports
//! - Opening the fixed-parameter connection the calibrator expects
//! - Probing ports until the calibrator acknowledges

pub mod port;
pub mod probe;

pub use port::{PortConfig, SerialConnection};
pub use probe::find_calibrator;
