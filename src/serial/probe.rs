//! Calibrator detection
//!
//! Walks the host's serial ports and probes each one with a background-off
//! command until a device acknowledges. The VIK-202 answers `>OK` to every
//! accepted command, so a correct acknowledgement on a freshly opened port
//! identifies the calibrator.

use anyhow::Result;
use log::{debug, info, warn};

use crate::protocol::{Command, OK_RESPONSE};
use crate::serial::port::{self, PortConfig, SerialConnection};

/// Check whether a probe response identifies the calibrator
pub fn is_probe_ack(line: &str) -> bool {
    line.trim() == OK_RESPONSE
}

/// Probe a single port for the calibrator
///
/// Opens the port with calibrator settings, sends `!BOFF`, and accepts the
/// port only when the device acknowledges. Probing with background-off also
/// leaves the device in a known subtraction state for the session.
pub fn probe_port(path: &str) -> Result<Option<SerialConnection>> {
    let mut conn = SerialConnection::open(PortConfig::new(path))?;
    conn.clear_buffers()?;
    conn.write_str(&Command::BackgroundOff.encode())?;
    conn.flush()?;

    match conn.read_line()? {
        Some(ref line) if is_probe_ack(line) => Ok(Some(conn)),
        Some(line) => {
            debug!("{}: unexpected probe response: {:?}", path, line);
            Ok(None)
        }
        None => {
            debug!("{}: no probe response", path);
            Ok(None)
        }
    }
}

/// Try every visible serial port in order and return the first connection
/// hosting a calibrator
///
/// Ports that cannot be opened (busy, permission denied) are skipped with a
/// warning. Returns `Ok(None)` when no port qualifies; there is no retry.
pub fn find_calibrator() -> Result<Option<SerialConnection>> {
    for info in port::list_ports()? {
        debug!("Probing {}", info.path);
        match probe_port(&info.path) {
            Ok(Some(conn)) => {
                info!("Calibrator found on {}", info.path);
                return Ok(Some(conn));
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping {}: {}", info.path, e),
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_ack() {
        assert!(is_probe_ack(">OK"));
        assert!(is_probe_ack("  >OK\r"));
    }

    #[test]
    fn test_probe_rejects_other_responses() {
        assert!(!is_probe_ack(""));
        assert!(!is_probe_ack(">ERR"));
        assert!(!is_probe_ack("OK"));
        assert!(!is_probe_ack(">OK 123"));
    }
}
