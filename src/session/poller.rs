//! Background polling worker
//!
//! One cycle per second: re-send the active channel selection, request a
//! reading, convert, publish. The worker checks the stop flag at the top of
//! each cycle and never propagates a failure out of the loop; a bad cycle
//! publishes an unavailable marker and the next tick starts fresh.

use log::debug;
use std::collections::HashSet;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::activity::{self, correct_now};
use crate::protocol::{clean_response, parse_reading, ResponseError};
use crate::session::{SessionEvent, SessionState};

/// Length of one poll cycle
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Fixed display text while readings are unavailable
pub const UNAVAILABLE: &str = "-------------";

/// Poll until the stop flag clears
///
/// The in-flight cycle always completes before the worker exits, so the
/// owner can join this thread and only then release the connection.
pub fn run(state: Arc<SessionState>, events: Sender<SessionEvent>) {
    let mut warned_no_constant: HashSet<String> = HashSet::new();

    while state.running() {
        let started = Instant::now();

        poll_cycle(&state, &events, &mut warned_no_constant);

        if let Some(remaining) = POLL_INTERVAL.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }
}

fn poll_cycle(
    state: &SessionState,
    events: &Sender<SessionEvent>,
    warned_no_constant: &mut HashSet<String>,
) {
    let (isotope_name, unit) = state.selection_snapshot();

    let Some(isotope) = state.catalog_entry(&isotope_name) else {
        let _ = events.send(SessionEvent::Warning(format!(
            "unknown isotope selected: {isotope_name}"
        )));
        return;
    };

    let raw = match state.poll_reading(&isotope.channel) {
        Ok(Some(raw)) => raw,
        // Read timeout: the device had nothing for us, leave the display alone
        Ok(None) => return,
        Err(e) => {
            debug!("poll exchange failed: {e:#}");
            let _ = events.send(SessionEvent::Unavailable);
            return;
        }
    };

    let becquerels = match parse_reading(&raw) {
        Ok(value) => value,
        Err(ResponseError::Empty) => return,
        Err(e) => {
            debug!("poll response rejected: {e}");
            let _ = events.send(SessionEvent::Unavailable);
            return;
        }
    };

    let converted = unit.convert(becquerels);
    let _ = events.send(SessionEvent::Reading(activity::format_reading(
        converted,
        unit,
        &isotope.name,
    )));
    let _ = events.send(SessionEvent::Log(clean_response(&raw)));

    if let Some(reference) = state.reference() {
        match correct_now(converted, &isotope, reference) {
            Ok(corrected) => {
                let _ = events.send(SessionEvent::Corrected(activity::format_corrected(
                    corrected,
                    unit,
                    &isotope.name,
                    reference,
                )));
            }
            Err(e) => {
                if warned_no_constant.insert(isotope.name.clone()) {
                    let _ = events.send(SessionEvent::Warning(e.to_string()));
                }
            }
        }
    }
}
