//! Polling session against a connected calibrator
//!
//! The session owns the serial connection for the lifetime of a console
//! run. The connection sits behind one mutex: a poll cycle's channel-select
//! + read pair and every console-triggered exchange each run under a single
//! lock hold, so request/response pairs never interleave.

pub mod console;
pub mod poller;

pub use console::{dispatch, ConsoleInput, Outcome};
pub use poller::{POLL_INTERVAL, UNAVAILABLE};

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::activity::{ReferenceTime, Unit};
use crate::isotopes::{catalog::CatalogError, Catalog, Isotope};
use crate::protocol::Command;
use crate::serial::SerialConnection;

/// Pause after a channel-select so the chamber electronics settle
pub const CHANNEL_SETTLE: Duration = Duration::from_millis(100);

/// Active isotope and display unit
#[derive(Debug, Clone)]
pub struct Selection {
    pub isotope: String,
    pub unit: Unit,
}

/// Events published to the display surface
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// New primary reading, already formatted
    Reading(String),
    /// Decay-corrected log line
    Corrected(String),
    /// Reading unavailable this cycle
    Unavailable,
    /// Transcript line (device exchange)
    Log(String),
    /// Non-fatal problem worth surfacing
    Warning(String),
}

/// State shared between the poller, the console, and the display
pub struct SessionState {
    connection: Mutex<SerialConnection>,
    selection: Mutex<Selection>,
    catalog: Mutex<Catalog>,
    reference: Mutex<Option<ReferenceTime>>,
    running: AtomicBool,
}

impl SessionState {
    fn lock_connection(&self) -> Result<MutexGuard<'_, SerialConnection>> {
        self.connection
            .lock()
            .map_err(|_| anyhow!("serial connection lock poisoned"))
    }

    /// One command/response exchange under a single lock hold
    pub fn exchange(&self, command: &Command) -> Result<Option<String>> {
        let mut conn = self.lock_connection()?;
        conn.write_str(&command.encode())?;
        conn.flush()?;
        conn.read_line()
    }

    /// Channel-select + read pair, atomic with respect to console traffic
    pub fn poll_reading(&self, channel: &str) -> Result<Option<String>> {
        let mut conn = self.lock_connection()?;
        conn.write_str(&Command::SelectChannel(channel.to_string()).encode())?;
        conn.flush()?;
        std::thread::sleep(CHANNEL_SETTLE);
        conn.write_str(&Command::Read.encode())?;
        conn.flush()?;
        conn.read_line()
    }

    /// Two-step autozero under one lock hold: start, settle, fetch result
    pub fn autozero_exchange(&self) -> Result<(Option<String>, Option<String>)> {
        let mut conn = self.lock_connection()?;
        conn.write_str(&Command::Autozero.encode())?;
        conn.flush()?;
        std::thread::sleep(CHANNEL_SETTLE);
        let started = conn.read_line()?;
        conn.write_str(&Command::AutozeroResult.encode())?;
        conn.flush()?;
        let result = conn.read_line()?;
        Ok((started, result))
    }

    /// Active isotope name and unit
    pub fn selection_snapshot(&self) -> (String, Unit) {
        let sel = self
            .selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (sel.isotope.clone(), sel.unit)
    }

    pub fn set_isotope(&self, name: &str) {
        self.selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .isotope = name.to_string();
    }

    pub fn set_unit(&self, unit: Unit) {
        self.selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unit = unit;
    }

    /// Catalog entry by name, cloned out of the registry
    pub fn catalog_entry(&self, name: &str) -> Option<Isotope> {
        self.catalog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Catalog names in selector order
    pub fn catalog_names(&self) -> Vec<String> {
        self.catalog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Register a console `*!F` channel
    pub fn add_manual_channel(&self, input: &str) -> Result<Isotope, CatalogError> {
        self.catalog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_manual(input)
    }

    pub fn reference(&self) -> Option<ReferenceTime> {
        *self
            .reference
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the decay anchor; it stays set until overwritten
    pub fn set_reference(&self, reference: ReferenceTime) {
        *self
            .reference
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(reference);
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// A running polling session
pub struct Session {
    state: Arc<SessionState>,
    events: Sender<SessionEvent>,
    worker: Option<JoinHandle<()>>,
}

impl Session {
    /// Start the polling worker against an accepted connection
    ///
    /// Returns the session handle and the receiving end of the display
    /// event stream.
    pub fn start(
        connection: SerialConnection,
        catalog: Catalog,
        selection: Selection,
    ) -> (Self, Receiver<SessionEvent>) {
        let state = Arc::new(SessionState {
            connection: Mutex::new(connection),
            selection: Mutex::new(selection),
            catalog: Mutex::new(catalog),
            reference: Mutex::new(None),
            running: AtomicBool::new(true),
        });

        let (tx, rx) = mpsc::channel();
        let worker = {
            let state = Arc::clone(&state);
            let tx = tx.clone();
            std::thread::spawn(move || poller::run(state, tx))
        };

        (
            Self {
                state,
                events: tx,
                worker: Some(worker),
            },
            rx,
        )
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Publish an event to the display surface
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Toggle background subtraction and log the exchange
    pub fn set_background(&self, on: bool) -> Result<()> {
        let command = if on {
            Command::BackgroundOn
        } else {
            Command::BackgroundOff
        };
        self.publish(SessionEvent::Log(command.to_string()));
        let response = self.state.exchange(&command)?;
        self.publish_response(response);
        Ok(())
    }

    /// Run an autozero cycle and log both steps
    pub fn autozero(&self) -> Result<()> {
        self.publish(SessionEvent::Log(Command::Autozero.to_string()));
        let (started, result) = self.state.autozero_exchange()?;
        self.publish_response(started);
        self.publish(SessionEvent::Log(Command::AutozeroResult.to_string()));
        self.publish_response(result);
        Ok(())
    }

    /// Send console input verbatim and log the exchange
    pub fn send_raw(&self, text: &str) -> Result<()> {
        let command = Command::Raw(text.to_string());
        self.publish(SessionEvent::Log(command.to_string()));
        let response = self.state.exchange(&command)?;
        self.publish_response(response);
        Ok(())
    }

    fn publish_response(&self, response: Option<String>) {
        match response {
            Some(line) => self.publish(SessionEvent::Log(line)),
            None => self.publish(SessionEvent::Warning(
                "no response from device".to_string(),
            )),
        }
    }

    /// Stop the worker and wait out its in-flight cycle
    ///
    /// The connection is only dropped after the join, so the worker never
    /// touches a closed handle.
    pub fn stop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Process-wide interrupt flag set by Ctrl+C
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the Ctrl+C hook and return the flag it sets
///
/// The handler only sets a flag; the console loop observes it between
/// reads and drives the stop/join/close sequence itself.
#[cfg(unix)]
pub fn install_interrupt_hook() -> &'static AtomicBool {
    extern "C" fn handle_sigint(_: libc::c_int) {
        INTERRUPTED.store(true, Ordering::SeqCst);
    }

    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handle_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
        libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut());
    }

    &INTERRUPTED
}

#[cfg(not(unix))]
pub fn install_interrupt_hook() -> &'static AtomicBool {
    &INTERRUPTED
}
