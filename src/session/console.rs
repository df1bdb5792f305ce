//! Manual command console
//!
//! Input grammar, checked in order:
//! 1. `*!F<code>` registers a new channel (device untouched)
//! 2. `t<hh><mm>` sets the decay reference (device untouched)
//! 3. `:`-prefixed local commands drive the session itself
//! 4. anything else goes to the device verbatim
//!
//! A malformed `t` form is not an error; it falls through to passthrough
//! like any other text. Dispatch never ends the session on bad input;
//! every failure becomes a warning line.

use crate::activity::{ReferenceTime, Unit};
use crate::session::{Session, SessionEvent};

/// Session-local commands (the console's own controls)
#[derive(Debug, Clone, PartialEq)]
pub enum LocalCommand {
    /// `:isotope <name>`: switch the active channel
    Isotope(String),
    /// `:unit <label>`: switch the display unit
    Unit(Unit),
    /// `:background on|off`: background subtraction
    Background(bool),
    /// `:zero`: run an autozero cycle
    Zero,
    /// `:help`: show the console grammar
    Help,
    /// `:quit`: stop polling and exit
    Quit,
}

/// Classified console input
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    /// Register a `*!F` channel
    AddChannel(String),
    /// Set the decay reference
    SetReference(ReferenceTime),
    /// Session-local command
    Local(LocalCommand),
    /// Rejected local command, with the complaint
    Invalid(String),
    /// Verbatim device traffic
    Passthrough(String),
}

/// What the caller should do after a dispatched line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

/// Console help text
pub const HELP: &str = "\
local commands:
  :isotope <name>          switch the active channel
  :unit <MBq|kBq|mCi|uCi>  switch the display unit
  :background on|off       background subtraction
  :zero                    autozero cycle
  :quit                    stop polling and exit
device forms:
  *!F<code>                register a channel (e.g. *!F1234)
  t<hhmm>                  decay-correct to hh:mm (e.g. t0930)
  anything else is sent to the device verbatim";

impl ConsoleInput {
    /// Classify one console line
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        if line.starts_with("*!F") {
            return ConsoleInput::AddChannel(line.to_string());
        }
        if let Some(reference) = ReferenceTime::parse_console(line) {
            return ConsoleInput::SetReference(reference);
        }
        if let Some(rest) = line.strip_prefix(':') {
            return Self::parse_local(rest);
        }

        ConsoleInput::Passthrough(line.to_string())
    }

    fn parse_local(rest: &str) -> Self {
        let (keyword, arg) = match rest.split_once(char::is_whitespace) {
            Some((keyword, arg)) => (keyword, arg.trim()),
            None => (rest, ""),
        };

        match keyword {
            "isotope" if !arg.is_empty() => {
                ConsoleInput::Local(LocalCommand::Isotope(arg.to_string()))
            }
            "isotope" => ConsoleInput::Invalid("usage: :isotope <name>".to_string()),
            "unit" => match arg.parse::<Unit>() {
                Ok(unit) => ConsoleInput::Local(LocalCommand::Unit(unit)),
                Err(e) => ConsoleInput::Invalid(e),
            },
            "background" => match arg {
                "on" => ConsoleInput::Local(LocalCommand::Background(true)),
                "off" => ConsoleInput::Local(LocalCommand::Background(false)),
                _ => ConsoleInput::Invalid("usage: :background on|off".to_string()),
            },
            "zero" => ConsoleInput::Local(LocalCommand::Zero),
            "help" => ConsoleInput::Local(LocalCommand::Help),
            "quit" | "q" => ConsoleInput::Local(LocalCommand::Quit),
            _ => ConsoleInput::Invalid(format!("unknown command :{keyword} (try :help)")),
        }
    }
}

/// Dispatch one console line against the running session
pub fn dispatch(session: &Session, line: &str) -> Outcome {
    match ConsoleInput::parse(line) {
        ConsoleInput::AddChannel(input) => match session.state().add_manual_channel(&input) {
            Ok(isotope) => session.publish(SessionEvent::Log(format!(
                "channel {} registered as {}",
                isotope.channel, isotope.name
            ))),
            Err(e) => session.publish(SessionEvent::Warning(e.to_string())),
        },
        ConsoleInput::SetReference(reference) => {
            session.state().set_reference(reference);
            session.publish(SessionEvent::Log(format!(
                "decay reference set to {reference}"
            )));
        }
        ConsoleInput::Local(command) => return dispatch_local(session, command),
        ConsoleInput::Invalid(message) => session.publish(SessionEvent::Warning(message)),
        ConsoleInput::Passthrough(text) if text.is_empty() => {}
        ConsoleInput::Passthrough(text) => {
            if let Err(e) = session.send_raw(&text) {
                session.publish(SessionEvent::Warning(format!("send failed: {e:#}")));
            }
        }
    }

    Outcome::Continue
}

fn dispatch_local(session: &Session, command: LocalCommand) -> Outcome {
    match command {
        LocalCommand::Isotope(name) => {
            if session.state().catalog_entry(&name).is_some() {
                session.state().set_isotope(&name);
                session.publish(SessionEvent::Log(format!("isotope: {name}")));
            } else {
                let known = session.state().catalog_names().join(", ");
                session.publish(SessionEvent::Warning(format!(
                    "unknown isotope {name:?}; known: {known}"
                )));
            }
        }
        LocalCommand::Unit(unit) => {
            session.state().set_unit(unit);
            session.publish(SessionEvent::Log(format!("unit: {unit}")));
        }
        LocalCommand::Background(on) => {
            if let Err(e) = session.set_background(on) {
                session.publish(SessionEvent::Warning(format!(
                    "background toggle failed: {e:#}"
                )));
            }
        }
        LocalCommand::Zero => {
            if let Err(e) = session.autozero() {
                session.publish(SessionEvent::Warning(format!("autozero failed: {e:#}")));
            }
        }
        LocalCommand::Help => session.publish(SessionEvent::Log(HELP.to_string())),
        LocalCommand::Quit => return Outcome::Quit,
    }

    Outcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_channel_form_wins() {
        assert_eq!(
            ConsoleInput::parse("*!F1234"),
            ConsoleInput::AddChannel("*!F1234".to_string())
        );
    }

    #[test]
    fn test_reference_form() {
        assert_eq!(
            ConsoleInput::parse("t0930"),
            ConsoleInput::SetReference(ReferenceTime { hour: 9, minute: 30 })
        );
    }

    #[test]
    fn test_malformed_reference_falls_through() {
        // out-of-range hour/minute are passthrough, not errors
        assert_eq!(
            ConsoleInput::parse("t2530"),
            ConsoleInput::Passthrough("t2530".to_string())
        );
        assert_eq!(
            ConsoleInput::parse("t0965"),
            ConsoleInput::Passthrough("t0965".to_string())
        );
    }

    #[test]
    fn test_device_commands_are_passthrough() {
        assert_eq!(
            ConsoleInput::parse("!GQ"),
            ConsoleInput::Passthrough("!GQ".to_string())
        );
        assert_eq!(
            ConsoleInput::parse("!P142"),
            ConsoleInput::Passthrough("!P142".to_string())
        );
    }

    #[test]
    fn test_local_commands() {
        assert_eq!(
            ConsoleInput::parse(":unit MBq"),
            ConsoleInput::Local(LocalCommand::Unit(Unit::MBq))
        );
        assert_eq!(
            ConsoleInput::parse(":isotope F-18"),
            ConsoleInput::Local(LocalCommand::Isotope("F-18".to_string()))
        );
        assert_eq!(
            ConsoleInput::parse(":background on"),
            ConsoleInput::Local(LocalCommand::Background(true))
        );
        assert_eq!(
            ConsoleInput::parse(":quit"),
            ConsoleInput::Local(LocalCommand::Quit)
        );
    }

    #[test]
    fn test_bad_local_commands_do_not_reach_device() {
        assert!(matches!(
            ConsoleInput::parse(":bogus"),
            ConsoleInput::Invalid(_)
        ));
        assert!(matches!(
            ConsoleInput::parse(":unit parsec"),
            ConsoleInput::Invalid(_)
        ));
        assert!(matches!(
            ConsoleInput::parse(":background maybe"),
            ConsoleInput::Invalid(_)
        ));
    }
}
