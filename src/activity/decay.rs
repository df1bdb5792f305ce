//! Decay back-correction to a reference clock time
//!
//! A reading taken now is projected to the activity the sample had at the
//! reference instant by multiplying with e^(k·m), where k is the isotope's
//! per-minute decay constant and m the whole minutes elapsed from the
//! reference to now. m may be negative when the reference lies ahead of
//! the clock.

use chrono::{Local, NaiveTime, Timelike};
use std::fmt;
use thiserror::Error;

use crate::isotopes::Isotope;

/// Wall-clock anchor for decay correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceTime {
    pub hour: u8,
    pub minute: u8,
}

/// Decay correction failures
#[derive(Debug, Error, PartialEq)]
pub enum DecayError {
    /// The active isotope has no recorded decay constant (manually added
    /// channels never do)
    #[error("no decay constant recorded for {0}")]
    MissingDecayConstant(String),
}

impl ReferenceTime {
    /// Parse the console form `t<hh><mm>`: exactly five characters, hour
    /// below 23, minute below 60. Anything else is not a reference time and
    /// falls through to device passthrough.
    pub fn parse_console(input: &str) -> Option<Self> {
        let bytes = input.as_bytes();
        if bytes.len() != 5 || bytes[0] != b't' {
            return None;
        }
        if !bytes[1..].iter().all(u8::is_ascii_digit) {
            return None;
        }

        let hour = (bytes[1] - b'0') * 10 + (bytes[2] - b'0');
        let minute = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
        if hour < 23 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Whole minutes elapsed from the reference to the given clock time
    pub fn elapsed_minutes(self, now: NaiveTime) -> i64 {
        let now_minutes = i64::from(now.hour()) * 60 + i64::from(now.minute());
        let ref_minutes = i64::from(self.hour) * 60 + i64::from(self.minute);
        now_minutes - ref_minutes
    }
}

impl fmt::Display for ReferenceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Back-correct a converted reading to the reference instant
pub fn correct_to_reference(
    converted: f64,
    isotope: &Isotope,
    reference: ReferenceTime,
    now: NaiveTime,
) -> Result<f64, DecayError> {
    let k = isotope
        .decay_per_min
        .ok_or_else(|| DecayError::MissingDecayConstant(isotope.name.clone()))?;
    let minutes = reference.elapsed_minutes(now) as f64;

    Ok(converted * (k * minutes).exp())
}

/// Back-correct against the local wall clock
pub fn correct_now(
    converted: f64,
    isotope: &Isotope,
    reference: ReferenceTime,
) -> Result<f64, DecayError> {
    correct_to_reference(converted, isotope, reference, Local::now().time())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tc99m() -> Isotope {
        Isotope::builtin("Tc-99m", "!F236", 0.001917)
    }

    #[test]
    fn test_parse_console_reference() {
        assert_eq!(
            ReferenceTime::parse_console("t0930"),
            Some(ReferenceTime { hour: 9, minute: 30 })
        );
        assert_eq!(
            ReferenceTime::parse_console("t2259"),
            Some(ReferenceTime { hour: 22, minute: 59 })
        );
    }

    #[test]
    fn test_parse_console_rejects_out_of_range() {
        // hour bound is exclusive at 23, as the device console defines it
        assert_eq!(ReferenceTime::parse_console("t2530"), None);
        assert_eq!(ReferenceTime::parse_console("t2300"), None);
        assert_eq!(ReferenceTime::parse_console("t0965"), None);
    }

    #[test]
    fn test_parse_console_rejects_malformed() {
        assert_eq!(ReferenceTime::parse_console("t093"), None);
        assert_eq!(ReferenceTime::parse_console("t09301"), None);
        assert_eq!(ReferenceTime::parse_console("x0930"), None);
        assert_eq!(ReferenceTime::parse_console("t09a0"), None);
        assert_eq!(ReferenceTime::parse_console(""), None);
    }

    #[test]
    fn test_elapsed_minutes() {
        let reference = ReferenceTime { hour: 9, minute: 30 };
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();

        assert_eq!(reference.elapsed_minutes(at(10, 45)), 75);
        assert_eq!(reference.elapsed_minutes(at(9, 30)), 0);
        assert_eq!(reference.elapsed_minutes(at(9, 0)), -30);
    }

    #[test]
    fn test_correction_is_identity_at_reference() {
        let reference = ReferenceTime { hour: 9, minute: 30 };
        let now = NaiveTime::from_hms_opt(9, 30, 0).unwrap();

        let corrected = correct_to_reference(42.0, &tc99m(), reference, now).unwrap();
        assert_eq!(corrected, 42.0);
    }

    #[test]
    fn test_correction_multiplies_by_exp() {
        let reference = ReferenceTime { hour: 9, minute: 0 };
        let now = NaiveTime::from_hms_opt(10, 0, 0).unwrap();

        let corrected = correct_to_reference(100.0, &tc99m(), reference, now).unwrap();
        let expected = 100.0 * (0.001917_f64 * 60.0).exp();
        assert!((corrected - expected).abs() < 1e-9);
        // one Tc-99m hour back-projects to ~12% more activity
        assert!(corrected > 100.0);
    }

    #[test]
    fn test_correction_with_future_reference() {
        let reference = ReferenceTime { hour: 11, minute: 0 };
        let now = NaiveTime::from_hms_opt(10, 0, 0).unwrap();

        let corrected = correct_to_reference(100.0, &tc99m(), reference, now).unwrap();
        assert!(corrected < 100.0);
    }

    #[test]
    fn test_missing_decay_constant_is_explicit() {
        let manual = Isotope {
            name: "*!F1234".to_string(),
            channel: "!F1234".to_string(),
            decay_per_min: None,
        };
        let reference = ReferenceTime { hour: 9, minute: 30 };
        let now = NaiveTime::from_hms_opt(10, 0, 0).unwrap();

        assert_eq!(
            correct_to_reference(1.0, &manual, reference, now),
            Err(DecayError::MissingDecayConstant("*!F1234".to_string()))
        );
    }

    #[test]
    fn test_reference_display() {
        let reference = ReferenceTime { hour: 9, minute: 5 };
        assert_eq!(reference.to_string(), "09:05");
    }
}
