//! Activity units and display formatting
//!
//! Raw readings arrive in becquerels; the display works in one of four
//! clinical units. Conversion is a fixed divisor per unit, with 1 Ci =
//! 3.7e10 Bq behind the curie-based divisors.

pub mod decay;

pub use decay::{correct_now, correct_to_reference, DecayError, ReferenceTime};

use std::fmt;
use std::str::FromStr;

/// Display units for an activity reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Megabecquerel ("MBq")
    MBq,
    /// Kilobecquerel ("kBq")
    KBq,
    /// Millicurie ("mCi")
    MCi,
    /// Microcurie ("µCi")
    UCi,
}

/// Unit selected at startup when none is requested
pub const DEFAULT_UNIT: Unit = Unit::MCi;

impl Unit {
    /// Selector order, as offered by the unit picker
    pub const ALL: [Unit; 4] = [Unit::UCi, Unit::MCi, Unit::MBq, Unit::KBq];

    /// Divisor from becquerels
    pub fn divisor(self) -> f64 {
        match self {
            Unit::MBq => 1e6,
            Unit::KBq => 1e3,
            Unit::MCi => 37.0 * 1e6,
            Unit::UCi => 37.0 * 1e3,
        }
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            Unit::MBq => "MBq",
            Unit::KBq => "kBq",
            Unit::MCi => "mCi",
            Unit::UCi => "µCi",
        }
    }

    /// Convert a raw becquerel reading into this unit
    pub fn convert(self, raw_bq: f64) -> f64 {
        raw_bq / self.divisor()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Unit {
    type Err = String;

    /// Accepts the display labels, case-insensitively; "uCi" is an ASCII
    /// alias for "µCi"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mbq" => Ok(Unit::MBq),
            "kbq" => Ok(Unit::KBq),
            "mci" => Ok(Unit::MCi),
            "uci" | "µci" => Ok(Unit::UCi),
            _ => Err(format!("unknown unit: {s:?} (use MBq, kBq, mCi or µCi)")),
        }
    }
}

/// Primary display line: value to one decimal, unit label, isotope name
pub fn format_reading(value: f64, unit: Unit, isotope: &str) -> String {
    format!("{:.1} {} {}", value, unit.label(), isotope)
}

/// Decay log line: corrected value tagged with the reference time
pub fn format_corrected(value: f64, unit: Unit, isotope: &str, reference: ReferenceTime) -> String {
    format!("{:.1} {} {} @ {}", value, unit.label(), isotope, reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_divisors() {
        assert_eq!(Unit::MBq.divisor(), 1e6);
        assert_eq!(Unit::KBq.divisor(), 1e3);
        assert_eq!(Unit::MCi.divisor(), 37e6);
        assert_eq!(Unit::UCi.divisor(), 37e3);
    }

    #[test]
    fn test_convert_scenarios() {
        // 3.7 GBq is exactly 100 mCi
        assert_eq!(Unit::MCi.convert(3_700_000.0), 0.1);
        assert_eq!(format_reading(Unit::MCi.convert(3_700_000_000.0), Unit::MCi, "Tc-99m"),
            "100.0 mCi Tc-99m");
        assert_eq!(format_reading(Unit::KBq.convert(1000.0), Unit::KBq, "F-18"),
            "1.0 kBq F-18");
    }

    #[test]
    fn test_unit_parse() {
        assert_eq!("MBq".parse::<Unit>(), Ok(Unit::MBq));
        assert_eq!("kbq".parse::<Unit>(), Ok(Unit::KBq));
        assert_eq!("mCi".parse::<Unit>(), Ok(Unit::MCi));
        assert_eq!("uCi".parse::<Unit>(), Ok(Unit::UCi));
        assert_eq!("µCi".parse::<Unit>(), Ok(Unit::UCi));
        assert!("Bq".parse::<Unit>().is_err());
    }

    #[test]
    fn test_format_rounds_to_one_decimal() {
        assert_eq!(format_reading(99.96, Unit::MCi, "Tc-99m"), "100.0 mCi Tc-99m");
        assert_eq!(format_reading(0.04, Unit::UCi, "I-131"), "0.0 µCi I-131");
    }
}
