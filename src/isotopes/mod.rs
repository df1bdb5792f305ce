//! Isotope catalog
//!
//! Maps isotope names to calibration channel commands and decay constants.
//! The builtin table covers the channels programmed into the VIK-202;
//! additional channels can be merged from a TOML file or registered at
//! runtime through the console's `*!F` form.

pub mod builtin;
pub mod catalog;

pub use builtin::BUILTIN_ISOTOPES;
pub use catalog::{Catalog, Isotope};

/// Isotope selected at startup when none is requested
pub const DEFAULT_ISOTOPE: &str = "Tc-99m";
