//! Builtin isotope table
//!
//! Channel codes and per-minute decay constants for the isotopes programmed
//! into the calibrator at the factory.

use once_cell::sync::Lazy;

use super::catalog::Isotope;

/// Isotopes programmed into the VIK-202
pub static BUILTIN_ISOTOPES: Lazy<Vec<Isotope>> = Lazy::new(|| {
    vec![
        Isotope::builtin("Tc-99m", "!F236", 0.001917),
        Isotope::builtin("I-123", "!F618", 0.000873),
        Isotope::builtin("Ga-67", "!F287", 0.0001476),
        Isotope::builtin("In-111", "!F676", 0.000172),
        Isotope::builtin("Y-90", "!F902", 0.000180),
        Isotope::builtin("I-131", "!F447", 0.00006),
        Isotope::builtin("Tl-201", "!F552", 0.0001584),
        Isotope::builtin("F-18", "!F762", 0.006315),
        Isotope::builtin("Cs-137", "!F587", 0.000000004368),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        assert_eq!(BUILTIN_ISOTOPES.len(), 9);

        let tc = BUILTIN_ISOTOPES.iter().find(|i| i.name == "Tc-99m").unwrap();
        assert_eq!(tc.channel, "!F236");
        assert_eq!(tc.decay_per_min, Some(0.001917));
    }

    #[test]
    fn test_builtin_channels_unique() {
        for (idx, a) in BUILTIN_ISOTOPES.iter().enumerate() {
            for b in &BUILTIN_ISOTOPES[idx + 1..] {
                assert_ne!(a.name, b.name);
                assert_ne!(a.channel, b.channel);
            }
        }
    }
}
