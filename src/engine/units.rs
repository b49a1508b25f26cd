//! Unit normalization.
//!
//! Converts quantities written with a single metric-prefixed unit (`km`,
//! `GHz`, `hPa`, ...) to the unprefixed SI base unit and back again. Every
//! link formula is written against base SI values, so the display unit chosen
//! in a configuration never leaks into a calculation.
//!
//! Units:
//! - Only single units are decomposed. Composite units (`m/s`, `kg m^-3`) are
//!   rejected with [`UnitError::Composite`].
//! - `dB`, `deg`, `-` and the empty string are not physical SI quantities and
//!   pass through unchanged.
//! - Mass is normalized to kilograms, so `g` carries a factor of 1e-3.

use super::error::UnitError;

/// Speed of light in vacuum [m/s].
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Units that are never converted.
pub const IGNORED_UNITS: [&str; 4] = ["dB", "deg", "-", ""];

// "da" must be tried before "d".
const SI_PREFIXES: [(&str, f64); 22] = [
    ("Y", 1e24),
    ("Z", 1e21),
    ("E", 1e18),
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("da", 1e1),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("µ", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
    ("z", 1e-21),
    ("y", 1e-24),
    ("", 1.0),
];

/// Unprefixed symbols with the factor to their SI base unit.
const BASE_UNITS: [(&str, f64); 14] = [
    ("m", 1.0),
    ("s", 1.0),
    ("Hz", 1.0),
    ("K", 1.0),
    ("Pa", 1.0),
    ("W", 1.0),
    ("J", 1.0),
    ("N", 1.0),
    ("V", 1.0),
    ("A", 1.0),
    ("rad", 1.0),
    ("mol", 1.0),
    ("cd", 1.0),
    // kilogram is the base unit of mass
    ("g", 1e-3),
];

/// Whether `unit` is exempt from conversion.
pub fn is_ignored_unit(unit: &str) -> bool {
    IGNORED_UNITS.contains(&unit)
}

fn is_composite(unit: &str) -> bool {
    unit.chars().any(|ch| matches!(ch, '/' | '*' | '^' | '.' | '(' | ')' | '-') || ch.is_whitespace() || ch.is_ascii_digit())
}

fn lookup_base(symbol: &str) -> Option<f64> {
    BASE_UNITS.iter().find(|(sym, _)| *sym == symbol).map(|(_, factor)| *factor)
}

/// Multiplier from `unit` to its SI base unit.
fn resolve(unit: &str) -> Result<f64, UnitError> {
    if is_composite(unit) {
        return Err(UnitError::Composite(unit.to_string()));
    }

    // An exact base symbol wins over a prefix reading ("cd" is candela, not centi-day).
    if let Some(factor) = lookup_base(unit) {
        return Ok(factor);
    }

    for (prefix, multiplier) in SI_PREFIXES.iter().filter(|(p, _)| !p.is_empty()) {
        if let Some(rest) = unit.strip_prefix(prefix) {
            if let Some(factor) = lookup_base(rest) {
                return Ok(factor * multiplier);
            }
        }
    }

    Err(UnitError::Unknown(unit.to_string()))
}

/// Convert `value` expressed in `unit` to the unprefixed SI base unit.
///
/// ```text
/// to_base_si(300.0, "km")  -> 300000.0   (m)
/// to_base_si(2.0, "GHz")   -> 2.0e9      (Hz)
/// to_base_si(12.0, "dB")   -> 12.0       (ignored)
/// ```
pub fn to_base_si(value: f64, unit: &str) -> Result<f64, UnitError> {
    if is_ignored_unit(unit) {
        return Ok(value);
    }
    Ok(value * resolve(unit)?)
}

/// Convert a base SI `value` to the prefixed `unit`. Inverse of [`to_base_si`].
pub fn to_prefixed_si(value: f64, unit: &str) -> Result<f64, UnitError> {
    if is_ignored_unit(unit) {
        return Ok(value);
    }
    Ok(value / resolve(unit)?)
}

/// λ = c / f, with `frequency` in Hz and the result in meters.
pub fn freq_to_wavelength(frequency: f64) -> f64 {
    SPEED_OF_LIGHT / frequency
}

/// f = c / λ, with `wavelength` in meters and the result in Hz.
pub fn wavelength_to_freq(wavelength: f64) -> f64 {
    SPEED_OF_LIGHT / wavelength
}
